//! In-memory [`SparqlEndpoint`] for tests and offline demos

use super::client::{SparqlEndpoint, StoreError, StoreResult};
use super::SparqlJson;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Answers queries from canned responses.
///
/// Scripted responses are consumed first, in order. After that the first rule
/// whose needle occurs in the query text answers, and anything else gets the
/// fallback (an empty SELECT result unless changed).
pub struct MockEndpoint {
    url: String,
    script: Mutex<VecDeque<StoreResult<SparqlJson>>>,
    rules: Vec<(String, StoreResult<SparqlJson>)>,
    fallback: StoreResult<SparqlJson>,
    update_result: StoreResult<()>,
    queries: Mutex<Vec<String>>,
    updates: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            url: "mock://fuseki/query".to_string(),
            script: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            fallback: Ok(SparqlJson::select(Vec::new(), Vec::new())),
            update_result: Ok(()),
            queries: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Queue a one-shot response
    pub fn then(self, response: StoreResult<SparqlJson>) -> Self {
        lock(&self.script).push_back(response);
        self
    }

    /// Answer every query containing `needle`
    pub fn respond_to(mut self, needle: impl Into<String>, response: StoreResult<SparqlJson>) -> Self {
        self.rules.push((needle.into(), response));
        self
    }

    pub fn otherwise(mut self, response: StoreResult<SparqlJson>) -> Self {
        self.fallback = response;
        self
    }

    /// Fail every update with `err`
    pub fn failing_updates(mut self, err: StoreError) -> Self {
        self.update_result = Err(err);
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.queries).len()
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }

    pub fn updates(&self) -> Vec<String> {
        lock(&self.updates).clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        lock(&self.timeouts).clone()
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SparqlEndpoint for MockEndpoint {
    fn query_url(&self) -> &str {
        &self.url
    }

    async fn query(&self, query: &str, timeout: Duration) -> StoreResult<SparqlJson> {
        lock(&self.queries).push(query.to_string());
        lock(&self.timeouts).push(timeout);

        if let Some(response) = lock(&self.script).pop_front() {
            return response;
        }
        self.rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn update(&self, update: &str, timeout: Duration) -> StoreResult<()> {
        lock(&self.updates).push(update.to_string());
        lock(&self.timeouts).push(timeout);
        self.update_result.clone()
    }
}
