//! Ontogate SDK: client library for the Ontogate SPARQL gateway
//!
//! [`RemoteClient`] talks to a running server over HTTP and implements the
//! [`GatewayClient`] trait.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ontogate_sdk::{GatewayClient, RemoteClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = RemoteClient::new("http://localhost:5000");
//!
//!     let result = client
//!         .query("SELECT ?s WHERE { ?s ?p ?o } LIMIT 5", None)
//!         .await
//!         .unwrap();
//!     println!("Found {} bindings", result.bindings_count());
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod remote;

pub use client::GatewayClient;
pub use error::{SdkError, SdkResult};
pub use models::{
    AskResponse, ExamplesResponse, HealthReport, Person, QueryExample, QueryResponse,
    ValidationResponse,
};
pub use remote::RemoteClient;
