use anyhow::Context;
use clap::Parser;
use ontogate::config::{GatewayConfig, DEFAULT_NAMESPACE};
use ontogate::custom::DEFAULT_MAX_QUERY_LENGTH;
use ontogate::health::SysinfoMetrics;
use ontogate::sparql::{HttpSparqlEndpoint, LinearBackoff, QueryExecutor};
use ontogate::{AppState, HttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SPARQL gateway over a Fuseki dataset
#[derive(Parser, Debug)]
#[command(name = "ontogate", version, about)]
struct Args {
    /// SPARQL query endpoint
    #[arg(long, env = "FUSEKI_QUERY_ENDPOINT", default_value = "http://localhost:3030/smartcity/query")]
    query_endpoint: String,

    /// SPARQL update endpoint
    #[arg(long, env = "FUSEKI_UPDATE_ENDPOINT", default_value = "http://localhost:3030/smartcity/update")]
    update_endpoint: String,

    /// Default per-attempt timeout in seconds
    #[arg(long, env = "SPARQL_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Attempts per query
    #[arg(long, env = "SPARQL_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    #[arg(long, env = "MAX_QUERY_LENGTH", default_value_t = DEFAULT_MAX_QUERY_LENGTH)]
    max_query_length: usize,

    /// Ontology namespace
    #[arg(long, env = "ONTOLOGY_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    #[arg(long, env = "ONTOGATE_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "ONTOGATE_PORT", default_value_t = 5000)]
    port: u16,
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        Self {
            query_endpoint: args.query_endpoint,
            update_endpoint: args.update_endpoint,
            timeout_secs: args.timeout,
            max_retries: args.max_retries,
            max_query_length: args.max_query_length,
            namespace: args.namespace,
            host: args.host,
            port: args.port,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::from(Args::parse());
    config.validate().context("invalid configuration")?;

    info!("Ontogate v{}", ontogate::version());
    info!("Query endpoint:  {}", config.query_endpoint);
    info!("Update endpoint: {}", config.update_endpoint);

    let endpoint = HttpSparqlEndpoint::new(&config.query_endpoint, &config.update_endpoint)
        .context("failed to build the HTTP client")?;
    let executor = Arc::new(QueryExecutor::new(
        Arc::new(endpoint),
        config.executor_config(),
        Arc::new(LinearBackoff::default()),
    ));
    let state = AppState::new(&config, executor, Arc::new(SysinfoMetrics))
        .context("invalid ontology namespace")?;

    HttpServer::new(state, config.bind_address())
        .start()
        .await
        .context("HTTP server failed")?;
    Ok(())
}
