//! Ontogate CLI: command-line interface for the Ontogate SPARQL gateway
//!
//! Uses the ontogate-sdk RemoteClient to connect to a running server.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use ontogate_sdk::{GatewayClient, RemoteClient, SdkError};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "ontogate", version, about = "Ontogate SPARQL gateway CLI")]
struct Cli {
    /// Gateway HTTP URL
    #[arg(long, default_value = "http://localhost:5000", global = true, env = "ONTOGATE_URL")]
    url: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a SELECT query
    Query {
        /// The SPARQL query string
        sparql: String,

        /// Timeout in seconds (1-300)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Validate a query without executing it
    Validate {
        sparql: String,
    },
    /// Ask a question in French
    Ask {
        question: String,
    },
    /// List example queries
    Examples,
    /// Show the gateway health report
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = RemoteClient::new(&cli.url);

    let result = match cli.command {
        Commands::Query { sparql, timeout } => run_query(&client, &sparql, timeout, &cli.format).await,
        Commands::Validate { sparql } => run_validate(&client, &sparql, &cli.format).await,
        Commands::Ask { question } => run_ask(&client, &question, &cli.format).await,
        Commands::Examples => run_examples(&client, &cli.format).await,
        Commands::Health => run_health(&client, &cli.format).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(sdk) = e.downcast_ref::<SdkError>() {
            for suggestion in sdk.suggestions() {
                eprintln!("  - {}", suggestion);
            }
        }
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Value of a formatted term object, or empty for an unbound variable
fn cell(term: Option<&Value>) -> String {
    match term {
        Some(Value::Object(term)) => term
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

async fn run_query(
    client: &RemoteClient,
    sparql: &str,
    timeout: Option<u64>,
    format: &OutputFormat,
) -> CliResult {
    let result = client.query(sparql, timeout).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            let variables = result.variables();
            if variables.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(&variables);

            let rows = result.rows();
            for row in &rows {
                let cells: Vec<String> = variables.iter().map(|v| cell(row.get(v))).collect();
                table.add_row(cells);
            }

            println!("{}", table);
            println!("{} row(s)", rows.len());
        }
    }

    Ok(())
}

async fn run_validate(client: &RemoteClient, sparql: &str, format: &OutputFormat) -> CliResult {
    let result = client.validate(sparql).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            println!("Valid: {}", result.valid);
            if let Some(query_type) = result.data.get("queryType").and_then(Value::as_str) {
                println!("Type:  {}", query_type);
            }
            for suggestion in result.suggestions() {
                println!("  - {}", suggestion);
            }
        }
    }

    Ok(())
}

async fn run_ask(client: &RemoteClient, question: &str, format: &OutputFormat) -> CliResult {
    let result = client.ask(question).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            println!("Intent: {}", result.intent);
            println!("{}\n", result.sparql_query);

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["name", "type", "uri"]);
            for person in &result.results {
                table.add_row(vec![&person.name, &person.person_type, &person.uri]);
            }

            println!("{}", table);
            println!("{} person(s) in {:.3}s", result.results.len(), result.execution_time);
        }
    }

    Ok(())
}

async fn run_examples(client: &RemoteClient, format: &OutputFormat) -> CliResult {
    let result = client.examples().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            for (name, example) in &result.examples {
                println!("# {}: {}", name, example.description);
                println!("{}\n", example.query);
            }
        }
    }

    Ok(())
}

async fn run_health(client: &RemoteClient, format: &OutputFormat) -> CliResult {
    let report = client.health().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("Status:   {}", report.status);
            println!(
                "Fuseki:   {} ({})",
                if report.fuseki.connected { "connected" } else { "unreachable" },
                report.fuseki.endpoint
            );
            if let Some(time) = report.fuseki.response_time {
                println!("Response: {:.3}s", time);
            }
            println!(
                "Ontology: {} triples, {} classes",
                report.ontology.total_triples.map_or("?".to_string(), |n| n.to_string()),
                report.ontology.class_count.map_or("?".to_string(), |n| n.to_string()),
            );
            for error in &report.issues.errors {
                println!("  error:   {}", error);
            }
            for warning in &report.issues.warnings {
                println!("  warning: {}", warning);
            }
        }
    }

    Ok(())
}
