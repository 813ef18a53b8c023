use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use automation_client::config::{load_config, ClientConfig};
use automation_client::observability::logging::init_logging;
use automation_client::{
    AutomationClient, ClassifiedError, EnvResolver, FileResolver, ListOptions, ResourceClient,
    SecretResolver,
};

#[derive(Parser)]
#[command(name = "automation-cli")]
#[command(about = "Operator CLI for the workflow-automation service", long_about = None)]
struct Cli {
    /// TOML client configuration; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file with `api_key` and `base_url`; environment variables otherwise
    #[arg(short, long)]
    secrets: Option<PathBuf>,

    /// Collection path the resource commands operate on
    #[arg(long, default_value = "/workflows")]
    collection: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the service and report connection status
    Status,
    /// List items in the collection
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        /// Follow cursors and print every page
        #[arg(long)]
        all: bool,
    },
    /// Fetch a single item
    Get { id: String },
    /// Activate an item
    Activate { id: String },
    /// Deactivate an item
    Deactivate { id: String },
    /// Delete an item
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    init_logging(&config.observability)?;

    let resolver: Arc<dyn SecretResolver> = match &cli.secrets {
        Some(path) => Arc::new(FileResolver::new(path)),
        None => Arc::new(EnvResolver::new(
            config.credentials.api_key_env.clone(),
            config.credentials.base_url_env.clone(),
        )),
    };

    let client = AutomationClient::new(&config, resolver)?;
    let resources = client.resources(&cli.collection);

    match cli.command {
        Commands::Status => {
            let report = client.tracker().check_connection().await;
            print_json(&json!({
                "status": report.status,
                "error": report.last_error,
                "circuit": format!("{:?}", client.breaker().state()),
            }))?;
            if !report.is_connected() {
                std::process::exit(1);
            }
        }
        Commands::List { limit, cursor, active, all } => {
            let options = ListOptions {
                limit,
                cursor,
                active,
                extra: Vec::new(),
            };
            let result = if all {
                resources.list_all::<Value>(&options).await.map(Value::Array)
            } else {
                resources
                    .list::<Value>(&options)
                    .await
                    .map(|page| json!({ "data": page.data, "nextCursor": page.next_cursor }))
            };
            print_result(result)?;
        }
        Commands::Get { id } => print_result(resources.get::<Value>(&id).await)?,
        Commands::Activate { id } => print_result(resources.activate::<Value>(&id).await)?,
        Commands::Deactivate { id } => print_result(resources.deactivate::<Value>(&id).await)?,
        Commands::Delete { id } => {
            let result = delete(&resources, &id).await;
            print_result(result)?;
        }
    }

    Ok(())
}

async fn delete(resources: &ResourceClient, id: &str) -> Result<Value, ClassifiedError> {
    resources.delete(id).await?;
    Ok(json!({ "deleted": id }))
}

fn print_result(result: Result<Value, ClassifiedError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(value) => print_json(&value),
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!("{}", err.user_hint());
            std::process::exit(1);
        }
    }
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
