//! Parados API entry point
//!
//! Serves predictions over HTTP and offers offline validation helpers.

use clap::{Args, Parser, Subcommand};
use parados_api::config::{
    select_source, DEFAULT_COLUMNS_PATH, DEFAULT_MODEL_ARTIFACT, DEFAULT_MODEL_URI,
};
use parados_api::telemetry::{init_tracing, LogFormat};
use parados_api::{create_router, AppState, PredictionService, ServiceConfig, SERVICE_ID, SERVICE_VERSION};
use parados_core::{schema, ColumnOrder, FeatureRecord};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "parados-api")]
#[command(about = "Canary Islands unemployment prediction service")]
#[command(version)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value = "json", global = true, env = "LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Validate a feature record from a JSON file
    Validate {
        /// Path to the JSON payload
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check a column order artifact against the field table
    Columns {
        /// Path to the column artifact
        #[arg(short, long, default_value = DEFAULT_COLUMNS_PATH)]
        file: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Registered model reference
    #[arg(long, default_value = DEFAULT_MODEL_URI, env = "MODEL_URI")]
    model_uri: String,

    /// Tracking server base URL (`databricks` uses DATABRICKS_HOST)
    #[arg(long, env = "MLFLOW_TRACKING_URI")]
    tracking_uri: Option<String>,

    /// Model file inside the registered version's artifacts
    #[arg(long, default_value = DEFAULT_MODEL_ARTIFACT, env = "MODEL_ARTIFACT_PATH")]
    model_artifact: String,

    /// Load the model from a local export instead of the registry
    #[arg(long, env = "MODEL_FILE")]
    model_file: Option<PathBuf>,

    /// Score through an external serving endpoint instead of loading locally
    #[arg(long, env = "MODEL_SERVING_URL")]
    serving_url: Option<String>,

    /// Column order artifact, read on every prediction
    #[arg(long, default_value = DEFAULT_COLUMNS_PATH, env = "COLUMNS_PATH")]
    columns: PathBuf,

    /// Registry request timeout in milliseconds
    #[arg(long, default_value = "30000", env = "REGISTRY_TIMEOUT_MS")]
    registry_timeout_ms: u64,
}

impl ServeArgs {
    fn into_config(self) -> anyhow::Result<ServiceConfig> {
        let model = select_source(
            self.serving_url,
            self.model_file,
            self.model_uri,
            self.tracking_uri,
            parados_api::config::tracking_token_from_env(),
            self.model_artifact,
        )
        .map_err(anyhow::Error::msg)?;

        Ok(ServiceConfig::builder()
            .host(self.host)
            .port(self.port)
            .model(model)
            .columns_path(self.columns)
            .registry_timeout(Duration::from_millis(self.registry_timeout_ms))
            .build())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Serve(args) => {
            let config = args.into_config()?;
            let addr: SocketAddr = config.bind_address().parse()?;

            tracing::info!(
                service = SERVICE_ID,
                version = SERVICE_VERSION,
                model = %config.model.describe(),
                columns = %config.columns_path.display(),
                "Starting prediction service on {}",
                addr
            );

            let service = PredictionService::start(&config).await;
            let state = Arc::new(AppState::new(service)?);
            let router = create_router(state.clone());

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            state.shutdown();
        }

        Commands::Validate { file } => {
            let content = std::fs::read_to_string(&file)?;
            let payload: serde_json::Value = serde_json::from_str(&content)?;

            match FeatureRecord::from_json(&payload) {
                Ok(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                Err(failure) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "detail": failure.issues
                        }))?
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Columns { file } => {
            let order = ColumnOrder::load(&file)?;
            let unknown: Vec<_> = order
                .columns()
                .iter()
                .filter(|c| !schema::aliases().any(|alias| alias == c.as_str()))
                .collect();

            println!(
                "{}",
                serde_json::json!({
                    "columns": order.columns(),
                    "count": order.len(),
                    "unknown": unknown,
                })
            );

            if !unknown.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
