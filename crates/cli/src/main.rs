mod config;

use anyhow::{Context, Result};
use brokerlink_api::{AppState, StaticTokenVerifier};
use brokerlink_brokers_metaapi::MetaApiClient;
use brokerlink_core::LinkStore;
use brokerlink_data::{MemoryLinkStore, PgLinkStore};
use brokerlink_workflow::WorkflowContext;
use clap::{Parser, Subcommand};
use config::{RelayConfig, StoreBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "brokerlink")]
#[command(about = "Broker account relay: link MT5 accounts and proxy account data without exposing the API credential")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, env = "BROKERLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream service credential
    #[arg(long, env = "METAAPI_TOKEN", hide_env_values = true)]
    metaapi_token: Option<String>,

    /// Database URL (postgres store backend)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Server {
        /// Bind address (overrides the config file)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print the effective configuration with secrets masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    let config = RelayConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Server { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            run_server(config, bind, cli.metaapi_token, cli.database_url).await?;
        }
        Commands::CheckConfig => {
            let rendered = toml::to_string_pretty(&config.redacted())
                .context("Failed to render configuration")?;
            println!("{rendered}");
            println!(
                "# upstream credential: {}",
                if cli.metaapi_token.is_some() { "set" } else { "MISSING" }
            );
        }
    }

    Ok(())
}

async fn run_server(
    config: RelayConfig,
    bind: String,
    metaapi_token: Option<String>,
    database_url: Option<String>,
) -> Result<()> {
    let token = metaapi_token.context("METAAPI_TOKEN is not set")?;
    let upstream =
        MetaApiClient::new(&config.upstream, &token).context("Failed to build upstream client")?;

    let store: Arc<dyn LinkStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory link store; links are lost on restart");
            Arc::new(MemoryLinkStore::new())
        }
        StoreBackend::Postgres => {
            let database_url = database_url.context("DATABASE_URL is required for the postgres store")?;
            let pool = sqlx::PgPool::connect(&database_url).await?;
            brokerlink_data::db::run_migrations(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
            Arc::new(PgLinkStore::new(pool))
        }
    };

    let verifier = StaticTokenVerifier::new(&config.auth.tokens);
    if verifier.is_empty() {
        tracing::warn!("No API tokens configured; every request will be rejected as unauthenticated");
    }

    tracing::info!(
        store = ?config.store.backend,
        tokens = verifier.len(),
        "Starting broker-link relay"
    );

    let workflow = WorkflowContext::new(Arc::new(upstream), store);
    brokerlink_api::start_server(AppState::new(workflow, Arc::new(verifier)), &bind).await
}
