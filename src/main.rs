use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rbac_api_rust::config::{AppConfig, LogFormat, StorageKind};
use rbac_api_rust::database::{DatabaseManager, Directory, MemoryDirectory, PgDirectory};
use rbac_api_rust::AppState;

#[derive(Parser)]
#[command(name = "rbac-api")]
#[command(about = "User, role and permission management API")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, value_parser = ["postgres", "memory"], help = "Override the STORAGE backend")]
    storage: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,

    #[command(about = "Seed default permissions, roles and users into empty tables and exit")]
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET, etc. are picked up
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    match cli.storage.as_deref() {
        Some("memory") => config.database.storage = StorageKind::Memory,
        Some("postgres") => {
            anyhow::ensure!(config.database.url.is_some(), "--storage postgres needs DATABASE_URL");
            config.database.storage = StorageKind::Postgres;
        }
        _ => {}
    }
    init_tracing(config.api.log_format);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate => {
            let manager = connect(&config).await?;
            manager.close().await;
            Ok(())
        }
        Commands::Seed => {
            let state = build_state(config).await?;
            let report = state.seeder().run().await?;
            info!("Seeded {:?}", report);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rbac_api_rust=info,tower_http=info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting RBAC API in {:?} mode", config.environment);
    let bind_addr = config.bind_addr();
    let seed_on_startup = config.seed.on_startup;

    if seed_on_startup && config.is_production() {
        warn!("SEED_ON_STARTUP is enabled in production");
    }

    let state = build_state(config).await?;
    info!(
        "Permission grant precedence: {}",
        state.tokens.resolver().precedence()
    );
    if seed_on_startup {
        let report = state.seeder().run().await?;
        info!("Startup seed: {:?}", report);
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("RBAC API listening on http://{}", bind_addr);

    axum::serve(listener, rbac_api_rust::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let directory: Arc<dyn Directory> = match config.database.storage {
        StorageKind::Postgres => {
            let manager = connect(&config).await?;
            Arc::new(PgDirectory::new(manager.pool()))
        }
        StorageKind::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Arc::new(MemoryDirectory::new())
        }
    };

    Ok(AppState::with_system_clock(config, directory)?)
}

/// Connect to Postgres and bring the schema up to date.
async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseManager> {
    let manager = DatabaseManager::connect(&config.database).await?;
    manager.health_check().await.context("database unreachable")?;
    manager.migrate().await.context("migrations failed")?;
    info!("Database migrations applied");
    Ok(manager)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
