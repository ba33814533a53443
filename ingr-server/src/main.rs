//! ingr-server - image annotation backend
//!
//! Stores datasets, images, classes and labels in SQLite, keeps uploaded
//! assets on disk and serves both over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use ingr_common::config::{self, CliOverrides, ServerConfig};
use ingr_server::assets::AssetLayout;
use ingr_server::plugins::ProcessPluginRunner;
use ingr_server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ingr-server", version, about = "Image annotation backend")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "INGR_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database path or sqlite:// URL
    #[arg(long)]
    database: Option<String>,

    /// Permanent asset root
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Staging root for upload sessions
    #[arg(long)]
    tmp_dir: Option<PathBuf>,

    /// Directory scanned for plugin manifests
    #[arg(long)]
    plugins_dir: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            upload_dir: self.upload_dir.clone(),
            tmp_dir: self.tmp_dir.clone(),
            plugins_dir: self.plugins_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        config::load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config = ServerConfig::resolve(&args.overrides(), &toml_config)
        .context("Failed to resolve configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ingr-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Upload root: {}", config.upload_dir.display());
    info!("Staging root: {}", config.tmp_dir.display());
    info!("Plugins: {}", config.plugins_dir.display());

    let layout = AssetLayout::new(&config.upload_dir, &config.tmp_dir);
    layout
        .ensure_dirs()
        .context("Failed to create asset directories")?;

    info!("Database: {}", config.database_path.display());
    let db_pool = ingr_common::db::init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let runner = ProcessPluginRunner::from_command(&config.plugin_executor)?;
    let state = AppState::new(db_pool, layout, Arc::new(runner), config.plugins_dir.clone());

    let app = ingr_server::build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
