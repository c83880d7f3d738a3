//! Oven server - HTTP endpoint for the browser-driven CakePHP installer

use anyhow::Result;
use clap::Parser;
use oven_core::catalog;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod handlers;
mod state;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "oven-server")]
#[command(about = "HTTP endpoint for the browser-driven CakePHP application installer")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8765")]
    pub listen: SocketAddr,

    /// Base directory installs are created under (defaults to the current
    /// working directory)
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Filename of the bundled Composer archive next to the base directory
    #[arg(long, default_value = "composer.phar")]
    pub composer_filename: String,

    /// Package index queried for the version catalog
    #[arg(long, env = "OVEN_PACKAGE_INDEX_URL", default_value = catalog::PACKAGE_INDEX_URL)]
    pub package_index_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let base_dir = match args.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let state = AppState::new(base_dir.clone(), args.composer_filename, args.package_index_url);
    let app = handlers::router(state);

    tracing::info!(listen = %args.listen, base_dir = %base_dir.display(), "oven installer listening");

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
