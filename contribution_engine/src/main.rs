//! Entry point for the Contribution Engine binary.
//!
//! Running this binary starts an HTTP server that exposes the engine.
//! The JSON file holding the rate and cost tables may be specified via
//! the `COTIZADOR_CONFIG` environment variable; if unset the built-in
//! tables are used.  `COTIZADOR_BIND_ADDR` selects the listen address
//! and `RUST_LOG` the log filter.

use contribution_engine::config::{load_config, CONFIG_ENV};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("config error: {:#}", err);
            std::process::exit(1);
        }
    };

    // Determine bind address
    let addr = std::env::var("COTIZADOR_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    if let Err(err) = contribution_engine::api::serve(&addr, config).await {
        tracing::error!("error running server: {:#}", err);
        std::process::exit(1);
    }
}
