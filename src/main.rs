//! File service - Entry Point

use log::info;

use file_service::{Server, ServiceConfig};

/// Names an explicit config file instead of the default search paths.
const CONFIG_ENV: &str = "FILE_SERVICE_CONFIG";

fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default `info` filter
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Launching file service...");

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            info!("Loading configuration from {path}");
            ServiceConfig::load_from(&path)?
        }
        Err(_) => ServiceConfig::load()?,
    };

    let server = Server::new(config)?;
    server.run()
}
