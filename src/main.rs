mod config;
mod error;
mod export;
mod extract;
mod fieldpath;
mod merge;
mod pairing;
mod projection;
mod record;
mod server;
mod session;

use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "ratecon.toml".to_string());
    let cfg = if std::path::Path::new(&config_path).exists() {
        info!(path = %config_path, "Loading config");
        config::Config::load(&config_path)?
    } else {
        info!(path = %config_path, "No config file, using defaults");
        config::Config::default()
    };

    server::start_server(cfg).await
}
