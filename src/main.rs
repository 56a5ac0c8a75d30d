use wms_console::config::AppConfig;
use wms_console::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    log::info!("WMS Console: warehouse administration API");

    // Load configuration
    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{} store={:?} page_size={}",
        config.server.host,
        config.server.port,
        config.store.backend,
        config.console.page_size
    );

    run_server(config).await
}
