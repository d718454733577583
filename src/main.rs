use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};
use post_digest::{
    config::Config,
    credentials::load_scrape_tokens,
    api::routes::create_router,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let credentials = load_scrape_tokens(&config.token_dir).inspect_err(|e| {
        error!(dir = %config.token_dir.display(), error = %e, "Failed to load scrape tokens");
    })?;
    if credentials.is_empty() {
        info!(dir = %config.token_dir.display(), "No scrape tokens found; runs will be rejected");
    }

    let app = create_router(AppState::new(config, credentials));

    let listener = TcpListener::bind(server_addr).await?;
    info!(%server_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
