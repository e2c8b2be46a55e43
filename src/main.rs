use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use racewatch::api;
use racewatch::config::Config;
use racewatch::ocr::TesseractExtractor;
use racewatch::resolver::ScreenStateResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let auth_token = config
        .require_auth_token()
        .context("the HTTP API needs an auth token")?
        .to_string();

    tracing::info!(
        "racewatch starting, listen: {}, references: {}, tesseract: {} (lang {}, psm {})",
        config.listen_addr,
        config.reference_dir.display(),
        config.tesseract_path.display(),
        config.tesseract_lang,
        config.tesseract_psm,
    );

    if !config.reference_dir.is_dir() {
        tracing::warn!(
            "reference directory {} does not exist; template fallback will fail",
            config.reference_dir.display()
        );
    }

    let resolver = Arc::new(ScreenStateResolver::new(TesseractExtractor::from_config(&config)));

    let app = api::router(auth_token, config.reference_dir.clone(), resolver)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .context(format!("failed to bind to {}", config.listen_addr))?;

    tracing::info!("listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
