use anyhow::Context;
use healthmate_server::{AppState, Settings, router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let address = settings.bind_address();
    tracing::info!(
        address = %address,
        data_dir = %settings.data_dir.display(),
        retrieval_mode = ?settings.retrieval_mode,
        "starting healthmate server"
    );

    let state = AppState::new(settings);
    if let Err(e) = state.vertex_client().await {
        tracing::warn!(error = %e, "vertex ai not initialized; /health will report degraded");
    }

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    axum::serve(listener, router(state)).await.context("server error")?;
    Ok(())
}
