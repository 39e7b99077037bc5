use anyhow::Context;
use tracing_subscriber::EnvFilter;
use verirag_server::{build_documents, build_rag, router, AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    if settings.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; requests go out unauthenticated");
    }

    let documents = build_documents(&settings).await?;
    let rag = build_rag(&settings, &documents).await?;
    let app = router(AppState::new(rag).with_documents(documents));

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    tracing::info!("listening on http://{}", settings.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
