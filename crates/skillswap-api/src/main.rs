//! skillswap auth API server

use skillswap_api::{create_router, state::AppState};
use skillswap_core::config::AppConfig;
use skillswap_core::InMemoryUserDirectory;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing signing secrets abort startup here, before anything listens
    let config = AppConfig::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "skillswap_api={level},tower_http=debug",
            level = config.logging.level
        ))
    });
    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let directory = Arc::new(InMemoryUserDirectory::new());
    let state = Arc::new(AppState::new(config, directory));
    state.start_sweeper();

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("skillswap auth API listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.shutdown();

    Ok(())
}
