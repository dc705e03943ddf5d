use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenv::dotenv;
use prometheus::Registry;

use recipebox_api::{
    app,
    config::AppConfig,
    cors_layer, metrics,
    normalizer::ErrorNormalizer,
    observability,
    rate_limit::RateLimitState,
    state::AppState,
    store::{MemoryStore, PgStore, RecipeStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    observability::init(config.log_format)?;

    let store: Arc<dyn RecipeStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections)
                .await
                .context("failed to connect to database")?;
            store.migrate().await.context("failed to apply migrations")?;
            tracing::info!("Database connected and migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Registry::new_custom(Some("recipebox".into()), None)?;
    metrics::register_all(&registry)?;

    let state = AppState::new(store, ErrorNormalizer::tracing(), registry);
    let router = app(
        state,
        RateLimitState::from_env(),
        cors_layer(&config.cors_origins),
    );

    tracing::info!("API server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
