mod auth;
mod config;
mod error;
mod routes;

use std::sync::Arc;

use auth::TokenRegistry;
use config::AppConfig;
use routes::{app_router, AppState};
use stockpile_core::db::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stockpile_api=info".parse().expect("valid directive"))
                .add_directive("stockpile_core=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting stockpile-api with config: {:?}", config);

    let registry = TokenRegistry::from_spec(&config.api_tokens)?;
    let db = Arc::new(Database::open(&config.db_path).await?);

    let state = AppState::new(Arc::clone(&config), db, registry);
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("stockpile-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
