use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use campus_shared::clients::db::{create_pool, DbPool};
use campus_shared::clients::rabbitmq::RabbitMQClient;
use config::AppConfig;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_shared::middleware::init_tracing("campus-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(AppState { db, config, rabbitmq });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::register::register))
        .route("/login", post(routes::login::login))
        .route("/refresh", post(routes::refresh::refresh_token))
        .route("/logout", post(routes::logout::logout))
        .route("/me", get(routes::me::me))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "campus-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
