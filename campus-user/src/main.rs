use axum::{routing::{delete, get, post}, extract::DefaultBodyLimit, Router};
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
use campus_shared::clients::minio::MinioClient;
use campus_shared::clients::rabbitmq::RabbitMQClient;
use config::AppConfig;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub minio: MinioClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_shared::middleware::init_tracing("campus-user");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;

    let state = Arc::new(AppState { db, config, rabbitmq, minio });

    // Spawn RabbitMQ subscriber for user.registered events
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_user_registered(sub_state).await {
            tracing::error!(error = %e, "user.registered subscriber failed");
        }
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Profiles
        .route("/me", get(routes::profile::get_profile).patch(routes::profile::update_profile))
        .route("/profiles/:id", get(routes::profile::get_public_profile))
        .route("/photos", post(routes::photo::upload_photo)
            .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
            .delete(routes::photo::delete_photo))
        // Discovery + swipes
        .route("/discover", get(routes::discover::discover))
        .route("/decisions", post(routes::decisions::record_decision))
        // Matches
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/:id", delete(routes::matches::unmatch))
        // Blocks
        .route("/blocks", post(routes::blocks::block_user).get(routes::blocks::list_blocks))
        .route("/blocks/:id", delete(routes::blocks::unblock_user))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "campus-user starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
