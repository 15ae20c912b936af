use axum::{routing::get, Router};
use socketioxide::SocketIo;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod socket;

use campus_shared::clients::db::{create_pool, DbPool};
use campus_shared::clients::rabbitmq::RabbitMQClient;
use campus_shared::clients::redis::RedisClient;
use config::AppConfig;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub io: SocketIo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_shared::middleware::init_tracing("campus-messaging");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;

    // Build Socket.IO layer - we need io in AppState for emitting from REST routes
    let (sio_layer, io) = SocketIo::builder().build_layer();

    let state = Arc::new(AppState { db, config, rabbitmq, redis, io: io.clone() });

    // Configure the Socket.IO namespace with state via closure
    io.ns("/", {
        let state = state.clone();
        move |socket: socketioxide::extract::SocketRef| {
            let state = state.clone();
            async move {
                socket::handlers::on_connect_with_state(socket, state).await;
            }
        }
    });

    // Spawn RabbitMQ subscriber for match and block events
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_match_events(sub_state).await {
            tracing::error!(error = %e, "match events subscriber failed");
        }
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/matches/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        .layer(sio_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "campus-messaging starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
