use axum::Json;
use campus_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("campus-user", env!("CARGO_PKG_VERSION")))
}
