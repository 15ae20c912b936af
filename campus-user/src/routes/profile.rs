use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Profile, UpdateProfile};
use crate::schema::profiles;
use crate::AppState;

// --- GET /me ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /me ---

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    if let Some(name) = payload.display_name.as_deref() {
        if name.trim().is_empty() || name.len() > 50 {
            return Err(AppError::new(
                ErrorCode::InvalidDisplayName,
                "display name must be between 1 and 50 characters",
            ));
        }
    }
    if let Some(age) = payload.age {
        if !(18..=99).contains(&age) {
            return Err(AppError::new(ErrorCode::ValidationError, "age must be between 18 and 99"));
        }
    }
    if let Some(gender) = payload.gender.as_deref() {
        if !matches!(gender, "male" | "female") {
            return Err(AppError::new(ErrorCode::ValidationError, "gender must be 'male' or 'female'"));
        }
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            &payload,
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .get_result::<Profile>(&mut conn)?;

    publisher::publish_profile_updated(&state.rabbitmq, updated.id, updated.user_id).await;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- GET /profiles/:id ---

pub async fn get_public_profile(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    Ok(Json(ApiResponse::ok(profile)))
}
