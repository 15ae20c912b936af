use axum::extract::{Multipart, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::ApiResponse;

use crate::models::Profile;
use crate::schema::profiles;
use crate::AppState;

pub const MAX_PHOTOS: usize = 6;
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Maps an accepted image content type to a file extension; anything else is
/// rejected before the upload.
pub fn photo_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub photo_url: String,
    pub photo_urls: Vec<String>,
}

// --- POST /photos ---

pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<PhotoUploadResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let mut photos = profile.photos();
    if photos.len() >= MAX_PHOTOS {
        return Err(AppError::new(
            ErrorCode::PhotoLimitReached,
            format!("a profile can have at most {MAX_PHOTOS} photos"),
        ));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read multipart: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::PhotoUploadFailed, "no file provided"))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let ext = photo_extension(&content_type).ok_or_else(|| {
        AppError::new(
            ErrorCode::PhotoUploadFailed,
            "unsupported image format, accepted: jpeg, png, webp, gif",
        )
    })?;

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read file data: {e}")))?;

    if data.len() > MAX_PHOTO_BYTES {
        return Err(AppError::new(ErrorCode::PayloadTooLarge, "photo exceeds the 5 MiB limit"));
    }

    let file_id = Uuid::now_v7();
    let key = format!("profiles/{}/{}.{}", profile.id, file_id, ext);

    let photo_url = state
        .minio
        .upload(&key, data.to_vec(), &content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e))?;

    photos.push(photo_url.clone());

    diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            profiles::photo_urls.eq(serde_json::json!(photos)),
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut conn)?;

    tracing::info!(
        profile_id = %profile.id,
        photo_url = %photo_url,
        count = photos.len(),
        "profile photo uploaded"
    );

    Ok(Json(ApiResponse::ok(PhotoUploadResponse {
        photo_url,
        photo_urls: photos,
    })))
}

// --- DELETE /photos ---

#[derive(Debug, Deserialize)]
pub struct DeletePhotoRequest {
    pub photo_url: String,
}

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeletePhotoRequest>,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let mut photos = profile.photos();
    let before = photos.len();
    photos.retain(|url| url != &req.photo_url);

    if photos.len() == before {
        return Err(AppError::new(ErrorCode::PhotoNotFound, "photo not on this profile"));
    }

    diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            profiles::photo_urls.eq(serde_json::json!(photos)),
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(&mut conn)?;

    if let Some(key) = state.minio.key_for_url(&req.photo_url) {
        if let Err(e) = state.minio.delete(&key).await {
            tracing::warn!(error = %e, key = %key, "failed to delete photo object");
        }
    }

    Ok(Json(ApiResponse::ok(photos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_types_accepted() {
        assert_eq!(photo_extension("image/jpeg"), Some("jpg"));
        assert_eq!(photo_extension("image/png"), Some("png"));
        assert_eq!(photo_extension("image/webp"), Some("webp"));
        assert_eq!(photo_extension("video/mp4"), None);
        assert_eq!(photo_extension("application/octet-stream"), None);
    }
}
