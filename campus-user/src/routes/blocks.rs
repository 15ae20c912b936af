use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Block, NewBlock};
use crate::schema::{blocks, profiles};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub blocked_id: Uuid,
}

/// POST /blocks - idempotent directed block. Suppresses the pair from each
/// other's discovery and disables messaging; an existing match survives.
pub async fn block_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlockRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    if req.blocked_id == user.id {
        return Err(AppError::new(ErrorCode::CannotBlockSelf, "cannot block yourself"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let target_exists: bool = profiles::table
        .filter(profiles::user_id.eq(req.blocked_id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if !target_exists {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "target profile not found"));
    }

    let inserted = diesel::insert_into(blocks::table)
        .values(&NewBlock {
            blocker_id: user.id,
            blocked_id: req.blocked_id,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    if inserted > 0 {
        publisher::publish_user_blocked(&state.rabbitmq, user.id, req.blocked_id).await;
        tracing::info!(blocker = %user.id, blocked = %req.blocked_id, "user blocked");
    }

    Ok(Json(ApiResponse::ok("blocked")))
}

/// DELETE /blocks/:blocked_id - idempotent unblock.
pub async fn unblock_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(blocked_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let removed = diesel::delete(
        blocks::table
            .filter(blocks::blocker_id.eq(user.id))
            .filter(blocks::blocked_id.eq(blocked_id)),
    )
    .execute(&mut conn)?;

    if removed > 0 {
        publisher::publish_user_unblocked(&state.rabbitmq, user.id, blocked_id).await;
        tracing::info!(blocker = %user.id, blocked = %blocked_id, "user unblocked");
    }

    Ok(Json(ApiResponse::ok("unblocked")))
}

/// GET /blocks - the caller's block list, for the settings screen.
pub async fn list_blocks(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Block>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rows: Vec<Block> = blocks::table
        .filter(blocks::blocker_id.eq(user.id))
        .order(blocks::created_at.desc())
        .load::<Block>(&mut conn)?;

    Ok(Json(ApiResponse::ok(rows)))
}
