use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::api::ApiResponse;
use campus_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{MatchThread, Message, NewMessage};
use crate::schema::{blocks, match_threads, messages};
use crate::AppState;

pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Trims and bounds message content. Empty or whitespace-only content is a
/// validation error, as is anything past the character cap.
pub fn validate_content(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "message must not be empty"));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("message must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

// --- Helpers ---

/// Load the thread for a match id, or fail with MatchNotFound.
fn load_thread(
    conn: &mut diesel::pg::PgConnection,
    match_id: Uuid,
) -> AppResult<MatchThread> {
    match_threads::table
        .filter(match_threads::match_id.eq(match_id))
        .first::<MatchThread>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))
}

/// A block in either direction disables messaging for the pair.
fn is_blocked_either_direction(
    conn: &mut diesel::pg::PgConnection,
    a: Uuid,
    b: Uuid,
) -> AppResult<bool> {
    let count: i64 = blocks::table
        .filter(
            blocks::blocker_id.eq(a).and(blocks::blocked_id.eq(b))
                .or(blocks::blocker_id.eq(b).and(blocks::blocked_id.eq(a))),
        )
        .select(count_star())
        .first::<i64>(conn)?;
    Ok(count > 0)
}

// --- Handlers ---

/// GET /matches/:id/messages - paginated history, newest first. Reconnecting
/// clients re-fetch here instead of relying on replay.
pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;

    let thread = load_thread(&mut conn, match_id)?;
    if !thread.involves(auth_user.id) {
        return Err(AppError::new(
            ErrorCode::NotMatchParticipant,
            "you are not a participant of this match",
        ));
    }

    let total: i64 = messages::table
        .filter(messages::match_id.eq(match_id))
        .select(count_star())
        .first::<i64>(&mut conn)?;

    let items: Vec<Message> = messages::table
        .filter(messages::match_id.eq(match_id))
        .order(messages::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load::<Message>(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// POST /matches/:id/messages - append a message to a match and push it to
/// subscribed viewers.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let content = validate_content(&req.content)?;

    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;

    let thread = load_thread(&mut conn, match_id)?;
    if !thread.involves(auth_user.id) {
        return Err(AppError::new(
            ErrorCode::NotMatchParticipant,
            "you are not a participant of this match",
        ));
    }
    if !thread.is_open {
        return Err(AppError::new(ErrorCode::MatchClosed, "this match has ended"));
    }

    let counterpart = thread.counterpart(auth_user.id);
    if is_blocked_either_direction(&mut conn, auth_user.id, counterpart)? {
        return Err(AppError::new(
            ErrorCode::MessageBlocked,
            "messaging is disabled between you and this user",
        ));
    }

    let new_message = NewMessage {
        match_id,
        sender_id: auth_user.id,
        content,
    };

    let message: Message = diesel::insert_into(messages::table)
        .values(&new_message)
        .get_result(&mut conn)?;

    // Push to the open chat view(s) and to the counterpart's user room.
    let payload = serde_json::json!({
        "match_id": match_id,
        "message": message,
    });
    let _ = state.io.to(format!("match:{match_id}")).emit("new_message", &payload);
    let _ = state.io.to(format!("user:{counterpart}")).emit("new_message", &payload);

    let content_preview = message.content.chars().take(100).collect::<String>();
    publisher::publish_message_sent(&state.rabbitmq, message.id, match_id, auth_user.id, &content_preview).await;

    tracing::info!(
        sender = %auth_user.id,
        match_id = %match_id,
        message_id = %message.id,
        "message sent"
    );

    Ok(Json(ApiResponse::ok(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_rejected() {
        assert!(validate_content("").is_err());
        assert!(validate_content("   \n\t").is_err());
    }

    #[test]
    fn content_is_trimmed() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
    }

    #[test]
    fn oversized_content_rejected() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(validate_content(&long).is_err());
        let max = "x".repeat(MAX_MESSAGE_CHARS);
        assert!(validate_content(&max).is_ok());
    }
}
