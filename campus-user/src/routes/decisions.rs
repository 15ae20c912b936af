use axum::extract::State;
use axum::Json;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Match, NewLike, NewMatch, NewPass};
use crate::schema::{blocks, likes, matches, passes, profiles};
use crate::services::match_service;
use crate::AppState;

/// A block in either direction between the pair. Discovery already hides a
/// blocked pair, but a crafted request must not create likes or matches
/// between them either.
fn blocked_between(a: Uuid, b: Uuid) -> Box<dyn BoxableExpression<blocks::table, Pg, SqlType = Bool>> {
    Box::new(
        blocks::blocker_id.eq(a).and(blocks::blocked_id.eq(b))
            .or(blocks::blocker_id.eq(b).and(blocks::blocked_id.eq(a))),
    )
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub target_id: Uuid,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub matched: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_record: Option<Match>,
}

/// POST /decisions - record a swipe. A pass is persisted so the profile
/// never reappears; a like is inserted idempotently and, if the reciprocal
/// like exists, materializes the match row.
pub async fn record_decision(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<DecisionResponse>>> {
    if req.target_id == user.id {
        return Err(AppError::new(ErrorCode::CannotDecideSelf, "cannot swipe on yourself"));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let target_exists: bool = profiles::table
        .filter(profiles::user_id.eq(req.target_id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if !target_exists {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "target profile not found"));
    }

    let blocked: bool = blocks::table
        .filter(blocked_between(user.id, req.target_id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if blocked {
        return Err(AppError::forbidden("you cannot interact with this user"));
    }

    if !req.liked {
        // Duplicate passes are no-ops; the unique (from, to) constraint
        // absorbs them.
        diesel::insert_into(passes::table)
            .values(&NewPass {
                from_user_id: user.id,
                to_user_id: req.target_id,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)?;

        return Ok(Json(ApiResponse::ok(DecisionResponse {
            matched: false,
            match_record: None,
        })));
    }

    // Idempotent like insert: a duplicate is success, not an error.
    diesel::insert_into(likes::table)
        .values(&NewLike {
            from_user_id: user.id,
            to_user_id: req.target_id,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    publisher::publish_like_recorded(&state.rabbitmq, user.id, req.target_id).await;

    // Whichever like completes the pair materializes the match.
    let reciprocal: bool = likes::table
        .filter(likes::from_user_id.eq(req.target_id))
        .filter(likes::to_user_id.eq(user.id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if !reciprocal {
        return Ok(Json(ApiResponse::ok(DecisionResponse {
            matched: false,
            match_record: None,
        })));
    }

    let (user_a, user_b) = match_service::canonical_pair(user.id, req.target_id);

    // Both clients may race to complete the pair; the unique constraint on
    // (user_a_id, user_b_id) guarantees a single row, and only the insert
    // that won publishes the event.
    let inserted = diesel::insert_into(matches::table)
        .values(&NewMatch {
            user_a_id: user_a,
            user_b_id: user_b,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    let match_record: Match = matches::table
        .filter(matches::user_a_id.eq(user_a))
        .filter(matches::user_b_id.eq(user_b))
        .first(&mut conn)?;

    if inserted > 0 {
        publisher::publish_match_created(&state.rabbitmq, match_record.id, user_a, user_b).await;
        tracing::info!(
            match_id = %match_record.id,
            user_a = %user_a,
            user_b = %user_b,
            "mutual like materialized a match"
        );
    }

    Ok(Json(ApiResponse::ok(DecisionResponse {
        matched: true,
        match_record: Some(match_record),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;

    #[test]
    fn block_gate_covers_both_directions() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let sql = debug_query::<Pg, _>(
            &blocks::table.filter(blocked_between(a, b)).count(),
        )
        .to_string();

        // the gate must match regardless of which side placed the block
        assert_eq!(sql.matches("blocker_id").count(), 2, "{sql}");
        assert_eq!(sql.matches("blocked_id").count(), 2, "{sql}");
    }
}
