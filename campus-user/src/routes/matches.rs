use axum::extract::{Path, State};
use axum::Json;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Match, Profile};
use crate::schema::{likes, matches, passes, profiles};
use crate::AppState;

/// Likes between the pair, in both directions.
fn likes_between(a: Uuid, b: Uuid) -> Box<dyn BoxableExpression<likes::table, Pg, SqlType = Bool>> {
    Box::new(
        likes::from_user_id.eq(a).and(likes::to_user_id.eq(b))
            .or(likes::from_user_id.eq(b).and(likes::to_user_id.eq(a))),
    )
}

/// Passes between the pair, in both directions. A surviving pass would keep
/// the counterpart excluded from discovery after the unmatch.
fn passes_between(a: Uuid, b: Uuid) -> Box<dyn BoxableExpression<passes::table, Pg, SqlType = Bool>> {
    Box::new(
        passes::from_user_id.eq(a).and(passes::to_user_id.eq(b))
            .or(passes::from_user_id.eq(b).and(passes::to_user_id.eq(a))),
    )
}

#[derive(Debug, Serialize)]
pub struct MatchWithProfile {
    #[serde(flatten)]
    pub match_record: Match,
    pub counterpart: Option<Profile>,
}

/// GET /matches - the caller's matches with the counterpart's profile.
pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchWithProfile>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let rows: Vec<Match> = matches::table
        .filter(matches::user_a_id.eq(user.id).or(matches::user_b_id.eq(user.id)))
        .order(matches::created_at.desc())
        .load::<Match>(&mut conn)?;

    let counterpart_ids: Vec<Uuid> = rows.iter().map(|m| m.counterpart(user.id)).collect();

    let counterparts: Vec<Profile> = profiles::table
        .filter(profiles::user_id.eq_any(&counterpart_ids))
        .load::<Profile>(&mut conn)?;

    let enriched = rows
        .into_iter()
        .map(|m| {
            let other = m.counterpart(user.id);
            let counterpart = counterparts.iter().find(|p| p.user_id == other).cloned();
            MatchWithProfile {
                match_record: m,
                counterpart,
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(enriched)))
}

/// DELETE /matches/:id - unmatch. Removes the match row AND both sides'
/// likes and passes so the pair can reappear in each other's discovery feed.
pub async fn unmatch(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let record: Match = matches::table
        .find(match_id)
        .first::<Match>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    if !record.involves(user.id) {
        return Err(AppError::new(
            ErrorCode::NotMatchParticipant,
            "you are not a participant of this match",
        ));
    }

    let (a, b) = (record.user_a_id, record.user_b_id);

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(matches::table.find(match_id)).execute(conn)?;
        diesel::delete(likes::table.filter(likes_between(a, b))).execute(conn)?;
        diesel::delete(passes::table.filter(passes_between(a, b))).execute(conn)?;
        Ok(())
    })?;

    publisher::publish_match_ended(&state.rabbitmq, match_id, a, b, user.id).await;

    tracing::info!(match_id = %match_id, ended_by = %user.id, "match ended");

    Ok(Json(ApiResponse::ok("unmatched")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;

    #[test]
    fn unmatch_cleanup_deletes_passes_as_well_as_likes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let likes_sql =
            debug_query::<Pg, _>(&diesel::delete(likes::table.filter(likes_between(a, b)))).to_string();
        let passes_sql =
            debug_query::<Pg, _>(&diesel::delete(passes::table.filter(passes_between(a, b)))).to_string();

        assert!(likes_sql.contains("DELETE"));
        assert!(passes_sql.contains("\"passes\""));
        // each statement matches the pair in both orientations
        for sql in [&likes_sql, &passes_sql] {
            assert_eq!(sql.matches("from_user_id").count(), 2, "{sql}");
            assert_eq!(sql.matches("to_user_id").count(), 2, "{sql}");
        }
    }
}
