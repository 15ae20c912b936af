use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::AuthUser;
use campus_shared::types::ApiResponse;

use crate::models::Profile;
use crate::schema::{blocks, likes, passes, profiles};
use crate::services::discovery_service;
use crate::AppState;

const PAGE_SIZE: usize = 10;
// Fetch headroom so completeness filtering still fills a page.
const FETCH_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub university: Option<String>,
    pub course: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
}

/// GET /discover - a page of candidate profiles the viewer has not yet
/// evaluated. Order is unspecified; the client consumes the page
/// sequentially and re-queries when it runs out.
pub async fn discover(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverQuery>,
) -> AppResult<Json<ApiResponse<Vec<Profile>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let viewer = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first::<Profile>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let viewer_gender = viewer.gender.as_deref().ok_or_else(|| {
        AppError::new(ErrorCode::ProfileIncomplete, "set your gender before browsing discovery")
    })?;

    // Every load below must succeed; a failed exclusion fetch fails the
    // whole request rather than showing excluded identities.
    let liked: Vec<Uuid> = likes::table
        .filter(likes::from_user_id.eq(user.id))
        .select(likes::to_user_id)
        .load::<Uuid>(&mut conn)?;

    let passed: Vec<Uuid> = passes::table
        .filter(passes::from_user_id.eq(user.id))
        .select(passes::to_user_id)
        .load::<Uuid>(&mut conn)?;

    let blocked: Vec<Uuid> = blocks::table
        .filter(blocks::blocker_id.eq(user.id))
        .select(blocks::blocked_id)
        .load::<Uuid>(&mut conn)?;

    let blocked_by: Vec<Uuid> = blocks::table
        .filter(blocks::blocked_id.eq(user.id))
        .select(blocks::blocker_id)
        .load::<Uuid>(&mut conn)?;

    let excluded: Vec<Uuid> =
        discovery_service::exclusion_set(user.id, &liked, &passed, &blocked, &blocked_by)
            .into_iter()
            .collect();

    let mut query = profiles::table
        .filter(profiles::user_id.ne_all(&excluded))
        .filter(profiles::gender.eq(discovery_service::target_gender(viewer_gender)))
        .filter(profiles::is_visible.eq(true))
        .into_boxed();

    if let Some(university) = &params.university {
        query = query.filter(profiles::university.eq(university));
    }
    if let Some(course) = &params.course {
        query = query.filter(profiles::course.eq(course));
    }
    if let Some(min_age) = params.min_age {
        query = query.filter(profiles::age.ge(min_age));
    }
    if let Some(max_age) = params.max_age {
        query = query.filter(profiles::age.le(max_age));
    }

    let candidates: Vec<Profile> = query.limit(FETCH_LIMIT).load::<Profile>(&mut conn)?;

    let page: Vec<Profile> = candidates
        .into_iter()
        .filter(discovery_service::is_candidate)
        .take(PAGE_SIZE)
        .collect();

    tracing::debug!(viewer = %user.id, count = page.len(), "discovery page built");

    Ok(Json(ApiResponse::ok(page)))
}
