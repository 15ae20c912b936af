use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use campus_shared::errors::{AppError, AppResult, ErrorCode};
use campus_shared::types::auth::TokenPair;
use campus_shared::types::ApiResponse;

use crate::models::{Credential, NewCredential, NewRefreshToken};
use crate::schema::{credentials, refresh_tokens};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    auth_service::validate_password(&req.password)?;

    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    // Check if email already exists
    let exists: bool = credentials::table
        .filter(credentials::email.eq(&req.email.to_lowercase()))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if exists {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let new_cred = NewCredential {
        email: req.email.to_lowercase(),
        password_hash,
    };

    // Two concurrent signups can both pass the pre-check; the unique index
    // on email decides, and the loser gets the same 409 as the fast path.
    let credential: Credential = diesel::insert_into(credentials::table)
        .values(&new_cred)
        .get_result(&mut conn)
        .map_err(registration_insert_error)?;

    let (token_pair, refresh_hash) = token_service::create_token_pair(
        credential.id,
        &state.config.jwt_secret,
        state.config.jwt_access_ttl,
    )?;

    let new_rt = NewRefreshToken {
        credential_id: credential.id,
        token_hash: refresh_hash,
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(state.config.jwt_refresh_ttl),
    };
    diesel::insert_into(refresh_tokens::table)
        .values(&new_rt)
        .execute(&mut conn)?;

    // campus-user listens for this to create the empty profile row
    crate::events::publisher::publish_user_registered(&state.rabbitmq, credential.id, &credential.email).await;

    tracing::info!(user_id = %credential.id, email = %credential.email, "user registered");

    Ok(Json(ApiResponse::ok(token_pair)))
}

fn registration_insert_error(e: diesel::result::Error) -> AppError {
    match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_email_race_maps_to_conflict() {
        let err = registration_insert_error(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        ));
        match err {
            AppError::Known { code, .. } => assert_eq!(code, ErrorCode::EmailAlreadyExists),
            other => panic!("expected a known error, got {other:?}"),
        }
    }

    #[test]
    fn other_database_errors_pass_through() {
        let err = registration_insert_error(diesel::result::Error::NotFound);
        assert!(matches!(err, AppError::Database(diesel::result::Error::NotFound)));
    }
}
