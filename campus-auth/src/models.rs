use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{credentials, refresh_tokens};

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = credentials)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = credentials)]
pub struct NewCredential {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Queryable, Identifiable, Clone)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub token_hash: String,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub credential_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
