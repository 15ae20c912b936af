use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{blocks, likes, matches, passes, profiles};

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub university: Option<String>,
    pub course: Option<String>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub photo_urls: serde_json::Value,
    pub interests: serde_json::Value,
    pub verified_student: bool,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Photo URLs as a plain vector; the column is a JSONB array of strings.
    pub fn photos(&self) -> Vec<String> {
        serde_json::from_value(self.photo_urls.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub university: Option<String>,
    pub course: Option<String>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub interests: Option<serde_json::Value>,
    pub is_visible: Option<bool>,
}

// --- Like ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

// --- Pass ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = passes)]
pub struct Pass {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = passes)]
pub struct NewPass {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

// --- Match ---

/// Participants are stored in canonical order: user_a_id < user_b_id. The
/// unique constraint on (user_a_id, user_b_id) is what makes match creation
/// idempotent under the two-clients-race.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if self.user_a_id == user_id {
            self.user_b_id
        } else {
            self.user_a_id
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
}

// --- Block ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = blocks)]
pub struct Block {
    pub id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blocks)]
pub struct NewBlock {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}
