use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{blocks, match_threads, messages};

// --- MatchThread ---

/// Local replica of a match, fed by match.created / match.ended events from
/// campus-user. Participants are in canonical order, like the source row.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = match_threads)]
pub struct MatchThread {
    pub id: Uuid,
    pub match_id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

impl MatchThread {
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
#[diesel(table_name = match_threads)]
pub struct NewMatchThread {
    pub match_id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub is_open: bool,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

// --- Block (replica) ---

#[derive(Debug, Queryable, Identifiable)]
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
