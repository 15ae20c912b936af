use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `campus.{domain}.{entity}.{action}`
/// Example: `campus.match.pair.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Auth events
    pub const AUTH_USER_REGISTERED: &str = "campus.auth.user.registered";

    // Profile events
    pub const USER_PROFILE_UPDATED: &str = "campus.user.profile.updated";

    // Like / match events
    pub const USER_LIKE_RECORDED: &str = "campus.user.like.recorded";
    pub const MATCH_CREATED: &str = "campus.match.pair.created";
    pub const MATCH_ENDED: &str = "campus.match.pair.ended";

    // Block events
    pub const USER_BLOCKED: &str = "campus.user.block.created";
    pub const USER_UNBLOCKED: &str = "campus.user.block.removed";

    // Messaging events
    pub const MESSAGING_MESSAGE_SENT: &str = "campus.messaging.message.sent";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserRegistered {
        pub user_id: Uuid,
        pub email: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileUpdated {
        pub profile_id: Uuid,
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LikeRecorded {
        pub from_user_id: Uuid,
        pub to_user_id: Uuid,
    }

    /// Both participants in canonical order (user_a < user_b), mirroring the
    /// unique constraint on the match row.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchEnded {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
        pub ended_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserBlocked {
        pub blocker_id: Uuid,
        pub blocked_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserUnblocked {
        pub blocker_id: Uuid,
        pub blocked_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MessageSent {
        pub message_id: Uuid,
        pub match_id: Uuid,
        pub sender_id: Uuid,
        pub content_preview: String,
    }
}
