use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for an authenticated session. The `sub` field is the stable
/// user identifier every other service keys profiles, likes, matches and
/// messages on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Identity resolved from a request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            token_id: claims.jti,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_claims_are_not_expired() {
        let claims = Claims::new(Uuid::new_v4(), 900);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn past_expiry_is_expired() {
        let mut claims = Claims::new(Uuid::new_v4(), 900);
        claims.exp = Utc::now().timestamp() - 1;
        assert!(claims.is_expired());
    }

    #[test]
    fn auth_user_carries_subject() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, 60);
        let jti = claims.jti;
        let user = AuthUser::from(claims);
        assert_eq!(user.id, user_id);
        assert_eq!(user.token_id, jti);
    }
}
