use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use campus_shared::errors::AppError;
use campus_shared::types::auth::{Claims, TokenPair};

pub fn create_access_token(
    user_id: Uuid,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

pub fn create_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Refresh tokens are stored hashed; only the sha256 of the opaque token
/// ever touches the database.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn create_token_pair(
    user_id: Uuid,
    secret: &str,
    access_ttl: i64,
) -> Result<(TokenPair, String), AppError> {
    let access_token = create_access_token(user_id, secret, access_ttl)?;
    let refresh_token = create_refresh_token();
    let refresh_hash = hash_token(&refresh_token);
    let pair = TokenPair::new(access_token, refresh_token, access_ttl);
    Ok((pair, refresh_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn access_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "test-secret", 900).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.sub, user_id);
        assert!(data.claims.exp > data.claims.iat);
    }

    #[test]
    fn bad_secret_rejects() {
        let token = create_access_token(Uuid::new_v4(), "secret-a", 60).unwrap();
        let validation = Validation::new(Algorithm::HS256);
        assert!(decode::<Claims>(&token, &DecodingKey::from_secret(b"secret-b"), &validation).is_err());
    }

    #[test]
    fn refresh_token_is_opaque_hex() {
        let token = create_refresh_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        // hash is deterministic and distinct from the token
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }
}
