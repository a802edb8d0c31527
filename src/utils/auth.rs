use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(24); // Token expires in 24 hours

        Self {
            sub: user_id.to_string(),
            email,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

fn jwt_secret() -> ApiResult<String> {
    env::var("JWT_SECRET").map_err(|_| ApiError::Internal("JWT_SECRET must be set".to_string()))
}

pub fn create_token(user_id: Uuid, email: String) -> ApiResult<String> {
    let claims = Claims::new(user_id, email);
    let secret = jwt_secret()?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|err| ApiError::Internal(format!("token signing failed: {err}")))
}

pub fn verify_token(token: &str) -> ApiResult<Claims> {
    let secret = jwt_secret()?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret() {
        env::set_var("JWT_SECRET", "test-secret");
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        with_secret();
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, "ops@example.com".to_string()).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "ops@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        with_secret();
        let token = create_token(Uuid::new_v4(), "ops@example.com".to_string()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            verify_token(&tampered),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("warehouse-pass").unwrap();
        assert!(verify_password("warehouse-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }
}
