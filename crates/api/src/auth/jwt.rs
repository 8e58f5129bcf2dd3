//! HS256 access-token handling.
//!
//! Tokens are minted by the campus identity service with a shared
//! secret; this server verifies them and, in tests, mints its own.

use ipms_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User's database id.
    pub sub: DbId,
    /// Role code, e.g. `"TEACHER"` or `"LEVEL2_ADMIN"`.
    pub role: String,
    /// Expiry, UTC Unix seconds.
    pub exp: i64,
    /// Issue time, UTC Unix seconds.
    pub iat: i64,
    /// Per-token UUID, kept for audit trails.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret; must match the identity service.
    pub secret: String,
    pub access_token_expiry_mins: i64,
}

impl JwtConfig {
    /// Reads `JWT_SECRET` (required, non-empty) and
    /// `JWT_ACCESS_EXPIRY_MINS` (optional, default 60).
    ///
    /// # Panics
    ///
    /// Panics when `JWT_SECRET` is missing or empty; serving requests
    /// without a verifiable secret would accept any token.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
        }
    }
}

/// Mint an access token for `user_id` with the given role.
pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: iat + config.access_token_expiry_mins * 60,
        iat,
        jti: Uuid::new_v4().to_string(),
    };

    // Header::default() is HS256.
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature and expiry, returning the decoded [`Claims`].
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
