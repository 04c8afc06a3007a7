//! JWT Token Handler
//! Mission: Mint and validate signed bearer tokens

use crate::auth::models::{Claims, User};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

const DEFAULT_EXPIRATION_HOURS: i64 = 8;

/// JWT handler for token operations
pub struct JwtHandler {
    secret: String,
    expiration_hours: i64,
}

impl JwtHandler {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_hours: DEFAULT_EXPIRATION_HOURS,
        }
    }

    pub fn with_expiration(secret: String, expiration_hours: i64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    /// Generate a signed token carrying the user's identity and role.
    ///
    /// Tokens are stateless and self-contained: once issued they stay
    /// valid until expiry even if the user's role changes or the account
    /// is deleted. The expiry window bounds that staleness.
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: expiration,
        };

        debug!(
            "Generating JWT for user {} ({}), expires in {}h",
            user.username, user.id, self.expiration_hours
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate JWT")
    }

    /// Validate a token's signature and expiry and extract its claims.
    ///
    /// Malformed, tampered, and expired tokens all fail the same way;
    /// the underlying cause is only visible in debug logs.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!("Token validation failed: {}", e);
            e
        })
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}
