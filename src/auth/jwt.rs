//! JWT Token Handler
//! Mission: Issue and validate short-lived account tokens

use crate::auth::models::{Account, Claims};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Token lifetime. Also the longest a stale role claim can stay in circulation.
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// Token errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Invalid,
    Expired,
    Encoding(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Invalid => write!(f, "Invalid token"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Encoding(e) => write!(f, "Failed to generate token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_minutes: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_minutes: TOKEN_TTL_MINUTES,
        }
    }

    /// Seconds a freshly issued token stays valid
    pub fn expires_in(&self) -> i64 {
        self.expiration_minutes * 60
    }

    /// Generate a JWT token for an account
    pub fn generate_token(&self, account: &Account) -> Result<(String, i64), TokenError> {
        self.generate_token_at(account, Utc::now())
    }

    /// Generate a token as if issued at `now`
    pub fn generate_token_at(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<(String, i64), TokenError> {
        let expiration = now + Duration::minutes(self.expiration_minutes);

        let claims = Claims {
            sub: account.id.clone(),
            email: account.email.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        debug!(
            "Generating JWT for account {} ({}), expires in {}m",
            account.email, account.id, self.expiration_minutes
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok((token, self.expires_in()))
    }

    /// Validate a JWT token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Validate against an explicit clock. Signature is checked first, so a
    /// forged token is `Invalid` even when its `exp` is in the past.
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let decoded = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?;

        if decoded.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        debug!("Validated JWT for account {}", decoded.claims.sub);

        Ok(decoded.claims)
    }
}
