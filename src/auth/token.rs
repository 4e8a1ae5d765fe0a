//! Identity token issuance and verification.
//!
//! Tokens are self-issued HS256 JWTs carrying the identity id (`sub`), the
//! email claim, issued-at and expiry timestamps. The algorithm is pinned on
//! verification and no clock skew is tolerated (strict expiry comparison) —
//! a deliberate, documented limitation.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::IdentityId;

/// Signing algorithm for all tokens this service issues and accepts.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Why a token was rejected.
///
/// The distinction exists for logging and tests; all three map to the same
/// generic 401 so the response never reveals which check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token cannot be parsed or decoded, or lacks required claims
    Malformed,
    /// Signature check failed, or the token was signed with another algorithm
    BadSignature,
    /// Token is past its expiry timestamp
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed token"),
            Self::BadSignature => write!(f, "bad token signature"),
            Self::Expired => write!(f, "token has expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Claims carried by an identity token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity id
    pub sub: String,
    /// Email of the identity at issue time
    pub email: Option<String>,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch; always greater than `iat`
    pub exp: i64,
}

/// Issues and verifies identity tokens with the process-wide server secret.
///
/// Construction happens once at startup; the service is then shared
/// read-only across all requests.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from the server secret and a token lifetime
    /// in minutes.
    pub fn new(secret: &str, lifetime_minutes: i64) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Strict expiry: no clock-skew leeway.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::minutes(lifetime_minutes),
            validation,
        }
    }

    /// Issue a signed token for the given identity.
    pub fn issue(&self, identity_id: &IdentityId, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity_id.as_str().to_string(),
            email: Some(email.to_string()),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        Ok(encode(
            &Header::new(ALGORITHM),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify a token and return the identity id it asserts.
    ///
    /// Signature is checked before expiry, so a tampered-but-expired token
    /// reports `BadSignature`, not `Expired`.
    pub fn verify(&self, token: &str) -> Result<IdentityId, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(IdentityId::new(data.claims.sub))
    }
}
