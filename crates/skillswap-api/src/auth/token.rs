//! Token minting and verification
//!
//! Compact self-contained bearer tokens (JWT, HMAC-SHA256) in two kinds:
//! short-lived access tokens and long-lived refresh tokens. The two kinds are
//! signed with different secrets, so leaking one secret does not compromise
//! tokens of the other kind. Every verification path checks signature, kind,
//! issuer, audience, and expiry.
//!
//! Expiry comparisons use the same `Utc::now()` clock as issuance; clock skew
//! between nodes is not compensated.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use skillswap_core::{config::AuthConfig, User, UserRole};
use thiserror::Error;
use uuid::Uuid;

/// Which of the two token families a token belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims embedded in every signed token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Intended audience
    pub aud: String,
    /// Subject - user id
    pub sub: Uuid,
    /// Subject's email at issuance time
    pub email: String,
    /// Subject's role at issuance time
    pub role: UserRole,
    /// Token kind (access or refresh)
    pub kind: TokenKind,
    /// Unique token id; for refresh tokens this is the store key
    pub jti: Uuid,
    /// Issued at (Unix epoch seconds)
    pub iat: i64,
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
}

/// Token verification and minting errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Wrong token kind, expected {expected}")]
    WrongKind { expected: TokenKind },

    #[error("Token issuer or audience mismatch")]
    Invalid,

    #[error("Malformed token")]
    Malformed,
}

/// Signs and verifies access and refresh tokens.
///
/// Holds one key pair per token kind plus the fixed issuer/audience strings.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    access_ttl_secs: u64,
}

impl TokenCodec {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(auth.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(auth.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(auth.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(auth.refresh_secret.as_bytes()),
            issuer: auth.issuer.clone(),
            audience: auth.audience.clone(),
            access_ttl: Duration::seconds(auth.access_ttl_secs as i64),
            refresh_ttl: Duration::seconds(auth.refresh_ttl_secs as i64),
            access_ttl_secs: auth.access_ttl_secs,
        }
    }

    /// Access token lifetime, as reported to clients in `expiresIn`
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    fn claims_for(&self, user: &User, kind: TokenKind, ttl: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Mint a signed access token for an authenticated user
    pub fn mint_access(&self, user: &User) -> Result<String, TokenError> {
        let claims = self.claims_for(user, TokenKind::Access, self.access_ttl);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access_encoding,
        )
        .map_err(TokenError::Encoding)
    }

    /// Mint a signed refresh token; the returned id is the store key
    pub fn mint_refresh(&self, user: &User) -> Result<(String, Uuid), TokenError> {
        let claims = self.claims_for(user, TokenKind::Refresh, self.refresh_ttl);
        let token_id = claims.jti;
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.refresh_encoding,
        )
        .map_err(TokenError::Encoding)?;
        Ok((token, token_id))
    }

    /// Verify a token of the expected kind and return its claims.
    ///
    /// A token whose `exp` equals the current second is already expired.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked manually below so the exact boundary is ours
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer
            | jsonwebtoken::errors::ErrorKind::InvalidAudience => TokenError::Invalid,
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })?;

        let claims = data.claims;
        if claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Decode claims without verifying the signature.
    ///
    /// For introspection of a token's own claimed metadata only (sweep,
    /// logging). Never an input to an authorization decision.
    pub fn decode_unsafe(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = Default::default();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}
