//! Access token revocation registry
//!
//! Logout and password changes invalidate access tokens before their natural
//! expiry by recording the raw token string here. The authorization guard
//! consults the registry after signature verification; once `revoke` returns,
//! every subsequent check sees the token as revoked.
//!
//! An entry is never dropped before the expiry embedded in its own claims,
//! otherwise a still-live revoked token would come back from the dead. After
//! that point it is garbage and the sweep removes it to bound memory; entries
//! whose claims cannot be decoded fall back to a configured retention ceiling.

use crate::auth::token::TokenCodec;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Concurrent set of revoked access-token strings.
///
/// Each entry remembers when it was revoked so unparseable tokens can still
/// be evicted eventually.
pub struct RevocationRegistry {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
    fallback_ttl: Duration,
}

impl RevocationRegistry {
    pub fn new(fallback_ttl: Duration) -> Self {
        Self {
            revoked: RwLock::new(HashMap::new()),
            fallback_ttl,
        }
    }

    /// Add a token to the registry. Idempotent: revoking twice keeps the
    /// original revocation time.
    pub fn revoke(&self, token: &str) {
        let mut revoked = self.revoked.write().unwrap();
        revoked.entry(token.to_string()).or_insert_with(Utc::now);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked.read().unwrap().contains_key(token)
    }

    /// Drop entries that can no longer be accepted anywhere: tokens whose
    /// embedded expiry has passed, and undecodable entries past the fallback
    /// retention ceiling. Entries still inside their claimed lifetime stay.
    pub fn sweep(&self, now: DateTime<Utc>, codec: &TokenCodec) -> usize {
        let mut revoked = self.revoked.write().unwrap();
        let before = revoked.len();
        revoked.retain(|token, revoked_at| match codec.decode_unsafe(token) {
            Some(claims) => claims.exp > now.timestamp(),
            None => *revoked_at + self.fallback_ttl > now,
        });
        before - revoked.len()
    }

    pub fn len(&self) -> usize {
        self.revoked.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenKind;
    use skillswap_core::{config::AuthConfig, User, UserRole};

    fn codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig {
            access_secret: "registry-access-secret".to_string(),
            refresh_secret: "registry-refresh-secret".to_string(),
            ..Default::default()
        })
    }

    fn short_lived_codec(ttl_secs: u64) -> TokenCodec {
        TokenCodec::new(&AuthConfig {
            access_secret: "registry-access-secret".to_string(),
            refresh_secret: "registry-refresh-secret".to_string(),
            access_ttl_secs: ttl_secs,
            ..Default::default()
        })
    }

    fn sample_user() -> User {
        User::new(
            "alice@example.com".to_string(),
            "hash".to_string(),
            "Alice".to_string(),
            UserRole::Student,
        )
    }

    #[test]
    fn test_revoke_and_check() {
        let registry = RevocationRegistry::new(Duration::days(1));
        let token = codec().mint_access(&sample_user()).unwrap();

        assert!(!registry.is_revoked(&token));
        registry.revoke(&token);
        assert!(registry.is_revoked(&token));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let registry = RevocationRegistry::new(Duration::days(1));

        registry.revoke("some-token");
        registry.revoke("some-token");

        assert!(registry.is_revoked("some-token"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sweep_keeps_unexpired_tokens() {
        let registry = RevocationRegistry::new(Duration::days(1));
        let codec = codec();
        let token = codec.mint_access(&sample_user()).unwrap();

        registry.revoke(&token);
        let removed = registry.sweep(Utc::now(), &codec);

        assert_eq!(removed, 0);
        assert!(registry.is_revoked(&token));
    }

    #[test]
    fn test_sweep_drops_naturally_expired_tokens() {
        let registry = RevocationRegistry::new(Duration::days(1));
        // TTL of zero seconds: exp == iat, expired immediately
        let codec = short_lived_codec(0);
        let token = codec.mint_access(&sample_user()).unwrap();

        registry.revoke(&token);
        assert!(registry.is_revoked(&token));

        // Sweep one second later so exp < now holds
        let removed = registry.sweep(Utc::now() + Duration::seconds(1), &codec);
        assert_eq!(removed, 1);
        assert!(!registry.is_revoked(&token));
    }

    #[test]
    fn test_sweep_retains_garbage_until_fallback_ttl() {
        let registry = RevocationRegistry::new(Duration::hours(1));
        let codec = codec();

        registry.revoke("not-a-decodable-token");

        // Inside the fallback window: kept
        assert_eq!(registry.sweep(Utc::now(), &codec), 0);
        assert!(registry.is_revoked("not-a-decodable-token"));

        // Past the fallback window: evicted
        let removed = registry.sweep(Utc::now() + Duration::hours(2), &codec);
        assert_eq!(removed, 1);
        assert!(registry.is_empty());
    }
}
