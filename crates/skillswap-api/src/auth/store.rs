//! Refresh token store
//!
//! Authoritative record of every issued refresh token. A refresh token is
//! honored only while its record exists, is active, and is not past expiry;
//! deactivation is how logout and password changes kill outstanding sessions
//! before their natural end.
//!
//! Deactivated records are retained until the periodic sweep removes them
//! past expiry. Deferred deletion keeps a window in which a replayed dead
//! token is distinguishable from an unknown one, at the cost of holding the
//! record in memory until the sweep.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// One issued refresh token
#[derive(Debug, Clone)]
pub struct RefreshRecord {
    /// Store key, embedded in the token's `jti` claim
    pub token_id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// The signed token string exactly as handed to the client
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Cleared on logout / logout-all / password change
    pub is_active: bool,
}

impl RefreshRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Concurrent in-memory store keyed by token id.
///
/// Reads and writes take the lock only for the duration of the map
/// operation; nothing here performs I/O under the lock.
pub struct RefreshTokenStore {
    records: RwLock<HashMap<Uuid, RefreshRecord>>,
}

impl RefreshTokenStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record a freshly minted refresh token
    pub fn insert(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        token: String,
        expires_at: DateTime<Utc>,
    ) -> RefreshRecord {
        let record = RefreshRecord {
            token_id,
            user_id,
            token,
            created_at: Utc::now(),
            expires_at,
            is_active: true,
        };
        self.records
            .write()
            .unwrap()
            .insert(token_id, record.clone());
        record
    }

    pub fn get(&self, token_id: Uuid) -> Option<RefreshRecord> {
        self.records.read().unwrap().get(&token_id).cloned()
    }

    /// Mark a record inactive. Idempotent; absent records are a no-op.
    pub fn deactivate(&self, token_id: Uuid) {
        if let Some(record) = self.records.write().unwrap().get_mut(&token_id) {
            record.is_active = false;
        }
    }

    /// Mark every record owned by the user inactive, returning how many were
    /// still active. Used by logout-all and password changes so a credential
    /// change invalidates every outstanding session.
    pub fn deactivate_all_for_user(&self, user_id: Uuid) -> usize {
        let mut records = self.records.write().unwrap();
        let mut deactivated = 0;
        for record in records.values_mut() {
            if record.user_id == user_id && record.is_active {
                record.is_active = false;
                deactivated += 1;
            }
        }
        deactivated
    }

    /// Hard-delete every record past its expiry, active or not. Records
    /// still inside their TTL are never removed here, even when inactive.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        before - records.len()
    }

    /// Total records held, including inactive ones awaiting the sweep
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    /// Records that would still be accepted for a refresh right now
    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        self.records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.is_active && !r.is_expired(now))
            .count()
    }
}

impl Default for RefreshTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn insert_with_ttl(store: &RefreshTokenStore, user_id: Uuid, ttl: Duration) -> RefreshRecord {
        let token_id = Uuid::new_v4();
        store.insert(
            token_id,
            user_id,
            format!("token-{token_id}"),
            Utc::now() + ttl,
        )
    }

    #[test]
    fn test_insert_and_get() {
        let store = RefreshTokenStore::new();
        let user_id = Uuid::new_v4();
        let record = insert_with_ttl(&store, user_id, Duration::days(7));

        let fetched = store.get(record.token_id).expect("record should exist");
        assert_eq!(fetched.user_id, user_id);
        assert_eq!(fetched.token, record.token);
        assert!(fetched.is_active);
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let store = RefreshTokenStore::new();
        let record = insert_with_ttl(&store, Uuid::new_v4(), Duration::days(7));

        store.deactivate(record.token_id);
        store.deactivate(record.token_id);

        let fetched = store.get(record.token_id).unwrap();
        assert!(!fetched.is_active);

        // Unknown id is a no-op, not a panic
        store.deactivate(Uuid::new_v4());
    }

    #[test]
    fn test_deactivate_all_for_user() {
        let store = RefreshTokenStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        insert_with_ttl(&store, alice, Duration::days(7));
        insert_with_ttl(&store, alice, Duration::days(7));
        let bobs = insert_with_ttl(&store, bob, Duration::days(7));

        assert_eq!(store.deactivate_all_for_user(alice), 2);
        // Second call finds nothing active
        assert_eq!(store.deactivate_all_for_user(alice), 0);

        assert!(store.get(bobs.token_id).unwrap().is_active);
    }

    #[test]
    fn test_sweep_removes_expired_regardless_of_active_flag() {
        let store = RefreshTokenStore::new();
        let user_id = Uuid::new_v4();

        let expired_active = insert_with_ttl(&store, user_id, Duration::seconds(-10));
        let expired_inactive = insert_with_ttl(&store, user_id, Duration::seconds(-10));
        store.deactivate(expired_inactive.token_id);
        let live = insert_with_ttl(&store, user_id, Duration::days(1));
        let live_inactive = insert_with_ttl(&store, user_id, Duration::days(1));
        store.deactivate(live_inactive.token_id);

        let removed = store.sweep_expired(Utc::now());
        assert_eq!(removed, 2);

        assert!(store.get(expired_active.token_id).is_none());
        assert!(store.get(expired_inactive.token_id).is_none());
        // Still inside TTL: kept, even the inactive one
        assert!(store.get(live.token_id).is_some());
        assert!(store.get(live_inactive.token_id).is_some());
    }

    #[tokio::test]
    async fn test_sweep_purges_after_millisecond_ttl() {
        let store = RefreshTokenStore::new();
        let record = insert_with_ttl(&store, Uuid::new_v4(), Duration::milliseconds(1));

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(store.sweep_expired(Utc::now()), 1);
        assert!(store.get(record.token_id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_expired_at_exact_boundary() {
        let now = Utc::now();
        let record = RefreshRecord {
            token_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            created_at: now,
            expires_at: now,
            is_active: true,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_active_count_excludes_inactive_and_expired() {
        let store = RefreshTokenStore::new();
        let user_id = Uuid::new_v4();

        insert_with_ttl(&store, user_id, Duration::days(1));
        let dead = insert_with_ttl(&store, user_id, Duration::days(1));
        store.deactivate(dead.token_id);
        insert_with_ttl(&store, user_id, Duration::seconds(-5));

        assert_eq!(store.active_count(), 1);
        assert_eq!(store.len(), 3);
    }
}
