//! Application state management
//!
//! The store, registry, and codec are constructed once here and injected
//! everywhere else; nothing in the service reaches for ambient singletons.
//! The state also owns the periodic cleanup sweep, started after
//! construction and stopped on shutdown.

use crate::auth::{AuthService, RefreshTokenStore, RevocationRegistry, TokenCodec};
use skillswap_core::config::AppConfig;
use skillswap_core::UserDirectory;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token signing/verification
    pub codec: Arc<TokenCodec>,
    /// Refresh token records
    pub store: Arc<RefreshTokenStore>,
    /// Revoked access tokens
    pub registry: Arc<RevocationRegistry>,
    /// External user storage
    pub directory: Arc<dyn UserDirectory>,
    /// Server start time
    pub start_time: Instant,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(config: AppConfig, directory: Arc<dyn UserDirectory>) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.auth));
        let registry = Arc::new(RevocationRegistry::new(chrono::Duration::seconds(
            config.auth.revoked_fallback_ttl_secs as i64,
        )));

        Self {
            config,
            codec,
            store: Arc::new(RefreshTokenStore::new()),
            registry,
            directory,
            start_time: Instant::now(),
            sweeper: Mutex::new(None),
        }
    }

    /// Session service over this state's components
    pub fn auth(&self) -> AuthService {
        AuthService::new(
            self.directory.clone(),
            self.codec.clone(),
            self.store.clone(),
            self.registry.clone(),
            &self.config.auth,
        )
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Start the periodic cleanup sweep over the store and the registry.
    ///
    /// Runs until `shutdown`. Each pass takes its own clock reading, so a
    /// record created between passes is judged against the time of the pass
    /// that sees it.
    pub fn start_sweeper(self: &Arc<Self>) {
        let state = Arc::clone(self);
        let period = std::time::Duration::from_secs(self.config.auth.sweep_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The interval fires immediately; there is nothing to sweep yet
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = chrono::Utc::now();
                let purged = state.store.sweep_expired(now);
                let evicted = state.registry.sweep(now, &state.codec);
                tracing::debug!(purged, evicted, "session sweep complete");
            }
        });

        *self.sweeper.lock().unwrap() = Some(handle);
    }

    /// Stop the sweeper. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_core::config::AuthConfig;
    use skillswap_core::InMemoryUserDirectory;

    fn test_state() -> Arc<AppState> {
        let config = AppConfig {
            auth: AuthConfig {
                access_secret: "state-access-secret".to_string(),
                refresh_secret: "state-refresh-secret".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        Arc::new(AppState::new(
            config,
            Arc::new(InMemoryUserDirectory::new()),
        ))
    }

    #[tokio::test]
    async fn test_sweeper_lifecycle() {
        let state = test_state();
        state.start_sweeper();
        state.shutdown();
        // Second shutdown is a no-op
        state.shutdown();
    }

    #[tokio::test]
    async fn test_states_are_isolated() {
        let a = test_state();
        let b = test_state();

        a.registry.revoke("some-token");
        assert!(a.registry.is_revoked("some-token"));
        assert!(!b.registry.is_revoked("some-token"));
    }
}
