//! Pending authorizations: `state → PKCE verifier` between login start and callback.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::{OAuthError, Result};

/// Default lifetime of a pending authorization (10 minutes).
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(10 * 60);

/// An authorization that has been started but not yet completed.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub state: String,
    pub pkce_verifier: String,
    pub created_at: Instant,
}

/// Single-use table of pending authorizations keyed by state.
#[derive(Debug)]
pub struct PendingAuthorizations {
    entries: RwLock<HashMap<String, PendingAuthorization>>,
    ttl: Duration,
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL)
    }
}

impl PendingAuthorizations {
    /// Create an empty table whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Record a new pending authorization. Expired entries are pruned first.
    pub async fn insert(&self, state: String, pkce_verifier: String) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, p| now.duration_since(p.created_at) < self.ttl);
        let pruned = before - entries.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired pending authorizations");
        }

        entries.insert(
            state.clone(),
            PendingAuthorization {
                state,
                pkce_verifier,
                created_at: now,
            },
        );
    }

    /// Remove and return the pending authorization for `state`.
    ///
    /// Fails with [`OAuthError::InvalidState`] when the state is unknown,
    /// already consumed, or older than the TTL.
    pub async fn take(&self, state: &str) -> Result<PendingAuthorization> {
        let pending = self
            .entries
            .write()
            .await
            .remove(state)
            .ok_or(OAuthError::InvalidState)?;

        if pending.created_at.elapsed() >= self.ttl {
            tracing::debug!("Rejected expired authorization state");
            return Err(OAuthError::InvalidState);
        }

        Ok(pending)
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
