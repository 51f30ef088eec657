//! Token storage keyed by tenant (QuickBooks realm id).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::crypto::SealedSecret;
use crate::error::Result;

/// Stored credentials for one tenant.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub tenant_id: String,
    pub access_token: String,
    pub refresh_token: SealedSecret,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: SealedSecret,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            access_token: access_token.into(),
            refresh_token,
            updated_at: Utc::now(),
        }
    }
}

// ============================================================================
// TokenStore Trait
// ============================================================================

/// Storage for per-tenant tokens and the sessions linked to them.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Insert or replace the record for `record.tenant_id`.
    async fn save(&self, record: TokenRecord) -> Result<()>;

    /// Load the record for a tenant.
    async fn load(&self, tenant_id: &str) -> Result<Option<TokenRecord>>;

    /// Replace the access token and, when given, the sealed refresh token.
    ///
    /// Returns `false` if the tenant has no record.
    async fn update_tokens(
        &self,
        tenant_id: &str,
        access_token: String,
        refresh_token: Option<SealedSecret>,
    ) -> Result<bool>;

    /// Remember that the authorization started with `state` ended in `tenant_id`.
    ///
    /// Replaces any earlier link for the same tenant, so each tenant is
    /// addressable by its most recent state only.
    async fn link_session(&self, state: &str, tenant_id: &str) -> Result<()>;

    /// Resolve a completed authorization state to its tenant.
    async fn tenant_for_session(&self, state: &str) -> Result<Option<String>>;
}

/// Shared token store for use across handlers.
pub type SharedTokenStore = Arc<dyn TokenStore>;

// ============================================================================
// InMemoryTokenStore
// ============================================================================

/// Process-lifetime token store. Concurrent writers for one tenant resolve
/// last-write-wins.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
    sessions: RwLock<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, record: TokenRecord) -> Result<()> {
        let tenant_id = record.tenant_id.clone();
        self.records.write().await.insert(tenant_id.clone(), record);
        tracing::info!(tenant_id = %tenant_id, "Tokens stored");
        Ok(())
    }

    async fn load(&self, tenant_id: &str) -> Result<Option<TokenRecord>> {
        Ok(self.records.read().await.get(tenant_id).cloned())
    }

    async fn update_tokens(
        &self,
        tenant_id: &str,
        access_token: String,
        refresh_token: Option<SealedSecret>,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(tenant_id) else {
            return Ok(false);
        };

        record.access_token = access_token;
        if let Some(refresh_token) = refresh_token {
            record.refresh_token = refresh_token;
        }
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn link_session(&self, state: &str, tenant_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, tenant| tenant.as_str() != tenant_id);
        sessions.insert(state.to_string(), tenant_id.to_string());
        Ok(())
    }

    async fn tenant_for_session(&self, state: &str) -> Result<Option<String>> {
        Ok(self.sessions.read().await.get(state).cloned())
    }
}

/// Create a shared in-memory token store.
pub fn create_memory_token_store() -> SharedTokenStore {
    Arc::new(InMemoryTokenStore::new())
}
