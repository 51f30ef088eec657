//! Authorization broker: ties PKCE, pending state, token exchange and storage together.

use std::sync::Arc;

use reqwest::Client;

use crate::crypto::TokenCipher;
use crate::error::{OAuthError, Result};
use crate::oauth::{
    OAuthConfig, PkceChallenge, build_authorization_url, exchange_code_for_tokens,
    generate_state, refresh_access_token,
};
use crate::pending::PendingAuthorizations;
use crate::token_store::{SharedTokenStore, TokenRecord};

/// Result of starting an authorization.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    pub state: String,
    pub url: String,
}

/// Owns the authorization-code lifecycle for all tenants.
#[derive(Debug)]
pub struct AuthBroker {
    http: Client,
    config: OAuthConfig,
    pending: PendingAuthorizations,
    tokens: SharedTokenStore,
    cipher: TokenCipher,
}

/// Shared broker for use across async contexts.
pub type SharedAuthBroker = Arc<AuthBroker>;

impl AuthBroker {
    pub fn new(
        http: Client,
        config: OAuthConfig,
        pending: PendingAuthorizations,
        tokens: SharedTokenStore,
        cipher: TokenCipher,
    ) -> Self {
        Self {
            http,
            config,
            pending,
            tokens,
            cipher,
        }
    }

    /// The OAuth configuration.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// The token store.
    pub fn tokens(&self) -> &SharedTokenStore {
        &self.tokens
    }

    /// The pending-authorization table.
    pub fn pending(&self) -> &PendingAuthorizations {
        &self.pending
    }

    /// Begin an authorization: fresh state and PKCE pair, remembered until callback.
    pub async fn start_authorization(&self) -> AuthorizationStart {
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let url = build_authorization_url(&self.config, &pkce.challenge, &state);

        self.pending.insert(state.clone(), pkce.verifier).await;
        tracing::info!("Authorization started");

        AuthorizationStart { state, url }
    }

    /// Finish an authorization from the provider callback.
    ///
    /// The state is consumed before the token endpoint is contacted, so a
    /// replayed callback fails with [`OAuthError::InvalidState`] even if the
    /// first exchange failed.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
        tenant_id: &str,
    ) -> Result<()> {
        let pending = self.pending.take(state).await?;

        let tokens =
            exchange_code_for_tokens(&self.http, &self.config, code, &pending.pkce_verifier)
                .await?;

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            OAuthError::TokenExchangeFailed("Token response did not include a refresh token".to_string())
        })?;
        let sealed = self.cipher.seal(tenant_id, refresh_token)?;

        self.tokens
            .save(TokenRecord::new(tenant_id, tokens.access_token, sealed))
            .await?;
        self.tokens.link_session(state, tenant_id).await?;

        tracing::info!(tenant_id = %tenant_id, "Authorization completed");
        Ok(())
    }

    /// Current access token for a tenant.
    pub async fn access_token(&self, tenant_id: &str) -> Result<String> {
        self.tokens
            .load(tenant_id)
            .await?
            .map(|record| record.access_token)
            .ok_or_else(|| OAuthError::NotAuthorized(tenant_id.to_string()))
    }

    /// Run one refresh grant for a tenant and store the result.
    ///
    /// The refresh token is replaced only when the provider returned a new one.
    pub async fn refresh(&self, tenant_id: &str) -> Result<String> {
        let record = self
            .tokens
            .load(tenant_id)
            .await?
            .ok_or_else(|| OAuthError::NotAuthorized(tenant_id.to_string()))?;

        let refresh_token = self.cipher.open(tenant_id, &record.refresh_token)?;
        let tokens = refresh_access_token(&self.http, &self.config, &refresh_token).await?;

        let rotated = match tokens.refresh_token.as_deref() {
            Some(new) if new != refresh_token => Some(self.cipher.seal(tenant_id, new)?),
            _ => None,
        };
        let was_rotated = rotated.is_some();

        let updated = self
            .tokens
            .update_tokens(tenant_id, tokens.access_token.clone(), rotated)
            .await?;
        if !updated {
            return Err(OAuthError::NotAuthorized(tenant_id.to_string()));
        }

        tracing::info!(tenant_id = %tenant_id, rotated = was_rotated, "Access token refreshed");
        Ok(tokens.access_token)
    }

    /// Resolve the tenant addressed by a caller-supplied user id or session state.
    pub async fn resolve_tenant(
        &self,
        user_id: Option<&str>,
        state: Option<&str>,
    ) -> Result<String> {
        if let Some(id) = user_id.filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }
        if let Some(state) = state.filter(|s| !s.is_empty()) {
            return self
                .tokens
                .tenant_for_session(state)
                .await?
                .ok_or_else(|| OAuthError::NotAuthorized(format!("session {}", state)));
        }
        Err(OAuthError::NotAuthorized("no tenant supplied".to_string()))
    }
}
