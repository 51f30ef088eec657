//! OAuth 2.0 PKCE broker and token-refreshing client for QuickBooks Online.
//!
//! # Components
//!
//! - [`oauth`]: PKCE and state generation, authorization URL, code exchange and refresh grants
//! - [`pending`]: Single-use, expiring `state → verifier` table
//! - [`crypto`]: AES-256-GCM sealing of refresh tokens at rest
//! - [`token_store`]: Per-tenant token records
//! - [`broker`]: Authorization start/complete and the refresh grant
//! - [`api`]: Tenant-scoped GET with one refresh-and-retry on 401
//! - [`query`]: Escaped query builder, entity search and fetch

pub mod api;
pub mod broker;
pub mod crypto;
pub mod error;
pub mod oauth;
pub mod pending;
pub mod query;
pub mod token_store;

pub use api::{ApiClient, ApiConfig};
pub use broker::{AuthBroker, AuthorizationStart, SharedAuthBroker};
pub use crypto::{SealedSecret, TokenCipher};
pub use error::{OAuthError, Result};
pub use oauth::{OAuthConfig, OAuthTokens, PkceChallenge};
pub use pending::{PendingAuthorization, PendingAuthorizations};
pub use query::{Entity, Query, SearchResults};
pub use token_store::{InMemoryTokenStore, SharedTokenStore, TokenRecord, TokenStore};
