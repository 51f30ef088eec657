//! Error types for the OAuth broker.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while brokering authorization or calling the API.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The anti-forgery state is unknown, already used, or expired.
    #[error("Invalid or expired authorization state")]
    InvalidState,

    /// The provider rejected the authorization code exchange.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// No tokens are on file for the tenant.
    #[error("Not authorized: no tokens on file for tenant '{0}'")]
    NotAuthorized(String),

    /// The provider rejected the refresh grant.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The remote API answered with a non-success status.
    #[error("Remote API error ({status}): {body}")]
    RemoteApi { status: u16, body: String },

    /// Unknown entity kind.
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Sealing or opening a secret failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
