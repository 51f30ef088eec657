//! Serve command - runs the authorization broker and tool server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, ValueEnum};

use qbridge_oauth::api::DEFAULT_MINOR_VERSION;
use qbridge_oauth::oauth::{ACCOUNTING_SCOPE, INTUIT_AUTHORIZE_URL, INTUIT_TOKEN_URL};
use qbridge_oauth::token_store::create_memory_token_store;
use qbridge_oauth::{
    ApiClient, ApiConfig, AuthBroker, OAuthConfig, PendingAuthorizations, TokenCipher,
};
use qbridge_server::config::{DEFAULT_BIND_ADDRESS, DEFAULT_MAX_BODY_SIZE};
use qbridge_server::{AppState, Server, ServerConfig};

/// Which provider environment to call.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

/// Arguments for the serve command.
///
/// Every flag can also be set through its `QBRIDGE_*` environment variable.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// OAuth client id issued by the provider
    #[arg(long, env = "QBRIDGE_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret issued by the provider
    #[arg(long, env = "QBRIDGE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Redirect URI registered with the provider (points at /callback)
    #[arg(long, env = "QBRIDGE_REDIRECT_URI")]
    pub redirect_uri: String,

    /// Base64 32-byte key used to encrypt refresh tokens (see `qbridge gen-key`)
    #[arg(long, env = "QBRIDGE_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: String,

    /// Address to bind to
    #[arg(short, long, env = "QBRIDGE_BIND", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind: SocketAddr,

    /// Provider environment
    #[arg(long, env = "QBRIDGE_ENVIRONMENT", value_enum, default_value_t = Environment::Production)]
    pub environment: Environment,

    /// API base URL (overrides the environment's default)
    #[arg(long, env = "QBRIDGE_API_BASE")]
    pub api_base: Option<String>,

    /// API minor version sent with every request (empty to omit)
    #[arg(long, env = "QBRIDGE_MINOR_VERSION", default_value = DEFAULT_MINOR_VERSION)]
    pub minor_version: String,

    /// Authorization endpoint
    #[arg(long, env = "QBRIDGE_AUTHORIZE_URL", default_value = INTUIT_AUTHORIZE_URL)]
    pub authorize_url: String,

    /// Token endpoint
    #[arg(long, env = "QBRIDGE_TOKEN_URL", default_value = INTUIT_TOKEN_URL)]
    pub token_url: String,

    /// Requested scope
    #[arg(long, env = "QBRIDGE_SCOPE", default_value = ACCOUNTING_SCOPE)]
    pub scope: String,

    /// Seconds an unfinished authorization stays valid
    #[arg(long, env = "QBRIDGE_PENDING_TTL_SECS", default_value_t = 600)]
    pub pending_ttl_secs: u64,

    /// Allowed CORS origins (comma separated, `*` for any)
    #[arg(long, env = "QBRIDGE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origin: Vec<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "QBRIDGE_MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,
}

impl ServeArgs {
    fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::intuit(&self.client_id, &self.client_secret, &self.redirect_uri)
            .with_authorize_url(&self.authorize_url)
            .with_token_url(&self.token_url)
            .with_scope(&self.scope)
    }

    fn api_config(&self) -> ApiConfig {
        let config = match (&self.api_base, self.environment) {
            (Some(base), _) => ApiConfig::with_base_url(base.trim_end_matches('/')),
            (None, Environment::Production) => ApiConfig::production(),
            (None, Environment::Sandbox) => ApiConfig::sandbox(),
        };
        let minor_version = self.minor_version.trim();
        config.with_minor_version((!minor_version.is_empty()).then(|| minor_version.to_string()))
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig::new()
            .with_bind_address(self.bind)
            .with_cors_origins(self.cors_origin.clone())
            .with_max_body_size(self.max_body_size)
    }
}

/// Wire the broker, API client and server state from the arguments.
pub fn build_state(args: &ServeArgs) -> Result<AppState> {
    let cipher = TokenCipher::from_base64(&args.encryption_key)
        .map_err(|e| anyhow::anyhow!("Invalid encryption key: {}", e))?;

    let http = reqwest::Client::new();

    let broker = Arc::new(AuthBroker::new(
        http.clone(),
        args.oauth_config(),
        PendingAuthorizations::new(Duration::from_secs(args.pending_ttl_secs)),
        create_memory_token_store(),
        cipher,
    ));
    let api = ApiClient::new(http, args.api_config(), broker);

    Ok(AppState::new(api, args.server_config()))
}

/// Run the serve command.
pub async fn run(args: ServeArgs) -> Result<()> {
    let state = build_state(&args)?;
    let server = Server::from_state(state);

    tracing::info!(
        environment = ?args.environment,
        api_base = %args.api_config().base_url,
        "Broker configured"
    );

    println!("qbridge listening on http://{}", server.bind_address());
    println!("Start an authorization at http://{}/auth/start", server.bind_address());
    println!("Press Ctrl+C to stop");

    server.run().await?;
    Ok(())
}
