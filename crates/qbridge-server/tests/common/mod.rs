//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::MockServer;

use qbridge_oauth::crypto::KEY_LEN;
use qbridge_oauth::token_store::create_memory_token_store;
use qbridge_oauth::{ApiClient, ApiConfig, AuthBroker, OAuthConfig, PendingAuthorizations, TokenCipher};
use qbridge_server::{AppState, Server, ServerConfig};

/// A broker server running in the background against a fake provider.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client that does not follow redirects.
    pub client: Client,
    /// Fake provider: token endpoint at `/token`, API under `/v3/company`.
    pub provider: MockServer,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with its own fake provider.
    pub async fn start() -> Result<Self> {
        let provider = MockServer::start().await;
        let addr = find_available_port().await?;

        let http = Client::new();
        let oauth = OAuthConfig::intuit("test-client", "test-secret", format!("http://{}/callback", addr))
            .with_authorize_url(format!("{}/authorize", provider.uri()))
            .with_token_url(format!("{}/token", provider.uri()));
        let broker = Arc::new(AuthBroker::new(
            http.clone(),
            oauth,
            PendingAuthorizations::default(),
            create_memory_token_store(),
            TokenCipher::new(&[1u8; KEY_LEN])?,
        ));
        let api = ApiClient::new(
            http,
            ApiConfig::with_base_url(format!("{}/v3/company", provider.uri())),
            broker,
        );

        let config = ServerConfig::default().with_bind_address(addr);
        let server = Server::from_state(AppState::new(api, config));
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            provider,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// GET request builder for a server path.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// POST request builder for a server path.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Start an authorization and return the `state` from the redirect.
    pub async fn start_authorization(&self) -> Result<String> {
        let resp = self.get("/auth/start").send().await?;
        anyhow::ensure!(resp.status().as_u16() == 302, "expected redirect, got {}", resp.status());

        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .ok_or_else(|| anyhow::anyhow!("missing Location header"))?
            .to_str()?;
        let url = url_query_pairs(location);
        url.into_iter()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v)
            .ok_or_else(|| anyhow::anyhow!("no state in {}", location))
    }
}

/// Decode the query pairs of an absolute URL.
pub fn url_query_pairs(url: &str) -> Vec<(String, String)> {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
    query
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| {
            (
                k.to_string(),
                urlencoding::decode(v).map(|v| v.into_owned()).unwrap_or_default(),
            )
        })
        .collect()
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
