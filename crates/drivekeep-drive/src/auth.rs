//! OAuth2 PKCE authentication flow for Google Drive
//!
//! Implements the installed-app Authorization Code flow with PKCE (RFC 7636)
//! against Google's identity platform, plus persistence of the resulting
//! tokens so that later runs only refresh them.
//!
//! ## Components
//!
//! - [`ClientSecrets`] - OAuth client loaded from Google's `credentials.json`
//! - [`OAuth2Config`] - Configuration for the OAuth2 flow
//! - [`TokenStorage`] - Token persistence in a file or the system keyring
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`DriveAuthAdapter`] - Orchestrates load, refresh, login and storage

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use drivekeep_core::ports::Tokens;
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Full Drive access, needed to copy files owned by other users
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "drivekeep";

/// Access tokens closer than this to expiry are refreshed up front
const EXPIRY_MARGIN_SECS: i64 = 60;

// ============================================================================
// ClientSecrets
// ============================================================================

/// OAuth client registration from a Google `credentials.json` file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URL.to_string()
}

/// Top level of `credentials.json`: one of `installed` or `web`
#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses the contents of a `credentials.json` file
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SecretsFile =
            serde_json::from_str(json).context("Failed to parse client secrets")?;
        file.installed
            .or(file.web)
            .context("Client secrets contain neither an 'installed' nor a 'web' section")
    }

    /// Loads a `credentials.json` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets {}", path.display()))?;
        Self::from_json(&json)
    }
}

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Creates a config for the given client with the default Drive scope
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }

    pub fn from_secrets(secrets: &ClientSecrets) -> Self {
        Self {
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            auth_url: secrets.auth_uri.clone(),
            token_url: secrets.token_uri.clone(),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

// ============================================================================
// TokenStorage
// ============================================================================

/// Where OAuth tokens are persisted between runs
#[derive(Debug, Clone)]
pub enum TokenStorage {
    /// JSON file, readable only by the owner on Unix
    File(PathBuf),
    /// System keyring entry under the `drivekeep` service
    Keyring { username: String },
}

impl TokenStorage {
    /// Loads stored tokens, `None` if nothing was stored yet
    pub fn load(&self) -> Result<Option<Tokens>> {
        match self {
            TokenStorage::File(path) => {
                if !path.exists() {
                    debug!(path = %path.display(), "No token file");
                    return Ok(None);
                }
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read token file {}", path.display()))?;
                let tokens = serde_json::from_str(&json)
                    .with_context(|| format!("Failed to parse token file {}", path.display()))?;
                debug!(path = %path.display(), "Loaded tokens from file");
                Ok(Some(tokens))
            }
            TokenStorage::Keyring { username } => {
                let entry = keyring::Entry::new(KEYRING_SERVICE, username)
                    .context("Failed to create keyring entry")?;
                match entry.get_password() {
                    Ok(json) => {
                        let tokens: Tokens = serde_json::from_str(&json)
                            .context("Failed to deserialize tokens from keyring")?;
                        debug!("Loaded tokens from keyring for user: {}", username);
                        Ok(Some(tokens))
                    }
                    Err(keyring::Error::NoEntry) => {
                        debug!("No tokens found in keyring for user: {}", username);
                        Ok(None)
                    }
                    Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
                }
            }
        }
    }

    /// Persists `tokens`, replacing whatever was stored
    pub fn store(&self, tokens: &Tokens) -> Result<()> {
        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;
        match self {
            TokenStorage::File(path) => {
                write_private_file(path, json.as_bytes())
                    .with_context(|| format!("Failed to write token file {}", path.display()))?;
                debug!(path = %path.display(), "Stored tokens in file");
            }
            TokenStorage::Keyring { username } => {
                let entry = keyring::Entry::new(KEYRING_SERVICE, username)
                    .context("Failed to create keyring entry")?;
                entry
                    .set_password(&json)
                    .context("Failed to store tokens in keyring")?;
                debug!("Stored tokens in keyring for user: {}", username);
            }
        }
        Ok(())
    }

    /// Removes stored tokens; succeeds if there were none
    pub fn clear(&self) -> Result<()> {
        match self {
            TokenStorage::File(path) => match std::fs::remove_file(path) {
                Ok(()) => {
                    info!(path = %path.display(), "Removed token file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(anyhow::Error::new(e)
                    .context(format!("Failed to remove token file {}", path.display()))),
            },
            TokenStorage::Keyring { username } => {
                let entry = keyring::Entry::new(KEYRING_SERVICE, username)
                    .context("Failed to create keyring entry")?;
                match entry.delete_credential() {
                    Ok(()) => {
                        info!("Cleared tokens from keyring for user: {}", username);
                        Ok(())
                    }
                    Err(keyring::Error::NoEntry) => {
                        debug!("No tokens to clear for user: {}", username);
                        Ok(())
                    }
                    Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
                }
            }
        }
    }

    /// Short description for status output
    pub fn describe(&self) -> String {
        match self {
            TokenStorage::File(path) => format!("file {}", path.display()),
            TokenStorage::Keyring { username } => format!("keyring ({KEYRING_SERVICE}/{username})"),
        }
    }
}

fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.flush()
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow redirecting to `redirect_uri`
    pub fn new(config: &OAuth2Config, redirect_uri: &str) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(redirect_uri.to_string()).context("Invalid redirect URI")?,
            )
            .set_auth_type(AuthType::RequestBody);

        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access so that Google issues a refresh token.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("Failed to exchange authorization code")?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at: expiry(token_result.expires_in()),
        };

        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Refreshes an access token, keeping the old refresh token if no new one is issued
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .context("Failed to refresh token")?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expiry(token_result.expires_in()),
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

fn expiry(expires_in: Option<std::time::Duration>) -> chrono::DateTime<Utc> {
    expires_in
        .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
        .unwrap_or_else(|| Utc::now() + Duration::hours(1))
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on the loopback interface for the OAuth2
/// redirect callback.
///
/// The listener is bound before the browser is opened so that an ephemeral
/// port (`0`) can be used and advertised in the redirect URI.
pub struct LocalCallbackServer {
    listener: TcpListener,
    port: u16,
}

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Binds `127.0.0.1:port`; `0` picks a free port
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind callback server to 127.0.0.1:{port}"))?;
        let port = listener
            .local_addr()
            .context("Failed to read callback server address")?
            .port();
        info!(port, "Started local OAuth callback server");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to register in the authorization request
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Waits for the OAuth redirect and returns the callback parameters
    ///
    /// Requests without a `code` (favicon fetches, user errors) get an error
    /// page and the server keeps waiting.
    pub async fn wait_for_callback(self) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::header::{HeaderValue, CONTENT_TYPE};
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::sync::{mpsc, Mutex};

        let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);
        let tx = std::sync::Arc::new(Mutex::new(Some(tx)));

        loop {
            let (stream, _addr) = tokio::select! {
                accepted = self.listener.accept() => {
                    accepted.context("Failed to accept connection on callback server")?
                }
                Some(params) = rx.recv() => {
                    info!("Received OAuth callback with authorization code");
                    return Ok(params);
                }
            };

            let io = TokioIo::new(stream);
            let tx_conn = tx.clone();
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let tx_inner = tx_conn.clone();
                async move {
                    let uri = req.uri().to_string();
                    debug!("Callback server received request: {}", uri);

                    let (status, html) = match parse_callback_params(&uri) {
                        Some(params) => {
                            if let Some(sender) = tx_inner.lock().await.take() {
                                let _ = sender.send(params).await;
                            }
                            (StatusCode::OK, success_html())
                        }
                        None => (
                            StatusCode::BAD_REQUEST,
                            error_html("Missing authorization code in callback"),
                        ),
                    };

                    let mut response = Response::new(Full::new(Bytes::from(html)));
                    *response.status_mut() = status;
                    response.headers_mut().insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("text/html; charset=utf-8"),
                    );
                    Ok::<_, hyper::Error>(response)
                }
            });

            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    warn!("Callback server connection error: {}", e);
                }
            });
        }
    }
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>DriveKeep - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Successful</h1>
    <p>DriveKeep can now access your Google Drive.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>DriveKeep - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// DriveAuthAdapter
// ============================================================================

/// High-level authentication adapter
///
/// [`authorize`](Self::authorize) returns usable tokens with as little user
/// interaction as possible:
///
/// 1. Load stored tokens
/// 2. Use them if the access token is still valid
/// 3. Refresh them if a refresh token is available
/// 4. Otherwise run the interactive browser login
/// 5. Store the result for the next run
pub struct DriveAuthAdapter {
    config: OAuth2Config,
    storage: TokenStorage,
    redirect_port: u16,
}

impl DriveAuthAdapter {
    pub fn new(config: OAuth2Config, storage: TokenStorage) -> Self {
        Self {
            config,
            storage,
            redirect_port: 0,
        }
    }

    /// Uses a fixed loopback port for the redirect instead of a free one
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Performs the full interactive OAuth2 PKCE login flow
    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");

        let server = LocalCallbackServer::bind(self.redirect_port).await?;
        let flow = PKCEFlow::new(&self.config, &server.redirect_uri())?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authentication");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Failed to open browser");
        }
        eprintln!("If the browser did not open, visit this URL to authorize DriveKeep:\n\n{auth_url}\n");

        let callback = server.wait_for_callback().await?;
        if callback.state != *csrf_token.secret() {
            anyhow::bail!("OAuth state mismatch in callback, refusing authorization code");
        }

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;
        info!("OAuth2 PKCE login completed successfully");
        Ok(tokens)
    }

    /// Refreshes an expired access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        // the redirect URI is not used when refreshing
        let flow = PKCEFlow::new(&self.config, "http://127.0.0.1/")?;
        flow.refresh_token(refresh_token).await
    }

    /// Returns valid tokens, refreshing or logging in as needed, and stores them
    pub async fn authorize(&self) -> Result<Tokens> {
        let stored = self.storage.load()?;

        let tokens = match stored {
            Some(tokens) if !tokens.expires_within(Duration::seconds(EXPIRY_MARGIN_SECS)) => {
                debug!("Stored access token is still valid");
                return Ok(tokens);
            }
            Some(Tokens {
                refresh_token: Some(refresh_token),
                ..
            }) => match self.refresh(&refresh_token).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, starting interactive login");
                    self.login().await?
                }
            },
            _ => self.login().await?,
        };

        self.storage.store(&tokens)?;
        Ok(tokens)
    }

    /// Deletes stored tokens
    pub fn logout(&self) -> Result<()> {
        self.storage.clear()
    }
}
