//! Notion public-integration authorization: the authorization-code exchange,
//! refresh, and the on-disk token file.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{info, warn};

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_file: PathBuf,
}

/// Token endpoint response. Extra fields (workspace, bot id, ...) are kept
/// so the file round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// JSON token file. Each call opens, reads or writes, and closes the file.
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<Option<TokenSet>, AppError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, tokens: &TokenSet) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(tokens)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

pub fn authorize_url(api_base: &str, config: &OAuthConfig, state: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(&format!("{}/oauth/authorize", api_base))
        .map_err(|e| AppError::Config(format!("Invalid NOTION_API_BASE: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("owner", "user")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("state", state);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

async fn callback(
    State(slot): State<CallbackSlot>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let ok = params.code.is_some() && params.error.is_none();
    if let Some(tx) = slot.lock().await.take() {
        let _ = tx.send(params);
    }
    if ok {
        (StatusCode::OK, "Authorization code received. You can close this tab.")
    } else {
        (StatusCode::BAD_REQUEST, "Authorization failed. You can close this tab.")
    }
}

/// Binds the host and port of the redirect URI and waits for one callback.
pub async fn capture_code(redirect_uri: &str, expected_state: &str) -> Result<String, AppError> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| AppError::Config(format!("Invalid NOTION_REDIRECT_URI: {}", e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Config("NOTION_REDIRECT_URI has no host".to_string()))?
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| AppError::Config("NOTION_REDIRECT_URI has no port".to_string()))?;

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    capture_code_on(listener, url.path(), expected_state).await
}

/// Serves a single callback on an already bound listener, then shuts down.
pub async fn capture_code_on(
    listener: TcpListener,
    path: &str,
    expected_state: &str,
) -> Result<String, AppError> {
    let (tx, rx) = oneshot::channel();
    let slot: CallbackSlot = Arc::new(Mutex::new(Some(tx)));
    let app = Router::new().route(path, get(callback)).with_state(slot);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    info!("Waiting for OAuth authorization...");
    let received = rx.await;
    let _ = stop_tx.send(());
    if let Ok(Err(e)) = server.await {
        warn!("callback listener exited with error: {}", e);
    }

    let params = received
        .map_err(|_| AppError::Unauthorized("callback listener closed before a code arrived".to_string()))?;

    if let Some(error) = params.error {
        return Err(AppError::Unauthorized(format!("authorization denied: {}", error)));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AppError::Unauthorized("state mismatch in OAuth callback".to_string()));
    }
    params
        .code
        .ok_or_else(|| AppError::Unauthorized("callback carried no code".to_string()))
}

async fn request_tokens(
    client: &Client,
    api_base: &str,
    config: &OAuthConfig,
    body: serde_json::Value,
) -> Result<TokenSet, AppError> {
    let response = client
        .post(format!("{}/oauth/token", api_base))
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Unauthorized(format!("token endpoint returned {}: {}", status, body)));
    }

    let tokens: TokenSet = response.json().await?;
    Ok(tokens)
}

pub async fn exchange_code(
    client: &Client,
    api_base: &str,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenSet, AppError> {
    let body = serde_json::json!({
        "grant_type": "authorization_code",
        "code": code,
        "redirect_uri": config.redirect_uri,
    });
    request_tokens(client, api_base, config, body).await
}

/// Exchanges a refresh token. Notion may omit `refresh_token` in the
/// response; the old one is carried over in that case.
pub async fn refresh(
    client: &Client,
    api_base: &str,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<TokenSet, AppError> {
    let body = serde_json::json!({
        "grant_type": "refresh_token",
        "refresh_token": refresh_token,
    });
    let mut tokens = request_tokens(client, api_base, config, body).await?;
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.to_string());
    }
    Ok(tokens)
}

/// Full interactive flow: print the authorize URL, capture the code,
/// exchange it, and persist the result.
pub async fn authorize(
    client: &Client,
    api_base: &str,
    config: &OAuthConfig,
) -> Result<TokenSet, AppError> {
    let state = uuid::Uuid::new_v4().to_string();
    let url = authorize_url(api_base, config, &state)?;

    println!("Open this URL in your browser to authorize Notion:");
    println!("{}", url);

    let code = capture_code(&config.redirect_uri, &state).await?;
    let tokens = exchange_code(client, api_base, config, &code).await?;
    TokenStore::new(&config.token_file).save(&tokens).await?;
    info!("Saved Notion tokens to {}", config.token_file.display());
    Ok(tokens)
}

/// Tokens from the file, or the interactive flow when there is no file yet.
pub async fn load_or_authorize(
    client: &Client,
    api_base: &str,
    config: &OAuthConfig,
) -> Result<TokenSet, AppError> {
    match TokenStore::new(&config.token_file).load().await? {
        Some(tokens) => Ok(tokens),
        None => authorize(client, api_base, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token_file: PathBuf) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            redirect_uri: "http://localhost:8000/callback".to_string(),
            token_file,
        }
    }

    #[tokio::test]
    async fn token_store_round_trips_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join(".token.json"));

        assert!(store.load().await.unwrap().is_none());

        let raw = serde_json::json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "workspace_id": "ws"
        });
        let tokens: TokenSet = serde_json::from_value(raw).unwrap();
        store.save(&tokens).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, tokens);
        assert_eq!(loaded.extra.get("workspace_id"), Some(&serde_json::json!("ws")));
    }

    #[test]
    fn authorize_url_carries_client_and_state() {
        let cfg = config(PathBuf::from(".token.json"));
        let url = authorize_url("https://api.notion.com/v1", &cfg, "st4te").unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/v1/oauth/authorize");
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8000/callback");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["state"], "st4te");
    }

    #[tokio::test]
    async fn captures_code_from_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let capture = tokio::spawn(async move { capture_code_on(listener, "/callback", "abc").await });

        let response = Client::new()
            .get(format!("http://{}/callback?code=xyz&state=abc", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let code = capture.await.unwrap().unwrap();
        assert_eq!(code, "xyz");
    }

    #[tokio::test]
    async fn rejects_state_mismatch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let capture = tokio::spawn(async move { capture_code_on(listener, "/callback", "expected").await });

        let _ = Client::new()
            .get(format!("http://{}/callback?code=xyz&state=forged", addr))
            .send()
            .await;

        let err = capture.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
