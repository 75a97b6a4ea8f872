// Session-managed HTTP client
//
// Wraps `reqwest::Client` with the vendor's token lifecycle: lazy login on
// first use, the `token` header on every read, and exactly one re-login plus
// one replay when the server reports the token as expired. Endpoint methods
// live in sibling modules as inherent impls.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};
use url::Url;

use crate::auth::{Credentials, Session, SessionState};
use crate::crypto::Handshake;
use crate::error::Error;
use crate::identity::DEFAULT_ANDROID_ID;
use crate::transport::{READ_HEADERS, TransportConfig, header_map};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://iot.jackeryapp.com";

/// Application code for success.
pub const SUCCESS_CODE: i64 = 0;

/// Application code meaning "token expired".
pub const TOKEN_EXPIRED_CODE: i64 = 10402;

/// Everything needed to construct a [`SessionClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub credentials: Credentials,
    /// Seed for the device identifier. Defaults to [`DEFAULT_ANDROID_ID`].
    pub android_id: Option<String>,
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Config for the production host with default transport settings.
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        Ok(Self {
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            credentials,
            android_id: None,
            transport: TransportConfig::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_android_id(mut self, android_id: impl Into<String>) -> Self {
        self.android_id = Some(android_id.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

/// Authenticated client for the Jackery cloud API.
///
/// Holds the bearer token behind an async mutex. Each [`request`] keeps the
/// lock for its whole login/GET/re-login/replay sequence, so a shared client
/// has at most one request in flight and two expiry-triggered logins can
/// never race each other.
///
/// [`request`]: SessionClient::request
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    android_id: String,
    handshake: Handshake,
    pub(crate) session: Mutex<Session>,
}

impl SessionClient {
    /// Create a client from a [`ClientConfig`], using the vendor's embedded keys.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Ok(Self::with_client(
            http,
            config.base_url,
            config.credentials,
            config.android_id,
            Handshake::vendor()?,
        ))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for the identity headers and timeout
    /// that [`TransportConfig::build_client`] would otherwise install.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Credentials,
        android_id: Option<String>,
        handshake: Handshake,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
            android_id: android_id.unwrap_or_else(|| DEFAULT_ANDROID_ID.to_owned()),
            handshake,
            session: Mutex::new(Session::default()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `path` appended to the base URL, keeping any path prefix the base
    /// carries (`http://host/proxy` + `/v1/x` = `http://host/proxy/v1/x`).
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        endpoint_url(&self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn android_id(&self) -> &str {
        &self.android_id
    }

    pub(crate) fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Current session state. Waits for any in-flight request to finish.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    // ── Request pipeline ─────────────────────────────────────────────

    /// GET `path` with `params`, handling login and token expiry.
    ///
    /// Logs in first if no token is held. If the server answers with
    /// [`TOKEN_EXPIRED_CODE`], the token is dropped, the client logs in once
    /// more and replays the request once; a second expiry surfaces as
    /// [`Error::Api`]. Login failures propagate unchanged, transport
    /// failures propagate unwrapped.
    pub async fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, Error> {
        let url = self.endpoint(path)?;
        let mut session = self.session.lock().await;

        let token = if let Some(token) = session.token() {
            token.clone()
        } else {
            info!("no token held, logging in");
            self.login_locked(&mut session).await?
        };

        let mut body = self.get_json(&url, params, &token).await?;

        if response_code(&body) == Some(TOKEN_EXPIRED_CODE) {
            info!(path, "token expired, re-authenticating");
            session.clear();
            let token = self.login_locked(&mut session).await?;
            body = self.get_json(&url, params, &token).await?;
        }

        check_code(body)
    }

    async fn get_json(
        &self,
        url: &Url,
        params: &[(&str, &str)],
        token: &SecretString,
    ) -> Result<Value, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .query(params)
            .headers(header_map(READ_HEADERS))
            .header("token", token.expose_secret())
            .send()
            .await?
            .error_for_status()?;

        let body = resp.text().await?;
        trace!(%body, "response body");

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

fn endpoint_url(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

fn response_code(body: &Value) -> Option<i64> {
    body.get("code").and_then(Value::as_i64)
}

/// Pass the body through on code 0, otherwise turn it into an error.
fn check_code(body: Value) -> Result<Value, Error> {
    match response_code(&body) {
        Some(SUCCESS_CODE) => Ok(body),
        Some(code) => Err(Error::Api {
            code,
            message: body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_owned(),
        }),
        None => Err(Error::Deserialization {
            message: "response has no application code".into(),
            body: body.to_string(),
        }),
    }
}
