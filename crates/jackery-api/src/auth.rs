// Account login
//
// Exchanges account credentials for an opaque bearer token. The request is
// a multipart POST whose query string carries the encrypted envelope; the
// response is `{code, token?, msg?}`. The vendor never reports a TTL, so the
// session has no expiry clock: it stays valid until a read endpoint answers
// with the token-expired code.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::SessionClient;
use crate::error::Error;
use crate::identity;
use crate::transport::{LOGIN_HEADERS, header_map};

/// Login endpoint path.
pub const LOGIN_PATH: &str = "/v1/auth/login";

/// Account credentials. Fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub account: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }
}

/// Whether the client currently holds a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoToken,
    Authenticated,
}

/// Token state owned by a [`SessionClient`].
///
/// Only a successful login sets the token; only a token-expired response
/// clears it.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<SecretString>,
    authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        if self.token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::NoToken
        }
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// When the current token was obtained.
    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    pub(crate) fn set_token(&mut self, token: SecretString) {
        self.token = Some(token);
        self.authenticated_at = Some(Utc::now());
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
        self.authenticated_at = None;
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    code: Option<i64>,
    token: Option<String>,
    msg: Option<String>,
}

impl SessionClient {
    /// Log in and store a fresh token, replacing any existing one.
    pub async fn login(&self) -> Result<(), Error> {
        let mut session = self.session.lock().await;
        self.login_locked(&mut session).await?;
        Ok(())
    }

    /// Perform the login exchange with the session lock already held.
    ///
    /// Returns the new token so the caller can use it without re-reading
    /// the session.
    pub(crate) async fn login_locked(&self, session: &mut Session) -> Result<SecretString, Error> {
        let url = self.endpoint(LOGIN_PATH)?;
        info!(account = %self.credentials().account, "logging in to Jackery cloud");

        let device_id = identity::derive(self.android_id());
        let envelope = self.handshake().build_login_envelope(
            &self.credentials().account,
            self.credentials().password.expose_secret(),
            &device_id,
        )?;

        // The endpoint insists on multipart, even with nothing to upload.
        let form = Form::new().part("file", Part::bytes(Vec::new()).file_name(""));

        debug!("POST {}", url);
        let resp = self
            .http()
            .post(url)
            .query(&envelope.as_query())
            .headers(header_map(LOGIN_HEADERS))
            .multipart(form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Authentication {
                message: format!("request failed: {e}"),
            })?;

        debug!(status = %resp.status(), "login response received");

        let body = resp.text().await.map_err(|e| Error::Authentication {
            message: format!("request failed: {e}"),
        })?;

        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("malformed login response: {e}"),
            })?;

        match parsed {
            LoginResponse {
                code: Some(0),
                token: Some(token),
                ..
            } => {
                let token = SecretString::from(token);
                session.set_token(token.clone());
                info!("login successful");
                Ok(token)
            }
            LoginResponse { code, msg, .. } => {
                warn!(?code, msg = msg.as_deref().unwrap_or(""), "login rejected");
                Err(Error::Authentication {
                    message: msg.unwrap_or_else(|| "Login failed".into()),
                })
            }
        }
    }
}
