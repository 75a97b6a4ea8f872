// Shared transport configuration for building reqwest::Client instances.
//
// The vendor edge expects requests that look like they come from the iOS
// app, so every client carries the same fixed identity headers. Login and
// read requests add a few endpoint-specific headers on top.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::Error;

/// Per-request timeout used unless the caller overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// App version the identity headers advertise.
pub const APP_VERSION: &str = "1.0.5";

/// User agent of the impersonated mobile client.
pub const USER_AGENT: &str =
    "DxPowerProject/1.0.5 (com.hb.jackery; build:2; iOS 17.2.0) Alamofire/5.8.0";

const IDENTITY_HEADERS: &[(&str, &str)] = &[
    ("app_version", APP_VERSION),
    ("sys_version", "17.2"),
    ("platform", "1"),
    ("model", "iPad Pro (12.9-inch) (3rd generation)"),
    ("accept", "*/*"),
    ("accept-language", "en-US"),
    ("accept-encoding", "br;q=1.0, gzip;q=0.9, deflate;q=0.8"),
];

/// Extra headers the app sends with its multipart login upload.
pub(crate) const LOGIN_HEADERS: &[(&str, &str)] = &[
    ("upload-incomplete", "?0"),
    ("upload-draft-interop-version", "3"),
];

/// Extra headers the app sends with read requests.
pub(crate) const READ_HEADERS: &[(&str, &str)] = &[("content-type", "application/json")];

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    /// Config with a custom request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` carrying the mobile-client identity headers.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(identity_headers())
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// The fixed identity headers sent on every request.
pub fn identity_headers() -> HeaderMap {
    header_map(IDENTITY_HEADERS)
}

pub(crate) fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    pairs
        .iter()
        .map(|&(name, value)| {
            (
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
        })
        .collect()
}
