//! Shared configuration for Jackery tools.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), and
//! translation to `jackery_api::ClientConfig`. The core never reads
//! configuration itself; it receives a pre-built `ClientConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use jackery_api::{ClientConfig, Credentials, TransportConfig};

/// Keyring service name for stored passwords.
pub const KEYRING_SERVICE: &str = "jackery";

/// Environment variable consulted first for the account password.
pub const PASSWORD_ENV: &str = "JACKERY_PASSWORD";

/// Environment variable that turns off every system keyring access when set
/// to a non-empty value other than `0` (headless hosts, CI).
pub const NO_KEYRING_ENV: &str = "JACKERY_NO_KEYRING";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between telemetry polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    jackery_api::DEFAULT_POLL_INTERVAL.as_secs()
}

/// A named Jackery account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account (e-mail) used to log in.
    pub account: String,

    /// Plaintext password. The keyring or `JACKERY_PASSWORD` take precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// API host override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Seed for the client's device identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_id: Option<String>,

    /// Override timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override poll interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

impl Config {
    /// Resolve the active profile name: explicit choice, then the
    /// configured default, then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "jackery", "jackery").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("jackery");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path`, layered under `JACKERY_` environment overrides
/// (`JACKERY_DEFAULTS__TIMEOUT=5` sets `defaults.timeout`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("JACKERY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the password for a profile.
///
/// Order: `JACKERY_PASSWORD`, system keyring, plaintext in the profile.
/// The keyring step is skipped when [`NO_KEYRING_ENV`] is set.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    let env = std::env::var(PASSWORD_ENV).ok().filter(|pw| !pw.is_empty());
    let stored = if env.is_none() && keyring_enabled() {
        keyring_password(profile_name)
    } else {
        None
    };
    resolve_password_from(profile, profile_name, env, stored)
}

/// [`resolve_password`] with the env and keyring lookups already done.
pub fn resolve_password_from(
    profile: &Profile,
    profile_name: &str,
    env: Option<String>,
    keyring: Option<String>,
) -> Result<SecretString, ConfigError> {
    env.filter(|pw| !pw.is_empty())
        .or(keyring)
        .or_else(|| profile.password.clone())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

fn keyring_enabled() -> bool {
    !keyring_disabled_by(std::env::var(NO_KEYRING_ENV).ok().as_deref())
}

fn keyring_disabled_by(flag: Option<&str>) -> bool {
    flag.is_some_and(|v| !v.is_empty() && v != "0")
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    if !keyring_enabled() {
        return Err(ConfigError::Keyring(format!(
            "keyring access disabled by {NO_KEYRING_ENV}"
        )));
    }
    keyring_entry(profile_name)?
        .set_password(password)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation to core config ──────────────────────────────────────

/// Per-request timeout for a profile.
pub fn timeout(profile: &Profile, defaults: &Defaults) -> Duration {
    Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout))
}

/// Poll interval for a profile.
pub fn poll_interval(profile: &Profile, defaults: &Defaults) -> Duration {
    Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval))
}

/// Build a `ClientConfig` from a profile and an already-resolved password.
pub fn profile_to_client_config(
    profile: &Profile,
    password: SecretString,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    if profile.account.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "account".into(),
            reason: "account cannot be empty".into(),
        });
    }

    let timeout = timeout(profile, defaults);
    if timeout.is_zero() {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least one second".into(),
        });
    }

    let credentials = Credentials::new(profile.account.clone(), password);
    let mut config = ClientConfig::new(credentials).map_err(|e| ConfigError::Validation {
        field: "base_url".into(),
        reason: e.to_string(),
    })?;

    if let Some(ref raw) = profile.base_url {
        let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
        config = config.with_base_url(url);
    }

    if let Some(ref seed) = profile.android_id {
        config = config.with_android_id(seed.clone());
    }

    Ok(config.with_transport(TransportConfig::default().with_timeout(timeout)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile() -> Profile {
        Profile {
            account: "me@example.com".into(),
            password: Some("plain".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
poll_interval = 30

[profiles.home]
account = "me@example.com"
android_id = "0123456789abcdef"
timeout = 5
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.active_profile_name(None), "home");
        assert_eq!(cfg.active_profile_name(Some("work")), "work");

        let home = cfg.profile("home").unwrap();
        assert_eq!(home.account, "me@example.com");
        assert_eq!(home.android_id.as_deref(), Some("0123456789abcdef"));
        assert_eq!(timeout(home, &cfg.defaults), Duration::from_secs(5));
        assert_eq!(poll_interval(home, &cfg.defaults), Duration::from_secs(30));
        assert_eq!(cfg.defaults.timeout, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.poll_interval, 60);
        assert!(cfg.profiles.is_empty());
        assert!(matches!(
            cfg.profile("default"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profiles.home\naccount = \"me@example.com\"\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)), "got: {err:?}");
        assert!(err.to_string().starts_with("config loading failed"));
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let p = loaded.profile("default").unwrap();
        assert_eq!(p.account, "me@example.com");
        assert_eq!(p.password.as_deref(), Some("plain"));
        assert!(p.base_url.is_none());
    }

    #[test]
    fn password_resolution_order() {
        let p = profile();

        let pw = resolve_password_from(&p, "default", Some("env".into()), Some("ring".into()));
        assert_eq!(pw.unwrap().expose_secret(), "env");

        let pw = resolve_password_from(&p, "default", None, Some("ring".into()));
        assert_eq!(pw.unwrap().expose_secret(), "ring");

        let pw = resolve_password_from(&p, "default", Some(String::new()), None);
        assert_eq!(pw.unwrap().expose_secret(), "plain");
    }

    #[test]
    fn keyring_opt_out_flag() {
        assert!(!keyring_disabled_by(None));
        assert!(!keyring_disabled_by(Some("")));
        assert!(!keyring_disabled_by(Some("0")));
        assert!(keyring_disabled_by(Some("1")));
        assert!(keyring_disabled_by(Some("true")));
    }

    #[test]
    fn missing_password_is_reported() {
        let p = Profile {
            password: None,
            ..profile()
        };
        let result = resolve_password_from(&p, "home", None, None);
        assert!(matches!(result, Err(ConfigError::NoCredentials { ref profile }) if profile == "home"));
    }

    #[test]
    fn builds_client_config() {
        let p = Profile {
            base_url: Some("http://127.0.0.1:8080".into()),
            android_id: Some("seed".into()),
            timeout: Some(3),
            ..profile()
        };
        let cfg = profile_to_client_config(&p, "pw".to_string().into(), &Defaults::default()).unwrap();

        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(cfg.credentials.account, "me@example.com");
        assert_eq!(cfg.android_id.as_deref(), Some("seed"));
        assert_eq!(cfg.transport.timeout, Duration::from_secs(3));
    }

    #[test]
    fn client_config_defaults_to_production_host() {
        let cfg =
            profile_to_client_config(&profile(), "pw".to_string().into(), &Defaults::default())
                .unwrap();
        assert_eq!(cfg.base_url.as_str(), jackery_api::DEFAULT_BASE_URL.to_owned() + "/");
        assert_eq!(cfg.transport.timeout, Duration::from_secs(10));
        assert!(cfg.android_id.is_none());
    }

    #[test]
    fn rejects_bad_url_and_empty_account() {
        let bad_url = Profile {
            base_url: Some("not a url".into()),
            ..profile()
        };
        let result = profile_to_client_config(&bad_url, "pw".to_string().into(), &Defaults::default());
        assert!(matches!(result, Err(ConfigError::Validation { ref field, .. }) if field == "base_url"));

        let no_account = Profile {
            account: "  ".into(),
            ..profile()
        };
        let result =
            profile_to_client_config(&no_account, "pw".to_string().into(), &Defaults::default());
        assert!(matches!(result, Err(ConfigError::Validation { ref field, .. }) if field == "account"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let zero = Profile {
            timeout: Some(0),
            ..profile()
        };
        let result = profile_to_client_config(&zero, "pw".to_string().into(), &Defaults::default());
        assert!(matches!(result, Err(ConfigError::Validation { ref field, .. }) if field == "timeout"));

        let defaults = Defaults {
            timeout: 0,
            ..Defaults::default()
        };
        let result = profile_to_client_config(&profile(), "pw".to_string().into(), &defaults);
        assert!(matches!(result, Err(ConfigError::Validation { ref field, .. }) if field == "timeout"));
    }
}
