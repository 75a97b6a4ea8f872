//! Profile resolution: config file + global flags → `ClientConfig`.
//!
//! This is the single boundary where CLI flags cross into core types.

use std::time::Duration;

use jackery_api::ClientConfig;
use jackery_config::{Config, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a network command needs from configuration.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub client: ClientConfig,
    pub poll_interval: Duration,
}

/// Load config and resolve the active profile with flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = jackery_config::load_config()?;
    resolve_from(&cfg, global)
}

pub fn resolve_from(cfg: &Config, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let profile_name = cfg.active_profile_name(global.profile.as_deref());
    let profile = effective_profile(cfg, &profile_name, global)?;

    let password = jackery_config::resolve_password(&profile, &profile_name)?;
    let client = jackery_config::profile_to_client_config(&profile, password, &cfg.defaults)?;
    let poll_interval = jackery_config::poll_interval(&profile, &cfg.defaults);

    Ok(Resolved {
        profile_name,
        client,
        poll_interval,
    })
}

/// The named profile with `--account`, `--base-url` and `--timeout` applied.
///
/// Without a stored profile, `--account` alone is enough to build one.
fn effective_profile(
    cfg: &Config,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<Profile, CliError> {
    let mut profile = match (cfg.profiles.get(profile_name), &global.account) {
        (Some(p), _) => p.clone(),
        (None, Some(account)) => Profile {
            account: account.clone(),
            ..Profile::default()
        },
        (None, None) if global.profile.is_some() && !cfg.profiles.is_empty() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name.into(),
                available: cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: jackery_config::config_path().display().to_string(),
            });
        }
    };

    if let Some(ref account) = global.account {
        profile.account.clone_from(account);
    }
    if let Some(ref url) = global.base_url {
        profile.base_url = Some(url.clone());
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::cli::{ColorMode, OutputFormat};

    fn global() -> GlobalOpts {
        GlobalOpts {
            profile: None,
            account: None,
            base_url: None,
            output: OutputFormat::Table,
            color: ColorMode::Never,
            verbose: 0,
            quiet: false,
            timeout: None,
        }
    }

    fn config_with(name: &str) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            name.into(),
            Profile {
                account: "me@example.com".into(),
                base_url: Some("http://127.0.0.1:9".into()),
                timeout: Some(4),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile_fields() {
        let cfg = config_with("default");
        let opts = GlobalOpts {
            account: Some("other@example.com".into()),
            timeout: Some(20),
            ..global()
        };

        let profile = effective_profile(&cfg, "default", &opts).unwrap();
        assert_eq!(profile.account, "other@example.com");
        assert_eq!(profile.base_url.as_deref(), Some("http://127.0.0.1:9"));
        assert_eq!(profile.timeout, Some(20));
    }

    #[test]
    fn account_flag_works_without_config() {
        let opts = GlobalOpts {
            account: Some("me@example.com".into()),
            ..global()
        };
        let profile = effective_profile(&Config::default(), "default", &opts).unwrap();
        assert_eq!(profile.account, "me@example.com");
        assert!(profile.base_url.is_none());
    }

    #[test]
    fn missing_profile_without_account_is_an_error() {
        let err = effective_profile(&Config::default(), "default", &global()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));

        let cfg = config_with("home");
        let opts = GlobalOpts {
            profile: Some("work".into()),
            ..global()
        };
        match effective_profile(&cfg, "work", &opts).unwrap_err() {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "work");
                assert_eq!(available, "home");
            }
            other => panic!("expected ProfileNotFound, got: {other:?}"),
        }
    }
}
