//! Account commands: login, import, logout, refresh.

use std::io::{self, IsTerminal};

use secrecy::SecretString;
use serde::Serialize;

use lightdeck_config::{Account, Config, ConfigError};
use lightdeck_core::{Credentials, LightController, Platform, Region};

use crate::cli::{GlobalOpts, LoginArgs, PlatformArg};
use crate::error::CliError;
use crate::output;

use super::util;

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Tuya => Self::Tuya,
            PlatformArg::SmartLife => Self::SmartLife,
            PlatformArg::JinvooSmart => Self::JinvooSmart,
        }
    }
}

#[derive(Serialize)]
struct LoginSummary {
    username: String,
    region: String,
    devices: usize,
    remembered: bool,
}

pub async fn login(
    controller: &LightController,
    args: LoginArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let creds = resolve_credentials(&args, cfg)?;
    let remember = wants_remember(&args, cfg);

    let pb = util::spinner("Logging in...", global.quiet);
    let result = controller.login(&creds, remember).await;
    util::finish(pb);
    let devices = result?;

    let summary = LoginSummary {
        username: creds.username.clone(),
        region: region_name(creds.region()).into(),
        devices,
        remembered: remember,
    };
    let out = output::render_single(
        &global.output,
        &summary,
        |s| {
            let saved = if s.remembered {
                "session saved"
            } else {
                "session not saved (use --remember)"
            };
            format!(
                "Logged in as {} ({}) -- {} light(s) found, {saved}",
                s.username, s.region, s.devices
            )
        },
        |s| s.devices.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn import(
    controller: &LightController,
    args: LoginArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let creds = resolve_credentials(&args, cfg)?;
    controller.import_credentials(&creds).await?;
    output::print_output(
        &format!(
            "Credentials for {} saved. Run `lightdeck refresh` to log in and load lights.",
            creds.username
        ),
        global.quiet,
    );
    Ok(())
}

pub async fn logout(controller: &LightController, global: &GlobalOpts) -> Result<(), CliError> {
    controller.logout().await;
    output::print_output(
        "Logged out. Saved lights remain available offline.",
        global.quiet,
    );
    Ok(())
}

pub async fn refresh(controller: &LightController, global: &GlobalOpts) -> Result<(), CliError> {
    let pb = util::spinner("Refreshing session...", global.quiet);
    let result = controller.refresh_devices().await;
    util::finish(pb);
    let count = result?;
    output::print_output(&format!("Session renewed -- {count} light(s) found"), global.quiet);
    Ok(())
}

// ── Credential resolution ────────────────────────────────────────────

/// Merge flags over the configured account, then find a password.
fn resolve_credentials(args: &LoginArgs, cfg: &Config) -> Result<Credentials, CliError> {
    let configured = cfg.account.as_ref();

    let username = args
        .username
        .clone()
        .or_else(|| configured.map(|a| a.username.clone()))
        .filter(|u| !u.trim().is_empty())
        .ok_or(CliError::NoCredentials)?;

    let country_code = args
        .country_code
        .clone()
        .or_else(|| configured.map(|a| a.country_code.clone()))
        .ok_or_else(|| CliError::Validation {
            field: "country-code".into(),
            reason: "required, e.g. 1 (US), 44 (UK) or 86 (China)".into(),
        })?;
    let country_code = country_code.trim().to_owned();
    if country_code.is_empty() || !country_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(CliError::Validation {
            field: "country-code".into(),
            reason: format!("expected digits, got '{country_code}'"),
        });
    }

    let platform = args
        .platform
        .map(Platform::from)
        .or_else(|| configured.map(|a| a.platform))
        .unwrap_or_default();

    // Only reuse the configured plaintext password for the configured user.
    let account = Account {
        username: username.clone(),
        country_code: country_code.clone(),
        platform,
        password: configured
            .filter(|a| a.username == username)
            .and_then(|a| a.password.clone()),
        remember: false,
    };
    let password = match lightdeck_config::resolve_password(&account) {
        Ok(pw) => pw,
        Err(ConfigError::NoPassword { .. }) if io::stdin().is_terminal() => prompt_password()?,
        Err(e) => return Err(e.into()),
    };

    Ok(Credentials {
        username,
        password,
        country_code,
        platform,
    })
}

fn prompt_password() -> Result<SecretString, CliError> {
    let pw = rpassword::prompt_password("Password: ")?;
    if pw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(SecretString::from(pw))
}

fn wants_remember(args: &LoginArgs, cfg: &Config) -> bool {
    if args.no_remember {
        return false;
    }
    args.remember || cfg.account.as_ref().is_some_and(|a| a.remember)
}

fn region_name(region: Region) -> &'static str {
    match region {
        Region::Eu => "Europe",
        Region::Us => "US",
        Region::Cn => "China",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn args(username: Option<&str>, country_code: Option<&str>) -> LoginArgs {
        LoginArgs {
            username: username.map(Into::into),
            country_code: country_code.map(Into::into),
            platform: None,
            remember: false,
            no_remember: false,
        }
    }

    fn configured(remember: bool) -> Config {
        Config {
            account: Some(Account {
                username: "me@example.com".into(),
                country_code: "44".into(),
                platform: Platform::SmartLife,
                password: Some("from-config".into()),
                remember,
            }),
            ..Config::default()
        }
    }

    #[test]
    fn flags_fall_back_to_configured_account() {
        if std::env::var(lightdeck_config::PASSWORD_ENV).is_ok() {
            return;
        }
        let creds = resolve_credentials(&args(None, None), &configured(false)).unwrap();
        assert_eq!(creds.username, "me@example.com");
        assert_eq!(creds.country_code, "44");
        assert_eq!(creds.platform, Platform::SmartLife);
        assert_eq!(creds.password.expose_secret(), "from-config");
    }

    #[test]
    fn missing_account_is_no_credentials() {
        let err = resolve_credentials(&args(None, Some("1")), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoCredentials));
    }

    #[test]
    fn country_code_must_be_digits() {
        let err = resolve_credentials(&args(Some("x"), Some("+1")), &Config::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn remember_flags_override_config() {
        let mut a = args(None, None);
        assert!(wants_remember(&a, &configured(true)));
        assert!(!wants_remember(&a, &configured(false)));
        a.no_remember = true;
        assert!(!wants_remember(&a, &configured(true)));
        a.no_remember = false;
        a.remember = true;
        assert!(wants_remember(&a, &Config::default()));
    }
}
