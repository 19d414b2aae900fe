//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use lightdeck_config::{Account, Config};
use lightdeck_core::Platform;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(lightdeck_config::config_path)
}

fn store_file(global: &GlobalOpts) -> PathBuf {
    global
        .store
        .clone()
        .unwrap_or_else(lightdeck_config::store_path)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),
        ConfigCommand::Show => show(global),
        ConfigCommand::Path => {
            let out = match global.output {
                crate::cli::OutputFormat::Plain => config_file(global).display().to_string(),
                _ => format!(
                    "config: {}\nstore:  {}",
                    config_file(global).display(),
                    store_file(global).display()
                ),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_file(global);
    eprintln!("lightdeck -- configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let username: String = Input::new()
        .with_prompt("Account username (email or phone)")
        .interact_text()
        .map_err(prompt_err)?;

    let country_code: String = Input::new()
        .with_prompt("Phone country code (1 = US, 86 = China, other = Europe)")
        .default("1".into())
        .validate_with(|code: &String| -> Result<(), &str> {
            if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
                Ok(())
            } else {
                Err("digits only")
            }
        })
        .interact_text()
        .map_err(prompt_err)?;

    let platforms = [Platform::Tuya, Platform::SmartLife, Platform::JinvooSmart];
    let platform_labels = ["Tuya", "Smart Life", "Jinvoo Smart"];
    let platform_idx = Select::new()
        .with_prompt("Vendor app")
        .items(&platform_labels)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let platform = platforms
        .get(platform_idx)
        .copied()
        .unwrap_or_default();

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if username.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    let store_choices = [
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Don't store (prompt on login)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(&store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let password_field = match store_selection {
        0 => {
            lightdeck_config::store_password(&username, &password)?;
            eprintln!("   ✓ Password stored in system keyring");
            None
        }
        1 => Some(password),
        _ => None,
    };

    let remember = Confirm::new()
        .with_prompt("Save the session after login?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    // Keep any hand-edited defaults and endpoints.
    let mut cfg = lightdeck_config::load_config_from(&path).unwrap_or_default();
    cfg.account = Some(Account {
        username,
        country_code,
        platform,
        password: password_field,
        remember,
    });

    lightdeck_config::save_config_to(&cfg, &path)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("\n  Next: lightdeck login");
    Ok(())
}

// ── Show ────────────────────────────────────────────────────────────

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = lightdeck_config::load_config_from(&config_file(global))?;
    redact(&mut cfg);

    let out = output::render_single(
        &global.output,
        &cfg,
        |c| {
            toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unprintable config: {e}>"))
        },
        |c| {
            c.account
                .as_ref()
                .map_or_else(String::new, |a| a.username.clone())
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn redact(cfg: &mut Config) {
    if let Some(account) = cfg.account.as_mut() {
        if account.password.is_some() {
            account.password = Some("********".into());
        }
    }
}
