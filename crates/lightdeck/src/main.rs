mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lightdeck_config::{Config, JsonFileStore};
use lightdeck_core::{LightController, PersistentStore, RestoreOutcome, StoreMirror};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't touch the store
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "lightdeck", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = load_config(&cli.global)?;
            let long_lived = matches!(cmd, Command::Shell);
            let controller = build_controller(&cfg, &cli.global, long_lived)?;

            match controller.restore().await? {
                RestoreOutcome::Discarded => {
                    tracing::warn!("saved session was corrupt and has been cleared");
                }
                outcome => tracing::debug!(?outcome, "restored"),
            }

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &controller, &cfg, &cli.global).await;
            controller.shutdown().await;
            result
        }
    }
}

fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(lightdeck_config::config_path);
    Ok(lightdeck_config::load_config_from(&path)?)
}

/// Wire the controller to the on-disk store. Auto-refresh only runs in the
/// long-lived `shell`.
fn build_controller(
    cfg: &Config,
    global: &GlobalOpts,
    long_lived: bool,
) -> Result<LightController, CliError> {
    let mut config = lightdeck_config::to_controller_config(cfg)?;
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.timeout = Duration::from_secs(secs);
    }
    config.auto_refresh = long_lived;

    let path = global
        .store
        .clone()
        .unwrap_or_else(lightdeck_config::store_path);
    let store: Arc<dyn PersistentStore> = Arc::new(JsonFileStore::new(path));
    let mirror = Arc::new(StoreMirror::load(Arc::clone(&store)));

    Ok(LightController::new(config, store, mirror))
}
