//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod account;
pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod shell;
pub mod util;

use lightdeck_config::Config;
use lightdeck_core::LightController;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &LightController,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => account::login(controller, args, cfg, global).await,
        Command::Import(args) => account::import(controller, args, cfg, global).await,
        Command::Logout => account::logout(controller, global).await,
        Command::Refresh => account::refresh(controller, global).await,
        Command::Devices => devices::list(controller, global).await,
        Command::Select(args) => devices::select(controller, args, global).await,
        Command::Status => devices::status(controller, global).await,
        Command::On => control::power(controller, true, global).await,
        Command::Off => control::power(controller, false, global).await,
        Command::Brightness(args) => control::brightness(controller, args, global).await,
        Command::Hue(args) => control::hue(controller, args, global).await,
        Command::Color(args) => control::color(controller, args, global).await,
        Command::Quick(args) => control::quick(controller, args, global).await,
        Command::Shell => shell::run(controller, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
