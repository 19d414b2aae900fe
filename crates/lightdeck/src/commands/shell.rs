//! Long-running session: auto-refresh stays on, stdin lines play the role
//! of tray menu items and global shortcuts, and controller notices are
//! printed as they arrive.

use std::str::FromStr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use lightdeck_core::{BridgeEvent, LightController, PowerAction, WidgetEvent};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

const BRIDGE_CHANNEL_SIZE: usize = 16;

const HELP: &str = "\
commands:
  select <id>        select a light
  on | turnOn        turn the selected light on
  off | turnOff      turn the selected light off
  devices            list known lights
  refresh            renew the session and rediscover
  status             session state
  quit               leave the shell";

/// One parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput {
    Bridge(BridgeEvent),
    Devices,
    Refresh,
    Status,
    Help,
    Quit,
    Empty,
}

fn parse_line(line: &str) -> Result<ShellInput, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(ShellInput::Empty);
    };
    let input = match head {
        "select" => {
            let id = words.next().ok_or("usage: select <id>")?;
            ShellInput::Bridge(BridgeEvent::DeviceSelected(id.to_owned()))
        }
        "devices" | "ls" => ShellInput::Devices,
        "refresh" => ShellInput::Refresh,
        "status" => ShellInput::Status,
        "help" | "?" => ShellInput::Help,
        "quit" | "exit" => ShellInput::Quit,
        other => match PowerAction::from_str(other) {
            Ok(action) => ShellInput::Bridge(BridgeEvent::Control(action)),
            Err(_) => return Err(format!("unknown command '{other}' (try `help`)")),
        },
    };
    Ok(input)
}

pub async fn run(controller: &LightController, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let (tx, rx) = mpsc::channel(BRIDGE_CHANNEL_SIZE);
    controller.spawn_bridge_listener(rx).await;
    let mut events = controller.subscribe();

    let online = controller.session().is_online();
    output::print_output(
        &format!(
            "lightdeck shell ({}, {} light(s)). Type `help` for commands.",
            if online { "online" } else { "offline" },
            controller.devices().await.len()
        ),
        global.quiet,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event, color, global.quiet),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(ShellInput::Bridge(event)) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(ShellInput::Devices) => super::devices::list(controller, global).await?,
                    Ok(ShellInput::Status) => super::devices::status(controller, global).await?,
                    Ok(ShellInput::Refresh) => {
                        // Failures arrive as notices.
                        let _ = controller.refresh_devices().await;
                    }
                    Ok(ShellInput::Help) => output::print_output(HELP, global.quiet),
                    Ok(ShellInput::Quit) => break,
                    Ok(ShellInput::Empty) => {}
                    Err(msg) => eprintln!("{msg}"),
                }
            }
        }
    }

    drop(tx);
    Ok(())
}

fn print_event(event: &WidgetEvent, color: bool, quiet: bool) {
    let line = match event {
        WidgetEvent::Notice(notice) => output::format_notice(notice, color),
        WidgetEvent::SessionChanged { online } => {
            format!("session {}", if *online { "online" } else { "offline" })
        }
        WidgetEvent::DeviceInfoChanged(device) => {
            let state = if device.is_on() { "on" } else { "off" };
            format!("{} is {state}", device.display_name())
        }
        WidgetEvent::DevicesChanged(_) | WidgetEvent::ControlPanel { .. } => return,
    };
    output::print_output(&line, quiet);
}
