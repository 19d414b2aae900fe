//! Control commands for the selected light.
//!
//! Online, each command goes to the cloud first and local state follows
//! the acknowledgement. Offline, the saved state is updated directly.

use lightdeck_core::{LightController, QuickAction};

use crate::cli::{BrightnessArgs, ColorArgs, GlobalOpts, HueArgs, QuickArg, QuickArgs};
use crate::error::CliError;
use crate::output;

impl From<QuickArg> for QuickAction {
    fn from(arg: QuickArg) -> Self {
        match arg {
            QuickArg::On => Self::On,
            QuickArg::Off => Self::Off,
            QuickArg::Bright => Self::Bright,
            QuickArg::Dim => Self::Dim,
        }
    }
}

pub async fn power(
    controller: &LightController,
    on: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = controller.set_power(on).await?;
    let verb = if on { "Turned on" } else { "Turned off" };
    report(
        controller,
        format!("{verb} \"{}\"", device.display_name()),
        global,
    );
    Ok(())
}

pub async fn brightness(
    controller: &LightController,
    args: BrightnessArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let level = controller.set_brightness(args.value).await?;
    let name = selected_name(controller).await;
    report(controller, format!("{name} brightness set to {level}"), global);
    Ok(())
}

pub async fn hue(
    controller: &LightController,
    args: HueArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let preview = controller.set_hue(args.degrees).await?;
    let name = selected_name(controller).await;
    report(
        controller,
        format!("{name} color set to hue {}° ({preview})", args.degrees),
        global,
    );
    Ok(())
}

pub async fn color(
    controller: &LightController,
    args: ColorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let value = controller.set_color_hex(&args.hex).await?;
    let name = selected_name(controller).await;
    report(
        controller,
        format!(
            "{name} color set to hue {}°, saturation {:.0}%",
            value.hue,
            value.saturation * 100.0
        ),
        global,
    );
    Ok(())
}

pub async fn quick(
    controller: &LightController,
    args: QuickArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let action = QuickAction::from(args.action);
    controller.quick_action(action).await?;
    let name = selected_name(controller).await;
    report(controller, format!("{name}: {action}"), global);
    Ok(())
}

async fn selected_name(controller: &LightController) -> String {
    controller.current_device().await.map_or_else(
        || "Light".to_owned(),
        |d| format!("\"{}\"", d.display_name()),
    )
}

fn report(controller: &LightController, message: String, global: &GlobalOpts) {
    let line = if controller.session().is_online() {
        message
    } else {
        format!("{message} (offline)")
    };
    output::print_output(&line, global.quiet);
}
