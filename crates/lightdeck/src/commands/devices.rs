//! Device directory commands: list, select, status.

use serde::Serialize;
use tabled::Tabled;

use lightdeck_core::{Device, LightController, hsl_to_hex};

use crate::cli::{GlobalOpts, SelectArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "")]
    selected: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Brightness")]
    brightness: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Reachable")]
    reachable: String,
}

fn row(device: &Device, current: Option<&str>) -> DeviceRow {
    let data = device.data.as_ref();
    DeviceRow {
        selected: if current == Some(device.id.as_str()) { "*" } else { "" },
        id: device.id.clone(),
        name: device.display_name().to_owned(),
        power: power_label(device).into(),
        brightness: device
            .brightness()
            .map_or_else(|| "-".into(), |b| format!("{b}%")),
        color: color_label(device),
        reachable: data
            .and_then(|d| d.online)
            .map_or_else(|| "-".into(), |o| if o { "yes".into() } else { "no".into() }),
    }
}

fn power_label(device: &Device) -> &'static str {
    match device.data.as_ref().and_then(|d| d.state) {
        Some(true) => "on",
        Some(false) => "off",
        None => "-",
    }
}

fn color_label(device: &Device) -> String {
    device
        .data
        .as_ref()
        .and_then(|d| d.color)
        .map_or_else(
            || "-".into(),
            |c| {
                hsl_to_hex(
                    f64::from(c.hue),
                    c.saturation * 100.0,
                    f64::from(c.brightness),
                )
            },
        )
}

fn detail(device: &Device) -> String {
    let lines = [
        format!("ID:          {}", device.id),
        format!("Name:        {}", device.display_name()),
        format!("Type:        {}", device.dev_type),
        format!("Power:       {}", power_label(device)),
        format!(
            "Brightness:  {}",
            device
                .brightness()
                .map_or_else(|| "-".into(), |b| format!("{b}%"))
        ),
        format!("Color:       {}", color_label(device)),
    ];
    lines.join("\n")
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn list(controller: &LightController, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = controller.devices().await;
    let current = controller.current_device().await.map(|d| d.id);

    if devices.is_empty() && matches!(global.output, crate::cli::OutputFormat::Table) {
        output::print_output(
            "No lights known. Run `lightdeck login` or `lightdeck refresh`.",
            global.quiet,
        );
        return Ok(());
    }

    let out = output::render_list(
        &global.output,
        &devices,
        |d| row(d, current.as_deref()),
        |d| d.id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn select(
    controller: &LightController,
    args: SelectArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let Some(id) = args.id.filter(|_| !args.clear) else {
        controller.select_device(None).await;
        output::print_output("Selection cleared", global.quiet);
        return Ok(());
    };

    // An unknown id clears the selection before reporting.
    let device = controller
        .select_device(Some(&id))
        .await
        .ok_or(CliError::DeviceNotFound { id })?;

    let out = output::render_single(&global.output, &device, detail, |d| d.id.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    online: bool,
    base_url: Option<String>,
    relay_url: Option<String>,
    has_refresh_token: bool,
    last_refresh: Option<String>,
    refresh_failures: u32,
    devices: usize,
    selected: Option<Device>,
}

fn status_detail(s: &StatusView) -> String {
    let mut lines = vec![
        format!(
            "Session:     {}",
            if s.online { "online" } else { "offline" }
        ),
        format!("Endpoint:    {}", s.base_url.as_deref().unwrap_or("-")),
    ];
    if let Some(relay) = &s.relay_url {
        lines.push(format!("Relay:       {relay}"));
    }
    lines.push(format!(
        "Refresh:     {}",
        if s.has_refresh_token { "available" } else { "none" }
    ));
    if let Some(at) = &s.last_refresh {
        lines.push(format!("Refreshed:   {at}"));
    }
    if s.refresh_failures > 0 {
        lines.push(format!("Failures:    {}", s.refresh_failures));
    }
    lines.push(format!("Lights:      {}", s.devices));
    lines.push(format!(
        "Selected:    {}",
        s.selected
            .as_ref()
            .map_or_else(|| "-".into(), |d| format!("{} ({})", d.display_name(), d.id))
    ));
    lines.join("\n")
}

pub async fn status(controller: &LightController, global: &GlobalOpts) -> Result<(), CliError> {
    let session = controller.status().await;
    let view = StatusView {
        online: session.online,
        base_url: session.base_url,
        relay_url: session.relay_url,
        has_refresh_token: session.has_refresh_token,
        last_refresh: session.last_refresh.map(|t| t.to_rfc3339()),
        refresh_failures: session.refresh_failures,
        devices: controller.devices().await.len(),
        selected: controller.current_device().await,
    };

    let out = output::render_single(&global.output, &view, status_detail, |s| {
        if s.online { "online" } else { "offline" }.to_owned()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
