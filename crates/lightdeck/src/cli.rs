//! Clap derive structures for the `lightdeck` CLI.
//!
//! One subcommand per widget action, plus `shell` for a long-running
//! session driven from stdin.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lightdeck -- control cloud smart lights from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "lightdeck",
    version,
    about = "Control cloud-connected smart lights from the command line",
    long_about = "Log in to the smart-light cloud, pick a light and switch it, dim it or \
        change its color.\n\n\
        Without a session every command works offline against the saved device \
        list, the same way the desktop widget does.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "LIGHTDECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Store file holding the session and device list
    #[arg(long, env = "LIGHTDECK_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, discover lights and optionally remember the session
    Login(LoginArgs),

    /// Save credentials without logging in
    Import(LoginArgs),

    /// Forget the saved session (devices stay for offline control)
    Logout,

    /// List known lights
    #[command(alias = "ls")]
    Devices,

    /// Renew the saved session and rediscover lights
    Refresh,

    /// Select the light to control
    Select(SelectArgs),

    /// Turn the selected light on
    On,

    /// Turn the selected light off
    Off,

    /// Set brightness from the slider scale (0 = off, 90 = full)
    #[command(alias = "b")]
    Brightness(BrightnessArgs),

    /// Set the color from a hue in degrees
    Hue(HueArgs),

    /// Set the color from a hex string (e.g. "#ff8800")
    Color(ColorArgs),

    /// One-tap actions: on, off, bright, dim
    Quick(QuickArgs),

    /// Show session and selection status
    Status,

    /// Run a long-lived session with auto-refresh, reading tray commands from stdin
    Shell,

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Arguments ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account username (overrides config)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Phone country code: 1 = US, 86 = China, anything else = Europe
    #[arg(long, short = 'r')]
    pub country_code: Option<String>,

    /// Vendor app the account belongs to
    #[arg(long)]
    pub platform: Option<PlatformArg>,

    /// Save the session, including the password in plaintext
    #[arg(long, conflicts_with = "no_remember")]
    pub remember: bool,

    /// Do not save the session even if the config says so
    #[arg(long)]
    pub no_remember: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlatformArg {
    Tuya,
    SmartLife,
    JinvooSmart,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Device id
    #[arg(required_unless_present = "clear")]
    pub id: Option<String>,

    /// Clear the selection
    #[arg(long, conflicts_with = "id")]
    pub clear: bool,
}

#[derive(Debug, Args)]
pub struct BrightnessArgs {
    /// Slider position, 0..=90
    #[arg(value_parser = clap::value_parser!(u8).range(0..=90))]
    pub value: u8,
}

#[derive(Debug, Args)]
pub struct HueArgs {
    /// Hue in degrees, 0..360
    #[arg(value_parser = clap::value_parser!(u16).range(0..360))]
    pub degrees: u16,
}

#[derive(Debug, Args)]
pub struct ColorArgs {
    /// Hex color, with or without '#'
    pub hex: String,
}

#[derive(Debug, Args)]
pub struct QuickArgs {
    pub action: QuickArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QuickArg {
    On,
    Off,
    /// Slider 90
    Bright,
    /// Slider 30
    Dim,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the effective configuration
    Show,

    /// Print the config and store file paths
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
