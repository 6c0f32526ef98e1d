//! Clap derive structures for the `aquaguard` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use aquaguard_core::DeviceKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// aquaguard -- keep aquarium nodes and smart-home devices in sync
#[derive(Debug, Parser)]
#[command(
    name = "aquaguard",
    version,
    about = "Monitor and control AquaGuard nodes and cloud smart-home devices",
    long_about = "Polls HTTP sensor and light nodes plus cloud-platform devices,\n\
        tracks online state, logs power changes and pushes notifications.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "AQUAGUARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', env = "AQUAGUARD_OUTPUT", default_value = "table", global = true)]
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
    /// YAML
    Yaml,
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
    /// Poll continuously and print status updates until Ctrl-C
    Run(RunArgs),

    /// Manage the device list
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Poll one device now
    Poll(PollArgs),

    /// Switch a device on or off
    Power(PowerArgs),

    /// Colour, mode and scenes for HTTP light nodes
    Light(LightArgs),

    /// Per-device push notification rules
    Rules(RulesArgs),

    /// Power change log
    Logs(LogsArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Poll interval in milliseconds (overrides config, minimum 1000)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Sync the cloud device list before polling
    #[arg(long)]
    pub sync: bool,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List configured devices with their current status
    #[command(alias = "ls")]
    List {
        /// Skip the poll and show configuration only
        #[arg(long)]
        no_poll: bool,
    },

    /// Show one device after a fresh poll
    Show {
        /// Device id or name
        device: String,
    },

    /// Add a device
    Add(AddDeviceArgs),

    /// Remove a device
    #[command(alias = "rm")]
    Remove {
        /// Device id or name
        device: String,
    },

    /// Rename a device
    Rename {
        /// Device id or name
        device: String,
        /// New name
        name: String,
    },

    /// Hide or show a device (hidden devices are never polled)
    Visible {
        /// Device id or name
        device: String,
        #[arg(action = clap::ArgAction::Set)]
        visible: bool,
    },

    /// Add every cloud device not yet configured
    Sync,
}

#[derive(Debug, Args)]
pub struct AddDeviceArgs {
    /// Display name
    pub name: String,

    /// Device type (light, sensor, switch, mijia, mijia_light, ...)
    #[arg(long = "type", short = 't')]
    pub kind: DeviceKind,

    /// Node address for HTTP devices (host[:port])
    #[arg(long)]
    pub ip: Option<String>,

    /// Cloud device id (`<did>` or `<did>.s<n>`)
    #[arg(long)]
    pub did: Option<String>,

    /// Vendor model string
    #[arg(long)]
    pub model: Option<String>,

    /// Explicit id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Add the device hidden
    #[arg(long)]
    pub hidden: bool,
}

// ── Poll / power ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PollArgs {
    /// Device id or name
    pub device: String,
}

#[derive(Debug, Args)]
pub struct PowerArgs {
    /// Device id or name
    pub device: String,

    pub state: PowerState,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

// ── Light ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightArgs {
    /// Device id or name
    pub device: String,

    #[command(subcommand)]
    pub command: LightCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightCommand {
    /// Set an RGB colour (channels are clamped to 0-255)
    Color {
        #[arg(allow_negative_numbers = true)]
        r: i64,
        #[arg(allow_negative_numbers = true)]
        g: i64,
        #[arg(allow_negative_numbers = true)]
        b: i64,
    },

    /// Set the effect mode: static, rainbow, breath
    Mode { mode: String },

    /// Apply a scene: daylight, moonlight, aurora
    Scene { scene: String },
}

// ── Rules ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// List notification rules
    #[command(alias = "ls")]
    List,

    /// Set the rule for one device (omit both flags to disable)
    Set {
        /// Device id or name
        device: String,
        /// Notify when the device turns on
        #[arg(long)]
        on: bool,
        /// Notify when the device turns off
        #[arg(long)]
        off: bool,
    },
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// List change-log entries, newest last
    #[command(alias = "ls")]
    List {
        /// Only unread entries
        #[arg(long)]
        unread: bool,
    },

    /// Mark one entry read
    Read {
        /// Entry id
        id: String,
    },

    /// Mark every entry read
    ReadAll,

    /// Delete every entry
    Clear,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration (secrets masked)
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
