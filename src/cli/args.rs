//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// ZoneRecorder - proximity-triggered audio recording
#[derive(Parser, Debug)]
#[command(name = "zone-recorder")]
#[command(version = "1.0.0")]
#[command(about = "Records audio automatically while inside registered proximity zones")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recording engine daemon
    Run {
        /// Site whose zones to watch
        #[arg(long, value_name = "SITE")]
        site_id: Option<String>,

        /// Base URL of the session backend / zone directory
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,

        /// gpsd address (host:port)
        #[arg(long, value_name = "ADDR")]
        gpsd: Option<String>,

        /// Operating mode
        #[arg(long, value_name = "MODE")]
        mode: Option<ModeArg>,

        /// Seconds between evaluated location samples
        #[arg(long, value_name = "SECS")]
        sample_interval: Option<u64>,

        /// Extra meters beyond a zone radius before an exit registers
        #[arg(long, value_name = "METERS")]
        exit_margin: Option<f64>,

        /// GPS accuracy tier
        #[arg(long, value_name = "TIER")]
        gps_accuracy: Option<TierArg>,

        /// Audio quality tier
        #[arg(long, value_name = "TIER")]
        audio_quality: Option<TierArg>,
    },
    /// Replay a location trace through the engine, no hardware needed
    Simulate {
        /// JSON-lines trace of location samples
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,

        /// JSON file with the zone set
        #[arg(long, value_name = "FILE")]
        zones: PathBuf,

        /// Operating mode
        #[arg(long, value_name = "MODE")]
        mode: Option<ModeArg>,

        /// Extra meters beyond a zone radius before an exit registers
        #[arg(long, value_name = "METERS")]
        exit_margin: Option<f64>,

        /// Seconds between evaluated location samples
        #[arg(long, value_name = "SECS")]
        sample_interval: Option<u64>,

        /// Milliseconds to sleep between trace steps
        #[arg(long, value_name = "MS", default_value_t = 0)]
        step_delay_ms: u64,
    },
    /// Send commands to a running daemon
    Control {
        #[command(subcommand)]
        action: ControlAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Daemon control actions
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ControlAction {
    /// Show engine status as JSON
    Status,
    /// Stop the open recording (termination reason: manual_stop)
    Stop,
    /// Accept a pending zone-entry confirmation
    Accept,
    /// Decline a pending zone-entry confirmation
    Decline,
    /// Enable the engine
    Enable,
    /// Disable the engine, finalizing any open recording
    Disable,
    /// Shut the daemon down
    Shutdown,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Operating mode argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Automatic,
    ConfirmFirst,
}

impl ModeArg {
    pub const fn as_config_value(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::ConfirmFirst => "confirm_first",
        }
    }
}

/// Tier argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    Low,
    Medium,
    High,
}

impl TierArg {
    pub const fn as_config_value(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Valid configuration keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "site_id",
    "api_url",
    "gpsd_addr",
    "enabled",
    "mode",
    "gps_accuracy",
    "sample_interval_secs",
    "zone_refresh_secs",
    "exit_margin_m",
    "audio_quality",
    "notify_sound",
    "notify_vibrate",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_are_valid() {
        assert!(is_valid_config_key("site_id"));
        assert!(is_valid_config_key("exit_margin_m"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn mode_arg_maps_to_config_values() {
        assert_eq!(ModeArg::Automatic.as_config_value(), "automatic");
        assert_eq!(ModeArg::ConfirmFirst.as_config_value(), "confirm_first");
    }
}
