//! Engine configuration value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::engine::DEFAULT_EXIT_MARGIN_M;
use crate::domain::error::{InvalidModeError, InvalidTierError};

/// How zone entries become recordings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Entering a zone starts recording immediately
    #[default]
    Automatic,
    /// Entering a zone prompts for an explicit accept/decline first
    ConfirmFirst,
}

impl OperatingMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::ConfirmFirst => "confirm_first",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = InvalidModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automatic" => Ok(Self::Automatic),
            "confirm_first" => Ok(Self::ConfirmFirst),
            _ => Err(InvalidModeError {
                input: s.to_string(),
            }),
        }
    }
}

/// Polling/accuracy trade-off for the location stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsAccuracyTier {
    Low,
    #[default]
    Medium,
    High,
}

impl GpsAccuracyTier {
    /// How often the location source is polled at this tier
    pub const fn poll_interval_secs(&self) -> u64 {
        match self {
            Self::Low => 10,
            Self::Medium => 5,
            Self::High => 1,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for GpsAccuracyTier {
    type Err = InvalidTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(InvalidTierError {
                input: s.to_string(),
            }),
        }
    }
}

/// Capture fidelity trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioQualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl AudioQualityTier {
    /// Target sample rate for the encoded artifact
    pub const fn sample_rate(&self) -> u32 {
        match self {
            Self::Low => 8_000,
            Self::Medium => 16_000,
            Self::High => 44_100,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for AudioQualityTier {
    type Err = InvalidTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(InvalidTierError {
                input: s.to_string(),
            }),
        }
    }
}

/// Engine configuration.
/// All fields are optional to support partial configs and merging; the
/// engine reads resolved values through the `*_or_default` accessors at
/// each decision point. A config change never interrupts an open session,
/// it only affects future decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub site_id: Option<String>,
    pub api_url: Option<String>,
    pub gpsd_addr: Option<String>,
    pub enabled: Option<bool>,
    pub mode: Option<String>,
    pub gps_accuracy: Option<String>,
    pub sample_interval_secs: Option<u64>,
    pub zone_refresh_secs: Option<u64>,
    pub exit_margin_m: Option<f64>,
    pub audio_quality: Option<String>,
    pub notify_sound: Option<bool>,
    pub notify_vibrate: Option<bool>,
}

impl EngineConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            site_id: None,
            api_url: None,
            gpsd_addr: Some("127.0.0.1:2947".to_string()),
            enabled: Some(true),
            mode: Some("automatic".to_string()),
            gps_accuracy: Some("medium".to_string()),
            sample_interval_secs: Some(5),
            zone_refresh_secs: Some(300),
            exit_margin_m: Some(DEFAULT_EXIT_MARGIN_M),
            audio_quality: Some("medium".to_string()),
            notify_sound: Some(true),
            notify_vibrate: Some(false),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            site_id: other.site_id.or(self.site_id),
            api_url: other.api_url.or(self.api_url),
            gpsd_addr: other.gpsd_addr.or(self.gpsd_addr),
            enabled: other.enabled.or(self.enabled),
            mode: other.mode.or(self.mode),
            gps_accuracy: other.gps_accuracy.or(self.gps_accuracy),
            sample_interval_secs: other.sample_interval_secs.or(self.sample_interval_secs),
            zone_refresh_secs: other.zone_refresh_secs.or(self.zone_refresh_secs),
            exit_margin_m: other.exit_margin_m.or(self.exit_margin_m),
            audio_quality: other.audio_quality.or(self.audio_quality),
            notify_sound: other.notify_sound.or(self.notify_sound),
            notify_vibrate: other.notify_vibrate.or(self.notify_vibrate),
        }
    }

    pub fn enabled_or_default(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn mode_or_default(&self) -> OperatingMode {
        self.mode
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn gps_accuracy_or_default(&self) -> GpsAccuracyTier {
        self.gps_accuracy
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn sample_interval_secs_or_default(&self) -> u64 {
        self.sample_interval_secs.unwrap_or(5)
    }

    pub fn zone_refresh_secs_or_default(&self) -> u64 {
        self.zone_refresh_secs.unwrap_or(300)
    }

    pub fn exit_margin_or_default(&self) -> f64 {
        self.exit_margin_m.unwrap_or(DEFAULT_EXIT_MARGIN_M)
    }

    pub fn audio_quality_or_default(&self) -> AudioQualityTier {
        self.audio_quality
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn notify_sound_or_default(&self) -> bool {
        self.notify_sound.unwrap_or(true)
    }

    pub fn notify_vibrate_or_default(&self) -> bool {
        self.notify_vibrate.unwrap_or(false)
    }

    pub fn gpsd_addr_or_default(&self) -> &str {
        self.gpsd_addr.as_deref().unwrap_or("127.0.0.1:2947")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = EngineConfig::defaults();
        assert!(config.site_id.is_none());
        assert_eq!(config.mode, Some("automatic".to_string()));
        assert_eq!(config.gps_accuracy, Some("medium".to_string()));
        assert_eq!(config.sample_interval_secs, Some(5));
        assert_eq!(config.zone_refresh_secs, Some(300));
        assert_eq!(config.exit_margin_m, Some(10.0));
        assert_eq!(config.notify_sound, Some(true));
        assert_eq!(config.notify_vibrate, Some(false));
    }

    #[test]
    fn empty_has_all_none() {
        let config = EngineConfig::empty();
        assert!(config.site_id.is_none());
        assert!(config.mode.is_none());
        assert!(config.enabled.is_none());
        assert!(config.exit_margin_m.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = EngineConfig {
            site_id: Some("site-1".to_string()),
            mode: Some("automatic".to_string()),
            sample_interval_secs: Some(5),
            ..Default::default()
        };

        let other = EngineConfig {
            site_id: Some("site-2".to_string()),
            mode: None, // Should not override
            sample_interval_secs: Some(2),
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.site_id, Some("site-2".to_string()));
        assert_eq!(merged.mode, Some("automatic".to_string())); // Kept from base
        assert_eq!(merged.sample_interval_secs, Some(2));
    }

    #[test]
    fn merge_preserves_base_when_other_is_none() {
        let base = EngineConfig {
            api_url: Some("https://api.example.com".to_string()),
            notify_sound: Some(false),
            ..Default::default()
        };

        let merged = base.merge(EngineConfig::empty());

        assert_eq!(merged.api_url, Some("https://api.example.com".to_string()));
        assert_eq!(merged.notify_sound, Some(false));
    }

    #[test]
    fn mode_or_default_parses() {
        let config = EngineConfig {
            mode: Some("confirm_first".to_string()),
            ..Default::default()
        };
        assert_eq!(config.mode_or_default(), OperatingMode::ConfirmFirst);
    }

    #[test]
    fn mode_or_default_uses_default_on_invalid() {
        let config = EngineConfig {
            mode: Some("invalid".to_string()),
            ..Default::default()
        };
        assert_eq!(config.mode_or_default(), OperatingMode::Automatic);
    }

    #[test]
    fn tier_accessors() {
        let config = EngineConfig {
            gps_accuracy: Some("high".to_string()),
            audio_quality: Some("low".to_string()),
            ..Default::default()
        };
        assert_eq!(config.gps_accuracy_or_default(), GpsAccuracyTier::High);
        assert_eq!(config.audio_quality_or_default(), AudioQualityTier::Low);
    }

    #[test]
    fn tier_trade_offs() {
        assert_eq!(GpsAccuracyTier::Low.poll_interval_secs(), 10);
        assert_eq!(GpsAccuracyTier::High.poll_interval_secs(), 1);
        assert_eq!(AudioQualityTier::Low.sample_rate(), 8_000);
        assert_eq!(AudioQualityTier::Medium.sample_rate(), 16_000);
        assert_eq!(AudioQualityTier::High.sample_rate(), 44_100);
    }

    #[test]
    fn boolean_defaults() {
        let config = EngineConfig::empty();
        assert!(config.enabled_or_default());
        assert!(config.notify_sound_or_default());
        assert!(!config.notify_vibrate_or_default());
    }

    #[test]
    fn exit_margin_defaults_to_ten_meters() {
        assert_eq!(EngineConfig::empty().exit_margin_or_default(), 10.0);
    }

    #[test]
    fn mode_parse_error_lists_valid_values() {
        let err = "sometimes".parse::<OperatingMode>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("automatic"));
        assert!(msg.contains("confirm_first"));
    }
}
