//! Controller configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! tick_rate_hz = 60
//! blank_duration_frames = 60
//! animation_timeout_frames = 300   # 0 waits forever
//! win_policy = "automatic"         # or "on_check"
//! win_band_ceiling = 1.01
//! trials_path = "trials.jsonl"
//! shm_name = "tether"
//!
//! [input]
//! swipe_dead_zone_px = 20.0
//! pinch_dead_zone_px = 15.0
//! tap_max_distance_px = 10.0
//! tap_max_duration_secs = 0.3
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tether_shared::constants::{
    ANIMATION_TIMEOUT_FRAMES, REFRESH_RATE_HZ, WIN_BAND_CEILING, WIN_BLANK_DURATION_FRAMES,
};

use crate::error::ConfigError;
use crate::input::InputConfig;
use crate::sequencer::{SequencerConfig, WinPolicy};

/// Default shared memory name.
pub const DEFAULT_SHM_NAME: &str = "tether";

/// Controller settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Controller tick rate.
    pub tick_rate_hz: u32,
    /// Engine frames the screen stays blank between rounds.
    pub blank_duration_frames: u64,
    /// Engine frames to wait for the win animation; `None` waits forever.
    #[serde(deserialize_with = "zero_disables")]
    pub animation_timeout_frames: Option<u64>,
    /// Win rule.
    pub win_policy: WinPolicy,
    /// Exclusive upper bound of the win band.
    pub win_band_ceiling: f32,
    /// Scenario feed; the built-in scenario when absent.
    pub trials_path: Option<PathBuf>,
    /// Shared memory name for file-mapped regions.
    pub shm_name: String,
    /// Gesture thresholds.
    pub input: InputConfig,
}

fn zero_disables<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let frames = u64::deserialize(deserializer)?;
    Ok((frames > 0).then_some(frames))
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: REFRESH_RATE_HZ,
            blank_duration_frames: WIN_BLANK_DURATION_FRAMES,
            animation_timeout_frames: Some(ANIMATION_TIMEOUT_FRAMES),
            win_policy: WinPolicy::Automatic,
            win_band_ceiling: WIN_BAND_CEILING,
            trials_path: None,
            shm_name: DEFAULT_SHM_NAME.to_string(),
            input: InputConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Invalid TOML or a field of the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        if config.tick_rate_hz == 0 {
            tracing::warn!("tick_rate_hz = 0 is invalid, using {}", REFRESH_RATE_HZ);
            config.tick_rate_hz = REFRESH_RATE_HZ;
        }
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// The file is unreadable or invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded controller config from {}", path.display());
        Ok(config)
    }

    /// Sequencer tuning derived from this config.
    #[must_use]
    pub const fn sequencer(&self) -> SequencerConfig {
        SequencerConfig {
            blank_duration_frames: self.blank_duration_frames,
            animation_timeout_frames: self.animation_timeout_frames,
            win_band_ceiling: self.win_band_ceiling,
            policy: self.win_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = ControllerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.sequencer(), SequencerConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config = ControllerConfig::from_toml_str(
            r#"
            blank_duration_frames = 90
            win_policy = "on_check"
            trials_path = "feeds/lab.jsonl"

            [input]
            swipe_dead_zone_px = 32.0
            "#,
        )
        .unwrap();
        assert_eq!(config.blank_duration_frames, 90);
        assert_eq!(config.win_policy, WinPolicy::OnCheck);
        assert_eq!(config.trials_path, Some(PathBuf::from("feeds/lab.jsonl")));
        assert!((config.input.swipe_dead_zone_px - 32.0).abs() < f32::EPSILON);
        assert!((config.input.pinch_dead_zone_px - 15.0).abs() < f32::EPSILON);
        assert_eq!(config.tick_rate_hz, 60);
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config = ControllerConfig::from_toml_str("animation_timeout_frames = 0").unwrap();
        assert_eq!(config.animation_timeout_frames, None);
        let config = ControllerConfig::from_toml_str("animation_timeout_frames = 45").unwrap();
        assert_eq!(config.animation_timeout_frames, Some(45));
    }

    #[test]
    fn wrong_type_is_an_error() {
        assert!(matches!(
            ControllerConfig::from_toml_str("tick_rate_hz = \"fast\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
