//! Scenario (trial) configuration.
//!
//! One [`ScenarioConfig`] describes the initial parameters of a round. The
//! controller writes it into the State region before a reset and the engine
//! treats it as the authoritative scene description until the next one.

use serde::{Deserialize, Serialize};

use crate::constants::{
    COSINE_ALIGNMENT_TO_WIN, DEFAULT_AMBIENT_BRIGHTNESS, DEFAULT_ANIM_FADE_IN,
    DEFAULT_ANIM_FADE_OUT, DEFAULT_ANIM_STAY_OPEN, DEFAULT_BASE_RADIUS, DEFAULT_COLORS,
    DEFAULT_DECORATIONS_COUNT, DEFAULT_DECORATIONS_SIZE, DEFAULT_HEIGHT,
    DEFAULT_MAIN_SPOTLIGHT_INTENSITY, DEFAULT_MAX_SPOTLIGHT_INTENSITY, DEFAULT_SEED,
    DEFAULT_START_ORIENTATION, DEFAULT_TARGET_INDEX,
};

/// RGBA color, one float per channel.
pub type Rgba = [f32; 4];

/// Scenario (scene generator) variants.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ScenarioType {
    /// First generator.
    #[default]
    Type1 = 0,
    /// Second generator.
    Type2 = 1,
}

impl ScenarioType {
    /// Wire value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decodes a wire value. Unknown values are `None`.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Type1),
            1 => Some(Self::Type2),
            _ => None,
        }
    }
}

impl TryFrom<u32> for ScenarioType {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or_else(|| format!("unknown scenario type {value}"))
    }
}

impl From<ScenarioType> for u32 {
    fn from(value: ScenarioType) -> Self {
        value.as_u32()
    }
}

/// Initial parameters of one round.
///
/// Feed records only need the core fields; every tuning field falls back to
/// the built-in constant when absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scene generator seed.
    pub seed: u64,
    /// Scene generator variant.
    #[serde(alias = "pyramid_type")]
    pub scenario_type: ScenarioType,
    /// Base radius of the target object.
    pub base_radius: f32,
    /// Height of the target object.
    pub height: f32,
    /// Starting orientation (radians).
    #[serde(alias = "start_orient")]
    pub start_orientation: f32,
    /// Index of the face the player must align with.
    #[serde(alias = "target_door")]
    pub target_index: u32,
    /// One RGBA color per face.
    pub colors: [Rgba; 3],

    /// Decorations per face.
    #[serde(default = "default_decorations_count")]
    pub decorations_count: [u32; 3],
    /// Decoration size per face.
    #[serde(default = "default_decorations_size")]
    pub decorations_size: [f32; 3],
    /// Cosine alignment needed to win this round.
    #[serde(default = "default_alignment_threshold", alias = "cosine_alignment_threshold")]
    pub alignment_threshold: f32,
    /// Door animation: fade out (seconds).
    #[serde(default = "default_anim_fade_out", alias = "door_anim_fade_out")]
    pub anim_fade_out: f32,
    /// Door animation: stay open (seconds).
    #[serde(default = "default_anim_stay_open", alias = "door_anim_stay_open")]
    pub anim_stay_open: f32,
    /// Door animation: fade in (seconds).
    #[serde(default = "default_anim_fade_in", alias = "door_anim_fade_in")]
    pub anim_fade_in: f32,
    /// Main spotlight intensity.
    #[serde(default = "default_main_spotlight")]
    pub main_spotlight_intensity: f32,
    /// Ambient brightness.
    #[serde(default = "default_ambient")]
    pub ambient_brightness: f32,
    /// Spotlight intensity ceiling.
    #[serde(default = "default_max_spotlight")]
    pub max_spotlight_intensity: f32,
}

fn default_decorations_count() -> [u32; 3] {
    DEFAULT_DECORATIONS_COUNT
}

fn default_decorations_size() -> [f32; 3] {
    DEFAULT_DECORATIONS_SIZE
}

fn default_alignment_threshold() -> f32 {
    COSINE_ALIGNMENT_TO_WIN
}

fn default_anim_fade_out() -> f32 {
    DEFAULT_ANIM_FADE_OUT
}

fn default_anim_stay_open() -> f32 {
    DEFAULT_ANIM_STAY_OPEN
}

fn default_anim_fade_in() -> f32 {
    DEFAULT_ANIM_FADE_IN
}

fn default_main_spotlight() -> f32 {
    DEFAULT_MAIN_SPOTLIGHT_INTENSITY
}

fn default_ambient() -> f32 {
    DEFAULT_AMBIENT_BRIGHTNESS
}

fn default_max_spotlight() -> f32 {
    DEFAULT_MAX_SPOTLIGHT_INTENSITY
}

impl ScenarioConfig {
    /// The built-in fallback scenario.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            seed: DEFAULT_SEED,
            scenario_type: ScenarioType::Type1,
            base_radius: DEFAULT_BASE_RADIUS,
            height: DEFAULT_HEIGHT,
            start_orientation: DEFAULT_START_ORIENTATION,
            target_index: DEFAULT_TARGET_INDEX,
            colors: DEFAULT_COLORS,
            decorations_count: DEFAULT_DECORATIONS_COUNT,
            decorations_size: DEFAULT_DECORATIONS_SIZE,
            alignment_threshold: COSINE_ALIGNMENT_TO_WIN,
            anim_fade_out: DEFAULT_ANIM_FADE_OUT,
            anim_stay_open: DEFAULT_ANIM_STAY_OPEN,
            anim_fade_in: DEFAULT_ANIM_FADE_IN,
            main_spotlight_intensity: DEFAULT_MAIN_SPOTLIGHT_INTENSITY,
            ambient_brightness: DEFAULT_AMBIENT_BRIGHTNESS,
            max_spotlight_intensity: DEFAULT_MAX_SPOTLIGHT_INTENSITY,
        }
    }

    /// Total door animation length (seconds).
    #[must_use]
    pub fn animation_secs(&self) -> f32 {
        self.anim_fade_out + self.anim_stay_open + self.anim_fade_in
    }

    /// Colors flattened face-major into the 12 floats the wire carries.
    #[must_use]
    pub fn flat_colors(&self) -> [f32; 12] {
        let mut flat = [0.0; 12];
        for (face, color) in self.colors.iter().enumerate() {
            flat[face * 4..face * 4 + 4].copy_from_slice(color);
        }
        flat
    }

    /// Rebuilds the 3 × RGBA matrix from the flattened wire form.
    #[must_use]
    pub fn colors_from_flat(flat: &[f32; 12]) -> [Rgba; 3] {
        let mut colors = [[0.0; 4]; 3];
        for (face, color) in colors.iter_mut().enumerate() {
            color.copy_from_slice(&flat[face * 4..face * 4 + 4]);
        }
        colors
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_record_fills_tuning_defaults() {
        let line = r#"{"seed":7,"pyramid_type":1,"base_radius":3.0,"height":5.0,
            "start_orient":1.25,"target_door":2,
            "colors":[[1,0,0,1],[0,1,0,1],[0,0,1,1]]}"#;
        let config: ScenarioConfig = serde_json::from_str(line).unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.scenario_type, ScenarioType::Type2);
        assert_eq!(config.target_index, 2);
        assert!((config.start_orientation - 1.25).abs() < f32::EPSILON);
        assert_eq!(config.decorations_count, DEFAULT_DECORATIONS_COUNT);
        assert!((config.alignment_threshold - COSINE_ALIGNMENT_TO_WIN).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_scenario_type_is_rejected() {
        let line = r#"{"seed":1,"scenario_type":9,"base_radius":1,"height":1,
            "start_orientation":0,"target_index":0,
            "colors":[[0,0,0,0],[0,0,0,0],[0,0,0,0]]}"#;
        assert!(serde_json::from_str::<ScenarioConfig>(line).is_err());
    }

    #[test]
    fn flat_colors_are_face_major() {
        let config = ScenarioConfig::builtin();
        let flat = config.flat_colors();
        assert_eq!(&flat[4..8], &DEFAULT_COLORS[1]);
        assert_eq!(ScenarioConfig::colors_from_flat(&flat), DEFAULT_COLORS);
    }

    #[test]
    fn animation_length_sums_phases() {
        let config = ScenarioConfig::builtin();
        assert!((config.animation_secs() - 1.5).abs() < 1e-6);
    }
}
