//! # Boundary Constants
//!
//! Values both the engine and the controller bake in.
//!
//! **CRITICAL:** Timing and threshold values here define the protocol.
//! Changing them on one side only desynchronizes the win sequence.

// =============================================================================
// TIMING
// =============================================================================

/// Engine and controller nominal tick rate (Hz).
pub const REFRESH_RATE_HZ: u32 = 60;

/// Frames the output stays blank after a won round.
///
/// Counted on the engine's frame counter, never on wall-clock time.
pub const WIN_BLANK_DURATION_FRAMES: u64 = 60;

/// Frames the controller waits for the win animation before declaring
/// the engine desynchronized. `None` in the config disables the bound.
pub const ANIMATION_TIMEOUT_FRAMES: u64 = 300;

/// Converts an engine frame count into approximate seconds.
#[must_use]
pub fn frames_to_seconds(frames: u64) -> f32 {
    frames as f32 / REFRESH_RATE_HZ as f32
}

/// Converts seconds into engine frames (truncating).
#[must_use]
pub fn seconds_to_frames(seconds: f32) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * REFRESH_RATE_HZ as f32) as u64
}

// =============================================================================
// ALIGNMENT
// =============================================================================

/// Default cosine alignment a round needs to count as won (~18 degrees).
pub const COSINE_ALIGNMENT_TO_WIN: f32 = 0.95;

/// Upper guard of the win band. Cosines never exceed 1.0, so anything at or
/// above this ceiling is garbage rather than a perfect match.
pub const WIN_BAND_CEILING: f32 = 1.01;

/// Alignment values outside `[-ALIGNMENT_VALID_LIMIT, ALIGNMENT_VALID_LIMIT]`
/// are sentinels meaning "not evaluated this frame".
pub const ALIGNMENT_VALID_LIMIT: f32 = 1.5;

/// Sentinel the engine publishes when no alignment was computed.
pub const ALIGNMENT_SENTINEL: f32 = 2.0;

// =============================================================================
// SCENARIO DEFAULTS
// =============================================================================

/// Seed of the built-in scenario.
pub const DEFAULT_SEED: u64 = 69;

/// Base radius of the built-in scenario.
pub const DEFAULT_BASE_RADIUS: f32 = 2.5;

/// Height of the built-in scenario.
pub const DEFAULT_HEIGHT: f32 = 4.0;

/// Starting orientation of the built-in scenario (radians).
pub const DEFAULT_START_ORIENTATION: f32 = 0.0;

/// Target face of the built-in scenario.
pub const DEFAULT_TARGET_INDEX: u32 = 0;

/// Face colors of the built-in scenario (RGBA).
pub const DEFAULT_COLORS: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
];

/// Decorations per face.
pub const DEFAULT_DECORATIONS_COUNT: [u32; 3] = [50, 20, 10];

/// Decoration size per face.
pub const DEFAULT_DECORATIONS_SIZE: [f32; 3] = [0.1, 0.2, 0.3];

/// Door animation: fade out (seconds).
pub const DEFAULT_ANIM_FADE_OUT: f32 = 0.5;

/// Door animation: stay open (seconds).
pub const DEFAULT_ANIM_STAY_OPEN: f32 = 0.5;

/// Door animation: fade in (seconds).
pub const DEFAULT_ANIM_FADE_IN: f32 = 0.5;

/// Main spotlight intensity.
pub const DEFAULT_MAIN_SPOTLIGHT_INTENSITY: f32 = 5_000_000.0;

/// Global ambient brightness.
pub const DEFAULT_AMBIENT_BRIGHTNESS: f32 = 200.0;

/// Spotlight intensity ceiling.
pub const DEFAULT_MAX_SPOTLIGHT_INTENSITY: f32 = 1_000_000.0;

// =============================================================================
// INPUT
// =============================================================================

/// Horizontal pointer travel (pixels) before a swipe rotates.
pub const SWIPE_DEAD_ZONE_PX: f32 = 20.0;

/// Change in two-contact separation (pixels) before a pinch zooms.
pub const PINCH_DEAD_ZONE_PX: f32 = 15.0;

/// A release further than this from the start point is not a tap.
pub const TAP_MAX_DISTANCE_PX: f32 = 10.0;

/// A contact held longer than this is not a tap.
pub const TAP_MAX_DURATION_SECS: f32 = 0.3;
