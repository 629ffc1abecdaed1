//! # State Channel
//!
//! Engine → controller frame state, plus the controller's scenario
//! configuration sub-range.
//!
//! ## Ownership
//!
//! ```text
//! configuration fields   written by the controller, read by the engine on reset
//! live fields            written by the engine every frame
//! ```
//!
//! Every access goes through the session's [`OffsetTable`]. A field the
//! table leaves unresolved reads as its default (`false` / `0` / `0.0`) and
//! is never written.

use tether_shared::constants::ALIGNMENT_VALID_LIMIT;
use tether_shared::{ScenarioConfig, ScenarioType};

use crate::codec::{
    decode_bool, decode_f32, decode_f32_array, decode_u32, decode_u32_array, decode_u64,
    encode_bool, encode_f32, encode_f32_slice, encode_u32, encode_u32_slice, encode_u64,
};
use crate::error::{CodecResult, ProtocolResult};
use crate::layout::{OffsetTable, StateField};
use crate::region::Region;

/// Widest single field (the 12-float color block).
const MAX_FIELD_WIDTH: usize = 48;

// =============================================================================
// ALIGNMENT
// =============================================================================

/// Interpretation of the raw alignment field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    /// Sentinel or non-finite: the engine did not evaluate this frame.
    NotEvaluated,
    /// Cosine alignment in the valid window.
    Value(f32),
}

impl Alignment {
    /// Classifies a raw wire value.
    #[must_use]
    pub fn from_raw(raw: f32) -> Self {
        if raw.is_finite() && raw.abs() <= ALIGNMENT_VALID_LIMIT {
            Self::Value(raw)
        } else {
            Self::NotEvaluated
        }
    }

    /// The alignment, if evaluated.
    #[must_use]
    pub const fn value(self) -> Option<f32> {
        match self {
            Self::Value(a) => Some(a),
            Self::NotEvaluated => None,
        }
    }

    /// `threshold < a < ceiling`.
    #[must_use]
    pub fn in_win_band(self, threshold: f32, ceiling: f32) -> bool {
        match self {
            Self::Value(a) => a > threshold && a < ceiling,
            Self::NotEvaluated => false,
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Engine-owned fields.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LiveState {
    /// Frame counter.
    pub frame_number: u64,
    /// Seconds since the round started.
    pub elapsed_secs: f32,
    /// Camera distance.
    pub camera_radius: f32,
    /// Camera position (x, y, z).
    pub camera_position: [f32; 3],
    /// Object rotation.
    pub rotation_angle: f32,
    /// Attempts this round.
    pub attempts: u32,
    /// Raw alignment; see [`Alignment::from_raw`].
    pub alignment: f32,
    /// Current viewing angle.
    pub current_angle: f32,
    /// Win animation running.
    pub is_animating: bool,
    /// Engine's own win flag. Diagnostic only.
    pub has_won: bool,
    /// Seconds at which the round was won.
    pub win_time: f32,
}

/// One decoded read of the whole State region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSnapshot {
    /// Scenario as currently stored in the configuration fields.
    pub scenario: ScenarioConfig,
    /// Engine-owned fields.
    pub live: LiveState,
}

impl StateSnapshot {
    /// Interpreted alignment.
    #[must_use]
    pub fn alignment(&self) -> Alignment {
        Alignment::from_raw(self.live.alignment)
    }

    /// Frame counter.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.live.frame_number
    }
}

// =============================================================================
// FIELD ACCESS
// =============================================================================

struct FieldReader<'a> {
    buf: &'a [u8],
    table: &'a OffsetTable,
}

impl FieldReader<'_> {
    fn read<T: Default>(
        &self,
        field: StateField,
        decode: impl FnOnce(&[u8], usize) -> CodecResult<T>,
    ) -> CodecResult<T> {
        match self.table.offset(field) {
            Some(offset) => decode(self.buf, offset),
            None => Ok(T::default()),
        }
    }

    fn scenario(&self) -> CodecResult<ScenarioConfig> {
        let raw_type = self.read(StateField::ScenarioType, decode_u32)?;
        let scenario_type = ScenarioType::from_u32(raw_type).unwrap_or_else(|| {
            tracing::debug!("Unknown scenario type {} in State region", raw_type);
            ScenarioType::default()
        });
        let flat_colors = self.read(StateField::Colors, decode_f32_array::<12>)?;

        Ok(ScenarioConfig {
            seed: self.read(StateField::Seed, decode_u64)?,
            scenario_type,
            base_radius: self.read(StateField::BaseRadius, decode_f32)?,
            height: self.read(StateField::Height, decode_f32)?,
            start_orientation: self.read(StateField::StartOrientation, decode_f32)?,
            target_index: self.read(StateField::TargetIndex, decode_u32)?,
            colors: ScenarioConfig::colors_from_flat(&flat_colors),
            decorations_count: self.read(StateField::DecorationsCount, decode_u32_array::<3>)?,
            decorations_size: self.read(StateField::DecorationsSize, decode_f32_array::<3>)?,
            alignment_threshold: self.read(StateField::AlignmentThreshold, decode_f32)?,
            anim_fade_out: self.read(StateField::AnimFadeOut, decode_f32)?,
            anim_stay_open: self.read(StateField::AnimStayOpen, decode_f32)?,
            anim_fade_in: self.read(StateField::AnimFadeIn, decode_f32)?,
            main_spotlight_intensity: self.read(StateField::MainSpotlightIntensity, decode_f32)?,
            ambient_brightness: self.read(StateField::AmbientBrightness, decode_f32)?,
            max_spotlight_intensity: self.read(StateField::MaxSpotlightIntensity, decode_f32)?,
        })
    }

    fn live(&self) -> CodecResult<LiveState> {
        Ok(LiveState {
            frame_number: self.read(StateField::FrameNumber, decode_u64)?,
            elapsed_secs: self.read(StateField::ElapsedSecs, decode_f32)?,
            camera_radius: self.read(StateField::CameraRadius, decode_f32)?,
            camera_position: [
                self.read(StateField::CameraX, decode_f32)?,
                self.read(StateField::CameraY, decode_f32)?,
                self.read(StateField::CameraZ, decode_f32)?,
            ],
            rotation_angle: self.read(StateField::RotationAngle, decode_f32)?,
            attempts: self.read(StateField::Attempts, decode_u32)?,
            alignment: self.read(StateField::Alignment, decode_f32)?,
            current_angle: self.read(StateField::CurrentAngle, decode_f32)?,
            is_animating: self.read(StateField::IsAnimating, decode_bool)?,
            has_won: self.read(StateField::HasWon, decode_bool)?,
            win_time: self.read(StateField::WinTime, decode_f32)?,
        })
    }
}

struct FieldWriter<'a, R: Region> {
    region: &'a R,
    table: &'a OffsetTable,
}

impl<R: Region> FieldWriter<'_, R> {
    fn write(
        &self,
        field: StateField,
        encode: impl FnOnce(&mut [u8]) -> CodecResult<()>,
    ) -> ProtocolResult<()> {
        let Some(offset) = self.table.offset(field) else {
            return Ok(());
        };
        let width = field.kind().width();
        let mut scratch = [0u8; MAX_FIELD_WIDTH];
        encode(&mut scratch[..width])?;
        self.region.write(offset, &scratch[..width])?;
        Ok(())
    }

    fn f32(&self, field: StateField, value: f32) -> ProtocolResult<()> {
        self.write(field, |buf| encode_f32(buf, 0, value))
    }

    fn u32(&self, field: StateField, value: u32) -> ProtocolResult<()> {
        self.write(field, |buf| encode_u32(buf, 0, value))
    }

    fn u64(&self, field: StateField, value: u64) -> ProtocolResult<()> {
        self.write(field, |buf| encode_u64(buf, 0, value))
    }

    fn bool(&self, field: StateField, value: bool) -> ProtocolResult<()> {
        self.write(field, |buf| encode_bool(buf, 0, value))
    }

    fn scenario(&self, s: &ScenarioConfig) -> ProtocolResult<()> {
        self.u64(StateField::Seed, s.seed)?;
        self.u32(StateField::ScenarioType, s.scenario_type.as_u32())?;
        self.f32(StateField::BaseRadius, s.base_radius)?;
        self.f32(StateField::Height, s.height)?;
        self.f32(StateField::StartOrientation, s.start_orientation)?;
        self.u32(StateField::TargetIndex, s.target_index)?;
        let flat = s.flat_colors();
        self.write(StateField::Colors, |buf| encode_f32_slice(buf, 0, &flat))?;
        self.write(StateField::DecorationsCount, |buf| {
            encode_u32_slice(buf, 0, &s.decorations_count)
        })?;
        self.write(StateField::DecorationsSize, |buf| {
            encode_f32_slice(buf, 0, &s.decorations_size)
        })?;
        self.f32(StateField::AlignmentThreshold, s.alignment_threshold)?;
        self.f32(StateField::AnimFadeOut, s.anim_fade_out)?;
        self.f32(StateField::AnimStayOpen, s.anim_stay_open)?;
        self.f32(StateField::AnimFadeIn, s.anim_fade_in)?;
        self.f32(StateField::MainSpotlightIntensity, s.main_spotlight_intensity)?;
        self.f32(StateField::AmbientBrightness, s.ambient_brightness)?;
        self.f32(StateField::MaxSpotlightIntensity, s.max_spotlight_intensity)
    }

    fn live(&self, l: &LiveState) -> ProtocolResult<()> {
        self.u64(StateField::FrameNumber, l.frame_number)?;
        self.f32(StateField::ElapsedSecs, l.elapsed_secs)?;
        self.f32(StateField::CameraRadius, l.camera_radius)?;
        self.f32(StateField::CameraX, l.camera_position[0])?;
        self.f32(StateField::CameraY, l.camera_position[1])?;
        self.f32(StateField::CameraZ, l.camera_position[2])?;
        self.f32(StateField::RotationAngle, l.rotation_angle)?;
        self.u32(StateField::Attempts, l.attempts)?;
        self.f32(StateField::Alignment, l.alignment)?;
        self.f32(StateField::CurrentAngle, l.current_angle)?;
        self.bool(StateField::IsAnimating, l.is_animating)?;
        self.bool(StateField::HasWon, l.has_won)?;
        self.f32(StateField::WinTime, l.win_time)
    }
}

// =============================================================================
// CONTROLLER SIDE
// =============================================================================

/// Controller-side view of the State region.
#[derive(Debug)]
pub struct StateChannel<R: Region> {
    region: R,
    table: OffsetTable,
    scratch: Vec<u8>,
}

impl<R: Region> StateChannel<R> {
    /// Wraps an attached State region with the session's resolved table.
    pub fn new(region: R, table: OffsetTable) -> Self {
        let scratch = vec![0u8; table.required_len()];
        Self {
            region,
            table,
            scratch,
        }
    }

    /// The resolved offset table.
    pub const fn table(&self) -> &OffsetTable {
        &self.table
    }

    /// Reads every resolved field in one copy and decodes it.
    ///
    /// # Errors
    ///
    /// The region is smaller than the table requires.
    pub fn snapshot(&mut self) -> ProtocolResult<StateSnapshot> {
        self.region.read(0, &mut self.scratch)?;
        let reader = FieldReader {
            buf: &self.scratch,
            table: &self.table,
        };
        Ok(StateSnapshot {
            scenario: reader.scenario()?,
            live: reader.live()?,
        })
    }

    /// Writes the configuration sub-range. Live fields are untouched.
    ///
    /// # Errors
    ///
    /// A resolved field lies outside the region.
    pub fn write_scenario(&self, scenario: &ScenarioConfig) -> ProtocolResult<()> {
        FieldWriter {
            region: &self.region,
            table: &self.table,
        }
        .scenario(scenario)?;
        tracing::debug!(
            "Wrote scenario seed={} type={:?} target={}",
            scenario.seed,
            scenario.scenario_type,
            scenario.target_index
        );
        Ok(())
    }

    /// Releases the region.
    pub fn into_inner(self) -> R {
        self.region
    }
}

// =============================================================================
// ENGINE SIDE
// =============================================================================

/// Engine-side view of the State region.
#[derive(Debug)]
pub struct StateWriter<R: Region> {
    region: R,
    table: OffsetTable,
    scratch: Vec<u8>,
}

impl<R: Region> StateWriter<R> {
    /// Wraps an attached State region.
    pub fn new(region: R, table: OffsetTable) -> Self {
        let scratch = vec![0u8; table.required_len()];
        Self {
            region,
            table,
            scratch,
        }
    }

    /// Publishes the engine-owned fields.
    ///
    /// # Errors
    ///
    /// A resolved field lies outside the region.
    pub fn publish_live(&self, live: &LiveState) -> ProtocolResult<()> {
        FieldWriter {
            region: &self.region,
            table: &self.table,
        }
        .live(live)
    }

    /// Writes the configuration sub-range (initial defaults before a
    /// controller attaches).
    ///
    /// # Errors
    ///
    /// A resolved field lies outside the region.
    pub fn publish_scenario(&self, scenario: &ScenarioConfig) -> ProtocolResult<()> {
        FieldWriter {
            region: &self.region,
            table: &self.table,
        }
        .scenario(scenario)
    }

    /// Reads the scenario the controller last wrote.
    ///
    /// # Errors
    ///
    /// The region is smaller than the table requires.
    pub fn read_scenario(&mut self) -> ProtocolResult<ScenarioConfig> {
        self.region.read(0, &mut self.scratch)?;
        Ok(FieldReader {
            buf: &self.scratch,
            table: &self.table,
        }
        .scenario()?)
    }
}
