//! # Binary Layout Protocol
//!
//! Where every field lives in the two regions.
//!
//! ## Versions
//!
//! ```text
//! v1 FIXED       offsets from #[repr(C)] Pod structs, compiled in
//! v2 NEGOTIATED  State offsets queried from the engine once at startup
//! ```
//!
//! The Commands region is one byte per flag in wire order in both versions.
//! Negotiation only moves State fields.
//!
//! ## Capability Detection
//!
//! [`LayoutResolver::resolve`] picks the version:
//!
//! - no query provider → v1
//! - query fails → v1 (warn)
//! - required field missing → v1 (warn)
//! - any field past the end of the region → v1 (warn)
//!
//! A rejected negotiation always yields the complete v1 table, never a mix.
//! Optional fields (`has_won`, `rotation_angle`, `win_time`) may be absent
//! from a successful negotiation; they are left unresolved and read as
//! defaults.

use std::collections::HashMap;
use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::codec::{BOOL_WIDTH, F32_WIDTH, U32_WIDTH, U64_WIDTH};
use crate::error::LayoutError;

// =============================================================================
// FIELD DESCRIPTORS
// =============================================================================

/// Wire type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// One byte flag.
    Bool,
    /// Little-endian u32.
    U32,
    /// Two u32 halves, low first.
    U64,
    /// f32 bit pattern.
    F32,
    /// Consecutive f32 values.
    F32Array(usize),
    /// Consecutive u32 values.
    U32Array(usize),
}

impl FieldKind {
    /// Bytes occupied on the wire.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Bool => BOOL_WIDTH,
            Self::U32 => U32_WIDTH,
            Self::U64 => U64_WIDTH,
            Self::F32 => F32_WIDTH,
            Self::F32Array(n) => n * F32_WIDTH,
            Self::U32Array(n) => n * U32_WIDTH,
        }
    }
}

/// One flag in the Commands region, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandField {
    /// Level: rotate counter-clockwise.
    RotateLeft,
    /// Level: rotate clockwise.
    RotateRight,
    /// Level: zoom in.
    ZoomIn,
    /// Level: zoom out.
    ZoomOut,
    /// Edge: player asks for an alignment check.
    CheckAlignment,
    /// Edge: reload the scenario from the State configuration fields.
    Reset,
    /// Edge: toggle the blank screen.
    BlankScreen,
    /// Edge: stop rendering.
    StopRendering,
    /// Edge: resume rendering.
    ResumeRendering,
    /// Edge: start the win animation.
    AnimationTrigger,
}

impl CommandField {
    /// Number of flags.
    pub const COUNT: usize = 10;

    /// Every flag in wire order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::RotateLeft,
        Self::RotateRight,
        Self::ZoomIn,
        Self::ZoomOut,
        Self::CheckAlignment,
        Self::Reset,
        Self::BlankScreen,
        Self::StopRendering,
        Self::ResumeRendering,
        Self::AnimationTrigger,
    ];

    /// Wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RotateLeft => "rotate_left",
            Self::RotateRight => "rotate_right",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::CheckAlignment => "check_alignment",
            Self::Reset => "reset",
            Self::BlankScreen => "blank_screen",
            Self::StopRendering => "stop_rendering",
            Self::ResumeRendering => "resume_rendering",
            Self::AnimationTrigger => "animation_trigger",
        }
    }

    /// Edge fields are true for at most one publish.
    #[must_use]
    pub const fn is_edge(self) -> bool {
        !matches!(
            self,
            Self::RotateLeft | Self::RotateRight | Self::ZoomIn | Self::ZoomOut
        )
    }

    /// Byte offset in the Commands region. Same in every layout version.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::RotateLeft => offset_of!(CommandsLayoutV1, rotate_left),
            Self::RotateRight => offset_of!(CommandsLayoutV1, rotate_right),
            Self::ZoomIn => offset_of!(CommandsLayoutV1, zoom_in),
            Self::ZoomOut => offset_of!(CommandsLayoutV1, zoom_out),
            Self::CheckAlignment => offset_of!(CommandsLayoutV1, check_alignment),
            Self::Reset => offset_of!(CommandsLayoutV1, reset),
            Self::BlankScreen => offset_of!(CommandsLayoutV1, blank_screen),
            Self::StopRendering => offset_of!(CommandsLayoutV1, stop_rendering),
            Self::ResumeRendering => offset_of!(CommandsLayoutV1, resume_rendering),
            Self::AnimationTrigger => offset_of!(CommandsLayoutV1, animation_trigger),
        }
    }
}

/// One field in the State region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    // Configuration sub-range (controller writes)
    /// Scene generator seed.
    Seed,
    /// Scene generator variant.
    ScenarioType,
    /// Base radius.
    BaseRadius,
    /// Height.
    Height,
    /// Starting orientation.
    StartOrientation,
    /// Target face.
    TargetIndex,
    /// 3 × RGBA.
    Colors,
    /// Decorations per face.
    DecorationsCount,
    /// Decoration size per face.
    DecorationsSize,
    /// Per-trial win threshold.
    AlignmentThreshold,
    /// Animation fade-out seconds.
    AnimFadeOut,
    /// Animation stay-open seconds.
    AnimStayOpen,
    /// Animation fade-in seconds.
    AnimFadeIn,
    /// Main spotlight intensity.
    MainSpotlightIntensity,
    /// Ambient brightness.
    AmbientBrightness,
    /// Spotlight ceiling.
    MaxSpotlightIntensity,

    // Live sub-range (engine writes)
    /// Frame counter.
    FrameNumber,
    /// Seconds since the round started.
    ElapsedSecs,
    /// Camera distance.
    CameraRadius,
    /// Camera x.
    CameraX,
    /// Camera y.
    CameraY,
    /// Camera z.
    CameraZ,
    /// Object rotation (optional in v2).
    RotationAngle,
    /// Attempts this round.
    Attempts,
    /// Cosine alignment, or a sentinel.
    Alignment,
    /// Current viewing angle.
    CurrentAngle,
    /// Win animation running.
    IsAnimating,
    /// Engine's own win flag (optional in v2, diagnostic only).
    HasWon,
    /// Seconds at which the round was won (optional in v2).
    WinTime,
}

impl StateField {
    /// Number of fields.
    pub const COUNT: usize = 29;

    /// Every field in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Seed,
        Self::ScenarioType,
        Self::BaseRadius,
        Self::Height,
        Self::StartOrientation,
        Self::TargetIndex,
        Self::Colors,
        Self::DecorationsCount,
        Self::DecorationsSize,
        Self::AlignmentThreshold,
        Self::AnimFadeOut,
        Self::AnimStayOpen,
        Self::AnimFadeIn,
        Self::MainSpotlightIntensity,
        Self::AmbientBrightness,
        Self::MaxSpotlightIntensity,
        Self::FrameNumber,
        Self::ElapsedSecs,
        Self::CameraRadius,
        Self::CameraX,
        Self::CameraY,
        Self::CameraZ,
        Self::RotationAngle,
        Self::Attempts,
        Self::Alignment,
        Self::CurrentAngle,
        Self::IsAnimating,
        Self::HasWon,
        Self::WinTime,
    ];

    /// Position in [`StateField::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Key used by the engine's offset query.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::ScenarioType => "scenario_type",
            Self::BaseRadius => "base_radius",
            Self::Height => "height",
            Self::StartOrientation => "start_orientation",
            Self::TargetIndex => "target_index",
            Self::Colors => "colors",
            Self::DecorationsCount => "decorations_count",
            Self::DecorationsSize => "decorations_size",
            Self::AlignmentThreshold => "alignment_threshold",
            Self::AnimFadeOut => "anim_fade_out",
            Self::AnimStayOpen => "anim_stay_open",
            Self::AnimFadeIn => "anim_fade_in",
            Self::MainSpotlightIntensity => "main_spotlight_intensity",
            Self::AmbientBrightness => "ambient_brightness",
            Self::MaxSpotlightIntensity => "max_spotlight_intensity",
            Self::FrameNumber => "frame_number",
            Self::ElapsedSecs => "elapsed_secs",
            Self::CameraRadius => "camera_radius",
            Self::CameraX => "camera_x",
            Self::CameraY => "camera_y",
            Self::CameraZ => "camera_z",
            Self::RotationAngle => "rotation_angle",
            Self::Attempts => "attempts",
            Self::Alignment => "alignment",
            Self::CurrentAngle => "current_angle",
            Self::IsAnimating => "is_animating",
            Self::HasWon => "has_won",
            Self::WinTime => "win_time",
        }
    }

    /// Wire type.
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::Seed | Self::FrameNumber => FieldKind::U64,
            Self::ScenarioType | Self::TargetIndex | Self::Attempts => FieldKind::U32,
            Self::Colors => FieldKind::F32Array(12),
            Self::DecorationsCount => FieldKind::U32Array(3),
            Self::DecorationsSize => FieldKind::F32Array(3),
            Self::IsAnimating | Self::HasWon => FieldKind::Bool,
            _ => FieldKind::F32,
        }
    }

    /// A negotiated table lacking this field is rejected.
    #[must_use]
    pub const fn is_required(self) -> bool {
        !matches!(self, Self::HasWon | Self::RotationAngle | Self::WinTime)
    }

    /// Part of the controller-owned configuration sub-range.
    #[must_use]
    pub const fn is_config(self) -> bool {
        self.index() < Self::FrameNumber.index()
    }

    /// Offset in the fixed v1 layout.
    #[must_use]
    pub const fn fixed_offset(self) -> usize {
        match self {
            Self::Seed => offset_of!(StateLayoutV1, seed),
            Self::ScenarioType => offset_of!(StateLayoutV1, scenario_type),
            Self::BaseRadius => offset_of!(StateLayoutV1, base_radius),
            Self::Height => offset_of!(StateLayoutV1, height),
            Self::StartOrientation => offset_of!(StateLayoutV1, start_orientation),
            Self::TargetIndex => offset_of!(StateLayoutV1, target_index),
            Self::Colors => offset_of!(StateLayoutV1, colors),
            Self::DecorationsCount => offset_of!(StateLayoutV1, decorations_count),
            Self::DecorationsSize => offset_of!(StateLayoutV1, decorations_size),
            Self::AlignmentThreshold => offset_of!(StateLayoutV1, alignment_threshold),
            Self::AnimFadeOut => offset_of!(StateLayoutV1, anim_fade_out),
            Self::AnimStayOpen => offset_of!(StateLayoutV1, anim_stay_open),
            Self::AnimFadeIn => offset_of!(StateLayoutV1, anim_fade_in),
            Self::MainSpotlightIntensity => offset_of!(StateLayoutV1, main_spotlight_intensity),
            Self::AmbientBrightness => offset_of!(StateLayoutV1, ambient_brightness),
            Self::MaxSpotlightIntensity => offset_of!(StateLayoutV1, max_spotlight_intensity),
            Self::FrameNumber => offset_of!(StateLayoutV1, frame_number),
            Self::ElapsedSecs => offset_of!(StateLayoutV1, elapsed_secs),
            Self::CameraRadius => offset_of!(StateLayoutV1, camera_radius),
            Self::CameraX => offset_of!(StateLayoutV1, camera_x),
            Self::CameraY => offset_of!(StateLayoutV1, camera_y),
            Self::CameraZ => offset_of!(StateLayoutV1, camera_z),
            Self::RotationAngle => offset_of!(StateLayoutV1, rotation_angle),
            Self::Attempts => offset_of!(StateLayoutV1, attempts),
            Self::Alignment => offset_of!(StateLayoutV1, alignment),
            Self::CurrentAngle => offset_of!(StateLayoutV1, current_angle),
            Self::IsAnimating => offset_of!(StateLayoutV1, is_animating),
            Self::HasWon => offset_of!(StateLayoutV1, has_won),
            Self::WinTime => offset_of!(StateLayoutV1, win_time),
        }
    }
}

// =============================================================================
// FIXED LAYOUT (v1)
// =============================================================================

/// Commands region, v1. One byte per flag.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct CommandsLayoutV1 {
    pub rotate_left: u8,
    pub rotate_right: u8,
    pub zoom_in: u8,
    pub zoom_out: u8,
    pub check_alignment: u8,
    pub reset: u8,
    pub blank_screen: u8,
    pub stop_rendering: u8,
    pub resume_rendering: u8,
    pub animation_trigger: u8,
    pub _pad: [u8; 6],
}

/// State region, v1.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct StateLayoutV1 {
    // Configuration
    pub seed: u64,
    pub scenario_type: u32,
    pub base_radius: f32,
    pub height: f32,
    pub start_orientation: f32,
    pub target_index: u32,
    pub colors: [f32; 12],
    pub decorations_count: [u32; 3],
    pub decorations_size: [f32; 3],
    pub alignment_threshold: f32,
    pub anim_fade_out: f32,
    pub anim_stay_open: f32,
    pub anim_fade_in: f32,
    pub main_spotlight_intensity: f32,
    pub ambient_brightness: f32,
    pub max_spotlight_intensity: f32,
    // Live
    pub frame_number: u64,
    pub elapsed_secs: f32,
    pub camera_radius: f32,
    pub camera_x: f32,
    pub camera_y: f32,
    pub camera_z: f32,
    pub rotation_angle: f32,
    pub attempts: u32,
    pub alignment: f32,
    pub current_angle: f32,
    pub is_animating: u8,
    pub has_won: u8,
    pub _pad: [u8; 2],
    pub win_time: f32,
    pub _pad_tail: [u8; 4],
}

/// Minimum Commands region size.
pub const COMMANDS_REGION_LEN: usize = size_of::<CommandsLayoutV1>();

/// Minimum State region size.
pub const STATE_REGION_LEN: usize = size_of::<StateLayoutV1>();

const _: () = assert!(COMMANDS_REGION_LEN == 16);
const _: () = assert!(STATE_REGION_LEN == 184);
const _: () = assert!(offset_of!(StateLayoutV1, frame_number) == 128);
const _: () = assert!(offset_of!(StateLayoutV1, win_time) == 176);

// =============================================================================
// OFFSET TABLE
// =============================================================================

/// Which layout a session runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutVersion {
    /// Compiled-in offsets.
    Fixed,
    /// Offsets reported by the engine.
    Negotiated,
}

/// Resolved State offsets. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetTable {
    version: LayoutVersion,
    offsets: [Option<usize>; StateField::COUNT],
}

impl OffsetTable {
    /// The complete v1 table.
    #[must_use]
    pub fn fixed() -> Self {
        let mut offsets = [None; StateField::COUNT];
        for field in StateField::ALL {
            offsets[field.index()] = Some(field.fixed_offset());
        }
        Self {
            version: LayoutVersion::Fixed,
            offsets,
        }
    }

    /// Layout version this table came from.
    #[must_use]
    pub const fn version(&self) -> LayoutVersion {
        self.version
    }

    /// Offset of a field, `None` if unresolved.
    #[must_use]
    pub const fn offset(&self, field: StateField) -> Option<usize> {
        self.offsets[field.index()]
    }

    /// Whether a field is readable.
    #[must_use]
    pub const fn is_resolved(&self, field: StateField) -> bool {
        self.offsets[field.index()].is_some()
    }

    /// Smallest State region that holds every resolved field.
    #[must_use]
    pub fn required_len(&self) -> usize {
        StateField::ALL
            .iter()
            .filter_map(|f| self.offset(*f).map(|off| off + f.kind().width()))
            .max()
            .unwrap_or(0)
    }
}

impl Default for OffsetTable {
    fn default() -> Self {
        Self::fixed()
    }
}

// =============================================================================
// NEGOTIATION
// =============================================================================

/// Field name → byte offset, as reported by the engine.
pub type OffsetMap = HashMap<String, usize>;

/// Engine-side capability: report where State fields live.
pub trait OffsetQuery {
    /// Returns the engine's offset map.
    ///
    /// # Errors
    ///
    /// Any error means "not supported"; the resolver falls back to v1.
    fn state_offsets(&self) -> Result<OffsetMap, LayoutError>;
}

impl<F> OffsetQuery for F
where
    F: Fn() -> Result<OffsetMap, LayoutError>,
{
    fn state_offsets(&self) -> Result<OffsetMap, LayoutError> {
        self()
    }
}

impl OffsetTable {
    /// The v1 table expressed as an engine would report it.
    #[must_use]
    pub fn fixed_offset_map() -> OffsetMap {
        StateField::ALL
            .iter()
            .map(|f| (f.name().to_string(), f.fixed_offset()))
            .collect()
    }
}

/// Picks the layout version for a session.
#[derive(Clone, Copy, Debug)]
pub struct LayoutResolver {
    state_len: usize,
}

impl LayoutResolver {
    /// Resolver for a State region of `state_len` bytes.
    #[must_use]
    pub const fn new(state_len: usize) -> Self {
        Self { state_len }
    }

    /// Resolves the offset table. Never fails: every rejection falls back
    /// to the complete v1 table.
    #[must_use]
    pub fn resolve(&self, query: Option<&dyn OffsetQuery>) -> OffsetTable {
        let Some(query) = query else {
            tracing::info!("No offset query available, using fixed layout v1");
            return OffsetTable::fixed();
        };

        match self.negotiate(query) {
            Ok(table) => {
                let unresolved: Vec<&str> = StateField::ALL
                    .iter()
                    .filter(|f| !table.is_resolved(**f))
                    .map(|f| f.name())
                    .collect();
                tracing::info!(
                    "Negotiated layout v2 ({} unresolved optional fields: {:?})",
                    unresolved.len(),
                    unresolved
                );
                table
            }
            Err(e) => {
                tracing::warn!("Layout negotiation rejected ({}), falling back to fixed layout v1", e);
                OffsetTable::fixed()
            }
        }
    }

    /// Builds a v2 table from the engine's answer.
    ///
    /// # Errors
    ///
    /// Returns the first reason the answer cannot be used as-is.
    pub fn negotiate(&self, query: &dyn OffsetQuery) -> Result<OffsetTable, LayoutError> {
        let reported = query.state_offsets()?;
        let mut offsets = [None; StateField::COUNT];

        for field in StateField::ALL {
            match reported.get(field.name()) {
                Some(&offset) => {
                    let width = field.kind().width();
                    let fits = offset
                        .checked_add(width)
                        .is_some_and(|end| end <= self.state_len);
                    if !fits {
                        return Err(LayoutError::OffsetOutOfBounds {
                            field: field.name(),
                            offset,
                            width,
                            len: self.state_len,
                        });
                    }
                    offsets[field.index()] = Some(offset);
                }
                None if field.is_required() => {
                    return Err(LayoutError::MissingField(field.name()));
                }
                None => {}
            }
        }

        Ok(OffsetTable {
            version: LayoutVersion::Negotiated,
            offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_offsets_match_struct_layout() {
        assert_eq!(StateField::Seed.fixed_offset(), 0);
        assert_eq!(StateField::ScenarioType.fixed_offset(), 8);
        assert_eq!(StateField::Colors.fixed_offset(), 28);
        assert_eq!(StateField::DecorationsCount.fixed_offset(), 76);
        assert_eq!(StateField::FrameNumber.fixed_offset(), 128);
        assert_eq!(StateField::Alignment.fixed_offset(), 164);
        assert_eq!(StateField::IsAnimating.fixed_offset(), 172);
        assert_eq!(StateField::HasWon.fixed_offset(), 173);
        assert_eq!(OffsetTable::fixed().required_len(), 180);
    }

    #[test]
    fn command_offsets_follow_wire_order() {
        for (i, field) in CommandField::ALL.iter().enumerate() {
            assert_eq!(field.offset(), i);
        }
        assert!(!CommandField::ZoomOut.is_edge());
        assert!(CommandField::CheckAlignment.is_edge());
    }

    #[test]
    fn table_order_matches_index() {
        for (i, field) in StateField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert!(StateField::MaxSpotlightIntensity.is_config());
        assert!(!StateField::FrameNumber.is_config());
    }

    #[test]
    fn no_query_yields_fixed() {
        let table = LayoutResolver::new(STATE_REGION_LEN).resolve(None);
        assert_eq!(table, OffsetTable::fixed());
    }

    #[test]
    fn failing_query_yields_fixed() {
        let query = || -> Result<OffsetMap, LayoutError> {
            Err(LayoutError::QueryUnavailable("not exported".into()))
        };
        let table = LayoutResolver::new(STATE_REGION_LEN).resolve(Some(&query));
        assert_eq!(table.version(), LayoutVersion::Fixed);
        assert_eq!(table, OffsetTable::fixed());
    }

    #[test]
    fn missing_required_field_yields_complete_fixed_table() {
        let query = || -> Result<OffsetMap, LayoutError> {
            let mut map = OffsetTable::fixed_offset_map();
            map.remove("alignment");
            // Shift something so a mixed table would be detectable.
            map.insert("camera_x".into(), 0);
            Ok(map)
        };
        let resolver = LayoutResolver::new(STATE_REGION_LEN);
        assert_eq!(
            resolver.negotiate(&query),
            Err(LayoutError::MissingField("alignment"))
        );
        assert_eq!(resolver.resolve(Some(&query)), OffsetTable::fixed());
    }

    #[test]
    fn offset_past_region_is_rejected() {
        let query = || -> Result<OffsetMap, LayoutError> {
            let mut map = OffsetTable::fixed_offset_map();
            map.insert("frame_number".into(), STATE_REGION_LEN - 4);
            Ok(map)
        };
        let resolver = LayoutResolver::new(STATE_REGION_LEN);
        assert!(matches!(
            resolver.negotiate(&query),
            Err(LayoutError::OffsetOutOfBounds { field: "frame_number", .. })
        ));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let query = || -> Result<OffsetMap, LayoutError> {
            let mut map = OffsetTable::fixed_offset_map();
            map.remove("has_won");
            map.remove("win_time");
            map.insert("alignment".into(), 180);
            Ok(map)
        };
        let table = LayoutResolver::new(STATE_REGION_LEN).resolve(Some(&query));
        assert_eq!(table.version(), LayoutVersion::Negotiated);
        assert!(!table.is_resolved(StateField::HasWon));
        assert!(!table.is_resolved(StateField::WinTime));
        assert!(table.is_resolved(StateField::RotationAngle));
        assert_eq!(table.offset(StateField::Alignment), Some(180));
    }
}
