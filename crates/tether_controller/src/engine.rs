//! # Headless Engine
//!
//! A deterministic stand-in for the real engine, driven one frame at a
//! time. It honours the engine half of the protocol and renders nothing.
//!
//! ## Per Frame
//!
//! 1. Consume commands (edges swap back to zero)
//! 2. Apply rendering/blank/reset/animation edges
//! 3. Rotate and zoom from level flags while rendering
//! 4. Publish live fields, frame counter last
//!
//! The frame counter keeps advancing while rendering is stopped, so blank
//! durations counted in engine frames still elapse.

use std::f32::consts::TAU;

use tether_protocol::{
    CommandReader, LayoutError, LiveState, OffsetMap, OffsetQuery, OffsetTable, ProtocolResult,
    Region, SharedMemory, StateField, StateWriter,
};
use tether_shared::constants::{
    frames_to_seconds, seconds_to_frames, ALIGNMENT_SENTINEL, WIN_BAND_CEILING,
};
use tether_shared::ScenarioConfig;

/// Headless engine tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadlessEngineConfig {
    /// Rotation per frame while a rotate flag is held (radians).
    pub rotation_per_frame: f32,
    /// Camera radius change per frame while a zoom flag is held.
    pub zoom_per_frame: f32,
    /// Camera radius bounds.
    pub camera_radius_range: (f32, f32),
    /// Fixed animation length; `None` derives it from the scenario.
    pub animation_frames: Option<u64>,
    /// Answer the offset query (v2). `false` behaves like a v1-only engine.
    pub export_offsets: bool,
}

impl Default for HeadlessEngineConfig {
    fn default() -> Self {
        Self {
            rotation_per_frame: 0.05,
            zoom_per_frame: 0.1,
            camera_radius_range: (2.0, 50.0),
            animation_frames: None,
            export_offsets: true,
        }
    }
}

/// The headless engine.
#[derive(Debug)]
pub struct HeadlessEngine<R: Region> {
    config: HeadlessEngineConfig,
    commands: CommandReader<R>,
    state: StateWriter<R>,
    table: OffsetTable,
    scenario: ScenarioConfig,
    live: LiveState,
    rendering: bool,
    blanked: bool,
    animation_frames_left: u64,
    resets: u64,
}

impl<R: Region> HeadlessEngine<R> {
    /// Takes over the engine side of `memory`, writes the built-in scenario
    /// and publishes an initial frame.
    ///
    /// # Errors
    ///
    /// The State region cannot hold `table`.
    pub fn new(
        memory: SharedMemory<R>,
        table: OffsetTable,
        config: HeadlessEngineConfig,
    ) -> ProtocolResult<Self> {
        let (commands, state) = memory.into_parts();
        let scenario = ScenarioConfig::builtin();
        let state = StateWriter::new(state, table.clone());
        state.publish_scenario(&scenario)?;

        let mut engine = Self {
            config,
            commands: CommandReader::new(commands),
            state,
            table,
            live: LiveState {
                camera_radius: 10.0,
                rotation_angle: scenario.start_orientation,
                alignment: ALIGNMENT_SENTINEL,
                ..LiveState::default()
            },
            scenario,
            rendering: true,
            blanked: false,
            animation_frames_left: 0,
            resets: 0,
        };
        engine.update_alignment();
        engine.state.publish_live(&engine.live)?;
        tracing::info!("Headless engine attached ({:?} layout)", engine.table.version());
        Ok(engine)
    }

    /// Runs one engine frame.
    ///
    /// # Errors
    ///
    /// A region access fell out of bounds.
    pub fn step(&mut self) -> ProtocolResult<()> {
        let cmd = self.commands.consume()?;

        if cmd.stop_rendering {
            self.rendering = false;
        }
        if cmd.resume_rendering {
            self.rendering = true;
        }
        if cmd.blank_screen {
            self.blanked = !self.blanked;
        }
        if cmd.reset {
            self.apply_reset()?;
        }
        if cmd.animation_trigger && self.animation_frames_left == 0 {
            let frames = self
                .config
                .animation_frames
                .unwrap_or_else(|| seconds_to_frames(self.scenario.animation_secs()))
                .max(1);
            self.animation_frames_left = frames;
            tracing::debug!("Animation started ({} frames)", frames);
        }

        if self.rendering {
            let turn = axis(cmd.rotate_left, cmd.rotate_right);
            self.live.rotation_angle =
                (self.live.rotation_angle + turn * self.config.rotation_per_frame).rem_euclid(TAU);
            let zoom = axis(cmd.zoom_in, cmd.zoom_out);
            let (min, max) = self.config.camera_radius_range;
            self.live.camera_radius =
                (self.live.camera_radius + zoom * self.config.zoom_per_frame).clamp(min, max);
            if cmd.check_alignment {
                self.live.attempts = self.live.attempts.saturating_add(1);
            }
            self.live.elapsed_secs += frames_to_seconds(1);
        }

        self.live.is_animating = self.animation_frames_left > 0;
        self.animation_frames_left = self.animation_frames_left.saturating_sub(1);

        self.update_alignment();
        self.live.frame_number = self.live.frame_number.wrapping_add(1);
        self.state.publish_live(&self.live)
    }

    /// Runs `frames` engine frames.
    ///
    /// # Errors
    ///
    /// A region access fell out of bounds.
    pub fn run(&mut self, frames: u64) -> ProtocolResult<()> {
        for _ in 0..frames {
            self.step()?;
        }
        Ok(())
    }

    fn apply_reset(&mut self) -> ProtocolResult<()> {
        self.scenario = self.state.read_scenario()?;
        self.resets += 1;
        self.live.rotation_angle = self.scenario.start_orientation;
        self.live.attempts = 0;
        self.live.elapsed_secs = 0.0;
        self.live.has_won = false;
        self.live.win_time = 0.0;
        self.animation_frames_left = 0;
        tracing::info!(
            "Engine reset to scenario seed={} target={}",
            self.scenario.seed,
            self.scenario.target_index
        );
        Ok(())
    }

    fn update_alignment(&mut self) {
        if !self.rendering || self.blanked {
            self.live.alignment = ALIGNMENT_SENTINEL;
            return;
        }
        let target = self.target_angle();
        self.live.alignment = (self.live.rotation_angle - target).cos();
        self.live.current_angle = self.live.rotation_angle;

        let band = self.live.alignment > self.scenario.alignment_threshold
            && self.live.alignment < WIN_BAND_CEILING;
        if band && !self.live.has_won {
            self.live.win_time = self.live.elapsed_secs;
        }
        self.live.has_won = band;
    }

    /// Rotation that aligns the target face with the camera.
    #[must_use]
    pub fn target_angle(&self) -> f32 {
        (self.scenario.target_index % 3) as f32 * TAU / 3.0
    }

    /// Sets the rotation directly.
    pub fn set_rotation(&mut self, angle: f32) {
        self.live.rotation_angle = angle.rem_euclid(TAU);
    }

    /// Scenario the engine last loaded.
    #[must_use]
    pub const fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Live fields as last published.
    #[must_use]
    pub const fn live(&self) -> &LiveState {
        &self.live
    }

    /// Frame counter.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.live.frame_number
    }

    /// Rendering is running.
    #[must_use]
    pub const fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Blank screen is showing.
    #[must_use]
    pub const fn is_blanked(&self) -> bool {
        self.blanked
    }

    /// Number of resets applied.
    #[must_use]
    pub const fn resets(&self) -> u64 {
        self.resets
    }
}

/// -1, 0 or +1 from a pair of opposing level flags.
fn axis(negative: bool, positive: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

impl<R: Region> OffsetQuery for HeadlessEngine<R> {
    fn state_offsets(&self) -> Result<OffsetMap, LayoutError> {
        if !self.config.export_offsets {
            return Err(LayoutError::QueryUnavailable(
                "engine exports no offset table".into(),
            ));
        }
        Ok(StateField::ALL
            .iter()
            .filter_map(|f| self.table.offset(*f).map(|off| (f.name().to_string(), off)))
            .collect())
    }
}
