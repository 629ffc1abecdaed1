//! # Controller Session
//!
//! Owns everything one controller needs: both channels, the trial queue,
//! the win sequencer, input fusion and the status sink. There is no global
//! state; two sessions over two pairs of regions never interact.
//!
//! ## Tick
//!
//! 1. Snapshot State (a failed read reuses the previous snapshot)
//! 2. Fuse input, gated to neutral unless running and PLAYING
//! 3. Step the sequencer (frozen while paused); a tick that sends `reset`
//!    marks the current frame so stale snapshots cannot win
//! 4. Write the next scenario if the sequencer asked for one
//! 5. Merge edges and publish the whole vector
//! 6. Advance the queue, update status
//!
//! Nothing in the tick path returns an error; region faults are logged and
//! the tick carries on.

use tether_protocol::{
    CommandChannel, CommandVector, LayoutResolver, LayoutVersion, OffsetQuery, Region,
    SharedMemory, StateChannel, StateSnapshot,
};

use crate::config::ControllerConfig;
use crate::error::SessionResult;
use crate::input::InputFusion;
use crate::sequencer::{WinPhase, WinSequencer};
use crate::status::{format_status, CoarseState, StatusSink};
use crate::trials::TrialQueue;

/// Operator-level session mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionMode {
    /// Player input and sequencing are live.
    Running,
    /// Rendering stopped by the operator; the sequencer is frozen.
    Paused,
    /// Only neutral vectors are published.
    Stopped,
}

/// One controller attached to one engine.
pub struct Session<R: Region> {
    commands: CommandChannel<R>,
    state: StateChannel<R>,
    trials: TrialQueue,
    sequencer: WinSequencer,
    input: InputFusion,
    status: Box<dyn StatusSink>,
    mode: SessionMode,
    /// Operator edges waiting for the next publish.
    pending: CommandVector,
    last_snapshot: StateSnapshot,
    ticks: u64,
}

impl<R: Region> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("phase", &self.sequencer.phase())
            .field("trial", &self.trials.index())
            .field("layout", &self.state.table().version())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<R: Region> Session<R> {
    /// Resolves the State layout, writes the current trial's scenario,
    /// clears the Commands region and queues `reset` for the first tick so
    /// the engine loads the scenario.
    ///
    /// `query` is the engine's offset export, if it has one. Any problem
    /// with it falls back to the fixed layout.
    ///
    /// # Errors
    ///
    /// The first scenario write or the clearing publish failed.
    pub fn start(
        memory: SharedMemory<R>,
        query: Option<&dyn OffsetQuery>,
        trials: TrialQueue,
        config: &ControllerConfig,
        status: Box<dyn StatusSink>,
    ) -> SessionResult<Self> {
        let table = LayoutResolver::new(memory.state().len()).resolve(query);
        let (commands, state) = memory.into_parts();
        let mut commands = CommandChannel::new(commands);
        let state = StateChannel::new(state, table);

        state.write_scenario(trials.current())?;
        commands.publish_neutral()?;

        tracing::info!(
            "Session started: {} trials, {:?} layout, {:?} wins",
            trials.len(),
            state.table().version(),
            config.win_policy
        );

        let mut session = Self {
            commands,
            state,
            trials,
            sequencer: WinSequencer::new(config.sequencer()),
            input: InputFusion::new(config.input),
            status,
            mode: SessionMode::Running,
            pending: CommandVector {
                reset: true,
                ..CommandVector::NEUTRAL
            },
            last_snapshot: StateSnapshot::default(),
            ticks: 0,
        };
        session.update_status();
        Ok(session)
    }

    /// Runs one controller tick and returns the vector it published.
    pub fn tick(&mut self) -> CommandVector {
        self.ticks += 1;

        let snapshot = match self.state.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("State read failed, reusing last snapshot: {}", e);
                self.last_snapshot.clone()
            }
        };

        if self.mode != SessionMode::Stopped && self.pending.reset {
            self.sequencer.await_reset(snapshot.frame());
        }

        let mut out = match self.mode {
            SessionMode::Stopped => {
                self.input.fuse(false);
                self.pending = CommandVector::NEUTRAL;
                CommandVector::NEUTRAL
            }
            SessionMode::Paused => {
                self.input.fuse(false);
                std::mem::replace(&mut self.pending, CommandVector::NEUTRAL)
            }
            SessionMode::Running => self.running_tick(&snapshot),
        };

        let published = out;
        if let Err(e) = self.commands.publish(&mut out) {
            tracing::warn!("Command publish failed: {}", e);
        }

        self.last_snapshot = snapshot;
        self.update_status();
        published
    }

    fn running_tick(&mut self, snapshot: &StateSnapshot) -> CommandVector {
        let playing = self.sequencer.phase() == WinPhase::Playing;
        let mut out = self.input.fuse(playing);

        let step = self
            .sequencer
            .step(snapshot, out.check_alignment, &self.trials);
        if self.sequencer.phase() != WinPhase::Playing {
            out.clear_movement();
        }

        if let Some(scenario) = &step.scenario {
            if let Err(e) = self.state.write_scenario(scenario) {
                tracing::warn!("Scenario write failed: {}", e);
            }
        }

        out.merge(&step.edges);
        out.merge(&std::mem::replace(&mut self.pending, CommandVector::NEUTRAL));

        if step.advance_trial {
            self.trials.advance();
        }
        out
    }

    /// Stops the session. Every later tick publishes the neutral vector.
    pub fn stop(&mut self) {
        if self.mode != SessionMode::Stopped {
            tracing::info!("Session stopped");
            self.mode = SessionMode::Stopped;
            self.pending = CommandVector::NEUTRAL;
        }
    }

    /// Stops engine rendering and freezes the sequencer.
    pub fn pause(&mut self) {
        if self.mode == SessionMode::Running {
            tracing::info!("Session paused");
            self.mode = SessionMode::Paused;
            self.pending.stop_rendering = true;
        } else {
            tracing::debug!("pause ignored in {:?}", self.mode);
        }
    }

    /// Resumes rendering after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        if self.mode == SessionMode::Paused {
            tracing::info!("Session resumed");
            self.mode = SessionMode::Running;
            self.pending.stop_rendering = false;
            self.pending.resume_rendering = true;
        } else {
            tracing::debug!("resume ignored in {:?}", self.mode);
        }
    }

    /// Skips to the next trial and resets the engine onto it. Works from any
    /// mode and leaves the session running.
    pub fn restart(&mut self) {
        let was_blank = self.sequencer.phase() == WinPhase::BlankScreenActive;
        let was_paused = self.mode == SessionMode::Paused;

        self.trials.advance();
        if let Err(e) = self.state.write_scenario(self.trials.current()) {
            tracing::warn!("Scenario write failed: {}", e);
        }
        self.sequencer.reset();

        self.pending = CommandVector {
            reset: true,
            blank_screen: was_blank,
            resume_rendering: was_blank || was_paused,
            ..CommandVector::NEUTRAL
        };
        self.mode = SessionMode::Running;
        tracing::info!("Session restarted on trial {}", self.trials.index() + 1);
        self.update_status();
    }

    /// Resets the engine onto the current trial behind a short blank.
    pub fn retry(&mut self) {
        if self.mode == SessionMode::Stopped {
            tracing::debug!("retry ignored while stopped");
            return;
        }
        if self.sequencer.phase() == WinPhase::BlankScreenActive {
            tracing::debug!("retry ignored during blank");
            return;
        }

        if let Err(e) = self.state.write_scenario(self.trials.current()) {
            tracing::warn!("Scenario write failed: {}", e);
        }
        self.pending.reset = true;
        self.pending.blank_screen = true;
        self.sequencer.begin_retry(self.last_snapshot.frame());
        tracing::info!("Retrying trial {}", self.trials.index() + 1);
        self.update_status();
    }

    /// Toggles the engine's blank screen. Ignored while stopped and while
    /// the sequencer owns the blank.
    pub fn toggle_blank(&mut self) {
        if self.mode == SessionMode::Stopped {
            tracing::debug!("blank toggle ignored while stopped");
            return;
        }
        if self.sequencer.phase() == WinPhase::BlankScreenActive {
            tracing::debug!("blank toggle ignored during sequenced blank");
            return;
        }
        self.pending.blank_screen = !self.pending.blank_screen;
        tracing::info!("Blank screen toggled");
    }

    /// Publishes neutral and hands both regions back as (commands, state).
    pub fn teardown(mut self) -> (R, R) {
        if let Err(e) = self.commands.publish_neutral() {
            tracing::warn!("Final neutral publish failed: {}", e);
        }
        tracing::info!("Session torn down after {} ticks", self.ticks);
        (self.commands.into_inner(), self.state.into_inner())
    }

    fn coarse_state(&self) -> CoarseState {
        match self.mode {
            SessionMode::Stopped => CoarseState::Stopped,
            SessionMode::Paused => CoarseState::Paused,
            SessionMode::Running => match self.sequencer.phase() {
                WinPhase::Playing => CoarseState::Ready,
                WinPhase::WaitingForAnimationEnd => CoarseState::Animating,
                WinPhase::BlankScreenActive => CoarseState::Blank,
            },
        }
    }

    fn update_status(&mut self) {
        let text = format_status(self.trials.index(), self.trials.len(), self.coarse_state());
        self.status.set_status(&text);
    }

    /// Sequencer state.
    #[must_use]
    pub const fn phase(&self) -> WinPhase {
        self.sequencer.phase()
    }

    /// Operator mode.
    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Trial queue.
    #[must_use]
    pub const fn trials(&self) -> &TrialQueue {
        &self.trials
    }

    /// Snapshot used by the last tick.
    #[must_use]
    pub const fn last_snapshot(&self) -> &StateSnapshot {
        &self.last_snapshot
    }

    /// Input sources, for the host to feed events into.
    pub fn input_mut(&mut self) -> &mut InputFusion {
        &mut self.input
    }

    /// Layout the session resolved at start.
    #[must_use]
    pub fn layout_version(&self) -> LayoutVersion {
        self.state.table().version()
    }

    /// Ticks run.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}
