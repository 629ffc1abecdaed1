//! # Win Sequencer
//!
//! Coordinates "round won → engine animation → blank → next scenario"
//! across the shared memory boundary, one snapshot at a time.
//!
//! ## States
//!
//! - **PLAYING**: watching alignment. Entering the win band fires
//!   `animation_trigger`.
//! - **WAITING_FOR_ANIMATION_END**: re-asserting the trigger until the
//!   engine reports `is_animating`, then waiting for it to drop. On the drop
//!   the next scenario is written and `reset + blank_screen + stop_rendering`
//!   go out.
//! - **BLANK_SCREEN_ACTIVE**: counting engine frames. After the blank
//!   duration `blank_screen + resume_rendering` go out and the queue
//!   advances.
//!
//! ## Clock
//!
//! Every duration is measured in engine frames from the State region,
//! never in controller wall-clock time.
//!
//! ## Timeout
//!
//! With `animation_timeout_frames = Some(n)`, a wait in which the engine
//! never reports `is_animating` within `n` engine frames logs a
//! desynchronization warning and completes anyway. Once the animation has
//! started it runs to its end however long the scenario makes it. `None`
//! waits forever.
//!
//! ## Reset Settling
//!
//! A published `reset` reaches the engine on its next frame. Until a
//! snapshot newer than the frame the reset went out on arrives, PLAYING
//! does not look for wins, so a pre-reset alignment cannot win the new
//! round.

use serde::Deserialize;
use tether_protocol::{CommandVector, StateSnapshot};
use tether_shared::constants::{ANIMATION_TIMEOUT_FRAMES, WIN_BAND_CEILING, WIN_BLANK_DURATION_FRAMES};
use tether_shared::ScenarioConfig;

use crate::trials::TrialQueue;

/// Sequencer state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WinPhase {
    /// Player has control.
    #[default]
    Playing,
    /// Win animation requested or running.
    WaitingForAnimationEnd,
    /// Screen blanked between rounds.
    BlankScreenActive,
}

impl WinPhase {
    /// Upper-case name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Playing => "PLAYING",
            Self::WaitingForAnimationEnd => "WAITING_FOR_ANIMATION_END",
            Self::BlankScreenActive => "BLANK_SCREEN_ACTIVE",
        }
    }
}

/// When a round counts as won.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinPolicy {
    /// As soon as alignment enters the win band.
    #[default]
    Automatic,
    /// Only when the player asks for a check while aligned. Every check
    /// plays the animation; a failed one returns to play without a reset.
    OnCheck,
}

/// Sequencer tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequencerConfig {
    /// Engine frames the screen stays blank between rounds.
    pub blank_duration_frames: u64,
    /// Engine frames to wait for an animation before giving up.
    pub animation_timeout_frames: Option<u64>,
    /// Exclusive upper bound of the win band.
    pub win_band_ceiling: f32,
    /// Win rule.
    pub policy: WinPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            blank_duration_frames: WIN_BLANK_DURATION_FRAMES,
            animation_timeout_frames: Some(ANIMATION_TIMEOUT_FRAMES),
            win_band_ceiling: WIN_BAND_CEILING,
            policy: WinPolicy::Automatic,
        }
    }
}

/// What the session must do after one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequencerStep {
    /// Edge flags to publish this tick.
    pub edges: CommandVector,
    /// Scenario to write into the State region before publishing.
    pub scenario: Option<ScenarioConfig>,
    /// Advance the trial queue after publishing.
    pub advance_trial: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlankKind {
    BetweenRounds,
    Retry,
}

/// The win sequencing state machine.
#[derive(Clone, Debug)]
pub struct WinSequencer {
    config: SequencerConfig,
    phase: WinPhase,
    /// `is_animating` has been observed true in the current wait.
    animation_seen: bool,
    /// The current wait ends in a blank and a new scenario.
    round_won: bool,
    wait_started_frame: u64,
    blank_started_frame: u64,
    blank_kind: BlankKind,
    /// Frame observed when the last reset went out, until a newer one shows.
    reset_sent_frame: Option<u64>,
}

impl WinSequencer {
    /// Creates a sequencer in PLAYING.
    #[must_use]
    pub const fn new(config: SequencerConfig) -> Self {
        Self {
            config,
            phase: WinPhase::Playing,
            animation_seen: false,
            round_won: false,
            wait_started_frame: 0,
            blank_started_frame: 0,
            blank_kind: BlankKind::BetweenRounds,
            reset_sent_frame: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn phase(&self) -> WinPhase {
        self.phase
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Frame at which the current blank started.
    #[must_use]
    pub const fn blank_started_frame(&self) -> Option<u64> {
        match self.phase {
            WinPhase::BlankScreenActive => Some(self.blank_started_frame),
            _ => None,
        }
    }

    /// Advances the machine by one snapshot.
    ///
    /// `check_requested` is this tick's `check_alignment` edge from input.
    pub fn step(
        &mut self,
        snapshot: &StateSnapshot,
        check_requested: bool,
        trials: &TrialQueue,
    ) -> SequencerStep {
        let mut out = SequencerStep::default();
        let frame = snapshot.frame();

        match self.phase {
            WinPhase::Playing => {
                if self.reset_sent_frame == Some(frame) {
                    tracing::trace!("Frame {} predates the last reset, not judged", frame);
                    return out;
                }
                self.reset_sent_frame = None;

                let threshold = trials.current().alignment_threshold;
                let aligned = snapshot
                    .alignment()
                    .in_win_band(threshold, self.config.win_band_ceiling);

                if snapshot.live.has_won != aligned {
                    tracing::debug!(
                        "has_won={} disagrees with alignment {:?} (threshold {})",
                        snapshot.live.has_won,
                        snapshot.alignment(),
                        threshold
                    );
                }

                let fire = match self.config.policy {
                    WinPolicy::Automatic => aligned,
                    WinPolicy::OnCheck => check_requested,
                };
                if fire {
                    if aligned {
                        tracing::info!(
                            "Round won at frame {} (alignment {:?} > {})",
                            frame,
                            snapshot.alignment(),
                            threshold
                        );
                    } else {
                        tracing::info!("Check failed at frame {} ({:?})", frame, snapshot.alignment());
                    }
                    self.round_won = aligned;
                    self.animation_seen = false;
                    self.wait_started_frame = frame;
                    out.edges.animation_trigger = true;
                    self.transition_to(WinPhase::WaitingForAnimationEnd);
                }
            }

            WinPhase::WaitingForAnimationEnd => {
                let animating = snapshot.live.is_animating;
                if self.animation_seen && !animating {
                    self.complete_animation(frame, trials, &mut out);
                } else if !self.animation_seen && self.timed_out(frame) {
                    tracing::warn!(
                        "Engine did not start the animation within {} frames, \
                         protocol desynchronized, completing anyway",
                        frame.wrapping_sub(self.wait_started_frame)
                    );
                    self.complete_animation(frame, trials, &mut out);
                } else if animating {
                    if !self.animation_seen {
                        tracing::debug!("Animation started at frame {}", frame);
                    }
                    self.animation_seen = true;
                } else {
                    // Engine has not consumed the trigger yet.
                    out.edges.animation_trigger = true;
                }
            }

            WinPhase::BlankScreenActive => {
                let elapsed = frame.wrapping_sub(self.blank_started_frame);
                if elapsed >= self.config.blank_duration_frames {
                    out.edges.blank_screen = true;
                    if self.blank_kind == BlankKind::BetweenRounds {
                        out.edges.resume_rendering = true;
                        out.advance_trial = true;
                    }
                    self.transition_to(WinPhase::Playing);
                }
            }
        }

        out
    }

    fn timed_out(&self, frame: u64) -> bool {
        self.config
            .animation_timeout_frames
            .is_some_and(|limit| frame.wrapping_sub(self.wait_started_frame) >= limit)
    }

    fn complete_animation(&mut self, frame: u64, trials: &TrialQueue, out: &mut SequencerStep) {
        self.animation_seen = false;
        if !self.round_won {
            self.transition_to(WinPhase::Playing);
            return;
        }

        out.scenario = Some(trials.peek_next().clone());
        out.edges.reset = true;
        out.edges.blank_screen = true;
        out.edges.stop_rendering = true;
        self.reset_sent_frame = Some(frame);
        self.blank_started_frame = frame;
        self.blank_kind = BlankKind::BetweenRounds;
        self.transition_to(WinPhase::BlankScreenActive);
    }

    /// Enters a blank that only toggles the screen back on when it ends
    /// (retry of the current trial).
    pub fn begin_retry(&mut self, frame: u64) {
        self.animation_seen = false;
        self.round_won = false;
        self.blank_started_frame = frame;
        self.blank_kind = BlankKind::Retry;
        self.transition_to(WinPhase::BlankScreenActive);
    }

    /// Marks a `reset` as published while the engine showed `frame`. Win
    /// detection skips snapshots of that frame.
    pub fn await_reset(&mut self, frame: u64) {
        self.reset_sent_frame = Some(frame);
    }

    /// Returns to PLAYING from any state and clears every marker except a
    /// pending reset mark.
    pub fn reset(&mut self) {
        self.animation_seen = false;
        self.round_won = false;
        self.wait_started_frame = 0;
        self.blank_started_frame = 0;
        self.blank_kind = BlankKind::BetweenRounds;
        self.transition_to(WinPhase::Playing);
    }

    fn transition_to(&mut self, phase: WinPhase) {
        if self.phase != phase {
            tracing::info!("Win sequencer: {} -> {}", self.phase.name(), phase.name());
            self.phase = phase;
        }
    }
}

impl Default for WinSequencer {
    fn default() -> Self {
        Self::new(SequencerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_protocol::LiveState;

    fn snap(frame: u64, alignment: f32, is_animating: bool) -> StateSnapshot {
        StateSnapshot {
            live: LiveState {
                frame_number: frame,
                alignment,
                is_animating,
                ..LiveState::default()
            },
            ..StateSnapshot::default()
        }
    }

    fn three_trials() -> TrialQueue {
        TrialQueue::new(
            (1..=3)
                .map(|seed| ScenarioConfig {
                    seed,
                    ..ScenarioConfig::builtin()
                })
                .collect(),
        )
    }

    #[test]
    fn full_round_blanks_for_exactly_sixty_frames() {
        let trials = three_trials();
        let mut seq = WinSequencer::default();

        let out = seq.step(&snap(0, 0.5, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);
        assert!(out.edges.is_neutral());

        let out = seq.step(&snap(0, 0.995, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
        assert!(out.edges.animation_trigger);

        let out = seq.step(&snap(0, 2.0, true), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
        assert!(!out.edges.animation_trigger);

        let out = seq.step(&snap(100, 2.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        assert!(out.edges.reset && out.edges.blank_screen && out.edges.stop_rendering);
        assert_eq!(out.scenario.as_ref().map(|s| s.seed), Some(2));
        assert!(!out.advance_trial);
        assert_eq!(seq.blank_started_frame(), Some(100));

        let out = seq.step(&snap(159, 2.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        assert!(out.edges.is_neutral());

        let out = seq.step(&snap(160, 2.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);
        assert!(out.edges.blank_screen && out.edges.resume_rendering);
        assert!(out.advance_trial);
    }

    #[test]
    fn trigger_is_reasserted_until_animation_seen() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            animation_timeout_frames: None,
            ..SequencerConfig::default()
        });
        seq.step(&snap(10, 0.99, false), false, &trials);
        for frame in 11..20 {
            let out = seq.step(&snap(frame, 0.99, false), false, &trials);
            assert!(out.edges.animation_trigger, "frame {frame}");
        }
        let out = seq.step(&snap(20, 0.99, true), false, &trials);
        assert!(!out.edges.animation_trigger);
        let out = seq.step(&snap(21, 0.99, true), false, &trials);
        assert!(out.edges.is_neutral());
    }

    #[test]
    fn sentinel_and_boundaries_do_not_win() {
        let trials = three_trials();
        let mut seq = WinSequencer::default();
        for alignment in [0.95, 1.01, 2.0, f32::NAN, -0.99] {
            seq.step(&snap(1, alignment, false), false, &trials);
            assert_eq!(seq.phase(), WinPhase::Playing, "alignment {alignment}");
        }
    }

    #[test]
    fn per_trial_threshold_is_used() {
        let trials = TrialQueue::new(vec![ScenarioConfig {
            alignment_threshold: 0.5,
            ..ScenarioConfig::builtin()
        }]);
        let mut seq = WinSequencer::default();
        seq.step(&snap(1, 0.6, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
    }

    #[test]
    fn timeout_fires_exactly_at_limit() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            animation_timeout_frames: Some(30),
            ..SequencerConfig::default()
        });
        seq.step(&snap(100, 0.99, false), false, &trials);

        let out = seq.step(&snap(129, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
        assert!(out.edges.animation_trigger);

        let out = seq.step(&snap(130, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        assert!(out.edges.reset);
        assert_eq!(seq.blank_started_frame(), Some(130));
    }

    #[test]
    fn started_animation_outlives_the_timeout() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            animation_timeout_frames: Some(300),
            ..SequencerConfig::default()
        });
        seq.step(&snap(0, 0.99, false), false, &trials);
        seq.step(&snap(1, 2.0, true), false, &trials);
        for frame in 2..420 {
            let out = seq.step(&snap(frame, 2.0, true), false, &trials);
            assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd, "frame {frame}");
            assert!(out.edges.is_neutral());
        }
        let out = seq.step(&snap(420, 2.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        assert!(out.edges.reset);
    }

    #[test]
    fn frame_of_the_reset_is_not_judged() {
        let trials = three_trials();
        let mut seq = WinSequencer::default();
        seq.await_reset(5);
        seq.reset();

        let out = seq.step(&snap(5, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);
        assert!(out.edges.is_neutral());
        seq.step(&snap(5, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);

        seq.step(&snap(6, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
    }

    #[test]
    fn won_round_reset_is_settled_after_blank() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            blank_duration_frames: 0,
            ..SequencerConfig::default()
        });
        seq.step(&snap(1, 0.99, false), false, &trials);
        seq.step(&snap(2, 0.99, true), false, &trials);
        seq.step(&snap(3, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        seq.step(&snap(3, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);

        seq.step(&snap(3, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing, "reset frame");
        seq.step(&snap(4, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
    }

    #[test]
    fn no_timeout_waits_indefinitely() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            animation_timeout_frames: None,
            ..SequencerConfig::default()
        });
        seq.step(&snap(0, 0.99, false), false, &trials);
        seq.step(&snap(1, 0.99, true), false, &trials);
        for frame in (2..100_000).step_by(997) {
            seq.step(&snap(frame, 0.99, true), false, &trials);
        }
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
    }

    #[test]
    fn blank_elapsed_handles_frame_wrap() {
        let trials = three_trials();
        let mut seq = WinSequencer::default();
        let start = u64::MAX - 10;
        seq.step(&snap(start, 0.99, false), false, &trials);
        seq.step(&snap(start, 0.99, true), false, &trials);
        seq.step(&snap(start, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);

        seq.step(&snap(start.wrapping_add(59), 0.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        seq.step(&snap(start.wrapping_add(60), 0.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);
    }

    #[test]
    fn on_check_policy_needs_the_edge() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            policy: WinPolicy::OnCheck,
            ..SequencerConfig::default()
        });
        seq.step(&snap(1, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);

        let out = seq.step(&snap(2, 0.99, false), true, &trials);
        assert!(out.edges.animation_trigger);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
    }

    #[test]
    fn failed_check_animates_then_plays_on() {
        let trials = three_trials();
        let mut seq = WinSequencer::new(SequencerConfig {
            policy: WinPolicy::OnCheck,
            ..SequencerConfig::default()
        });
        let out = seq.step(&snap(1, 0.2, false), true, &trials);
        assert!(out.edges.animation_trigger);
        seq.step(&snap(2, 0.2, true), false, &trials);
        let out = seq.step(&snap(3, 0.2, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);
        assert!(out.scenario.is_none());
        assert!(!out.edges.reset);
    }

    #[test]
    fn retry_blank_only_toggles_screen() {
        let trials = three_trials();
        let mut seq = WinSequencer::default();
        seq.begin_retry(40);
        assert_eq!(seq.phase(), WinPhase::BlankScreenActive);
        let out = seq.step(&snap(100, 0.0, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::Playing);
        assert!(out.edges.blank_screen);
        assert!(!out.edges.resume_rendering);
        assert!(!out.advance_trial);
    }

    #[test]
    fn reset_returns_to_playing_from_anywhere() {
        let trials = three_trials();
        let mut seq = WinSequencer::default();
        seq.step(&snap(5, 0.99, false), false, &trials);
        assert_eq!(seq.phase(), WinPhase::WaitingForAnimationEnd);
        seq.reset();
        assert_eq!(seq.phase(), WinPhase::Playing);
        assert_eq!(seq.blank_started_frame(), None);
    }
}
