//! # Session Round Tests
//!
//! A controller session and the headless engine stepped in lockstep over
//! one pair of regions: engine frame, then controller tick.
//!
//! Run with: cargo test -p tether_controller --test session_round_test -- --nocapture

use std::io::Write;

use tether_controller::{
    ControllerConfig, HeadlessEngine, HeadlessEngineConfig, Key, Session, SessionMode,
    SharedStatus, TrialQueue, WinPhase, WinPolicy,
};
use tether_protocol::{HeapRegion, LayoutError, LayoutVersion, OffsetMap, OffsetTable, SharedMemory};
use tether_shared::ScenarioConfig;

const ANIMATION_FRAMES: u64 = 10;
const BLANK_FRAMES: u64 = 20;

struct Pair {
    engine: HeadlessEngine<HeapRegion>,
    session: Session<HeapRegion>,
    status: SharedStatus,
}

impl Pair {
    fn step(&mut self) {
        self.engine.step().unwrap();
        self.session.tick();
    }
}

fn config() -> ControllerConfig {
    ControllerConfig {
        blank_duration_frames: BLANK_FRAMES,
        ..ControllerConfig::default()
    }
}

fn engine_config() -> HeadlessEngineConfig {
    HeadlessEngineConfig {
        animation_frames: Some(ANIMATION_FRAMES),
        ..HeadlessEngineConfig::default()
    }
}

/// Two trials that both start a full radian away from the target.
fn trials() -> TrialQueue {
    TrialQueue::new(
        [11, 22]
            .into_iter()
            .map(|seed| ScenarioConfig {
                seed,
                start_orientation: 1.0,
                ..ScenarioConfig::builtin()
            })
            .collect(),
    )
}

fn pair(config: &ControllerConfig) -> Pair {
    pair_with(config, engine_config(), trials())
}

/// The first tick carries the start reset; the next engine frame applies it.
fn pair_with(
    config: &ControllerConfig,
    engine_config: HeadlessEngineConfig,
    trials: TrialQueue,
) -> Pair {
    let memory = SharedMemory::heap();
    let engine = HeadlessEngine::new(memory.clone(), OffsetTable::fixed(), engine_config).unwrap();
    let status = SharedStatus::new();
    let mut session =
        Session::start(memory, Some(&engine), trials, config, Box::new(status.clone())).unwrap();
    assert!(session.tick().reset);
    Pair {
        engine,
        session,
        status,
    }
}

#[test]
fn test_won_round_loads_next_trial() {
    let mut pair = pair(&config());
    assert_eq!(pair.session.layout_version(), LayoutVersion::Negotiated);

    pair.step();
    assert_eq!(pair.engine.scenario().seed, 11, "start reset was applied");
    assert_eq!(pair.session.phase(), WinPhase::Playing);

    pair.session.input_mut().key_down(Key::Left);

    let mut phases = Vec::new();
    let mut blank_frames = None;
    for _ in 0..500 {
        pair.step();
        let phase = pair.session.phase();
        let held = phases.last() == Some(&phase);
        if !held {
            phases.push(phase);
        }
        // The engine applies the blank edges one frame after they are sent.
        if phase == WinPhase::BlankScreenActive && held {
            assert!(pair.engine.is_blanked());
            assert!(!pair.engine.is_rendering());
            assert_eq!(pair.status.get(), "Trial 1 / 2 - Blank");
        }
        if phase == WinPhase::BlankScreenActive {
            blank_frames.get_or_insert(pair.engine.frame());
        }
        if pair.session.trials().index() == 1 {
            break;
        }
    }

    assert_eq!(
        phases,
        [
            WinPhase::Playing,
            WinPhase::WaitingForAnimationEnd,
            WinPhase::BlankScreenActive,
            WinPhase::Playing,
        ]
    );
    let blank_start = blank_frames.unwrap();
    assert!(pair.engine.frame() - blank_start >= BLANK_FRAMES);

    // The engine picks up the edges published on the advancing tick.
    pair.step();
    assert_eq!(pair.engine.scenario().seed, 22);
    assert_eq!(pair.engine.resets(), 2);
    assert!(pair.engine.is_rendering());
    assert!(!pair.engine.is_blanked());
    assert_eq!(pair.status.get(), "Trial 2 / 2 - Ready");
}

#[test]
fn test_movement_is_neutral_outside_playing() {
    let mut pair = pair(&config());
    pair.step();
    pair.session.input_mut().key_down(Key::Left);

    let mut saw_waiting = false;
    for _ in 0..200 {
        pair.engine.step().unwrap();
        let out = pair.session.tick();
        if pair.session.phase() != WinPhase::Playing {
            saw_waiting = true;
            assert!(!out.rotate_left, "movement leaked in {:?}", pair.session.phase());
        }
        if pair.session.phase() == WinPhase::BlankScreenActive {
            break;
        }
    }
    assert!(saw_waiting);
}

#[test]
fn test_on_check_policy_needs_the_check_edge() {
    let mut config = config();
    config.win_policy = WinPolicy::OnCheck;
    let mut pair = pair(&config);
    pair.step();

    pair.engine.set_rotation(pair.engine.target_angle());
    for _ in 0..5 {
        pair.step();
    }
    assert_eq!(pair.session.phase(), WinPhase::Playing, "aligned alone does not win");

    pair.session.input_mut().key_down(Key::Space);
    pair.step();
    assert_eq!(pair.session.phase(), WinPhase::WaitingForAnimationEnd);
    assert_eq!(pair.engine.live().attempts, 0, "check reaches the engine next frame");
    pair.step();
    assert_eq!(pair.engine.live().attempts, 1);
}

#[test]
fn test_pause_freezes_sequencer_but_not_frames() {
    let mut pair = pair(&config());
    pair.step();
    pair.session.pause();
    pair.step();
    pair.step();
    assert!(!pair.engine.is_rendering());
    assert_eq!(pair.session.mode(), SessionMode::Paused);
    assert_eq!(pair.status.get(), "Trial 1 / 2 - Paused");

    let frame = pair.engine.frame();
    pair.engine.set_rotation(pair.engine.target_angle());
    for _ in 0..10 {
        pair.step();
    }
    assert_eq!(pair.engine.frame(), frame + 10);
    assert_eq!(pair.session.phase(), WinPhase::Playing);

    pair.session.resume();
    pair.step();
    pair.step();
    assert!(pair.engine.is_rendering());
}

#[test]
fn test_restart_during_blank_restores_screen() {
    let mut pair = pair(&config());
    pair.step();
    pair.engine.set_rotation(pair.engine.target_angle());
    for _ in 0..200 {
        pair.step();
        if pair.session.phase() == WinPhase::BlankScreenActive {
            break;
        }
    }
    pair.step();
    assert!(pair.engine.is_blanked());
    assert_eq!(pair.session.phase(), WinPhase::BlankScreenActive);

    pair.session.restart();
    pair.step();
    pair.step();
    assert!(!pair.engine.is_blanked());
    assert!(pair.engine.is_rendering());
    assert_eq!(pair.session.phase(), WinPhase::Playing);
    assert_eq!(pair.session.trials().index(), 1);
}

#[test]
fn test_long_animation_plays_to_the_end() {
    // 0.5 + 5.0 + 0.5 s is 360 frames, past the 300 frame start timeout.
    let trials = TrialQueue::new(
        [11, 22]
            .into_iter()
            .map(|seed| ScenarioConfig {
                seed,
                start_orientation: 1.0,
                anim_fade_out: 0.5,
                anim_stay_open: 5.0,
                anim_fade_in: 0.5,
                ..ScenarioConfig::builtin()
            })
            .collect(),
    );
    let engine_config = HeadlessEngineConfig {
        animation_frames: None,
        ..HeadlessEngineConfig::default()
    };
    let mut pair = pair_with(&config(), engine_config, trials);
    pair.step();
    pair.engine.set_rotation(pair.engine.target_angle());

    let mut animated = 0;
    for _ in 0..600 {
        pair.step();
        if pair.engine.live().is_animating {
            animated += 1;
            assert_eq!(
                pair.session.phase(),
                WinPhase::WaitingForAnimationEnd,
                "blank cut the animation short at frame {}",
                pair.engine.frame()
            );
        }
        if pair.session.phase() == WinPhase::BlankScreenActive {
            break;
        }
    }
    assert_eq!(animated, 360);
    assert_eq!(pair.session.phase(), WinPhase::BlankScreenActive);
}

#[test]
fn test_restart_while_aligned_does_not_win_next_trial() {
    let mut pair = pair(&config());
    pair.step();
    pair.engine.set_rotation(pair.engine.target_angle());
    pair.engine.step().unwrap();
    assert!(pair.engine.live().has_won, "aligned before the restart");

    pair.session.restart();
    pair.session.tick();
    for _ in 0..100 {
        pair.step();
        assert_eq!(pair.session.phase(), WinPhase::Playing);
    }
    assert_eq!(pair.session.trials().index(), 1);
    assert_eq!(pair.engine.scenario().seed, 22);
    assert!(!pair.engine.live().has_won);
}

#[test]
fn test_retry_while_aligned_keeps_the_trial() {
    let mut pair = pair(&config());
    pair.step();
    pair.engine.set_rotation(pair.engine.target_angle());
    pair.engine.step().unwrap();
    assert!(pair.engine.live().has_won);

    pair.session.retry();
    pair.session.tick();
    let mut phases = vec![pair.session.phase()];
    for _ in 0..100 {
        pair.step();
        if phases.last() != Some(&pair.session.phase()) {
            phases.push(pair.session.phase());
        }
    }
    assert_eq!(phases, [WinPhase::BlankScreenActive, WinPhase::Playing]);
    assert_eq!(pair.session.trials().index(), 0);
    assert_eq!(pair.engine.resets(), 2);
    assert!(!pair.engine.is_blanked());
    assert!(!pair.engine.live().has_won);
}

#[test]
fn test_blank_toggle_reaches_engine() {
    let mut pair = pair(&config());
    pair.step();
    pair.session.toggle_blank();
    pair.step();
    pair.step();
    assert!(pair.engine.is_blanked());
    assert!(pair.engine.live().alignment > 1.0, "sentinel while blanked");

    pair.session.toggle_blank();
    pair.step();
    pair.step();
    assert!(!pair.engine.is_blanked());
}

#[test]
fn test_stopped_session_publishes_neutral() {
    let mut pair = pair(&config());
    pair.step();
    pair.session.input_mut().key_down(Key::Right);
    pair.session.stop();

    let angle = pair.engine.live().rotation_angle;
    for _ in 0..10 {
        pair.engine.step().unwrap();
        assert!(pair.session.tick().is_neutral());
    }
    pair.engine.step().unwrap();
    assert!((pair.engine.live().rotation_angle - angle).abs() < f32::EPSILON);
    assert_eq!(pair.status.get(), "Trial 1 / 2 - Stopped");
}

#[test]
fn test_broken_negotiation_falls_back_to_fixed() {
    let memory = SharedMemory::heap();
    let mut engine =
        HeadlessEngine::new(memory.clone(), OffsetTable::fixed(), engine_config()).unwrap();
    let incomplete = || -> Result<OffsetMap, LayoutError> {
        Ok(OffsetMap::from([("attempts".to_string(), 40)]))
    };
    let mut session = Session::start(
        memory,
        Some(&incomplete),
        trials(),
        &config(),
        Box::new(SharedStatus::new()),
    )
    .unwrap();
    assert_eq!(session.layout_version(), LayoutVersion::Fixed);

    session.tick();
    engine.step().unwrap();
    session.tick();
    assert_eq!(engine.scenario().seed, 11);
    assert_eq!(session.last_snapshot().frame(), engine.frame());
}

#[test]
fn test_trial_feed_file_drives_session() {
    let path = std::env::temp_dir().join(format!("tether_feed_{}.jsonl", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        for seed in [101, 202, 303] {
            writeln!(
                file,
                "{{\"seed\":{seed},\"pyramid_type\":1,\"base_radius\":2.5,\"height\":4,\
                 \"start_orient\":1.0,\"target_door\":0,\
                 \"colors\":[[1,0,0,1],[0,1,0,1],[0,0,1,1]]}}"
            )
            .unwrap();
        }
    }

    let config = config();
    let trials = TrialQueue::try_load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(trials.len(), 3);

    let memory = SharedMemory::heap();
    let mut engine =
        HeadlessEngine::new(memory.clone(), OffsetTable::fixed(), engine_config()).unwrap();
    let mut session =
        Session::start(memory, None, trials, &config, Box::new(SharedStatus::new())).unwrap();

    session.tick();
    engine.step().unwrap();
    assert_eq!(engine.scenario().seed, 101);

    session.restart();
    session.restart();
    session.tick();
    engine.step().unwrap();
    assert_eq!(engine.scenario().seed, 303);
}
