//! # TETHER Controller
//!
//! Runs one controller session against an engine.
//!
//! ```bash
//! # Attach to an engine's file-mapped regions (named "tether" by default)
//! ./tether_controller --config controller.toml --trials trials.jsonl
//!
//! # Self-contained demo against the in-process headless engine
//! RUST_LOG=debug ./tether_controller --headless --frames 900
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tether_controller::{
    ControllerConfig, HeadlessEngine, HeadlessEngineConfig, Key, LogStatus, Session, TickLoop,
    TrialQueue,
};
use tether_protocol::{MappedRegion, OffsetTable, ProtocolError, Region, SharedMemory};

#[derive(Parser, Debug)]
#[command(name = "tether_controller")]
#[command(about = "Drives an engine over shared memory: input in, won rounds out")]
struct Cli {
    /// Controller config (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trial feed (one JSON scenario per line); overrides the config.
    #[arg(long)]
    trials: Option<PathBuf>,

    /// Shared memory name; overrides the config.
    #[arg(long)]
    shm: Option<String>,

    /// Run against the in-process headless engine.
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Stop after this many ticks.
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(path) = cli.trials {
        config.trials_path = Some(path);
    }
    if let Some(name) = cli.shm {
        config.shm_name = name;
    }

    let trials = config
        .trials_path
        .as_ref()
        .map_or_else(TrialQueue::builtin, TrialQueue::load);

    if cli.headless {
        run_headless(&config, trials, cli.frames)
    } else {
        run_mapped(&config, trials, cli.frames)
    }
}

/// Controller and headless engine in one process. The right arrow is held
/// down so the object keeps sweeping through the aligned orientation.
fn run_headless(
    config: &ControllerConfig,
    trials: TrialQueue,
    frames: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let memory = SharedMemory::heap();
    let mut engine = HeadlessEngine::new(
        memory.clone(),
        OffsetTable::fixed(),
        HeadlessEngineConfig::default(),
    )?;
    let mut session = Session::start(
        memory,
        Some(&engine),
        trials,
        config,
        Box::<LogStatus>::default(),
    )?;
    session.input_mut().key_down(Key::Right);

    drive(config, &mut session, frames, || engine.step())?;

    tracing::info!(
        "Headless run finished at engine frame {} after {} resets",
        engine.frame(),
        engine.resets()
    );
    session.teardown();
    Ok(())
}

/// Controller attached to an engine's mapped regions, created if the engine
/// has not made them yet.
fn run_mapped(
    config: &ControllerConfig,
    trials: TrialQueue,
    frames: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let memory = match SharedMemory::<MappedRegion>::open(&config.shm_name) {
        Ok(memory) => memory,
        Err(e) => {
            tracing::info!("No regions to open ({}), creating {}", e, config.shm_name);
            SharedMemory::<MappedRegion>::create(&config.shm_name)?
        }
    };
    let mut session =
        Session::start(memory, None, trials, config, Box::<LogStatus>::default())?;

    drive(config, &mut session, frames, || Ok::<_, ProtocolError>(()))?;

    let (commands, state) = session.teardown();
    commands.flush()?;
    state.flush()?;
    Ok(())
}

fn drive<R: Region, E>(
    config: &ControllerConfig,
    session: &mut Session<R>,
    frames: Option<u64>,
    mut before_tick: impl FnMut() -> Result<(), E>,
) -> Result<(), E> {
    let mut tick_loop = TickLoop::new(config.tick_rate_hz);
    loop {
        while tick_loop.should_tick() {
            let start = tick_loop.begin_tick();
            before_tick()?;
            session.tick();
            tick_loop.end_tick(start);

            if frames.is_some_and(|limit| tick_loop.tick_count() >= limit) {
                let stats = tick_loop.stats();
                tracing::info!(
                    "Stopping after {} ticks (avg {} us, {:.1}% late, {} skipped)",
                    stats.total_ticks,
                    stats.avg_tick_us,
                    stats.late_percent(),
                    stats.skipped_ticks
                );
                return Ok(());
            }
        }
        tick_loop.wait_for_next_tick();
    }
}
