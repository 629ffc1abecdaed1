//! # TETHER Controller - Intent In, Rounds Out
//!
//! The controller half of the engine/controller pair. Each tick it turns
//! player input into one command vector, watches the engine's alignment
//! and sequences won rounds into fresh scenarios.
//!
//! ## Architecture
//!
//! ```text
//!   keys / touches --> InputFusion --+
//!                                    +--> Session::tick --> Commands region
//!   State region --> WinSequencer ---+         |
//!                        ^                     +--> StatusSink
//!                    TrialQueue
//! ```
//!
//! ## Modules
//!
//! - [`session`]: per-controller context and the tick
//! - [`sequencer`]: win → animation → blank → next scenario
//! - [`input`]: keyboard and pointer gestures
//! - [`trials`]: JSON-lines scenario feed
//! - [`engine`]: deterministic headless engine for tests and demos

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod sequencer;
pub mod session;
pub mod status;
pub mod tick;
pub mod trials;

// Re-exports for convenience
pub use config::ControllerConfig;
pub use engine::{HeadlessEngine, HeadlessEngineConfig};
pub use error::{ConfigError, FeedError, SessionError, SessionResult};
pub use input::{InputConfig, InputFusion, Key, Point};
pub use sequencer::{SequencerConfig, SequencerStep, WinPhase, WinPolicy, WinSequencer};
pub use session::{Session, SessionMode};
pub use status::{CoarseState, LogStatus, SharedStatus, StatusSink};
pub use tick::{TickLoop, TickStats};
pub use trials::TrialQueue;
