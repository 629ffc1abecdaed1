//! # TETHER Shared
//!
//! Constants and value types used on both sides of the engine/controller
//! shared memory boundary.
//!
//! ## RULE
//!
//! This crate performs no memory access and no I/O. Anything that touches
//! a region belongs in `tether_protocol`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod scenario;

pub use constants::{
    COSINE_ALIGNMENT_TO_WIN, REFRESH_RATE_HZ, WIN_BAND_CEILING, WIN_BLANK_DURATION_FRAMES,
};
pub use scenario::{Rgba, ScenarioConfig, ScenarioType};
