//! # TETHER Protocol - The Shared Memory Contract
//!
//! Two independently clocked loops, one engine and one controller, talk
//! through two flat byte regions instead of messages.
//!
//! ## Architecture
//!
//! ```text
//!   CONTROLLER                                   ENGINE
//!       |                                           |
//!       |-- CommandChannel::publish --> [Commands] --> CommandReader::consume
//!       |                                           |
//!       |<-- StateChannel::snapshot <-- [ State  ] <-- StateWriter::publish_live
//!       |-- StateChannel::write_scenario --> (configuration sub-range)
//! ```
//!
//! - **Codec**: bool byte, LE u32, u64 as two u32 halves, f32 as raw bits
//! - **Layout**: fixed v1 offsets, or v2 offsets negotiated once at startup
//! - **Regions**: in-process heap buffers or file-mapped native memory
//!
//! ## Concurrency
//!
//! Single writer per field range, no protocol-level locks. Torn reads are
//! tolerated and heal on the next tick. Edges are re-asserted by the
//! controller until it observes their effect.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_protocol::{CommandChannel, CommandVector, LayoutResolver, SharedMemory, StateChannel};
//!
//! let memory = SharedMemory::heap();
//! let table = LayoutResolver::new(memory.state().len()).resolve(None);
//! let (commands, state) = memory.into_parts();
//!
//! let mut commands = CommandChannel::new(commands);
//! let mut state = StateChannel::new(state, table);
//!
//! let snapshot = state.snapshot()?;
//! let mut intent = CommandVector { rotate_left: true, ..CommandVector::NEUTRAL };
//! commands.publish(&mut intent)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod codec;
pub mod commands;
pub mod error;
pub mod layout;
pub mod mapped;
pub mod memory;
pub mod region;
pub mod state;

// Re-exports for convenience
pub use commands::{CommandChannel, CommandReader, CommandVector};
pub use error::{CodecError, CodecResult, LayoutError, ProtocolError, ProtocolResult};
pub use layout::{
    CommandField, LayoutResolver, LayoutVersion, OffsetMap, OffsetQuery, OffsetTable, StateField,
    COMMANDS_REGION_LEN, STATE_REGION_LEN,
};
pub use mapped::MappedRegion;
pub use memory::SharedMemory;
pub use region::{HeapRegion, Region};
pub use state::{Alignment, LiveState, StateChannel, StateSnapshot, StateWriter};
