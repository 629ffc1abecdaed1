//! Attaching the two regions.

use crate::error::{ProtocolError, ProtocolResult};
use crate::layout::{COMMANDS_REGION_LEN, STATE_REGION_LEN};
use crate::mapped::{region_path, MappedRegion};
use crate::region::{HeapRegion, Region};

/// Name of the Commands region file suffix.
pub const COMMANDS_REGION_NAME: &str = "commands";
/// Name of the State region file suffix.
pub const STATE_REGION_NAME: &str = "state";

/// The Commands and State regions of one engine/controller pair.
///
/// Both regions must hold at least the fixed v1 layout so the fallback is
/// always usable.
#[derive(Debug, Clone)]
pub struct SharedMemory<R: Region> {
    commands: R,
    state: R,
}

impl<R: Region> SharedMemory<R> {
    /// Validates region sizes and takes ownership.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::RegionTooSmall`] if either region cannot hold the
    /// fixed layout. This is the only fatal protocol error.
    pub fn attach(commands: R, state: R) -> ProtocolResult<Self> {
        check_len(COMMANDS_REGION_NAME, &commands, COMMANDS_REGION_LEN)?;
        check_len(STATE_REGION_NAME, &state, STATE_REGION_LEN)?;
        tracing::info!(
            "Attached shared memory (commands {} bytes, state {} bytes)",
            commands.len(),
            state.len()
        );
        Ok(Self { commands, state })
    }

    /// Commands region.
    pub const fn commands(&self) -> &R {
        &self.commands
    }

    /// State region.
    pub const fn state(&self) -> &R {
        &self.state
    }

    /// Splits into (commands, state).
    pub fn into_parts(self) -> (R, R) {
        (self.commands, self.state)
    }
}

fn check_len<R: Region>(region: &'static str, r: &R, required: usize) -> ProtocolResult<()> {
    let actual = r.len();
    if actual < required {
        tracing::error!(
            "{} region is {} bytes, need {}",
            region,
            actual,
            required
        );
        return Err(ProtocolError::RegionTooSmall {
            region,
            required,
            actual,
        });
    }
    Ok(())
}

impl SharedMemory<HeapRegion> {
    /// Zeroed in-process regions at the fixed sizes.
    #[must_use]
    pub fn heap() -> Self {
        Self {
            commands: HeapRegion::zeroed(COMMANDS_REGION_LEN),
            state: HeapRegion::zeroed(STATE_REGION_LEN),
        }
    }
}

impl SharedMemory<MappedRegion> {
    /// Creates both region files for `name`, zero-filled at the fixed sizes.
    ///
    /// # Errors
    ///
    /// File creation or mapping failed.
    pub fn create(name: &str) -> ProtocolResult<Self> {
        let commands = MappedRegion::create(
            region_path(name, COMMANDS_REGION_NAME),
            COMMANDS_REGION_LEN,
        )?;
        let state = MappedRegion::create(region_path(name, STATE_REGION_NAME), STATE_REGION_LEN)?;
        Self::attach(commands, state)
    }

    /// Maps both region files for `name`, created by the other side.
    ///
    /// # Errors
    ///
    /// A file is missing, cannot be mapped, or is too small.
    pub fn open(name: &str) -> ProtocolResult<Self> {
        let commands = MappedRegion::open(region_path(name, COMMANDS_REGION_NAME))?;
        let state = MappedRegion::open(region_path(name, STATE_REGION_NAME))?;
        Self::attach(commands, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undersized_state_region_is_fatal() {
        let err = SharedMemory::attach(
            HeapRegion::zeroed(COMMANDS_REGION_LEN),
            HeapRegion::zeroed(STATE_REGION_LEN - 1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::RegionTooSmall {
                region: "state",
                required: 184,
                actual: 183,
            }
        ));
    }

    #[test]
    fn oversized_regions_are_accepted() {
        let memory = SharedMemory::attach(HeapRegion::zeroed(64), HeapRegion::zeroed(4096)).unwrap();
        assert_eq!(memory.state().len(), 4096);
    }

    #[test]
    fn mapped_pair_round_trips_between_processes_views() {
        let name = format!("memtest_{}", std::process::id());
        let engine = SharedMemory::create(&name).unwrap();
        let controller = SharedMemory::open(&name).unwrap();

        controller.commands().write(3, &[1]).unwrap();
        let mut byte = [0u8; 1];
        engine.commands().read(3, &mut byte).unwrap();
        assert_eq!(byte, [1]);

        drop((engine, controller));
        let _ = std::fs::remove_file(region_path(&name, COMMANDS_REGION_NAME));
        let _ = std::fs::remove_file(region_path(&name, STATE_REGION_NAME));
    }
}
