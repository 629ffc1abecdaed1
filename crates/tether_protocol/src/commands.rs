//! # Command Channel
//!
//! Controller → engine intent, one byte per flag.
//!
//! ```text
//! byte  0  rotate_left        level
//! byte  1  rotate_right       level
//! byte  2  zoom_in            level
//! byte  3  zoom_out           level
//! byte  4  check_alignment    edge
//! byte  5  reset              edge
//! byte  6  blank_screen       edge (toggle)
//! byte  7  stop_rendering     edge
//! byte  8  resume_rendering   edge
//! byte  9  animation_trigger  edge
//! ```
//!
//! Levels mirror the current input every publish. Edges are true for at most
//! one publish: [`CommandChannel::publish`] clears them on the caller's
//! vector after writing, and [`CommandReader::consume`] swaps observed edge
//! bytes back to zero on the engine side.

use crate::codec::{decode_bool, encode_bool};
use crate::error::ProtocolResult;
use crate::layout::{CommandField, COMMANDS_REGION_LEN};
use crate::region::Region;

/// One tick's worth of intent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct CommandVector {
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub check_alignment: bool,
    pub reset: bool,
    pub blank_screen: bool,
    pub stop_rendering: bool,
    pub resume_rendering: bool,
    pub animation_trigger: bool,
}

impl CommandVector {
    /// All flags false.
    pub const NEUTRAL: Self = Self {
        rotate_left: false,
        rotate_right: false,
        zoom_in: false,
        zoom_out: false,
        check_alignment: false,
        reset: false,
        blank_screen: false,
        stop_rendering: false,
        resume_rendering: false,
        animation_trigger: false,
    };

    /// Reads one flag.
    #[must_use]
    pub const fn get(&self, field: CommandField) -> bool {
        match field {
            CommandField::RotateLeft => self.rotate_left,
            CommandField::RotateRight => self.rotate_right,
            CommandField::ZoomIn => self.zoom_in,
            CommandField::ZoomOut => self.zoom_out,
            CommandField::CheckAlignment => self.check_alignment,
            CommandField::Reset => self.reset,
            CommandField::BlankScreen => self.blank_screen,
            CommandField::StopRendering => self.stop_rendering,
            CommandField::ResumeRendering => self.resume_rendering,
            CommandField::AnimationTrigger => self.animation_trigger,
        }
    }

    /// Sets one flag.
    pub fn set(&mut self, field: CommandField, value: bool) {
        let slot = match field {
            CommandField::RotateLeft => &mut self.rotate_left,
            CommandField::RotateRight => &mut self.rotate_right,
            CommandField::ZoomIn => &mut self.zoom_in,
            CommandField::ZoomOut => &mut self.zoom_out,
            CommandField::CheckAlignment => &mut self.check_alignment,
            CommandField::Reset => &mut self.reset,
            CommandField::BlankScreen => &mut self.blank_screen,
            CommandField::StopRendering => &mut self.stop_rendering,
            CommandField::ResumeRendering => &mut self.resume_rendering,
            CommandField::AnimationTrigger => &mut self.animation_trigger,
        };
        *slot = value;
    }

    /// Clears every edge flag.
    pub fn clear_edges(&mut self) {
        for field in CommandField::ALL.into_iter().filter(|f| f.is_edge()) {
            self.set(field, false);
        }
    }

    /// Clears every level flag.
    pub fn clear_movement(&mut self) {
        for field in CommandField::ALL.into_iter().filter(|f| !f.is_edge()) {
            self.set(field, false);
        }
    }

    /// Any edge flag set.
    #[must_use]
    pub fn has_edges(&self) -> bool {
        CommandField::ALL
            .into_iter()
            .any(|f| f.is_edge() && self.get(f))
    }

    /// All flags false.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// ORs `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for field in CommandField::ALL {
            if other.get(field) {
                self.set(field, true);
            }
        }
    }

    /// Wire image.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; COMMANDS_REGION_LEN] {
        let mut bytes = [0u8; COMMANDS_REGION_LEN];
        for field in CommandField::ALL {
            bytes[field.offset()] = u8::from(self.get(field));
        }
        bytes
    }

    /// Decodes a wire image. Any non-zero byte is true.
    ///
    /// # Errors
    ///
    /// `bytes` is shorter than the flag block.
    pub fn from_bytes(bytes: &[u8]) -> ProtocolResult<Self> {
        let mut vector = Self::NEUTRAL;
        for field in CommandField::ALL {
            vector.set(field, decode_bool(bytes, field.offset())?);
        }
        Ok(vector)
    }
}

/// Controller-side writer of the Commands region.
#[derive(Debug)]
pub struct CommandChannel<R: Region> {
    region: R,
    publishes: u64,
}

impl<R: Region> CommandChannel<R> {
    /// Wraps an attached Commands region.
    pub const fn new(region: R) -> Self {
        Self {
            region,
            publishes: 0,
        }
    }

    /// Writes every flag in one copy, then clears the vector's edges.
    ///
    /// # Errors
    ///
    /// The region is smaller than the flag block.
    pub fn publish(&mut self, vector: &mut CommandVector) -> ProtocolResult<()> {
        let mut bytes = [0u8; COMMANDS_REGION_LEN];
        for field in CommandField::ALL {
            encode_bool(&mut bytes, field.offset(), vector.get(field))?;
        }
        self.region.write(0, &bytes)?;
        self.publishes = self.publishes.wrapping_add(1);

        if vector.has_edges() {
            tracing::debug!("Published edges {:?}", EdgeList(vector));
        }
        vector.clear_edges();
        Ok(())
    }

    /// Publishes the all-false vector.
    ///
    /// # Errors
    ///
    /// The region is smaller than the flag block.
    pub fn publish_neutral(&mut self) -> ProtocolResult<()> {
        let mut neutral = CommandVector::NEUTRAL;
        self.publish(&mut neutral)
    }

    /// Number of successful publishes.
    pub const fn publish_count(&self) -> u64 {
        self.publishes
    }

    /// The underlying region.
    pub const fn region(&self) -> &R {
        &self.region
    }

    /// Releases the region.
    pub fn into_inner(self) -> R {
        self.region
    }
}

/// Engine-side reader of the Commands region.
#[derive(Debug)]
pub struct CommandReader<R: Region> {
    region: R,
}

impl<R: Region> CommandReader<R> {
    /// Wraps an attached Commands region.
    pub const fn new(region: R) -> Self {
        Self { region }
    }

    /// Decodes every flag without touching the region.
    ///
    /// # Errors
    ///
    /// The region is smaller than the flag block.
    pub fn peek(&self) -> ProtocolResult<CommandVector> {
        let mut bytes = [0u8; COMMANDS_REGION_LEN];
        self.region.read(0, &mut bytes)?;
        CommandVector::from_bytes(&bytes)
    }

    /// Decodes every flag and swaps each observed edge byte back to zero.
    ///
    /// # Errors
    ///
    /// The region is smaller than the flag block.
    pub fn consume(&self) -> ProtocolResult<CommandVector> {
        let vector = self.peek()?;
        for field in CommandField::ALL {
            if field.is_edge() && vector.get(field) {
                self.region.write(field.offset(), &[0])?;
            }
        }
        Ok(vector)
    }
}

struct EdgeList<'a>(&'a CommandVector);

impl std::fmt::Debug for EdgeList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                CommandField::ALL
                    .into_iter()
                    .filter(|field| field.is_edge() && self.0.get(*field))
                    .map(CommandField::name),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::HeapRegion;

    fn pair() -> (CommandChannel<HeapRegion>, CommandReader<HeapRegion>) {
        let region = HeapRegion::zeroed(COMMANDS_REGION_LEN);
        (CommandChannel::new(region.clone()), CommandReader::new(region))
    }

    #[test]
    fn publish_then_decode_is_identical() {
        let (mut channel, reader) = pair();
        let mut vector = CommandVector {
            rotate_right: true,
            zoom_out: true,
            reset: true,
            animation_trigger: true,
            ..CommandVector::NEUTRAL
        };
        let expected = vector;

        channel.publish(&mut vector).unwrap();
        assert_eq!(reader.peek().unwrap(), expected);
    }

    #[test]
    fn one_byte_per_flag_in_wire_order() {
        let (mut channel, _) = pair();
        let mut vector = CommandVector {
            rotate_left: true,
            blank_screen: true,
            ..CommandVector::NEUTRAL
        };
        channel.publish(&mut vector).unwrap();

        let bytes = channel.region().to_vec();
        assert_eq!(&bytes[..10], &[1, 0, 0, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn edges_last_one_publish() {
        let (mut channel, reader) = pair();
        let mut vector = CommandVector {
            rotate_left: true,
            check_alignment: true,
            ..CommandVector::NEUTRAL
        };

        channel.publish(&mut vector).unwrap();
        assert!(reader.peek().unwrap().check_alignment);
        assert!(!vector.check_alignment);
        assert!(vector.rotate_left, "levels survive publish");

        channel.publish(&mut vector).unwrap();
        let seen = reader.peek().unwrap();
        assert!(!seen.check_alignment);
        assert!(seen.rotate_left);
        assert_eq!(channel.publish_count(), 2);
    }

    #[test]
    fn consume_swaps_edges_to_false() {
        let (mut channel, reader) = pair();
        let mut vector = CommandVector {
            zoom_in: true,
            reset: true,
            ..CommandVector::NEUTRAL
        };
        channel.publish(&mut vector).unwrap();

        let first = reader.consume().unwrap();
        assert!(first.reset);
        let second = reader.consume().unwrap();
        assert!(!second.reset);
        assert!(second.zoom_in, "levels are not consumed");
    }

    #[test]
    fn nonzero_bytes_decode_true() {
        let mut bytes = [0u8; COMMANDS_REGION_LEN];
        bytes[CommandField::StopRendering.offset()] = 0xFF;
        let vector = CommandVector::from_bytes(&bytes).unwrap();
        assert!(vector.stop_rendering);
        assert_eq!(vector.to_bytes()[7], 1);
    }

    #[test]
    fn merge_ors_flags() {
        let mut a = CommandVector {
            rotate_left: true,
            ..CommandVector::NEUTRAL
        };
        a.merge(&CommandVector {
            reset: true,
            ..CommandVector::NEUTRAL
        });
        assert!(a.rotate_left && a.reset);
        a.clear_movement();
        assert!(!a.rotate_left && a.has_edges());
        a.clear_edges();
        assert!(a.is_neutral());
    }
}
