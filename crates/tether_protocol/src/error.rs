//! # Protocol Error Types
//!
//! Only [`ProtocolError::RegionTooSmall`] is fatal, and only at attach time.
//! Everything else is absorbed by the caller with a default-and-continue
//! strategy.

use thiserror::Error;

/// A field access fell outside its region.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The field does not fit in the buffer.
    #[error("field at offset {offset} (width {width}) exceeds region of {len} bytes")]
    OutOfBounds {
        /// Byte offset of the field.
        offset: usize,
        /// Width of the field in bytes.
        width: usize,
        /// Length of the buffer.
        len: usize,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Why a negotiated layout was rejected.
///
/// Always recoverable: the resolver falls back to the fixed layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The engine does not answer the offset query.
    #[error("offset query unavailable: {0}")]
    QueryUnavailable(String),

    /// The engine's table lacks a field the controller cannot do without.
    #[error("negotiated layout is missing required field `{0}`")]
    MissingField(&'static str),

    /// The engine's table places a field past the end of the State region.
    #[error("field `{field}` at offset {offset} (width {width}) does not fit a {len}-byte state region")]
    OffsetOutOfBounds {
        /// Field name.
        field: &'static str,
        /// Offset reported by the engine.
        offset: usize,
        /// Width of the field.
        width: usize,
        /// Length of the State region.
        len: usize,
    },
}

/// Errors raised by regions and channels.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A region was provisioned smaller than the protocol needs.
    #[error("{region} region is {actual} bytes, protocol requires at least {required}")]
    RegionTooSmall {
        /// Which region.
        region: &'static str,
        /// Minimum size.
        required: usize,
        /// Provisioned size.
        actual: usize,
    },

    /// A field access fell outside its region.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Creating or mapping a native region failed.
    #[error("shared memory I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for region and channel operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
