//! # Field Codec
//!
//! Encode/decode for every wire field type, independent of any region.
//!
//! ## Wire Types
//!
//! ```text
//! bool   1 byte    0x00 = false, anything else = true (writers emit 0x01)
//! u32    4 bytes   little-endian
//! u64    8 bytes   two u32 halves, low half first
//! f32    4 bytes   raw IEEE-754 bit pattern as u32
//! ```
//!
//! Floats never go through a decimal representation, so every value
//! (NaN payloads, infinities, signed zero) survives the round trip.

use crate::error::{CodecError, CodecResult};

/// Width of a bool field.
pub const BOOL_WIDTH: usize = 1;
/// Width of a u32 field.
pub const U32_WIDTH: usize = 4;
/// Width of a u64 field.
pub const U64_WIDTH: usize = 8;
/// Width of an f32 field.
pub const F32_WIDTH: usize = 4;

#[inline]
fn check(len: usize, offset: usize, width: usize) -> CodecResult<()> {
    match offset.checked_add(width) {
        Some(end) if end <= len => Ok(()),
        _ => Err(CodecError::OutOfBounds { offset, width, len }),
    }
}

/// Checks that `width` bytes at `offset` fit in a buffer of `len` bytes.
#[inline]
pub fn check_bounds(len: usize, offset: usize, width: usize) -> CodecResult<()> {
    check(len, offset, width)
}

/// Writes a bool byte.
#[inline]
pub fn encode_bool(buf: &mut [u8], offset: usize, value: bool) -> CodecResult<()> {
    check(buf.len(), offset, BOOL_WIDTH)?;
    buf[offset] = u8::from(value);
    Ok(())
}

/// Reads a bool byte.
#[inline]
pub fn decode_bool(buf: &[u8], offset: usize) -> CodecResult<bool> {
    check(buf.len(), offset, BOOL_WIDTH)?;
    Ok(buf[offset] != 0)
}

/// Writes a u32 in little-endian format.
#[inline]
pub fn encode_u32(buf: &mut [u8], offset: usize, value: u32) -> CodecResult<()> {
    check(buf.len(), offset, U32_WIDTH)?;
    buf[offset..offset + U32_WIDTH].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Reads a u32 in little-endian format.
#[inline]
pub fn decode_u32(buf: &[u8], offset: usize) -> CodecResult<u32> {
    check(buf.len(), offset, U32_WIDTH)?;
    Ok(u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

/// Splits a u64 into its (low, high) u32 halves.
#[inline]
#[must_use]
pub const fn split_u64(value: u64) -> (u32, u32) {
    (value as u32, (value >> 32) as u32)
}

/// Joins (low, high) u32 halves into a u64.
#[inline]
#[must_use]
pub const fn join_u64(low: u32, high: u32) -> u64 {
    (high as u64) << 32 | low as u64
}

/// Writes a u64 as two little-endian u32 halves, low half first.
#[inline]
pub fn encode_u64(buf: &mut [u8], offset: usize, value: u64) -> CodecResult<()> {
    check(buf.len(), offset, U64_WIDTH)?;
    let (low, high) = split_u64(value);
    encode_u32(buf, offset, low)?;
    encode_u32(buf, offset + U32_WIDTH, high)
}

/// Reads a u64 stored as two little-endian u32 halves.
#[inline]
pub fn decode_u64(buf: &[u8], offset: usize) -> CodecResult<u64> {
    check(buf.len(), offset, U64_WIDTH)?;
    let low = decode_u32(buf, offset)?;
    let high = decode_u32(buf, offset + U32_WIDTH)?;
    Ok(join_u64(low, high))
}

/// Writes an f32 as its raw bit pattern.
#[inline]
pub fn encode_f32(buf: &mut [u8], offset: usize, value: f32) -> CodecResult<()> {
    encode_u32(buf, offset, value.to_bits())
}

/// Reads an f32 from its raw bit pattern.
#[inline]
pub fn decode_f32(buf: &[u8], offset: usize) -> CodecResult<f32> {
    decode_u32(buf, offset).map(f32::from_bits)
}

/// Writes consecutive f32 values starting at `offset`.
pub fn encode_f32_slice(buf: &mut [u8], offset: usize, values: &[f32]) -> CodecResult<()> {
    check(buf.len(), offset, values.len() * F32_WIDTH)?;
    for (i, value) in values.iter().enumerate() {
        encode_f32(buf, offset + i * F32_WIDTH, *value)?;
    }
    Ok(())
}

/// Reads `N` consecutive f32 values starting at `offset`.
pub fn decode_f32_array<const N: usize>(buf: &[u8], offset: usize) -> CodecResult<[f32; N]> {
    check(buf.len(), offset, N * F32_WIDTH)?;
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = decode_f32(buf, offset + i * F32_WIDTH)?;
    }
    Ok(out)
}

/// Writes consecutive u32 values starting at `offset`.
pub fn encode_u32_slice(buf: &mut [u8], offset: usize, values: &[u32]) -> CodecResult<()> {
    check(buf.len(), offset, values.len() * U32_WIDTH)?;
    for (i, value) in values.iter().enumerate() {
        encode_u32(buf, offset + i * U32_WIDTH, *value)?;
    }
    Ok(())
}

/// Reads `N` consecutive u32 values starting at `offset`.
pub fn decode_u32_array<const N: usize>(buf: &[u8], offset: usize) -> CodecResult<[u32; N]> {
    check(buf.len(), offset, N * U32_WIDTH)?;
    let mut out = [0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = decode_u32(buf, offset + i * U32_WIDTH)?;
    }
    Ok(out)
}
