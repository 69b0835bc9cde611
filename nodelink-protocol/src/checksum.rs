//! Frame checksum
//!
//! The checksum covers the TYPE, LENGTH and DATA fields of a frame and is
//! the 8-bit truncated sum of those bytes. Encoder and receiver both go
//! through [`checksum`]; a peer using any other arithmetic will have every
//! frame dropped.

/// Compute the checksum of a byte span
///
/// Sum of all bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

/// Checksum of a frame given its fields separately
///
/// Equivalent to `checksum(&[type_id, length, data...])` without having to
/// assemble the span first.
pub fn frame_checksum(type_id: u8, length: u8, data: &[u8]) -> u8 {
    type_id.wrapping_add(length).wrapping_add(checksum(data))
}
