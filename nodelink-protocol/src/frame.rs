//! Frame encoding and decoding for the nodelink protocol.
//!
//! Frame format:
//! - PREAMBLE (2 bytes): 0xF0 0xCA
//! - TYPE (1 byte): command code
//! - LENGTH (1 byte): payload length
//! - DATA (LENGTH bytes): command-specific payload
//! - CHECKSUM (1 byte): sum of TYPE, LENGTH and DATA bytes, modulo 256
//! - POSTAMBLE (2 bytes): 0x53 0x0F

use heapless::Vec;

use crate::checksum::frame_checksum;
use crate::packet::Packet;

/// First frame start marker
pub const PREAMBLE1: u8 = 0xF0;
/// Second frame start marker
pub const PREAMBLE2: u8 = 0xCA;
/// First frame end marker
pub const POSTAMBLE1: u8 = 0x53;
/// Second frame end marker
pub const POSTAMBLE2: u8 = 0x0F;

pub const PREAMBLE_SIZE: usize = 2;
pub const TYPE_FIELD_SIZE: usize = 1;
pub const DATA_LENGTH_FIELD_SIZE: usize = 1;
pub const CHECKSUM_FIELD_SIZE: usize = 1;
pub const POSTAMBLE_SIZE: usize = 2;

/// Bytes in a frame besides the payload
pub const NON_DATA_SIZE: usize = PREAMBLE_SIZE
    + TYPE_FIELD_SIZE
    + DATA_LENGTH_FIELD_SIZE
    + CHECKSUM_FIELD_SIZE
    + POSTAMBLE_SIZE;

pub const TYPE_OFFSET: usize = 2;
pub const DATA_LENGTH_OFFSET: usize = 3;
pub const DATA_START_OFFSET: usize = 4;

/// Receive buffer size of the node firmware
pub const RX_COMMAND_BUFFER_LENGTH: usize = 32;
/// Transmit buffer size of the node firmware
pub const TX_COMMAND_BUFFER_LENGTH: usize = 32;

/// Largest payload a node can send or accept
pub const MAX_PAYLOAD_SIZE: usize = TX_COMMAND_BUFFER_LENGTH - NON_DATA_SIZE;

/// Largest frame a node can send or accept
pub const MAX_FRAME_SIZE: usize = TX_COMMAND_BUFFER_LENGTH;

/// Total frame length for a payload of `data_length` bytes
pub const fn frame_len(data_length: usize) -> usize {
    NON_DATA_SIZE + data_length
}

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Frame does not start with the preamble
    InvalidPreamble,
    /// Frame does not end with the postamble
    InvalidPostamble,
    /// LENGTH field disagrees with the number of bytes supplied
    InvalidLength,
    /// Checksum mismatch
    InvalidChecksum,
}

/// Encode a frame into `buffer`
///
/// Returns the number of bytes written. The payload is bounded only by the
/// LENGTH byte and the size of `buffer`.
pub fn encode(type_id: u8, data: &[u8], buffer: &mut [u8]) -> Result<usize, FrameError> {
    if data.len() > u8::MAX as usize {
        return Err(FrameError::PayloadTooLarge);
    }
    let len = frame_len(data.len());
    if buffer.len() < len {
        return Err(FrameError::BufferTooSmall);
    }

    let length = data.len() as u8;
    let end = DATA_START_OFFSET + data.len();

    buffer[0] = PREAMBLE1;
    buffer[1] = PREAMBLE2;
    buffer[TYPE_OFFSET] = type_id;
    buffer[DATA_LENGTH_OFFSET] = length;
    buffer[DATA_START_OFFSET..end].copy_from_slice(data);
    buffer[end] = frame_checksum(type_id, length, data);
    buffer[end + 1] = POSTAMBLE1;
    buffer[end + 2] = POSTAMBLE2;

    Ok(len)
}

/// Encode a frame into a heapless Vec of capacity `M`
pub fn encode_to_vec<const M: usize>(type_id: u8, data: &[u8]) -> Result<Vec<u8, M>, FrameError> {
    let mut vec = Vec::new();
    vec.resize_default(frame_len(data.len()).min(M))
        .map_err(|_| FrameError::BufferTooSmall)?;
    let len = encode(type_id, data, &mut vec)?;
    vec.truncate(len);
    Ok(vec)
}

/// Decode exactly one complete frame
///
/// The returned packet borrows its payload from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Packet<'_>, FrameError> {
    if bytes.len() < NON_DATA_SIZE {
        return Err(FrameError::Incomplete);
    }
    if bytes[0] != PREAMBLE1 || bytes[1] != PREAMBLE2 {
        return Err(FrameError::InvalidPreamble);
    }

    let length = bytes[DATA_LENGTH_OFFSET];
    let len = frame_len(length as usize);
    if bytes.len() < len {
        return Err(FrameError::Incomplete);
    }
    if bytes.len() > len {
        return Err(FrameError::InvalidLength);
    }

    let end = DATA_START_OFFSET + length as usize;
    if bytes[end + 1] != POSTAMBLE1 || bytes[end + 2] != POSTAMBLE2 {
        return Err(FrameError::InvalidPostamble);
    }

    let type_id = bytes[TYPE_OFFSET];
    let data = &bytes[DATA_START_OFFSET..end];
    if bytes[end] != frame_checksum(type_id, length, data) {
        return Err(FrameError::InvalidChecksum);
    }

    Ok(Packet::from_parts(type_id, data))
}

/// An owned frame, for building replies or keeping a received packet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Command code
    pub type_id: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given command code and payload
    pub fn new(type_id: impl Into<u8>, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            type_id: type_id.into(),
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(type_id: impl Into<u8>) -> Self {
        Self {
            type_id: type_id.into(),
            payload: Vec::new(),
        }
    }

    /// Borrow this frame as a packet view
    pub fn as_packet(&self) -> Packet<'_> {
        Packet::from_parts(self.type_id, &self.payload)
    }

    /// Encoded size of this frame
    pub fn encoded_len(&self) -> usize {
        frame_len(self.payload.len())
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        encode(self.type_id, &self.payload, buffer)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        encode_to_vec(self.type_id, &self.payload)
    }
}
