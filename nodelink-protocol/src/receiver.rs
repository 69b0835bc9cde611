//! Receive state machine
//!
//! Turns an unstructured byte stream into validated packets, one byte at a
//! time, inside a fixed buffer. Anything that does not frame up correctly
//! (noise, truncated frames, bad checksums, frames too large for the
//! buffer) is dropped and the parser goes back to hunting for a preamble.

use crate::checksum::checksum;
use crate::frame::{
    CHECKSUM_FIELD_SIZE, DATA_LENGTH_OFFSET, DATA_START_OFFSET, NON_DATA_SIZE, POSTAMBLE1,
    POSTAMBLE2, PREAMBLE1, PREAMBLE2, RX_COMMAND_BUFFER_LENGTH, TYPE_OFFSET,
};
use crate::packet::Packet;

/// Parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Waiting for the first preamble byte
    SearchPreamble1,
    /// Got PREAMBLE1, waiting for PREAMBLE2
    SearchPreamble2,
    /// Storing TYPE, LENGTH, DATA and CHECKSUM
    ReceiveCommand,
    /// Waiting for the first postamble byte
    SearchPostamble1,
    /// Waiting for the second postamble byte
    SearchPostamble2,
    /// Frame too large; discarding until the next PREAMBLE1
    BufferOverflow,
}

impl ParseState {
    /// Diagnostic name
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParseState::SearchPreamble1 => "SRCH_PREAMBLE1",
            ParseState::SearchPreamble2 => "SRCH_PREAMBLE2",
            ParseState::ReceiveCommand => "RECV_COMMAND",
            ParseState::SearchPostamble1 => "SRCH_POSTAMBLE1",
            ParseState::SearchPostamble2 => "SRCH_POSTAMBLE2",
            ParseState::BufferOverflow => "BUF_OVERFLOW",
        }
    }
}

impl core::fmt::Display for ParseState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link health counters
///
/// All counters wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStats {
    /// Frames that validated and were published
    pub packets: u32,
    /// Well-formed frames dropped for a checksum mismatch
    pub checksum_errors: u32,
    /// Frames abandoned on a missing PREAMBLE2 or postamble byte
    pub framing_errors: u32,
    /// Frames too large for the receive buffer
    pub overflows: u32,
}

/// Byte-at-a-time frame parser over a fixed `N`-byte buffer
#[derive(Debug, Clone)]
pub struct Receiver<const N: usize = RX_COMMAND_BUFFER_LENGTH> {
    state: ParseState,
    buffer: [u8; N],
    /// Write position; also the number of valid bytes of the current frame
    cursor: usize,
    /// The buffer holds a validated frame that has not been overwritten
    published: bool,
    stats: RxStats,
}

impl<const N: usize> Default for Receiver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Receiver<N> {
    /// Buffer capacity in bytes
    pub const CAPACITY: usize = N;

    /// Largest payload that fits in the buffer
    pub const MAX_DATA_LENGTH: usize = N - NON_DATA_SIZE;

    /// Create a new receiver
    pub const fn new() -> Self {
        const { assert!(N >= NON_DATA_SIZE, "receive buffer cannot hold an empty frame") };

        Self {
            state: ParseState::SearchPreamble1,
            buffer: [0; N],
            cursor: 0,
            published: false,
            stats: RxStats {
                packets: 0,
                checksum_errors: 0,
                framing_errors: 0,
                overflows: 0,
            },
        }
    }

    /// Current parser state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Link health counters
    pub fn stats(&self) -> RxStats {
        self.stats
    }

    /// Bytes of the current frame stored so far
    pub fn buffered(&self) -> usize {
        self.cursor
    }

    /// Most recently published packet
    ///
    /// `None` before the first valid frame, after [`reset`](Self::reset),
    /// and once the start of a new frame has been stored over it.
    pub fn packet(&self) -> Option<Packet<'_>> {
        if !self.published {
            return None;
        }
        let length = self.buffer[DATA_LENGTH_OFFSET] as usize;
        let data = &self.buffer[DATA_START_OFFSET..DATA_START_OFFSET + length];
        Some(Packet::from_parts(self.buffer[TYPE_OFFSET], data))
    }

    /// Return to the initial state and drop any partial or published frame
    pub fn reset(&mut self) {
        self.state = ParseState::SearchPreamble1;
        self.cursor = 0;
        self.published = false;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `true` when this byte completed a valid frame; the packet is
    /// then available from [`packet`](Self::packet).
    pub fn feed(&mut self, byte: u8) -> bool {
        match self.state {
            ParseState::SearchPreamble1 | ParseState::BufferOverflow => {
                if byte == PREAMBLE1 {
                    self.start_frame();
                }
            }
            ParseState::SearchPreamble2 => {
                if byte == PREAMBLE2 {
                    self.store(byte);
                    self.state = ParseState::ReceiveCommand;
                } else if byte == PREAMBLE1 {
                    self.start_frame();
                } else {
                    self.framing_error(byte);
                }
            }
            ParseState::ReceiveCommand => {
                if !self.store(byte) {
                    self.overflow();
                } else if self.cursor == DATA_LENGTH_OFFSET + 1 {
                    if NON_DATA_SIZE + byte as usize > N {
                        self.overflow();
                    }
                } else if self.cursor > DATA_LENGTH_OFFSET + 1
                    && self.cursor == DATA_START_OFFSET + self.data_length() + CHECKSUM_FIELD_SIZE
                {
                    self.state = ParseState::SearchPostamble1;
                }
            }
            ParseState::SearchPostamble1 => {
                if byte != POSTAMBLE1 {
                    self.framing_error(byte);
                } else if !self.store(byte) {
                    self.overflow();
                } else {
                    self.state = ParseState::SearchPostamble2;
                }
            }
            ParseState::SearchPostamble2 => {
                if byte != POSTAMBLE2 {
                    self.framing_error(byte);
                } else if !self.store(byte) {
                    self.overflow();
                } else {
                    self.state = ParseState::SearchPreamble1;
                    return self.validate();
                }
            }
        }
        false
    }

    /// Feed bytes until one completes a frame
    ///
    /// Returns the number of bytes consumed and whether a packet was
    /// published. Bytes after a completed frame are left for the caller.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, bool) {
        for (i, &byte) in bytes.iter().enumerate() {
            if self.feed(byte) {
                return (i + 1, true);
            }
        }
        (bytes.len(), false)
    }

    /// LENGTH field of the frame in the buffer
    fn data_length(&self) -> usize {
        self.buffer[DATA_LENGTH_OFFSET] as usize
    }

    /// Begin a new frame with PREAMBLE1 at offset 0
    fn start_frame(&mut self) {
        self.published = false;
        self.cursor = 0;
        self.store(PREAMBLE1);
        self.state = ParseState::SearchPreamble2;
    }

    /// Append a byte; false if the buffer is full
    fn store(&mut self, byte: u8) -> bool {
        match self.buffer.get_mut(self.cursor) {
            Some(slot) => {
                *slot = byte;
                self.cursor += 1;
                true
            }
            None => false,
        }
    }

    fn overflow(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "RX buffer overflow: declared length {} exceeds capacity {}",
            self.buffer[DATA_LENGTH_OFFSET],
            N
        );
        self.stats.overflows = self.stats.overflows.wrapping_add(1);
        self.state = ParseState::BufferOverflow;
    }

    fn framing_error(&mut self, _byte: u8) {
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Framing error in {}: unexpected {=u8:#x}, resyncing",
            self.state.as_str(),
            _byte
        );
        self.stats.framing_errors = self.stats.framing_errors.wrapping_add(1);
        self.state = ParseState::SearchPreamble1;
    }

    /// Check the completed frame and publish it if the checksum matches
    fn validate(&mut self) -> bool {
        let end = DATA_START_OFFSET + self.data_length();
        let expected = checksum(&self.buffer[TYPE_OFFSET..end]);

        if self.buffer[end] != expected {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Checksum mismatch: got {=u8:#x}, expected {=u8:#x}",
                self.buffer[end],
                expected
            );
            self.stats.checksum_errors = self.stats.checksum_errors.wrapping_add(1);
            return false;
        }

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "RX packet type {=u8:#x}, {} data bytes",
            self.buffer[TYPE_OFFSET],
            self.data_length()
        );
        self.stats.packets = self.stats.packets.wrapping_add(1);
        self.published = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_to_vec, Frame, MAX_FRAME_SIZE};
    use crate::packet::PacketType;
    use heapless::Vec;
    use proptest::prelude::*;

    fn frame_bytes(packet_type: PacketType, data: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
        Frame::new(packet_type, data).unwrap().encode_to_vec().unwrap()
    }

    fn feed_all<const N: usize>(rx: &mut Receiver<N>, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| rx.feed(b)).count()
    }

    #[test]
    fn test_initial_state() {
        let rx: Receiver = Receiver::new();
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert!(rx.packet().is_none());
        assert_eq!(rx.buffered(), 0);
    }

    #[test]
    fn test_literal_uptime_frame() {
        let mut rx: Receiver = Receiver::new();
        let published = feed_all(&mut rx, &[0xF0, 0xCA, 0x00, 0x00, 0x00, 0x53, 0x0F]);

        assert_eq!(published, 1);
        let packet = rx.packet().unwrap();
        assert_eq!(packet.packet_type(), PacketType::GetUptime);
        assert_eq!(packet.data_length(), 0);
        assert!(!packet.has_data());
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
    }

    #[test]
    fn test_state_walk() {
        let mut rx: Receiver = Receiver::new();
        let bytes = frame_bytes(PacketType::SetDdsSpeed, &[5, 6]);
        let expected = [
            ParseState::SearchPreamble2,  // F0
            ParseState::ReceiveCommand,   // CA
            ParseState::ReceiveCommand,   // type
            ParseState::ReceiveCommand,   // length
            ParseState::ReceiveCommand,   // data 0
            ParseState::ReceiveCommand,   // data 1
            ParseState::SearchPostamble1, // checksum
            ParseState::SearchPostamble2, // 53
            ParseState::SearchPreamble1,  // 0F
        ];

        for (&byte, &state) in bytes.iter().zip(expected.iter()) {
            rx.feed(byte);
            assert_eq!(rx.state(), state);
        }
        assert_eq!(rx.packet().unwrap().data(), &[5, 6]);
    }

    #[test]
    fn test_repeated_preamble1_resyncs() {
        let mut rx: Receiver = Receiver::new();
        let bytes = frame_bytes(PacketType::GetBattLvl, &[]);

        rx.feed(0xF0);
        rx.feed(0xF0);
        assert_eq!(rx.state(), ParseState::SearchPreamble2);
        assert_eq!(feed_all(&mut rx, &bytes[1..]), 1);
        assert_eq!(rx.packet().unwrap().packet_type(), PacketType::GetBattLvl);
    }

    #[test]
    fn test_broken_preamble_returns_to_search() {
        let mut rx: Receiver = Receiver::new();
        rx.feed(0xF0);
        rx.feed(0x00);
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.stats().framing_errors, 1);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut rx: Receiver = Receiver::new();
        let garbage = [0x00, 0xFF, 0x12, 0xCA, 0x53, 0x0F, 0x34];
        let frame = frame_bytes(PacketType::GetRfAmbient, &[0xAB]);

        assert_eq!(feed_all(&mut rx, &garbage), 0);
        assert_eq!(feed_all(&mut rx, &frame), 1);
        let packet = rx.packet().unwrap();
        assert_eq!(packet.packet_type(), PacketType::GetRfAmbient);
        assert_eq!(packet.data(), &[0xAB]);
    }

    #[test]
    fn test_checksum_rejection() {
        let mut rx: Receiver = Receiver::new();
        let mut bytes = frame_bytes(PacketType::SetEmChargeEnable, &[1]);
        bytes[4] = 0;

        assert_eq!(feed_all(&mut rx, &bytes), 0);
        assert!(rx.packet().is_none());
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.stats().checksum_errors, 1);
    }

    #[test]
    fn test_corrupted_type_rejected() {
        let mut rx: Receiver = Receiver::new();
        let mut bytes = frame_bytes(PacketType::SetDdsSpeed, &[0x10, 0xF0]);
        bytes[TYPE_OFFSET] = 0x12;

        assert_eq!(feed_all(&mut rx, &bytes), 0);
        assert!(rx.packet().is_none());
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.stats().checksum_errors, 1);
    }

    #[test]
    fn test_corrupted_length_rejected() {
        // F0 CA 11 02 10 F0 13 53 0F
        let good = frame_bytes(PacketType::SetDdsSpeed, &[0x10, 0xF0]);

        // Shorter: 0xF0 is taken as the checksum and 0x13 breaks the postamble
        let mut rx: Receiver = Receiver::new();
        let mut bytes = good.clone();
        bytes[DATA_LENGTH_OFFSET] = 0x01;
        assert_eq!(feed_all(&mut rx, &bytes), 0);
        assert!(rx.packet().is_none());
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.stats().framing_errors, 1);
        assert_eq!(rx.stats().checksum_errors, 0);

        // Longer: 0x53 is taken as the checksum and 0x0F breaks the postamble
        let mut rx: Receiver = Receiver::new();
        let mut bytes = good.clone();
        bytes[DATA_LENGTH_OFFSET] = 0x03;
        assert_eq!(feed_all(&mut rx, &bytes), 0);
        assert!(rx.packet().is_none());
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.stats().framing_errors, 1);

        // Both recover on the next frame
        assert_eq!(feed_all(&mut rx, &good), 1);
        assert_eq!(rx.packet().unwrap().data(), &[0x10, 0xF0]);
    }

    #[test]
    fn test_bad_postamble_drops_frame() {
        let mut rx: Receiver = Receiver::new();
        let mut bytes = frame_bytes(PacketType::GetPmStatus, &[]);
        bytes[5] = 0x54;

        assert_eq!(feed_all(&mut rx, &bytes[..6]), 0);
        assert_eq!(rx.state(), ParseState::SearchPreamble1);

        let mut rx: Receiver = Receiver::new();
        let mut bytes = frame_bytes(PacketType::GetPmStatus, &[]);
        bytes[6] = 0x10;
        assert_eq!(feed_all(&mut rx, &bytes), 0);
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.stats().framing_errors, 1);
    }

    #[test]
    fn test_overflow_recovery() {
        let mut rx: Receiver = Receiver::new();

        // Declares 26 data bytes: 33 byte frame in a 32 byte buffer
        let oversized = [0xF0, 0xCA, 0xA1, 26];
        assert_eq!(feed_all(&mut rx, &oversized), 0);
        assert_eq!(rx.state(), ParseState::BufferOverflow);

        // The rest of the oversized frame is discarded
        let filler = [0x11u8; 26];
        assert_eq!(feed_all(&mut rx, &filler), 0);
        assert_eq!(feed_all(&mut rx, &[0x00, 0x53, 0x0F]), 0);
        assert_eq!(rx.state(), ParseState::BufferOverflow);

        let frame = frame_bytes(PacketType::ReadNfc, &[2]);
        assert_eq!(feed_all(&mut rx, &frame), 1);
        assert_eq!(rx.packet().unwrap().packet_type(), PacketType::ReadNfc);
        assert_eq!(rx.stats().overflows, 1);
    }

    #[test]
    fn test_largest_frame_fits() {
        let mut rx: Receiver = Receiver::new();
        let data = [0x5Au8; Receiver::<32>::MAX_DATA_LENGTH];
        let bytes = frame_bytes(PacketType::WriteNfc, &data);

        assert_eq!(bytes.len(), 32);
        assert_eq!(feed_all(&mut rx, &bytes), 1);
        assert_eq!(rx.packet().unwrap().data(), &data[..]);
    }

    #[test]
    fn test_small_buffer_overflows_on_length() {
        let mut rx: Receiver<8> = Receiver::new();
        let bytes = encode_to_vec::<16>(0x11, &[1, 2]).unwrap();

        assert_eq!(feed_all(&mut rx, &bytes), 0);
        assert_eq!(rx.stats().overflows, 1);

        let bytes = encode_to_vec::<16>(0x11, &[1]).unwrap();
        assert_eq!(feed_all(&mut rx, &bytes), 1);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut rx: Receiver = Receiver::new();
        let first = frame_bytes(PacketType::SetLiftActuatorPosition, &[0x10, 0x20]);
        let second = frame_bytes(PacketType::GetLiftActuatorState, &[]);
        let mut stream: Vec<u8, 64> = Vec::new();
        stream.extend_from_slice(&first).unwrap();
        stream.extend_from_slice(&second).unwrap();

        let (used, published) = rx.feed_bytes(&stream);
        assert!(published);
        assert_eq!(used, first.len());
        let packet = rx.packet().unwrap();
        assert_eq!(packet.packet_type(), PacketType::SetLiftActuatorPosition);
        assert_eq!(packet.data(), &[0x10, 0x20]);

        let (used, published) = rx.feed_bytes(&stream[first.len()..]);
        assert!(published);
        assert_eq!(used, second.len());
        assert_eq!(
            rx.packet().unwrap().packet_type(),
            PacketType::GetLiftActuatorState
        );
        assert_eq!(rx.stats().packets, 2);
    }

    #[test]
    fn test_new_frame_invalidates_packet() {
        let mut rx: Receiver = Receiver::new();
        feed_all(&mut rx, &frame_bytes(PacketType::GetUptime, &[]));
        assert!(rx.packet().is_some());

        rx.feed(0x01);
        assert!(rx.packet().is_some());
        rx.feed(PREAMBLE1);
        assert!(rx.packet().is_none());
    }

    #[test]
    fn test_reset_mid_frame() {
        let mut rx: Receiver = Receiver::new();
        let bytes = frame_bytes(PacketType::SetDdsParams, &[1, 2, 3]);

        feed_all(&mut rx, &bytes[..5]);
        assert_eq!(rx.state(), ParseState::ReceiveCommand);
        rx.reset();
        assert_eq!(rx.state(), ParseState::SearchPreamble1);
        assert_eq!(rx.buffered(), 0);

        // The tail of the abandoned frame is not mistaken for a frame
        assert_eq!(feed_all(&mut rx, &bytes[5..]), 0);
        assert_eq!(feed_all(&mut rx, &bytes), 1);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ParseState::SearchPreamble1.as_str(), "SRCH_PREAMBLE1");
        assert_eq!(ParseState::BufferOverflow.as_str(), "BUF_OVERFLOW");
    }

    proptest! {
        #[test]
        fn prop_receiver_roundtrip(
            type_id in any::<u8>(),
            data in proptest::collection::vec(
                any::<u8>(),
                0..=Receiver::<32>::MAX_DATA_LENGTH,
            ),
        ) {
            let mut rx: Receiver = Receiver::new();
            let bytes = encode_to_vec::<MAX_FRAME_SIZE>(type_id, &data).unwrap();

            let (used, published) = rx.feed_bytes(&bytes);
            prop_assert!(published);
            prop_assert_eq!(used, bytes.len());
            let packet = rx.packet().unwrap();
            prop_assert_eq!(packet.type_id(), type_id);
            prop_assert_eq!(packet.data(), &data[..]);
        }

        #[test]
        fn prop_resync_after_noise(
            noise in proptest::collection::vec(
                any::<u8>().prop_filter("no preamble", |b| *b != PREAMBLE1),
                0..64,
            ),
            data in proptest::collection::vec(any::<u8>(), 0..=8),
        ) {
            let mut rx: Receiver = Receiver::new();
            let type_id = PacketType::WriteSmbusBlockData.as_u8();
            let bytes = encode_to_vec::<MAX_FRAME_SIZE>(type_id, &data).unwrap();

            prop_assert_eq!(feed_all(&mut rx, &noise), 0);
            prop_assert_eq!(feed_all(&mut rx, &bytes), 1);
            prop_assert_eq!(rx.packet().unwrap().data(), &data[..]);
        }

        #[test]
        fn prop_single_corruption_never_publishes(
            data in proptest::collection::vec(
                any::<u8>().prop_filter("no markers", |b| *b != PREAMBLE1 && *b != POSTAMBLE1),
                1..=8,
            ),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut rx: Receiver = Receiver::new();
            let type_id = PacketType::SetDdsSpeed.as_u8();
            let good = encode_to_vec::<MAX_FRAME_SIZE>(type_id, &data).unwrap();

            // Corrupt one byte of TYPE, LENGTH or DATA
            let mut bytes = good.clone();
            let target = TYPE_OFFSET + index.index(DATA_START_OFFSET + data.len() - TYPE_OFFSET);
            bytes[target] = bytes[target].wrapping_add(flip);

            prop_assert_eq!(feed_all(&mut rx, &bytes), 0);
            prop_assert!(rx.packet().is_none());
            if target != DATA_LENGTH_OFFSET {
                prop_assert_eq!(rx.state(), ParseState::SearchPreamble1);
            }

            // A wrong LENGTH can leave the parser mid-frame; line noise flushes it
            prop_assert_eq!(feed_all(&mut rx, &[0u8; 40]), 0);
            prop_assert!(matches!(
                rx.state(),
                ParseState::SearchPreamble1 | ParseState::BufferOverflow
            ));

            prop_assert_eq!(feed_all(&mut rx, &good), 1);
            prop_assert_eq!(rx.packet().unwrap().data(), &data[..]);
        }
    }
}
