//! nodelink packet protocol
//!
//! This crate implements the command/telemetry link between a host
//! controller and its microcontroller nodes (sensor/actuator, power
//! management and manipulator boards) over a byte-oriented serial line.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────────┬──────┬────────┬─────────────┬──────────┬────────────┐
//! │ PREAMBLE  │ TYPE │ LENGTH │ DATA        │ CHECKSUM │ POSTAMBLE  │
//! │ F0 CA     │ 1B   │ 1B     │ 0–25B       │ 1B       │ 53 0F      │
//! └───────────┴──────┴────────┴─────────────┴──────────┴────────────┘
//! ```
//!
//! The checksum is the sum of TYPE, LENGTH and DATA modulo 256. Frames are
//! at most 32 bytes, the receive buffer size of the nodes.
//!
//! The receiver resynchronizes on its own: noise, truncated frames, bad
//! checksums and oversized frames are dropped and parsing resumes at the
//! next preamble. Nothing is allocated; a received [`Packet`] borrows the
//! receive buffer directly.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod dispatch;
pub mod frame;
pub mod interface;
pub mod packet;
pub mod receiver;

pub use checksum::checksum;
pub use dispatch::{DispatchError, Dispatcher, Handler, Reply};
pub use frame::{decode, encode, Frame, FrameError, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use interface::{LinkError, PacketControlInterface, Serviced};
pub use packet::{Board, Packet, PacketType};
pub use receiver::{ParseState, Receiver, RxStats};
