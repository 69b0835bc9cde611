//! nodelink Hardware Abstraction Layer
//!
//! This crate defines the byte-level transport traits the packet protocol
//! is written against. A node's serial peripheral driver (or a host-side
//! serial port) implements them; the protocol crate never touches hardware
//! directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Driving loop / command dispatcher      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nodelink-protocol (framing, parser)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nodelink-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  chip UART    │       │ embedded-io   │
//! │  driver       │       │ port (IoUart) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`uart::ErrorType`] - Error type shared by both directions

#![no_std]
#![deny(unsafe_code)]

pub mod io;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use io::IoUart;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockUart;
pub use uart::{ErrorType, Uart, UartConfig, UartRx, UartTx};
