//! Command dispatch
//!
//! Maps command codes to handler functions. A node registers one handler
//! per command it implements; the driving loop hands every published
//! packet to [`Dispatcher::dispatch`] and transmits whatever reply comes
//! back.
//!
//! Handlers receive an application context `C` explicitly, so node state
//! lives in one place owned by the driving loop.

use heapless::Vec;

use crate::frame::{Frame, FrameError};
use crate::packet::{Packet, PacketType};

/// Handler for one command code
///
/// A handler fails only when its reply cannot be framed.
pub type Handler<C> = fn(&mut C, &Packet<'_>) -> Result<Reply, FrameError>;

/// Outcome of a handler
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Nothing to send back
    None,
    /// Send this frame to the peer
    Send(Frame),
}

impl Reply {
    /// Reply with a single-byte payload
    pub fn byte(packet_type: PacketType, value: u8) -> Result<Self, FrameError> {
        Reply::data(packet_type, &[value])
    }

    /// Reply with a payload
    ///
    /// Fails with [`FrameError::PayloadTooLarge`] if it does not fit in a frame.
    pub fn data(packet_type: PacketType, data: &[u8]) -> Result<Self, FrameError> {
        Frame::new(packet_type, data).map(Reply::Send)
    }
}

/// Dispatch table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// A handler is already registered for this command
    Duplicate(PacketType),
    /// Table capacity reached
    TableFull,
    /// [`PacketType::Invalid`] cannot be registered
    InvalidType,
    /// No handler for this raw command code
    Unhandled(u8),
    /// The handler ran but its reply could not be framed
    Reply(FrameError),
}

/// Command table with room for `M` handlers
pub struct Dispatcher<C, const M: usize> {
    entries: Vec<(PacketType, Handler<C>), M>,
}

impl<C, const M: usize> Default for Dispatcher<C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, const M: usize> core::fmt::Debug for Dispatcher<C, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(packet_type, _)| packet_type))
            .finish()
    }
}

impl<C, const M: usize> Dispatcher<C, M> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a handler for a command
    pub fn register(
        &mut self,
        packet_type: PacketType,
        handler: Handler<C>,
    ) -> Result<(), DispatchError> {
        if packet_type == PacketType::Invalid {
            return Err(DispatchError::InvalidType);
        }
        if self.handles(packet_type) {
            return Err(DispatchError::Duplicate(packet_type));
        }
        self.entries
            .push((packet_type, handler))
            .map_err(|_| DispatchError::TableFull)
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(
        mut self,
        packet_type: PacketType,
        handler: Handler<C>,
    ) -> Result<Self, DispatchError> {
        self.register(packet_type, handler)?;
        Ok(self)
    }

    /// Whether a handler is registered for a command
    pub fn handles(&self, packet_type: PacketType) -> bool {
        self.entries.iter().any(|(registered, _)| *registered == packet_type)
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no handler is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the handler for a packet
    pub fn dispatch(&self, ctx: &mut C, packet: &Packet<'_>) -> Result<Reply, DispatchError> {
        let packet_type = packet.packet_type();
        let (_, handler) = self
            .entries
            .iter()
            .find(|(registered, _)| *registered == packet_type)
            .ok_or(DispatchError::Unhandled(packet.type_id()))?;

        handler(ctx, packet).map_err(DispatchError::Reply)
    }
}
