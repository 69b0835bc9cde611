//! Packet control interface
//!
//! Binds a [`Receiver`] to a UART. The driving loop calls
//! [`process_input`](PacketControlInterface::process_input) on every pass,
//! reacts to [`packet`](PacketControlInterface::packet) when a new one is
//! published, and sends commands or replies with the `send_packet` family.

use nodelink_hal::{ErrorType, Uart, UartConfig, UartRx, UartTx};

use crate::dispatch::{DispatchError, Dispatcher, Reply};
use crate::frame::{
    encode, Frame, FrameError, MAX_PAYLOAD_SIZE, RX_COMMAND_BUFFER_LENGTH,
    TX_COMMAND_BUFFER_LENGTH,
};
use crate::packet::{Packet, PacketType};
use crate::receiver::{ParseState, Receiver, RxStats};

/// Error from a transmit or service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<E> {
    /// Frame could not be encoded; nothing was written
    Frame(FrameError),
    /// UART failure
    Transport(E),
}

impl<E> From<FrameError> for LinkError<E> {
    fn from(e: FrameError) -> Self {
        LinkError::Frame(e)
    }
}

/// What one [`service`](PacketControlInterface::service) pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Serviced {
    /// No complete packet arrived
    Idle,
    /// A handler ran and had nothing to send back
    Handled(PacketType),
    /// A handler ran and its reply was sent
    Replied(PacketType),
    /// A packet arrived with no registered handler (raw code)
    Unhandled(u8),
}

/// Packet link over a UART with an `N`-byte receive buffer
#[derive(Debug)]
pub struct PacketControlInterface<T, const N: usize = RX_COMMAND_BUFFER_LENGTH> {
    receiver: Receiver<N>,
    uart: T,
}

impl<T, const N: usize> PacketControlInterface<T, N> {
    /// Create an interface that owns (or borrows, via `&mut`) its UART
    pub fn new(uart: T) -> Self {
        Self {
            receiver: Receiver::new(),
            uart,
        }
    }

    /// Current parser state
    pub fn state(&self) -> ParseState {
        self.receiver.state()
    }

    /// Most recently validated packet
    ///
    /// The packet borrows the receive buffer, so it must be dropped (or
    /// copied out with [`Packet::to_frame`]) before input is processed again.
    pub fn packet(&self) -> Option<Packet<'_>> {
        self.receiver.packet()
    }

    /// Link health counters
    pub fn stats(&self) -> RxStats {
        self.receiver.stats()
    }

    /// Abandon any partial frame and return to preamble search
    pub fn reset(&mut self) {
        self.receiver.reset();
    }

    /// Wire time of the largest frame the receive buffer accepts
    pub fn frame_timeout_us(&self, config: &UartConfig) -> u32 {
        config.transfer_time_us(N as u32)
    }

    /// Drop a partial frame the line has gone quiet on
    ///
    /// `idle_us` is the time since the last received byte, measured by the
    /// caller. If a frame is in progress and the line has been idle for
    /// longer than [`frame_timeout_us`](Self::frame_timeout_us), the parser
    /// is reset. Returns `true` when a partial frame was dropped.
    pub fn expire(&mut self, idle_us: u32, config: &UartConfig) -> bool {
        let mid_frame = !matches!(
            self.state(),
            ParseState::SearchPreamble1 | ParseState::BufferOverflow
        );
        if !mid_frame || idle_us <= self.frame_timeout_us(config) {
            return false;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Receive timeout in {} after {} us, resyncing",
            self.state().as_str(),
            idle_us
        );
        self.receiver.reset();
        true
    }

    /// Borrow the UART
    pub fn uart(&self) -> &T {
        &self.uart
    }

    /// Mutably borrow the UART
    pub fn uart_mut(&mut self) -> &mut T {
        &mut self.uart
    }

    /// Release the UART
    pub fn into_uart(self) -> T {
        self.uart
    }
}

impl<T: UartRx, const N: usize> PacketControlInterface<T, N> {
    /// Feed every byte the UART has ready into the parser
    ///
    /// Returns `Ok(true)` as soon as a packet is published; any bytes still
    /// pending stay in the UART for the next call, so frames that arrive
    /// back to back are each seen. Returns `Ok(false)` once the UART has
    /// nothing more to give. Never waits for data.
    pub fn process_input(&mut self) -> Result<bool, T::Error> {
        while self.uart.available()? {
            let byte = self.uart.read_byte()?;
            if self.receiver.feed(byte) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<T: UartTx, const N: usize> PacketControlInterface<T, N> {
    /// Send a packet with a payload
    pub fn send_packet(
        &mut self,
        packet_type: PacketType,
        data: &[u8],
    ) -> Result<(), LinkError<T::Error>> {
        transmit(&mut self.uart, packet_type.as_u8(), data)
    }

    /// Send a packet with a single-byte payload
    pub fn send_packet_byte(
        &mut self,
        packet_type: PacketType,
        data: u8,
    ) -> Result<(), LinkError<T::Error>> {
        self.send_packet(packet_type, &[data])
    }

    /// Send a packet with no payload
    pub fn send_packet_empty(
        &mut self,
        packet_type: PacketType,
    ) -> Result<(), LinkError<T::Error>> {
        self.send_packet(packet_type, &[])
    }

    /// Send an owned frame, including ones with undefined command codes
    pub fn send_frame(&mut self, frame: &Frame) -> Result<(), LinkError<T::Error>> {
        transmit(&mut self.uart, frame.type_id, &frame.payload)
    }
}

impl<T: Uart, const N: usize> PacketControlInterface<T, N> {
    /// One polling step: receive, dispatch, reply
    ///
    /// Runs the handler registered for a newly published packet and sends
    /// its reply, if any. A reply the handler could not frame is returned as
    /// [`LinkError::Frame`]; nothing is sent for it.
    pub fn service<C, const M: usize>(
        &mut self,
        dispatcher: &Dispatcher<C, M>,
        ctx: &mut C,
    ) -> Result<Serviced, LinkError<<T as ErrorType>::Error>> {
        if !self.process_input().map_err(LinkError::Transport)? {
            return Ok(Serviced::Idle);
        }
        let Some(packet) = self.receiver.packet() else {
            return Ok(Serviced::Idle);
        };
        let packet_type = packet.packet_type();
        let type_id = packet.type_id();

        match dispatcher.dispatch(ctx, &packet) {
            Ok(Reply::None) => Ok(Serviced::Handled(packet_type)),
            Ok(Reply::Send(frame)) => {
                self.send_frame(&frame)?;
                Ok(Serviced::Replied(packet_type))
            }
            Err(DispatchError::Reply(e)) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Reply to packet type {=u8:#x} not sent: {}", type_id, e);
                Err(LinkError::Frame(e))
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Packet type {=u8:#x} not dispatched: {}", type_id, _e);
                Ok(Serviced::Unhandled(type_id))
            }
        }
    }
}

/// Encode into a stack buffer and write the whole frame in one call
fn transmit<T: UartTx>(uart: &mut T, type_id: u8, data: &[u8]) -> Result<(), LinkError<T::Error>> {
    if data.len() > MAX_PAYLOAD_SIZE {
        return Err(LinkError::Frame(FrameError::PayloadTooLarge));
    }

    let mut buf = [0u8; TX_COMMAND_BUFFER_LENGTH];
    let len = encode(type_id, data, &mut buf)?;

    let result = uart
        .write_blocking(&buf[..len])
        .and_then(|()| uart.flush())
        .map_err(LinkError::Transport);

    #[cfg(feature = "defmt")]
    if result.is_err() {
        defmt::warn!("Failed to send packet type {=u8:#x}", type_id);
    }

    result
}
