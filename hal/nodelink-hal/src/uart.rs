//! UART serial communication abstractions
//!
//! The protocol layer polls the receiver one byte at a time and never waits
//! for data, so the receive side is a non-blocking "is a byte ready / take
//! it" pair. The transmit side writes whole frames at once.

use core::fmt::Debug;

/// Error type shared by the receive and transmit halves of a UART
pub trait ErrorType {
    /// Error type for UART operations
    type Error: Debug;
}

impl<T: ErrorType + ?Sized> ErrorType for &mut T {
    type Error = T::Error;
}

/// UART transmitter
pub trait UartTx: ErrorType {
    /// Write data to the UART
    ///
    /// Blocks until all data has been handed to the peripheral or an error
    /// occurs. Callers rely on a single call never interleaving with other
    /// writes, so a frame passed here goes out contiguously.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Write a single byte to the UART
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write_blocking(&[byte])
    }

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
///
/// Non-blocking byte source. Incoming bytes are usually queued by an
/// interrupt handler; this trait only answers synchronous queries.
pub trait UartRx: ErrorType {
    /// Check whether at least one byte can be read without blocking
    fn available(&mut self) -> Result<bool, Self::Error>;

    /// Read a single byte from the UART
    ///
    /// Only meaningful after [`available`](Self::available) returned `true`.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Read a byte if one is ready
    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if self.available()? {
            self.read_byte().map(Some)
        } else {
            Ok(None)
        }
    }
}

impl<T: UartTx + ?Sized> UartTx for &mut T {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write_blocking(self, data)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        T::write_byte(self, byte)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }
}

impl<T: UartRx + ?Sized> UartRx for &mut T {
    fn available(&mut self) -> Result<bool, Self::Error> {
        T::available(self)
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        T::read_byte(self)
    }
}

/// Combined UART interface
///
/// For UARTs that provide both TX and RX on a single peripheral.
pub trait Uart: UartTx + UartRx {}

// Blanket implementation
impl<T: UartTx + UartRx> Uart for T {}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::BAUD_115200
    }
}

impl UartConfig {
    /// 57600 baud, 8N1 (AVR nodes at 8 MHz)
    pub const BAUD_57600: Self = Self::new_8n1(57_600);

    /// 115200 baud, 8N1
    pub const BAUD_115200: Self = Self::new_8n1(115_200);

    /// 8 data bits, no parity, one stop bit at the given rate
    pub const fn new_8n1(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Number of bits on the line per transmitted byte, start bit included
    pub const fn bits_per_byte(&self) -> u32 {
        let data = match self.data_bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        };
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        1 + data + parity + stop
    }

    /// Time on the wire for `bytes` bytes, in microseconds (rounded up)
    ///
    /// Callers that enforce a receive timeout outside the parser use this to
    /// size it against the largest frame.
    pub const fn transfer_time_us(&self, bytes: u32) -> u32 {
        let bits = bytes as u64 * self.bits_per_byte() as u64;
        let rate = if self.baudrate == 0 { 1 } else { self.baudrate as u64 };
        ((bits * 1_000_000 + rate - 1) / rate) as u32
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
