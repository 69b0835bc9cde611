//! Adapter for `embedded-io` ports
//!
//! Most chip HALs already expose their UARTs through `embedded-io`. Wrapping
//! such a port in [`IoUart`] makes it usable as a packet transport without a
//! dedicated driver.

use embedded_io::{Read, ReadReady, Write};

use crate::uart::{ErrorType, UartRx, UartTx};

/// Error from an [`IoUart`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoUartError<E> {
    /// Error reported by the underlying port
    Io(E),
    /// Port reported a byte ready but the read returned nothing
    UnexpectedEof,
}

impl<E> From<E> for IoUartError<E> {
    fn from(e: E) -> Self {
        IoUartError::Io(e)
    }
}

/// UART transport backed by an `embedded-io` port
#[derive(Debug)]
pub struct IoUart<P> {
    port: P,
}

impl<P> IoUart<P> {
    /// Wrap a port
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Borrow the underlying port
    pub fn inner(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the underlying port
    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Release the underlying port
    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: embedded_io::ErrorType> ErrorType for IoUart<P> {
    type Error = IoUartError<P::Error>;
}

impl<P: Read + ReadReady> UartRx for IoUart<P> {
    fn available(&mut self) -> Result<bool, Self::Error> {
        Ok(self.port.read_ready()?)
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf)? {
            0 => Err(IoUartError::UnexpectedEof),
            _ => Ok(buf[0]),
        }
    }
}

impl<P: Write> UartTx for IoUart<P> {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        Ok(self.port.write_all(data)?)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(self.port.flush()?)
    }
}
