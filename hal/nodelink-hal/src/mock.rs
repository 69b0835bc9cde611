//! In-memory UART for host-side testing
//!
//! Bytes queued with [`MockUart::push_rx`] are handed out by the receive
//! half; everything written by the transmit half is captured and can be
//! inspected or drained.

use heapless::{Deque, Vec};

use crate::uart::{ErrorType, UartRx, UartTx};

/// Error from the mock UART
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MockError {
    /// Read attempted with nothing queued
    RxEmpty,
    /// Receive queue is full
    RxFull,
    /// Transmit capture buffer is full
    TxFull,
    /// Failure requested with [`MockUart::fail_next_write`]
    Injected,
}

/// Mock UART with fixed-capacity receive queue and transmit capture
#[derive(Debug, Default)]
pub struct MockUart<const RX: usize = 256, const TX: usize = 256> {
    rx: Deque<u8, RX>,
    tx: Vec<u8, TX>,
    writes: usize,
    fail_next_write: bool,
}

impl<const RX: usize, const TX: usize> MockUart<RX, TX> {
    /// Create an empty mock
    pub const fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Vec::new(),
            writes: 0,
            fail_next_write: false,
        }
    }

    /// Queue bytes for the receive half
    pub fn push_rx(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        for &byte in bytes {
            self.rx.push_back(byte).map_err(|_| MockError::RxFull)?;
        }
        Ok(())
    }

    /// Number of bytes still waiting to be read
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Everything written so far
    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx
    }

    /// Number of `write_blocking` calls that succeeded
    pub fn write_calls(&self) -> usize {
        self.writes
    }

    /// Discard captured transmit data
    pub fn clear_tx(&mut self) {
        self.tx.clear();
        self.writes = 0;
    }

    /// Make the next write fail without transmitting anything
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }
}

impl<const RX: usize, const TX: usize> ErrorType for MockUart<RX, TX> {
    type Error = MockError;
}

impl<const RX: usize, const TX: usize> UartRx for MockUart<RX, TX> {
    fn available(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(MockError::RxEmpty)
    }
}

impl<const RX: usize, const TX: usize> UartTx for MockUart<RX, TX> {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(MockError::Injected);
        }
        if self.tx.capacity() - self.tx.len() < data.len() {
            return Err(MockError::TxFull);
        }
        self.tx
            .extend_from_slice(data)
            .map_err(|_| MockError::TxFull)?;
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
