//! Half-duplex RS-485 exchange over one shared serial line.
//!
//! The transceiver cannot send and receive at the same time, so every
//! exchange walks the same sequence: clear buffers, assert transmit-enable,
//! write and drain, release the line, then give the remote device a fixed
//! window to answer. One exchange at a time; the bus is exclusively owned.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use log::warn;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use thiserror::Error;

use super::frame;

pub const DEFAULT_BAUD: u32 = 57_600;

/// Transceiver settle time after asserting transmit-enable.
const TX_SETTLE: Duration = Duration::from_millis(1);
/// Drain time before releasing the line back to receive.
const TX_DRAIN: Duration = Duration::from_millis(2);
/// Fixed window the remote device gets to answer. Slow actuator firmware
/// needs most of it; not adaptive.
const RESPONSE_WAIT: Duration = Duration::from_millis(50);

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// How the transmit/receive direction of the transceiver is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionMode {
    /// RTS wired to DE/RE: asserted during transmit, released to receive.
    Rts,
    /// Transceiver switches on its own; nothing to drive.
    None,
}

#[derive(Debug, Clone)]
pub struct BusConfig {
    pub port: String,
    pub baud: u32,
    pub direction: DirectionMode,
}

impl BusConfig {
    pub fn new(port: &str) -> Self {
        BusConfig {
            port: port.to_string(),
            baud: DEFAULT_BAUD,
            direction: DirectionMode::Rts,
        }
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn with_direction(mut self, direction: DirectionMode) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),
    #[error("serial io: {0}")]
    Io(#[from] std::io::Error),
}

/// One exclusively-owned path onto the bus. A call runs a full
/// request/response round; callers never interleave two exchanges.
pub trait ModbusBus: Send {
    fn open(&mut self) -> Result<(), TransportError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;

    /// Sends one request and returns the CRC-stripped reply, or empty bytes
    /// when nothing usable came back. I/O faults and corrupt frames are
    /// logged here and surfaced as "no response".
    fn exchange(&mut self, request: &[u8]) -> Vec<u8>;
}

/// MODBUS RTU over a half-duplex RS-485 line, 8N1.
pub struct RtuBus {
    config: BusConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl RtuBus {
    pub fn new(config: BusConfig) -> Self {
        RtuBus { config, port: None }
    }

    pub fn port_name(&self) -> &str {
        &self.config.port
    }

    fn round_trip(
        port: &mut Box<dyn SerialPort>,
        direction: DirectionMode,
        request: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        // Leftovers from a previous exchange must not be read back as a reply.
        port.clear(ClearBuffer::All)?;

        if direction == DirectionMode::Rts {
            port.write_request_to_send(true)?;
            thread::sleep(TX_SETTLE);
        }

        port.write_all(request)?;
        port.flush()?;

        if direction == DirectionMode::Rts {
            thread::sleep(TX_DRAIN);
            port.write_request_to_send(false)?;
        }

        thread::sleep(RESPONSE_WAIT);

        let available = port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut raw = vec![0u8; available];
        port.read_exact(&mut raw)?;

        match frame::decode_response(&raw) {
            Ok(body) => Ok(body.to_vec()),
            Err(e) => {
                warn!("dropping corrupt reply ({} bytes): {}", raw.len(), e);
                Ok(Vec::new())
            }
        }
    }
}

impl ModbusBus for RtuBus {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.port.is_some() {
            return Ok(());
        }

        let mut port = serialport::new(&self.config.port, self.config.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()?;

        if self.config.direction == DirectionMode::Rts {
            // Start out listening.
            port.write_request_to_send(false)?;
        }

        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        self.port = None;
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn exchange(&mut self, request: &[u8]) -> Vec<u8> {
        let Some(port) = self.port.as_mut() else {
            warn!("exchange on closed bus ({})", self.config.port);
            return Vec::new();
        };

        match Self::round_trip(port, self.config.direction, request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("exchange failed on {}: {}", self.config.port, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BusConfig::new("/dev/serial0");
        assert_eq!(config.baud, 57_600);
        assert_eq!(config.direction, DirectionMode::Rts);

        let config = BusConfig::new("/dev/ttyUSB0")
            .with_baud(115_200)
            .with_direction(DirectionMode::None);
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.direction, DirectionMode::None);
    }

    #[test]
    fn test_exchange_on_closed_bus_is_empty() {
        let mut bus = RtuBus::new(BusConfig::new("/dev/does-not-exist"));
        assert!(!bus.is_open());
        assert!(bus.exchange(&[0x01, 0x03, 0x00, 0x20, 0x00, 0x01, 0x85, 0xC0]).is_empty());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let mut bus = RtuBus::new(BusConfig::new("/dev/does-not-exist"));
        assert!(bus.open().is_err());
        assert!(!bus.is_open());
    }
}
