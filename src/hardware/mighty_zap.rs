//! MightyZap linear actuator driver over MODBUS RTU.
//!
//! Maps actuator bus ids to register reads/writes through a `ModbusBus`.
//! Every commanded position is clamped into the 0..=4095 stroke before it
//! touches the wire.

use std::collections::HashMap;

use log::{info, warn};
use thiserror::Error;

use crate::modbus::{encode_request, EncodeError, FunctionCode, ModbusBus, TransportError};

// Holding registers per the FC_MODBUS manual.
pub const ADDR_GOAL_POSITION: u16 = 0x001E;
pub const ADDR_PRESENT_POSITION: u16 = 0x0020;
pub const ADDR_PRESENT_CURRENT: u16 = 0x0024;
pub const ADDR_OPERATING_MODE: u16 = 0x0026;

/// Full stroke in raw position units.
pub const POSITION_MAX: u16 = 4095;

#[derive(Debug, Error)]
pub enum DriverError {
    /// No usable reply. The position is unknown, not zero.
    #[error("actuator {0}: no response")]
    NoResponse(u8),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Capability surface of a position actuator. One implementation talks
/// MODBUS, the other echoes commands for benches without hardware; the
/// control loop cannot tell them apart.
pub trait ActuatorDriver: Send {
    fn connect(&mut self) -> Result<(), DriverError>;
    fn disconnect(&mut self);

    /// Commands a goal position, clamped into 0..=4095. A missing
    /// acknowledgment is logged and not retried; the next control cycle
    /// issues a fresh goal anyway.
    fn set_position(&mut self, actuator_id: u8, position: i32) -> Result<(), DriverError>;

    /// Present position, or `NoResponse` when the reply was missing or
    /// corrupt. Never panics on a malformed reply.
    fn get_position(&mut self, actuator_id: u8) -> Result<u16, DriverError>;
}

fn clamp_position(position: i32) -> u16 {
    position.clamp(0, POSITION_MAX as i32) as u16
}

pub struct MightyZap {
    bus: Box<dyn ModbusBus>,
}

impl MightyZap {
    pub fn new(bus: Box<dyn ModbusBus>) -> Self {
        MightyZap { bus }
    }

    fn read_register(&mut self, actuator_id: u8, address: u16) -> Result<u16, DriverError> {
        let request = encode_request(actuator_id, FunctionCode::ReadHolding, address, 1)?;
        let reply = self.bus.exchange(&request);

        // Reply: id, function, byte count, then the register big-endian.
        if reply.len() >= 5 {
            Ok(u16::from_be_bytes([reply[3], reply[4]]))
        } else {
            Err(DriverError::NoResponse(actuator_id))
        }
    }

    /// Present current draw, register 0x0024. Diagnostic only; the control
    /// logic never reads it.
    pub fn get_current(&mut self, actuator_id: u8) -> Result<u16, DriverError> {
        self.read_register(actuator_id, ADDR_PRESENT_CURRENT)
    }
}

impl ActuatorDriver for MightyZap {
    fn connect(&mut self) -> Result<(), DriverError> {
        self.bus.open()?;
        info!("actuator bus connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.bus.close();
    }

    fn set_position(&mut self, actuator_id: u8, position: i32) -> Result<(), DriverError> {
        let goal = clamp_position(position);
        let request =
            encode_request(actuator_id, FunctionCode::WriteSingle, ADDR_GOAL_POSITION, goal)?;

        let reply = self.bus.exchange(&request);
        if reply.is_empty() {
            warn!("actuator {}: no ack for goal position {}", actuator_id, goal);
        }
        Ok(())
    }

    fn get_position(&mut self, actuator_id: u8) -> Result<u16, DriverError> {
        match self.read_register(actuator_id, ADDR_PRESENT_POSITION) {
            Ok(position) => Ok(position),
            Err(e) => {
                warn!("actuator {}: position read failed", actuator_id);
                Err(e)
            }
        }
    }
}

/// Bench double: accepts the same commands, touches no transport, and reads
/// back whatever was last commanded per actuator (0 before any command).
#[derive(Debug, Default)]
pub struct SimulatedZap {
    positions: HashMap<u8, u16>,
}

impl SimulatedZap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActuatorDriver for SimulatedZap {
    fn connect(&mut self) -> Result<(), DriverError> {
        info!("simulated actuator driver connected");
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn set_position(&mut self, actuator_id: u8, position: i32) -> Result<(), DriverError> {
        let goal = clamp_position(position);
        info!("[simulated] actuator {} goal position {}", actuator_id, goal);
        self.positions.insert(actuator_id, goal);
        Ok(())
    }

    fn get_position(&mut self, actuator_id: u8) -> Result<u16, DriverError> {
        Ok(self.positions.get(&actuator_id).copied().unwrap_or(0))
    }
}
