//! MODBUS RTU frame encode/decode.
//!
//! Requests are a fixed 6-byte big-endian header plus the little-endian CRC
//! trailer; responses are accepted only after their trailer validates
//! against the bytes in front of it.

use thiserror::Error;

use super::crc::crc16;

pub const SLAVE_ID_MIN: u8 = 1;
pub const SLAVE_ID_MAX: u8 = 247;

/// Shortest response that can carry a checkable CRC trailer.
pub const MIN_RESPONSE_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read holding registers; the value field is the register count.
    ReadHolding = 0x03,
    /// Write single register; the value field is the register value.
    WriteSingle = 0x06,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("slave id {0} outside 1..=247")]
    SlaveIdOutOfRange(u8),
}

/// A reply failing either check is unusable and must be treated exactly
/// like no reply at all, never as a fatal condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("response too short: {0} bytes")]
    TooShort(usize),
    #[error("crc mismatch: expected {expected:#06x}, received {received:#06x}")]
    CrcMismatch { expected: u16, received: u16 },
}

/// One request on the wire. Built, encoded, and discarded within a single
/// exchange; never stored.
#[derive(Debug, Clone, Copy)]
pub struct MotionFrame {
    pub slave_id: u8,
    pub function: FunctionCode,
    pub address: u16,
    /// Register value for writes, register count for reads.
    pub value: u16,
}

impl MotionFrame {
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if !(SLAVE_ID_MIN..=SLAVE_ID_MAX).contains(&self.slave_id) {
            return Err(EncodeError::SlaveIdOutOfRange(self.slave_id));
        }

        let mut frame = Vec::with_capacity(8);
        frame.push(self.slave_id);
        frame.push(self.function as u8);
        frame.extend_from_slice(&self.address.to_be_bytes());
        frame.extend_from_slice(&self.value.to_be_bytes());

        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

pub fn encode_request(
    slave_id: u8,
    function: FunctionCode,
    address: u16,
    value: u16,
) -> Result<Vec<u8>, EncodeError> {
    MotionFrame { slave_id, function, address, value }.encode()
}

/// Validates length and the CRC trailer, then returns the response minus
/// the trailer.
pub fn decode_response(bytes: &[u8]) -> Result<&[u8], DecodeError> {
    if bytes.len() < MIN_RESPONSE_LEN {
        return Err(DecodeError::TooShort(bytes.len()));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - 2);
    let expected = crc16(body);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);

    if expected != received {
        return Err(DecodeError::CrcMismatch { expected, received });
    }
    Ok(body)
}
