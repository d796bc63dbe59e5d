pub mod crc;
pub mod frame;
pub mod transport;

pub use crc::crc16;
pub use frame::{
    decode_response, encode_request, DecodeError, EncodeError, FunctionCode, MotionFrame,
};
pub use transport::{BusConfig, DirectionMode, ModbusBus, RtuBus, TransportError, DEFAULT_BAUD};
