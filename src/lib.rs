pub mod config;
pub mod control;
pub mod hardware;
pub mod modbus;

pub use config::{ActuatorConfig, ConfigError, ConfigStore, ControlSettings, ProfileConfig};
pub use control::{ControlLoop, LoopHandle, CORRECTION_SCALE};
pub use hardware::{
    ActuatorDriver, DriverError, MightyZap, Profilometer, SimulatedZap, POSITION_MAX,
};
pub use modbus::{BusConfig, DirectionMode, ModbusBus, RtuBus, TransportError, DEFAULT_BAUD};
