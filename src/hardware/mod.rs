pub mod mighty_zap;
pub mod profilometer;

pub use mighty_zap::{
    ActuatorDriver, DriverError, MightyZap, SimulatedZap, ADDR_GOAL_POSITION,
    ADDR_OPERATING_MODE, ADDR_PRESENT_CURRENT, ADDR_PRESENT_POSITION, POSITION_MAX,
};
pub use profilometer::Profilometer;
