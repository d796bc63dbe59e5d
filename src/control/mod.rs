pub mod control_loop;

pub use control_loop::{correction_for, next_position, ControlLoop, LoopHandle, CORRECTION_SCALE};
