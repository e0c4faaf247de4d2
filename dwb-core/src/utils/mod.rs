//! Utility re-exports and helper macros for the Differential-Wheel Bot.
//!
//! This module re-exports the wheel and drivetrain controllers, the chassis
//! kinematics and the host command protocol:
//!
//! - `connection`: host command packet decoding (binary and JSON)
//! - `controllers`: wheel actuators, drivetrain, control loop and command dispatch
//! - `math`: differential-drive kinematics
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod connection;
pub mod controllers;
pub mod math;

pub use connection::serial::decode_frame;
pub use controllers::MotionController;
pub use embassy_time::*;
pub use math::kinematics::DifferentialKinematics as dk;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
