//! Motion-control core for the four-wheel Differential-Wheel Bot on no-std embedded platforms.
//!
//! For a host-side simulation, see `dwb-app/mock-mcu`.
#![no_std]

pub mod utils;
