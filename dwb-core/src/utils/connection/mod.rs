//! Module Exports
//!
//! This file exports the host link used to command the drivetrain.
//!
//! # Modules
//! - `serial`: decodes host command frames (14-byte binary packets or JSON).

/// Module for decoding host command frames into `DriveCommand`s.
pub mod serial;
