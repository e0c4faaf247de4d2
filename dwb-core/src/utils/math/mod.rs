//! Math utilities for the Differential-Wheel Bot.
//!
//! This module provides kinematics calculations for four-wheeled differential-drive robots.

pub mod kinematics;
