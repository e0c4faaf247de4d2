//! Kinematics utilities for 4-wheeled differential-drive robots.
//!
//! The `DifferentialKinematics` struct maps chassis-level motion requests
//! (rotate in place, drive an arc, advance a linear distance) onto per-side
//! wheel angles and speeds. It performs no hardware access; the drivetrain
//! controller turns its results into wheel commands.
//!
//! # Example
//! ```rust
//! use dwb_core::utils::math::kinematics::DifferentialKinematics;
//! let kin = DifferentialKinematics::new(0.3, 0.05);
//! let sides = kin.arc_side_speeds(0.3, 40.0).unwrap();
//! assert_eq!((sides.left, sides.right), (20.0, 60.0));
//! ```
//!
use libm;
use serde::{Deserialize, Serialize};

/// Per-side values for the left and right wheel pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidePair {
    pub left: f32,
    pub right: f32,
}

/// Reasons a chassis request cannot be realised by the drivetrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// The inner side would need a negative linear speed.
    InfeasibleRadius { radius: f32, min_radius: f32 },
}

/// Represents the kinematics of a four-wheeled differential-drive robot.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialKinematics {
    /// Distance between left and right wheel contact lines (m)
    track_width: f32,
    /// Radius of each wheel (m)
    wheel_radius: f32,
}

impl DifferentialKinematics {
    /// Instantiate with a given track width and wheel radius.
    pub fn new(
        track_width: f32,
        wheel_radius: f32,
    ) -> Self {
        Self {
            track_width,
            wheel_radius,
        }
    }

    pub fn track_width(&self) -> f32 {
        self.track_width
    }

    pub fn wheel_radius(&self) -> f32 {
        self.wheel_radius
    }

    /// Smallest turning radius whose inner side speed is still non-negative.
    pub fn min_turning_radius(&self) -> f32 {
        self.track_width / 2.0
    }

    /// Wheel rotation (rad) needed to roll a signed linear distance (m).
    pub fn distance_to_wheel_angle(
        &self,
        displacement: f32,
    ) -> f32 {
        displacement / self.wheel_radius
    }

    /// Wheel angles (rad) that rotate the chassis about its center by `theta`.
    ///
    /// Positive `theta` is counter-clockwise: the right side rolls forward and
    /// the left side rolls backward by the same amount.
    pub fn in_place_wheel_angles(
        &self,
        theta: f32,
    ) -> SidePair {
        let arc = (self.track_width / 2.0) * libm::fabsf(theta);
        let wheel_angle = self.distance_to_wheel_angle(arc);
        let sign = if theta > 0.0 { 1.0 } else { -1.0 };

        SidePair {
            left: -sign * wheel_angle,
            right: sign * wheel_angle,
        }
    }

    /// Side speeds for a continuous arc of `turning_radius` at linear `speed`.
    ///
    /// A negative radius puts the right side on the inside of the turn, a
    /// non-negative radius the left side.
    ///
    /// # Errors
    ///
    /// `Rejection::InfeasibleRadius` when `|turning_radius|` is below half the
    /// track width (or not a number).
    pub fn arc_side_speeds(
        &self,
        turning_radius: f32,
        speed: f32,
    ) -> Result<SidePair, Rejection> {
        let radius = libm::fabsf(turning_radius);
        let min_radius = self.min_turning_radius();
        if radius.is_nan() || radius < min_radius {
            return Err(Rejection::InfeasibleRadius {
                radius: turning_radius,
                min_radius,
            });
        }

        let ratio = self.track_width / (2.0 * radius);
        let inner = speed * (1.0 - ratio);
        let outer = speed * (1.0 + ratio);

        Ok(if turning_radius < 0.0 {
            SidePair {
                left: outer,
                right: inner,
            }
        } else {
            SidePair {
                left: inner,
                right: outer,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    #[test]
    fn test_in_place_quarter_turn() {
        let kin = DifferentialKinematics::new(0.3, 0.05);
        let sides = kin.in_place_wheel_angles(PI / 2.0);
        assert!((sides.right - 1.5 * PI).abs() < 1e-4);
        assert!((sides.left + 1.5 * PI).abs() < 1e-4);
    }

    #[test]
    fn test_in_place_clockwise_mirrors() {
        let kin = DifferentialKinematics::new(0.3, 0.05);
        let ccw = kin.in_place_wheel_angles(1.0);
        let cw = kin.in_place_wheel_angles(-1.0);
        assert_eq!(ccw.left, cw.right);
        assert_eq!(ccw.right, cw.left);
    }

    #[test]
    fn test_arc_boundary_radius_equals_track_width() {
        let kin = DifferentialKinematics::new(0.3, 0.05);
        let sides = kin.arc_side_speeds(0.3, 10.0).unwrap();
        assert!((sides.left - 5.0).abs() < 1e-5);
        assert!((sides.right - 15.0).abs() < 1e-5);

        let sides = kin.arc_side_speeds(-0.3, 10.0).unwrap();
        assert!((sides.left - 15.0).abs() < 1e-5);
        assert!((sides.right - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_arc_minimum_radius_pivots_on_inner_side() {
        let kin = DifferentialKinematics::new(0.3, 0.05);
        let sides = kin.arc_side_speeds(0.15, 10.0).unwrap();
        assert_eq!(sides.left, 0.0);
        assert!((sides.right - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_arc_too_tight_is_rejected() {
        let kin = DifferentialKinematics::new(0.3, 0.05);
        assert_eq!(
            kin.arc_side_speeds(-0.1, 10.0),
            Err(Rejection::InfeasibleRadius {
                radius: -0.1,
                min_radius: 0.15
            })
        );
        assert!(kin.arc_side_speeds(f32::NAN, 10.0).is_err());
    }

    #[test]
    fn test_distance_to_wheel_angle() {
        let kin = DifferentialKinematics::new(0.3, 0.05);
        assert!((kin.distance_to_wheel_angle(-0.5) + 10.0).abs() < 1e-5);
    }
}
