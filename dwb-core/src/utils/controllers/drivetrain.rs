//! Four-wheel differential drivetrain.
//!
//! `Drivetrain` turns chassis-level requests into consistent commands for its
//! front/back, left/right wheels. Free-running requests (`drive_straight`,
//! `reverse`, `turn_while_moving`) set direction and speed only; angle-limited
//! requests (`turn_in_place`, `drive_meters`, `turn_wheel`) need
//! [`Drivetrain::update`] every control tick to finish.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};
use serde::{Deserialize, Serialize};

use super::wheel::{ActuatorError, Direction, Encoder, MotionPhase, WheelActuator};
use crate::utils::math::kinematics::{DifferentialKinematics, Rejection};

/// Default distance between left and right wheel contact lines (m).
pub const DEFAULT_TRACK_WIDTH: f32 = 0.3;
/// Default wheel radius (m).
pub const DEFAULT_WHEEL_RADIUS: f32 = 0.05;

/// Chassis constants fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    pub track_width: f32,
    pub wheel_radius: f32,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            track_width: DEFAULT_TRACK_WIDTH,
            wheel_radius: DEFAULT_WHEEL_RADIUS,
        }
    }
}

impl ChassisConfig {
    /// Build from optional dimensions, falling back to the defaults.
    pub fn new(
        track_width: Option<f32>,
        wheel_radius: Option<f32>,
    ) -> Self {
        Self {
            track_width: track_width.unwrap_or(DEFAULT_TRACK_WIDTH),
            wheel_radius: wheel_radius.unwrap_or(DEFAULT_WHEEL_RADIUS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Wheel slots, in the order commands are issued to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPosition {
    FrontRight = 0,
    BackRight = 1,
    FrontLeft = 2,
    BackLeft = 3,
}

impl WheelPosition {
    pub const ALL: [WheelPosition; 4] = [
        WheelPosition::FrontRight,
        WheelPosition::BackRight,
        WheelPosition::FrontLeft,
        WheelPosition::BackLeft,
    ];

    pub fn side(self) -> Side {
        match self {
            WheelPosition::FrontRight | WheelPosition::BackRight => Side::Right,
            WheelPosition::FrontLeft | WheelPosition::BackLeft => Side::Left,
        }
    }

    /// Wheel for a host protocol index (0 FR, 1 BR, 2 FL, 3 BL).
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Result of a chassis request that may be refused without touching the wheels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Applied,
    Rejected(Rejection),
}

/// Aggregate closed-loop state after a round of wheel updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStatus {
    /// Wheels still chasing an angle target.
    pub tracking: usize,
}

impl MotionStatus {
    pub fn is_idle(&self) -> bool {
        self.tracking == 0
    }
}

/// Four wheels plus the chassis geometry that relates them.
pub struct Drivetrain<DIR, PWM, ENC> {
    wheels: [WheelActuator<DIR, PWM, ENC>; 4],
    kinematics: DifferentialKinematics,
}

impl<DIR, PWM, ENC> Drivetrain<DIR, PWM, ENC>
where
    DIR: OutputPin,
    PWM: SetDutyCycle,
    ENC: Encoder,
{
    pub fn new(
        front_right: WheelActuator<DIR, PWM, ENC>,
        back_right: WheelActuator<DIR, PWM, ENC>,
        front_left: WheelActuator<DIR, PWM, ENC>,
        back_left: WheelActuator<DIR, PWM, ENC>,
        chassis: ChassisConfig,
    ) -> Self {
        Drivetrain {
            wheels: [front_right, back_right, front_left, back_left],
            kinematics: DifferentialKinematics::new(chassis.track_width, chassis.wheel_radius),
        }
    }

    pub fn wheel(
        &self,
        position: WheelPosition,
    ) -> &WheelActuator<DIR, PWM, ENC> {
        &self.wheels[position as usize]
    }

    pub fn wheel_mut(
        &mut self,
        position: WheelPosition,
    ) -> &mut WheelActuator<DIR, PWM, ENC> {
        &mut self.wheels[position as usize]
    }

    pub fn kinematics(&self) -> &DifferentialKinematics {
        &self.kinematics
    }

    /// Hand the wheels back in `WheelPosition::ALL` order.
    pub fn into_wheels(self) -> [WheelActuator<DIR, PWM, ENC>; 4] {
        self.wheels
    }

    /// Drive all wheels in the direction of `velocity` at `|velocity|`.
    pub fn drive_straight(
        &mut self,
        velocity: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        tracing::info!(velocity, "drive straight");
        self.drive_all(Direction::from_sign(velocity), libm::fabsf(velocity))
    }

    /// Drive all wheels backwards at `|velocity|`, whatever the sign.
    pub fn reverse(
        &mut self,
        velocity: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        tracing::info!(velocity, "reverse");
        self.drive_all(Direction::Reverse, libm::fabsf(velocity))
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError<DIR, PWM>> {
        self.drive_straight(0.0)
    }

    /// Rotate the chassis about its center by `theta` radians (CCW positive).
    pub fn turn_in_place(
        &mut self,
        theta: f32,
        speed: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        let angles = self.kinematics.in_place_wheel_angles(theta);
        tracing::info!(theta, speed, left = angles.left, right = angles.right, "turn in place");

        for position in WheelPosition::ALL {
            let angle = match position.side() {
                Side::Left => angles.left,
                Side::Right => angles.right,
            };
            self.wheels[position as usize].turn_by_angle(angle, speed)?;
        }
        Ok(())
    }

    /// Follow a continuous arc of `turning_radius` at linear `speed`.
    ///
    /// Radii tighter than half the track width are refused and leave every
    /// wheel as it was.
    pub fn turn_while_moving(
        &mut self,
        turning_radius: f32,
        speed: f32,
    ) -> Result<CommandOutcome, ActuatorError<DIR, PWM>> {
        let sides = match self.kinematics.arc_side_speeds(turning_radius, speed) {
            Ok(sides) => sides,
            Err(rejection) => {
                tracing::warn!(?rejection, "turn while moving refused");
                return Ok(CommandOutcome::Rejected(rejection));
            }
        };
        tracing::info!(turning_radius, speed, left = sides.left, right = sides.right, "turn while moving");

        for wheel in self.wheels.iter_mut() {
            wheel.cancel_target();
            wheel.set_direction(Direction::Forward)?;
        }
        for position in [
            WheelPosition::FrontLeft,
            WheelPosition::BackLeft,
            WheelPosition::FrontRight,
            WheelPosition::BackRight,
        ] {
            let side_speed = match position.side() {
                Side::Left => sides.left,
                Side::Right => sides.right,
            };
            self.wheels[position as usize].set_speed(side_speed)?;
        }
        Ok(CommandOutcome::Applied)
    }

    /// Roll a signed linear `displacement` (m) under closed-loop control.
    pub fn drive_meters(
        &mut self,
        displacement: f32,
        speed: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        let angle = self.kinematics.distance_to_wheel_angle(displacement);
        tracing::info!(displacement, speed, angle, "drive meters");

        self.stop()?;
        for wheel in self.wheels.iter_mut() {
            wheel.turn_by_angle(angle, speed)?;
        }
        Ok(())
    }

    /// Closed-loop rotation of a single wheel.
    pub fn turn_wheel(
        &mut self,
        position: WheelPosition,
        angle: f32,
        speed: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        tracing::info!(?position, angle, speed, "turn wheel");
        self.wheels[position as usize].turn_by_angle(angle, speed)
    }

    /// Poll every wheel once; call this each control tick.
    pub fn update(&mut self) -> Result<MotionStatus, ActuatorError<DIR, PWM>> {
        let mut tracking = 0;
        for wheel in self.wheels.iter_mut() {
            if wheel.update()? == MotionPhase::Tracking {
                tracking += 1;
            }
        }
        Ok(MotionStatus { tracking })
    }

    fn drive_all(
        &mut self,
        direction: Direction,
        speed: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        for wheel in self.wheels.iter_mut() {
            wheel.cancel_target();
            wheel.set_direction(direction)?;
        }
        for wheel in self.wheels.iter_mut() {
            wheel.set_speed(speed)?;
        }
        Ok(())
    }
}
