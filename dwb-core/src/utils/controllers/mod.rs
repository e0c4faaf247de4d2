//! Module Exports
//!
//! This file exports the motion-control pieces of the Differential-Wheel Bot.
//!
//! - `wheel`: single-wheel direction/PWM output with encoder angle tracking.
//! - `drivetrain`: four-wheel chassis kinematics and command dispatch.
//! - `control_loop`: per-tick wheel polling with an optional watchdog.

pub mod control_loop;
pub mod drivetrain;
pub mod wheel;

#[cfg(test)]
pub(crate) mod fakes;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};
use serde::{Deserialize, Serialize};

pub use control_loop::{ControlLoop, TickReport};
pub use drivetrain::{ChassisConfig, CommandOutcome, Drivetrain, MotionStatus, WheelPosition};
pub use wheel::{Direction, Encoder, MotionPhase, Polarity, WheelActuator, WheelConfig, WheelError};

use wheel::ActuatorError;

/// Channel used to receive drive commands (`DriveCommand` messages).
pub static COMMAND_CHANNEL: embassy_sync::channel::Channel<
    CriticalSectionRawMutex,
    DriveCommand,
    16,
> = embassy_sync::channel::Channel::new();

/// Default control tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Chassis-level command variants.
///
/// Serialized as JSON with tag `"dc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "dc", rename_all = "snake_case")]
pub enum DriveCommand {
    /// Closed-loop rotation of a single wheel (rad).
    TurnWheel {
        wheel: WheelPosition,
        angle: f32,
        speed: f32,
    },
    /// Continuous arc (m); negative radius turns right.
    TurnWhileMoving { radius: f32, speed: f32 },
    /// Closed-loop rotation about the chassis center (rad, CCW positive).
    TurnInPlace { theta: f32, speed: f32 },
    /// Free-running straight drive; the sign picks the direction.
    DriveStraight { velocity: f32 },
    /// Closed-loop linear move (m).
    DriveMeters { displacement: f32, speed: f32 },
    /// Free-running backwards drive at `|velocity|`.
    Reverse { velocity: f32 },
    Stop,
}

/// Applies `DriveCommand`s to a drivetrain and keeps its closed loop ticking.
pub struct MotionController<DIR, PWM, ENC> {
    drivetrain: Drivetrain<DIR, PWM, ENC>,
    control_loop: ControlLoop,
    tick_period: Duration,
}

impl<DIR, PWM, ENC> MotionController<DIR, PWM, ENC>
where
    DIR: OutputPin,
    PWM: SetDutyCycle,
    ENC: Encoder,
{
    pub fn new(
        drivetrain: Drivetrain<DIR, PWM, ENC>,
        tick_period: Option<Duration>,
        max_ticks: Option<u32>,
    ) -> Self {
        MotionController {
            drivetrain,
            control_loop: ControlLoop::new(max_ticks),
            tick_period: tick_period.unwrap_or(DEFAULT_TICK_PERIOD),
        }
    }

    pub fn drivetrain(&self) -> &Drivetrain<DIR, PWM, ENC> {
        &self.drivetrain
    }

    pub fn drivetrain_mut(&mut self) -> &mut Drivetrain<DIR, PWM, ENC> {
        &mut self.drivetrain
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Execute a `DriveCommand` against the drivetrain.
    pub fn execute_command(
        &mut self,
        command: DriveCommand,
    ) -> Result<CommandOutcome, ActuatorError<DIR, PWM>> {
        let dt = &mut self.drivetrain;
        let outcome = match command {
            DriveCommand::TurnWheel { wheel, angle, speed } => {
                dt.turn_wheel(wheel, angle, speed)?;
                CommandOutcome::Applied
            }
            DriveCommand::TurnWhileMoving { radius, speed } => dt.turn_while_moving(radius, speed)?,
            DriveCommand::TurnInPlace { theta, speed } => {
                dt.turn_in_place(theta, speed)?;
                CommandOutcome::Applied
            }
            DriveCommand::DriveStraight { velocity } => {
                dt.drive_straight(velocity)?;
                CommandOutcome::Applied
            }
            DriveCommand::DriveMeters {
                displacement,
                speed,
            } => {
                dt.drive_meters(displacement, speed)?;
                CommandOutcome::Applied
            }
            DriveCommand::Reverse { velocity } => {
                dt.reverse(velocity)?;
                CommandOutcome::Applied
            }
            DriveCommand::Stop => {
                dt.stop()?;
                CommandOutcome::Applied
            }
        };

        if outcome == CommandOutcome::Applied {
            self.control_loop.restart();
        }
        Ok(outcome)
    }

    /// Run one control tick over all wheels.
    pub fn tick(&mut self) -> Result<TickReport, ActuatorError<DIR, PWM>> {
        self.control_loop.tick(&mut self.drivetrain)
    }

    /// Serve `COMMAND_CHANNEL` forever, ticking the control loop every period.
    pub async fn run(&mut self) -> ! {
        let mut next_tick = Instant::now() + self.tick_period;
        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            match with_timeout(wait, COMMAND_CHANNEL.receive()).await {
                Ok(command) => {
                    tracing::info!("Received drive command: {:?}", command);
                    match self.execute_command(command) {
                        Ok(CommandOutcome::Applied) => {}
                        Ok(CommandOutcome::Rejected(reason)) => {
                            tracing::warn!(?reason, "drive command rejected")
                        }
                        Err(e) => tracing::error!("drive command failed: {:?}", e),
                    }
                }
                Err(_) => {
                    match self.tick() {
                        Ok(TickReport::WatchdogTripped { ticks }) => {
                            tracing::warn!(ticks, "control loop watchdog tripped")
                        }
                        Ok(report) => tracing::trace!(?report, "control tick"),
                        Err(e) => tracing::error!("control tick failed: {:?}", e),
                    }
                    next_tick += self.tick_period;
                }
            }
        }
    }
}
