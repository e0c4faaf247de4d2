//! Single-wheel actuator for the Differential-Wheel Bot.
//!
//! A `WheelActuator` drives one DC motor through a direction pin and a PWM
//! speed channel, and tracks closed-loop angular moves against an incremental
//! encoder. Angle-limited moves only finish when [`WheelActuator::update`] is
//! polled every control tick.

use core::f32::consts::PI;

use embedded_hal::{
    digital::{self, OutputPin, PinState},
    pwm::{self, SetDutyCycle},
};
use serde::{Deserialize, Serialize};

/// Encoder steps per full wheel rotation used when no configuration is given.
pub const DEFAULT_STEPS_PER_ROTATION: u32 = 1440;
/// Physical speed limit (RPM) used when no configuration is given.
pub const DEFAULT_MAX_SPEED: f32 = 100.0;

/// Incremental encoder feed consumed by the wheel.
///
/// `read` must not block; it returns the latest cumulative step count since
/// the last `reset`.
pub trait Encoder {
    fn reset(&mut self);
    fn read(&mut self) -> i32;
}

/// Logical rotation sense of a wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// Negative values reverse; zero and positive values go forward.
    pub fn from_sign(value: f32) -> Self {
        if value < 0.0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

/// Counting sense of an encoder relative to the wheel's forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Normal,
    Inverted,
}

impl Polarity {
    pub fn sign(self) -> i32 {
        match self {
            Polarity::Normal => 1,
            Polarity::Inverted => -1,
        }
    }
}

/// Whether a wheel is chasing an angle target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Idle,
    Tracking,
}

/// Construction-time wheel configuration. Immutable once the wheel is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// Direction pin level that spins this wheel forward.
    pub forward_high: bool,
    /// Speed (RPM) mapped to the full PWM duty cycle.
    pub max_speed: f32,
    pub encoder_polarity: Polarity,
    pub steps_per_rotation: u32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            forward_high: true,
            max_speed: DEFAULT_MAX_SPEED,
            encoder_polarity: Polarity::Normal,
            steps_per_rotation: DEFAULT_STEPS_PER_ROTATION,
        }
    }
}

impl WheelConfig {
    /// Configuration for a wheel mounted mirrored: the opposite direction
    /// level drives it forward and its encoder counts the other way.
    pub fn mirrored(self) -> Self {
        Self {
            forward_high: !self.forward_high,
            encoder_polarity: match self.encoder_polarity {
                Polarity::Normal => Polarity::Inverted,
                Polarity::Inverted => Polarity::Normal,
            },
            ..self
        }
    }
}

/// Errors raised by the wheel's output hardware.
#[derive(Debug)]
pub enum WheelError<D: core::fmt::Debug, P: core::fmt::Debug> {
    Direction(D),
    Pwm(P),
}

/// `WheelError` specialised to the pin and PWM types of a wheel.
pub type ActuatorError<DIR, PWM> =
    WheelError<<DIR as digital::ErrorType>::Error, <PWM as pwm::ErrorType>::Error>;

/// Direction/PWM motor output with encoder-based angle tracking.
pub struct WheelActuator<DIR, PWM, ENC> {
    dir_pin: DIR,
    pwm: PWM,
    encoder: ENC,
    config: WheelConfig,
    direction: Direction,
    speed: f32,
    target_steps: i32,
}

impl<DIR, PWM, ENC> WheelActuator<DIR, PWM, ENC>
where
    DIR: OutputPin,
    PWM: SetDutyCycle,
    ENC: Encoder,
{
    /// Bind a wheel to its hardware and leave it stopped, pointing forward.
    pub fn new(
        dir_pin: DIR,
        pwm: PWM,
        encoder: ENC,
        config: WheelConfig,
    ) -> Result<Self, ActuatorError<DIR, PWM>> {
        let config = WheelConfig {
            max_speed: libm::fmaxf(config.max_speed, 0.0),
            ..config
        };
        let mut wheel = WheelActuator {
            dir_pin,
            pwm,
            encoder,
            config,
            direction: Direction::Forward,
            speed: 0.0,
            target_steps: 0,
        };
        wheel.set_speed(0.0)?;
        wheel.set_direction(Direction::Forward)?;
        Ok(wheel)
    }

    /// Write the direction pin level for `dir`.
    pub fn set_direction(
        &mut self,
        dir: Direction,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        let high = match dir {
            Direction::Forward => self.config.forward_high,
            Direction::Reverse => !self.config.forward_high,
        };
        self.dir_pin
            .set_state(PinState::from(high))
            .map_err(WheelError::Direction)?;
        self.direction = dir;
        Ok(())
    }

    /// Clamp `speed` to `[0, max_speed]` and write the matching duty cycle.
    pub fn set_speed(
        &mut self,
        speed: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        let max_speed = self.config.max_speed;
        let speed = if speed.is_nan() {
            0.0
        } else {
            speed.clamp(0.0, max_speed)
        };

        let max_duty = self.pwm.max_duty_cycle();
        let duty = if max_speed > 0.0 {
            ((speed / max_speed * max_duty as f32) as u16).min(max_duty)
        } else {
            0
        };
        self.pwm.set_duty_cycle(duty).map_err(WheelError::Pwm)?;
        self.speed = speed;
        Ok(())
    }

    /// Start a closed-loop rotation of `angle` radians at `speed`.
    ///
    /// Positive angles turn in the wheel's forward sense. A move that rounds to
    /// zero encoder steps leaves the wheel idle and stopped.
    pub fn turn_by_angle(
        &mut self,
        angle: f32,
        speed: f32,
    ) -> Result<(), ActuatorError<DIR, PWM>> {
        let steps = self.angle_to_steps(angle);
        self.encoder.reset();
        self.target_steps = steps.saturating_mul(self.config.encoder_polarity.sign());
        tracing::debug!(angle, steps, target = self.target_steps, "wheel angle target");

        self.set_direction(Direction::from_sign(angle))?;
        if self.target_steps == 0 {
            self.set_speed(0.0)
        } else {
            self.set_speed(speed)
        }
    }

    /// Poll the encoder and stop the wheel once its angle target is reached.
    ///
    /// Safe to call every tick; an idle wheel is left untouched.
    pub fn update(&mut self) -> Result<MotionPhase, ActuatorError<DIR, PWM>> {
        let target = self.target_steps;
        if target == 0 {
            return Ok(MotionPhase::Idle);
        }

        let steps = self.encoder.read();
        let reached = (target < 0 && steps <= target) || (target > 0 && steps >= target);
        if !reached {
            return Ok(MotionPhase::Tracking);
        }

        self.set_speed(0.0)?;
        self.target_steps = 0;
        tracing::debug!(steps, target, "wheel reached angle target");
        Ok(MotionPhase::Idle)
    }

    /// Drop any angle target without touching the outputs.
    pub fn cancel_target(&mut self) {
        self.target_steps = 0;
    }

    /// Raw encoder steps for a wheel rotation of `angle` radians.
    pub fn angle_to_steps(
        &self,
        angle: f32,
    ) -> i32 {
        libm::roundf(angle * self.config.steps_per_rotation as f32 / (2.0 * PI)) as i32
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Last speed written, after clamping.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Encoder target of the active move, 0 when idle.
    pub fn target_steps(&self) -> i32 {
        self.target_steps
    }

    pub fn phase(&self) -> MotionPhase {
        if self.target_steps == 0 {
            MotionPhase::Idle
        } else {
            MotionPhase::Tracking
        }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    /// Give back the hardware handles.
    pub fn release(self) -> (DIR, PWM, ENC) {
        (self.dir_pin, self.pwm, self.encoder)
    }
}
