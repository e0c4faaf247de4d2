//! Simulated wheel hardware for running the motion core on a host.
//!
//! Each `SimWheel` stands in for one motor: its direction pin level and PWM
//! duty are written by the core, and `advance` integrates them into encoder
//! steps the way a real wheel would turn.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, Ordering};

use dwb_core::utils::controllers::{Encoder, WheelConfig};
use embedded_hal::{digital, pwm};

/// Full-scale duty of the simulated PWM channels.
pub const MAX_DUTY: u16 = 255;

pub struct SimWheel {
    name: &'static str,
    config: WheelConfig,
    /// Encoder steps per physics tick at full duty.
    steps_per_tick: f32,
    level: AtomicBool,
    duty: AtomicU16,
    steps: AtomicI32,
    /// Steps since power-up, never reset.
    odometer: AtomicI32,
}

impl SimWheel {
    pub fn new(
        name: &'static str,
        config: WheelConfig,
        steps_per_tick: f32,
    ) -> Self {
        Self {
            name,
            config,
            steps_per_tick,
            level: AtomicBool::new(false),
            duty: AtomicU16::new(0),
            steps: AtomicI32::new(0),
            odometer: AtomicI32::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> WheelConfig {
        self.config
    }

    pub fn odometer(&self) -> i32 {
        self.odometer.load(Ordering::Relaxed)
    }

    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::Relaxed)
    }

    /// Turn the wheel for one physics tick.
    pub fn advance(&self) {
        let duty = self.duty.load(Ordering::Relaxed);
        if duty == 0 {
            return;
        }
        let magnitude = (self.steps_per_tick * duty as f32 / MAX_DUTY as f32).round() as i32;
        let forward = self.level.load(Ordering::Relaxed) == self.config.forward_high;
        let sense = if forward { 1 } else { -1 };
        let delta = sense * self.config.encoder_polarity.sign() * magnitude.max(1);

        self.steps.fetch_add(delta, Ordering::Relaxed);
        self.odometer.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn handles(&'static self) -> (SimDirPin, SimPwm, SimEncoder) {
        (SimDirPin(self), SimPwm(self), SimEncoder(self))
    }
}

pub struct SimDirPin(&'static SimWheel);

impl digital::ErrorType for SimDirPin {
    type Error = Infallible;
}

impl digital::OutputPin for SimDirPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.level.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.level.store(true, Ordering::Relaxed);
        Ok(())
    }
}

pub struct SimPwm(&'static SimWheel);

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        MAX_DUTY
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        self.0.duty.store(duty, Ordering::Relaxed);
        Ok(())
    }
}

pub struct SimEncoder(&'static SimWheel);

impl Encoder for SimEncoder {
    fn reset(&mut self) {
        self.0.steps.store(0, Ordering::Relaxed);
    }

    fn read(&mut self) -> i32 {
        self.0.steps.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwb_core::utils::controllers::WheelActuator;

    fn leak(wheel: SimWheel) -> &'static SimWheel {
        Box::leak(Box::new(wheel))
    }

    #[test]
    fn mirrored_wheel_counts_down_going_forward() {
        let sim = leak(SimWheel::new("fr", WheelConfig::default().mirrored(), 10.0));
        let (dir, pwm, enc) = sim.handles();
        let mut wheel = WheelActuator::new(dir, pwm, enc, sim.config()).unwrap();

        wheel.turn_by_angle(1.0, 100.0).unwrap();
        assert!(wheel.target_steps() < 0);
        sim.advance();
        assert_eq!(sim.odometer(), -10);
    }

    #[test]
    fn simulated_wheel_reaches_target() {
        let sim = leak(SimWheel::new("bl", WheelConfig::default(), 7.0));
        let (dir, pwm, enc) = sim.handles();
        let mut wheel = WheelActuator::new(dir, pwm, enc, sim.config()).unwrap();

        wheel.turn_by_angle(-2.0, 50.0).unwrap();
        let mut ticks = 0;
        while wheel.update().unwrap() == dwb_core::utils::controllers::MotionPhase::Tracking {
            sim.advance();
            ticks += 1;
            assert!(ticks < 1_000);
        }
        assert_eq!(sim.duty(), 0);
        assert!(sim.odometer() <= wheel.angle_to_steps(-2.0));
    }
}
