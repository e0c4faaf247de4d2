//! In-memory stand-ins for the wheel hardware, shared by the unit tests.

use core::{cell::Cell, convert::Infallible};

use embedded_hal::{digital, pwm};

use super::wheel::Encoder;

/// Observable state of one wheel's outputs and encoder.
pub struct Outputs {
    pub level: Cell<Option<bool>>,
    pub duty: Cell<u16>,
    pub steps: Cell<i32>,
}

impl Outputs {
    pub fn new() -> Self {
        Self {
            level: Cell::new(None),
            duty: Cell::new(0),
            steps: Cell::new(0),
        }
    }
}

pub struct FakePin<'a>(pub &'a Cell<Option<bool>>);

impl digital::ErrorType for FakePin<'_> {
    type Error = Infallible;
}

impl digital::OutputPin for FakePin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(Some(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(Some(true));
        Ok(())
    }
}

/// 8-bit PWM channel.
pub struct FakePwm<'a>(pub &'a Cell<u16>);

impl pwm::ErrorType for FakePwm<'_> {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for FakePwm<'_> {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        self.0.set(duty);
        Ok(())
    }
}

pub struct FakeEncoder<'a>(pub &'a Cell<i32>);

impl Encoder for FakeEncoder<'_> {
    fn reset(&mut self) {
        self.0.set(0);
    }

    fn read(&mut self) -> i32 {
        self.0.get()
    }
}
