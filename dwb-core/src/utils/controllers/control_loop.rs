//! Control-loop tick scheduler.
//!
//! Angle-limited moves only terminate when every wheel is polled each tick.
//! `ControlLoop` owns that contract: call [`ControlLoop::tick`] once per
//! control period and it updates all four wheels. An optional tick budget
//! stops the drivetrain when a move never reaches its target (stalled wheel,
//! dead encoder).

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use super::{
    drivetrain::Drivetrain,
    wheel::{ActuatorError, Encoder},
};

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// No wheel is tracking an angle target.
    Idle,
    /// `wheels` are still short of their target.
    Tracking { wheels: usize },
    /// The tick budget ran out and the drivetrain was stopped.
    WatchdogTripped { ticks: u32 },
}

#[derive(Debug, Default)]
pub struct ControlLoop {
    max_ticks: Option<u32>,
    tracking_ticks: u32,
}

impl ControlLoop {
    /// `max_ticks` of `None` lets a move track forever.
    pub fn new(max_ticks: Option<u32>) -> Self {
        Self {
            max_ticks,
            tracking_ticks: 0,
        }
    }

    /// Reset the tick budget; call when a new command is issued.
    pub fn restart(&mut self) {
        self.tracking_ticks = 0;
    }

    pub fn tracking_ticks(&self) -> u32 {
        self.tracking_ticks
    }

    pub fn tick<DIR, PWM, ENC>(
        &mut self,
        drivetrain: &mut Drivetrain<DIR, PWM, ENC>,
    ) -> Result<TickReport, ActuatorError<DIR, PWM>>
    where
        DIR: OutputPin,
        PWM: SetDutyCycle,
        ENC: Encoder,
    {
        let status = drivetrain.update()?;
        if status.is_idle() {
            self.tracking_ticks = 0;
            return Ok(TickReport::Idle);
        }

        self.tracking_ticks = self.tracking_ticks.saturating_add(1);
        match self.max_ticks {
            Some(max) if self.tracking_ticks > max => {
                let ticks = self.tracking_ticks;
                tracing::warn!(ticks, wheels = status.tracking, "angle move timed out, stopping");
                drivetrain.stop()?;
                self.tracking_ticks = 0;
                Ok(TickReport::WatchdogTripped { ticks })
            }
            _ => Ok(TickReport::Tracking {
                wheels: status.tracking,
            }),
        }
    }
}
