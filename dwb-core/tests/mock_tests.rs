use core::f32::consts::PI;
use std::{cell::Cell, convert::Infallible, rc::Rc};

use dwb_core::utils::controllers::{
    ChassisConfig, CommandOutcome, ControlLoop, Direction, Drivetrain, Encoder, TickReport,
    WheelActuator, WheelConfig, WheelPosition,
};
use dwb_core::utils::{decode_frame, MotionController};
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};

/// 8-bit PWM channel whose last duty is visible to the test.
#[derive(Clone, Default)]
pub struct SharedPwm(Rc<Cell<u16>>);

impl ErrorType for SharedPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SharedPwm {
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

/// Encoder counter the test advances by hand.
#[derive(Clone, Default)]
pub struct SharedEncoder(Rc<Cell<i32>>);

impl Encoder for SharedEncoder {
    fn reset(&mut self) {
        self.0.set(0);
    }

    fn read(&mut self) -> i32 {
        self.0.get()
    }
}

/// One wheel's test handles.
struct Rig {
    pin: PinMock,
    pwm: SharedPwm,
    encoder: SharedEncoder,
    config: WheelConfig,
}

impl Rig {
    /// `levels` are the direction writes expected after construction.
    fn new(
        config: WheelConfig,
        levels: &[PinState],
    ) -> Self {
        let forward = if config.forward_high {
            PinState::High
        } else {
            PinState::Low
        };
        let expectations: Vec<PinTransaction> = std::iter::once(forward)
            .chain(levels.iter().copied())
            .map(PinTransaction::set)
            .collect();
        Rig {
            pin: PinMock::new(&expectations),
            pwm: SharedPwm::default(),
            encoder: SharedEncoder::default(),
            config,
        }
    }

    fn wheel(&self) -> WheelActuator<PinMock, SharedPwm, SharedEncoder> {
        WheelActuator::new(
            self.pin.clone(),
            self.pwm.clone(),
            self.encoder.clone(),
            self.config,
        )
        .unwrap()
    }

    fn done(&mut self) {
        self.pin.done();
    }
}

/// Rigs in `WheelPosition::ALL` order; right wheels are mounted mirrored.
fn rigs(
    right_levels: &[PinState],
    left_levels: &[PinState],
) -> [Rig; 4] {
    let left = WheelConfig::default();
    let right = left.mirrored();
    [
        Rig::new(right, right_levels),
        Rig::new(right, right_levels),
        Rig::new(left, left_levels),
        Rig::new(left, left_levels),
    ]
}

fn drivetrain(rigs: &[Rig; 4]) -> Drivetrain<PinMock, SharedPwm, SharedEncoder> {
    Drivetrain::new(
        rigs[0].wheel(),
        rigs[1].wheel(),
        rigs[2].wheel(),
        rigs[3].wheel(),
        ChassisConfig::new(Some(0.3), Some(0.05)),
    )
}

#[test]
fn test_drive_straight_pin_levels() {
    // Backwards on a mirrored wheel drives its pin high.
    let mut rigs = rigs(&[PinState::High], &[PinState::Low]);
    let mut dt = drivetrain(&rigs);
    dt.drive_straight(-20.0).unwrap();

    for rig in rigs.iter_mut() {
        assert_eq!(rig.pwm.0.get(), 51);
        rig.done();
    }
}

#[test]
fn test_rejected_arc_writes_nothing() {
    let mut rigs = rigs(&[], &[]);
    let mut dt = drivetrain(&rigs);
    let outcome = dt.turn_while_moving(0.1, 50.0).unwrap();
    assert!(matches!(outcome, CommandOutcome::Rejected(_)));

    for rig in rigs.iter_mut() {
        assert_eq!(rig.pwm.0.get(), 0);
        rig.done();
    }
}

#[test]
fn test_arc_drives_all_forward() {
    let mut rigs = rigs(&[PinState::Low], &[PinState::High]);
    let mut dt = drivetrain(&rigs);
    dt.turn_while_moving(-0.3, 50.0).unwrap();

    assert_eq!(rigs[0].pwm.0.get(), 63);
    assert_eq!(rigs[2].pwm.0.get(), 191);
    for rig in rigs.iter_mut() {
        rig.done();
    }
}

#[test]
fn test_turn_in_place_runs_to_completion() {
    // CCW: right wheels forward (mirrored, low), left wheels reverse (low).
    let mut rigs = rigs(&[PinState::Low], &[PinState::Low]);
    let mut dt = drivetrain(&rigs);
    let mut ctl = ControlLoop::new(Some(1_000));

    dt.turn_in_place(PI / 2.0, 40.0).unwrap();
    let targets: Vec<i32> = WheelPosition::ALL
        .iter()
        .map(|p| dt.wheel(*p).target_steps())
        .collect();
    assert_eq!(targets, vec![-1080, -1080, -1080, -1080]);

    let mut ticks = 0;
    while ctl.tick(&mut dt).unwrap() != TickReport::Idle {
        for rig in rigs.iter() {
            // Every wheel's encoder counts down towards its target.
            rig.encoder.0.set(rig.encoder.0.get() - 40);
        }
        ticks += 1;
        assert!(ticks < 100);
    }

    assert_eq!(ticks, 27);
    for rig in rigs.iter_mut() {
        assert_eq!(rig.pwm.0.get(), 0);
        rig.done();
    }
}

#[test]
fn test_controller_executes_decoded_frames() {
    // drive_meters stops first, then targets; the final stop writes forward again.
    let mut rigs = rigs(&[PinState::Low; 3], &[PinState::High; 3]);
    let dt = drivetrain(&rigs);
    let mut ctl = MotionController::new(dt, None, None);

    let mut frame = [0u8; 14];
    frame[0] = 4;
    frame[2..6].copy_from_slice(&0.25f32.to_le_bytes());
    frame[6..10].copy_from_slice(&80.0f32.to_le_bytes());
    let command = decode_frame(&frame).unwrap();
    assert_eq!(ctl.execute_command(command).unwrap(), CommandOutcome::Applied);

    let fl = ctl.drivetrain().wheel(WheelPosition::FrontLeft);
    assert_eq!(fl.direction(), Direction::Forward);
    assert_eq!(fl.target_steps(), 1146);
    assert_eq!(rigs[2].pwm.0.get(), 204);

    let stop = decode_frame(br#"{"dc":"stop"}"#).unwrap();
    ctl.execute_command(stop).unwrap();
    assert_eq!(ctl.tick().unwrap(), TickReport::Idle);
    for rig in rigs.iter_mut() {
        assert_eq!(rig.pwm.0.get(), 0);
        rig.done();
    }
}
