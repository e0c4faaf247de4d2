mod sim;

use std::io::BufRead;
use std::path::PathBuf;

use clap::Parser;
use dwb_core::mk_static;
use dwb_core::utils::controllers::{
    ChassisConfig, DriveCommand, Drivetrain, WheelActuator, WheelConfig, WheelError,
    COMMAND_CHANNEL,
};
use dwb_core::utils::{decode_frame, Duration, MotionController, Ticker, Timer};
use embassy_executor::{Executor, Spawner};
use serde::Deserialize;
use sim::{SimDirPin, SimEncoder, SimPwm, SimWheel};
use static_cell::StaticCell;
use std::convert::Infallible;
use tracing::{error, info, warn};

type SimController = MotionController<SimDirPin, SimPwm, SimEncoder>;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// distance between left and right wheels (m)
    #[clap(long, default_value_t = 0.3)]
    track_width: f32,
    /// wheel radius (m)
    #[clap(long, default_value_t = 0.05)]
    wheel_radius: f32,
    /// wheel speed at full duty (RPM)
    #[clap(long, default_value_t = 100.0)]
    max_speed: f32,
    #[clap(long, default_value_t = 1440)]
    steps_per_rotation: u32,
    /// control tick period (ms)
    #[clap(long, default_value_t = 10)]
    tick_ms: u64,
    /// stop angle moves that track for more than this many ticks
    #[clap(long)]
    max_ticks: Option<u32>,
    /// JSON file with a list of `{ "wait_ms": .., "command": {..} }` steps
    #[clap(long)]
    script: Option<PathBuf>,
    /// read command frames (JSON, one per line) from stdin instead of a script
    #[clap(long)]
    stdin: bool,
    /// time to let the last scripted move finish before exiting (ms)
    #[clap(long, default_value_t = 3000)]
    settle_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ScriptStep {
    #[serde(default)]
    wait_ms: u64,
    command: DriveCommand,
}

fn demo_script() -> Vec<ScriptStep> {
    let step = |wait_ms, command| ScriptStep { wait_ms, command };
    vec![
        step(0, DriveCommand::DriveMeters {
            displacement: 0.5,
            speed: 60.0,
        }),
        step(2500, DriveCommand::TurnInPlace {
            theta: core::f32::consts::FRAC_PI_2,
            speed: 40.0,
        }),
        step(2500, DriveCommand::TurnWhileMoving {
            radius: 0.1,
            speed: 50.0,
        }),
        step(100, DriveCommand::TurnWhileMoving {
            radius: -0.5,
            speed: 50.0,
        }),
        step(1000, DriveCommand::Reverse { velocity: 30.0 }),
        step(500, DriveCommand::Stop),
        step(100, DriveCommand::TurnWheel {
            wheel: dwb_core::utils::controllers::WheelPosition::BackLeft,
            angle: -core::f32::consts::PI,
            speed: 25.0,
        }),
    ]
}

fn load_script(opts: &Opts) -> Result<Vec<ScriptStep>, String> {
    match &opts.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))
        }
        None => Ok(demo_script()),
    }
}

fn build_controller(
    opts: &Opts,
    sims: &'static [SimWheel; 4],
) -> Result<SimController, WheelError<Infallible, Infallible>> {
    let wheel = |sim: &'static SimWheel| {
        let (dir, pwm, enc) = sim.handles();
        WheelActuator::new(dir, pwm, enc, sim.config())
    };
    let drivetrain = Drivetrain::new(
        wheel(&sims[0])?,
        wheel(&sims[1])?,
        wheel(&sims[2])?,
        wheel(&sims[3])?,
        ChassisConfig::new(Some(opts.track_width), Some(opts.wheel_radius)),
    );
    Ok(MotionController::new(
        drivetrain,
        Some(Duration::from_millis(opts.tick_ms)),
        opts.max_ticks,
    ))
}

#[embassy_executor::task]
async fn control_task(mut ctrl: SimController) -> ! {
    ctrl.run().await
}

#[embassy_executor::task]
async fn physics_task(
    sims: &'static [SimWheel; 4],
    period: Duration,
) -> ! {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        for sim in sims.iter() {
            sim.advance();
        }
    }
}

fn report(sims: &[SimWheel; 4]) {
    for sim in sims.iter() {
        info!(wheel = sim.name(), odometer = sim.odometer(), duty = sim.duty(), "wheel state");
    }
}

/// Forward stdin frames to the control task from a plain thread.
fn spawn_stdin_reader() {
    std::thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("stdin read failed: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match decode_frame(line.as_bytes()) {
                Ok(command) => {
                    if COMMAND_CHANNEL.try_send(command).is_err() {
                        warn!("command queue full, dropping {:?}", command);
                    }
                }
                Err(e) => warn!("invalid command frame: {:?}", e),
            }
        }
        info!("stdin closed");
    });
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    opts: Opts,
) {
    // Right wheels are mounted mirrored: opposite pin level and encoder sense.
    let left = WheelConfig {
        max_speed: opts.max_speed,
        steps_per_rotation: opts.steps_per_rotation,
        ..WheelConfig::default()
    };
    let right = left.mirrored();
    let period = Duration::from_millis(opts.tick_ms);
    // Full duty turns the wheel at max_speed RPM.
    let steps_per_tick =
        opts.max_speed / 60_000.0 * opts.tick_ms as f32 * opts.steps_per_rotation as f32;
    let sims: &'static [SimWheel; 4] = mk_static!(
        [SimWheel; 4],
        [
            SimWheel::new("front_right", right, steps_per_tick),
            SimWheel::new("back_right", right, steps_per_tick),
            SimWheel::new("front_left", left, steps_per_tick),
            SimWheel::new("back_left", left, steps_per_tick),
        ]
    );

    let ctrl = match build_controller(&opts, sims) {
        Ok(ctrl) => ctrl,
        Err(e) => {
            error!("failed to bring up drivetrain: {:?}", e);
            std::process::exit(1);
        }
    };
    spawner.spawn(control_task(ctrl)).unwrap();
    spawner.spawn(physics_task(sims, period)).unwrap();

    if opts.stdin {
        info!("Reading command frames from stdin");
        spawn_stdin_reader();
        return;
    }

    let script = match load_script(&opts) {
        Ok(script) => script,
        Err(e) => {
            error!("failed to load script: {e}");
            std::process::exit(1);
        }
    };
    for step in script {
        Timer::after_millis(step.wait_ms).await;
        info!("Sending {:?}", step.command);
        COMMAND_CHANNEL.send(step.command).await;
    }

    Timer::after_millis(opts.settle_ms).await;
    report(sims);
    std::process::exit(0);
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts = Opts::parse();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, opts)).unwrap();
    });
}
