mod plant;

use core::cell::RefCell;
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use clap::Parser;
use embassy_executor::{Executor, Spawner};
use lfb_core::{
    mk_static,
    utils::{
        config::PWM_FULL_SCALE,
        controllers::{CalibratedArray, MotorChannel, Tb6612fng},
        diagnostics::{ChannelSink, TELEMETRY_CHANNEL, TELEMETRY_DEPTH},
        Duration, LineFollower, Ticker, Tunables,
    },
};
use plant::{Line, Plant, Side, SimPin, SimPwm, SimSensors, SENSORS};
use static_cell::StaticCell;
use tracing::{error, info};

/// Simulation step of the plant.
const PLANT_STEP: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// JSON file overriding any of the tunables
    #[clap(long)]
    config: Option<PathBuf>,
    /// lateral offset of the bot from the line at start (mm)
    #[clap(long, default_value_t = 12.0, allow_negative_numbers = true)]
    start_offset: f32,
}

type Drive = Tb6612fng<SimPin, SimPin, SimPwm, SimPin, SimPin, SimPwm>;
type Follower = LineFollower<
    CalibratedArray<SimSensors, SENSORS>,
    Drive,
    ChannelSink<'static, SENSORS, TELEMETRY_DEPTH>,
    SimPin,
    SENSORS,
>;

fn load_tunables(path: &Path) -> Result<Tunables, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let tunables: Tunables = serde_json::from_str(&text)?;
    tunables.validate()?;
    Ok(tunables)
}

#[embassy_executor::task]
async fn plant_task(plant: &'static RefCell<Plant>) -> ! {
    let mut ticker = Ticker::every(PLANT_STEP);
    let dt = PLANT_STEP.as_micros() as f32 / 1_000_000.0;
    loop {
        ticker.next().await;
        plant.borrow_mut().advance(dt);
    }
}

#[embassy_executor::task]
async fn telemetry_task() -> ! {
    loop {
        let record = TELEMETRY_CHANNEL.receive().await;
        println!("{}", record);
    }
}

#[embassy_executor::task]
async fn control_task(mut follower: Follower) -> ! {
    follower.start().await;
    follower.run().await
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    tunables: Tunables,
    start_offset: f32,
) {
    let plant: &'static RefCell<Plant> =
        mk_static!(RefCell<Plant>, RefCell::new(Plant::new(start_offset)));
    spawner.spawn(plant_task(plant)).unwrap();
    spawner.spawn(telemetry_task()).unwrap();

    let left = MotorChannel::new(
        SimPin::new(plant, Line::LeftIn1),
        SimPin::new(plant, Line::LeftIn2),
        SimPwm::new(plant, Side::Left),
    );
    let right = MotorChannel::new(
        SimPin::new(plant, Line::RightIn1),
        SimPin::new(plant, Line::RightIn2),
        SimPwm::new(plant, Side::Right),
    );
    let max_duty = u16::try_from(tunables.max_speed).unwrap_or(PWM_FULL_SCALE);

    let follower: Follower = match LineFollower::new(
        CalibratedArray::new(SimSensors::new(plant)),
        Tb6612fng::new(left, right, max_duty),
        ChannelSink::new(&TELEMETRY_CHANNEL),
        SimPin::new(plant, Line::Indicator),
        Some(tunables),
    ) {
        Ok(f) => f,
        Err(e) => {
            error!("Rejected tunables: {}", e);
            return;
        }
    };

    info!(start_offset, "Starting simulated line follower");
    spawner.spawn(control_task(follower)).unwrap();
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let tunables = match opts.config.as_deref() {
        Some(path) => match load_tunables(path) {
            Ok(t) => {
                info!(path = %path.display(), "Loaded tunables");
                t
            }
            Err(e) => {
                error!(path = %path.display(), "Invalid tunables: {}", e);
                std::process::exit(1);
            }
        },
        None => Tunables::default(),
    };

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner
            .spawn(main_task(spawner, tunables, opts.start_offset))
            .unwrap();
    });
}
