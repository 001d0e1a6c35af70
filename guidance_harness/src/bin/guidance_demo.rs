use chrono::Utc;
use clap::Parser;
use guidance::{
    AlignmentTolerances, DeclinationModel, FixedDeclination, GeoLocation, GuidanceController,
    GuidanceEngine, GuidanceEvent, NoDeclination, SpaOracle, UpdateSource,
};
use guidance_harness::display;
use guidance_harness::{DevicePose, SimulatedDevice, SimulatedSensorSource};
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

/// Command line arguments for the guidance demo
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Solar panel alignment demo with simulated sensors",
    long_about = "Runs a full guidance session against a simulated device.\n\n\
        The demo feeds a scripted location fix and synthetic motion sensor \
        samples into the guidance engine, then steers the simulated device \
        toward the computed target the way a person following the on-screen \
        hints would. Useful for:\n  \
        - Watching the alignment verdict evolve tick by tick\n  \
        - Exercising every tilt strategy without hardware\n  \
        - Producing JSON snapshot streams for downstream tooling"
)]
struct Args {
    #[arg(
        long,
        default_value_t = 48.21,
        help = "Latitude in degrees, positive north",
        long_help = "Latitude of the scripted location fix in degrees, positive north. \
            Drives both the fixed-strategy tilt (latitude magnitude) and the \
            azimuth the panel faces (equatorward). Defaults to Vienna."
    )]
    latitude: f64,

    #[arg(
        long,
        default_value_t = 16.37,
        help = "Longitude in degrees, positive east",
        long_help = "Longitude of the scripted location fix in degrees, positive east. \
            Only the real-time strategy uses it, for the solar position query."
    )]
    longitude: f64,

    #[arg(
        long,
        help = "Altitude above sea level in meters",
        long_help = "Optional altitude of the location fix in meters. Feeds the \
            solar position query in real-time mode; sea level is assumed when \
            omitted."
    )]
    altitude: Option<f64>,

    #[arg(
        long,
        help = "Magnetic declination in degrees, east positive",
        long_help = "Magnetic declination at the location in degrees, east positive. \
            When given, targets are additionally expressed as compass bearings \
            and the device is steered against those. Look the value up for \
            your location; it is not derived from a geomagnetic model here."
    )]
    declination: Option<f64>,

    #[arg(
        short,
        long,
        default_value = "year_round",
        help = "Tilt strategy",
        long_help = "Tilt strategy to guide toward. Available strategies:\n  \
            - year_round: fixed compromise tilt for the whole year\n  \
            - summer: fixed tilt favoring the high summer sun\n  \
            - winter: fixed tilt favoring the low winter sun\n  \
            - spring_autumn: fixed tilt for the transitional seasons\n  \
            - realtime: follow the live sun position"
    )]
    mode: String,

    #[arg(
        short = 't',
        long,
        default_value_t = 10.0,
        help = "Demo duration in seconds",
        long_help = "Total duration of the demo in seconds. The simulated device \
            slews toward the target over the first part of the run, so very \
            short durations may end before alignment is reached."
    )]
    duration: f64,

    #[arg(
        long,
        default_value_t = 20.0,
        help = "Sensor sample rate in Hz",
        long_help = "Rate at which the simulated device produces sensor sample pairs, \
            in samples per second. Also the cadence of status output. Typical \
            range: 5-50 Hz."
    )]
    rate: f64,

    #[arg(
        long,
        default_value_t = 42,
        help = "Seed for the sensor noise generator",
        long_help = "Seed for the simulated sensor noise. Runs with the same seed and \
            arguments produce identical sample streams."
    )]
    seed: u64,

    #[arg(
        long,
        default_value_t = 3.0,
        help = "Device slew rate in degrees per tick",
        long_help = "How far the simulated device rotates toward the target per tick, \
            in degrees. Models how quickly the person holding the device \
            follows the hints."
    )]
    slew: f64,

    #[arg(
        long,
        help = "Force a perfect alignment verdict",
        long_help = "Report every axis as aligned regardless of the device pose. \
            Exercises the success path of downstream consumers without \
            having to steer the device onto the target."
    )]
    simulate_alignment: bool,

    #[arg(
        long,
        help = "Emit one JSON snapshot per tick instead of text",
        long_help = "Print each engine snapshot as a single JSON line on stdout and \
            suppress all other output. Suitable for piping into other tools."
    )]
    json: bool,

    #[arg(
        short,
        long,
        help = "Print the full status block every tick",
        long_help = "Print the rendered status block on every tick instead of progress \
            dots. Produces a lot of output at high sample rates."
    )]
    verbose: bool,
}

/// Sensor sampling interval for a sample rate in Hz.
///
/// Zero, negative and non-finite rates are rejected, as are positive rates
/// so small that the interval overflows a `Duration`.
fn sample_interval(rate: f64) -> Result<Duration, String> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err("Sample rate must be positive and finite".to_string());
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_err(|_| format!("Sample rate {rate} is out of range"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let interval = sample_interval(args.rate)?;
    let mode = display::parse_mode(&args.mode)
        .ok_or_else(|| format!("Unknown tilt mode: {}", args.mode))?;

    if !args.json {
        println!("Solar Panel Guidance Demo");
        println!("=========================");
        println!("Mode: {}", display::mode_title(mode));
        println!("Location: {:.4}, {:.4}", args.latitude, args.longitude);
        if let Some(declination) = args.declination {
            println!("Declination: {declination:.2} deg east");
        }
        println!("UTC time: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        println!("Duration: {} seconds at {} Hz", args.duration, args.rate);
        println!();
    }

    let declination_model: Box<dyn DeclinationModel> = match args.declination {
        Some(declination) => Box::new(FixedDeclination(declination)),
        None => Box::new(NoDeclination),
    };
    let controller = GuidanceController::new(
        Box::new(SpaOracle),
        declination_model,
        AlignmentTolerances::default(),
    );
    let mut engine = GuidanceEngine::spawn(controller);

    engine.send(GuidanceEvent::ModeSelected(mode));
    let location = GeoLocation {
        latitude: args.latitude,
        longitude: args.longitude,
        altitude_m: args.altitude,
        accuracy_m: None,
    };
    engine.send(GuidanceEvent::LocationChanged(Some(location)));
    if args.simulate_alignment {
        engine.send(GuidanceEvent::SimulateAlignment(true));
    }

    // Start the simulated device well off target in every axis.
    let mut device = SimulatedDevice::new(args.seed);
    device.set_pose(DevicePose::new(310.0, -5.0, 12.0));
    let mut sensors = SimulatedSensorSource::new(engine.sender(), device, interval);
    let device_handle = sensors.device();
    sensors.start();

    let ticks = (args.duration * args.rate).ceil() as u64;
    let started = Instant::now();
    let mut aligned_after: Option<f64> = None;

    for tick in 0..ticks {
        thread::sleep(interval);
        let snapshot = engine.snapshot();

        // Follow the hints: slew the device toward the flipped bearing and
        // the target tilt.
        if let (Some(target), Some(verdict)) = (&snapshot.target, &snapshot.verdict) {
            let goal = DevicePose::new(verdict.device_target_azimuth, -target.target_tilt, 0.0);
            let mut device = device_handle.lock().unwrap();
            let pose = device.pose();
            device.set_pose(pose.step_toward(&goal, args.slew));
        }

        if args.json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else if args.verbose {
            println!("{}", display::render(&snapshot));
            println!();
        } else if tick % 10 == 0 {
            print!(".");
            std::io::stdout().flush()?;
        }

        if aligned_after.is_none() && snapshot.verdict.as_ref().is_some_and(|v| v.aligned) {
            let elapsed = started.elapsed().as_secs_f64();
            aligned_after = Some(elapsed);
            if !args.json {
                if !args.verbose {
                    println!();
                }
                println!("✅ Aligned after {elapsed:.1} s");
            }
        }
    }

    if !args.json {
        if !args.verbose && aligned_after.is_none() {
            println!();
        }
        println!("\nFinal state");
        println!("-----------");
        println!("{}", display::render(&engine.snapshot()));
        match aligned_after {
            Some(elapsed) => println!("\n✅ Panel aligned (first reached after {elapsed:.1} s)"),
            None => println!("\nPanel not aligned within {:.1} s", args.duration),
        }
    }

    sensors.stop();
    engine.stop();
    Ok(())
}
