//! Headless vehicle tuner.
//!
//! Drives a vehicle through a scripted course on a flat plane using the same
//! simulation core as the game and prints per-tick telemetry as CSV to
//! stdout. Summary lines go to stderr prefixed with `#`.
//!
//! Run with: cargo run -p cityrun --bin vehicle-tuning -- [tuning.ron]

use std::{env, process};

use cityrun_core::{
    ControlMode, FlatWorld, InputState, Key, PhysicsWorld, Simulation, SimulationConfig,
    VehicleAppearance,
};
use glam::Vec3;

/// Ticks spent on foot before getting in, so the agent lands first.
const SETTLE_TICKS: u32 = 60;

/// Tick length of the scripted run (60 Hz).
const DT: f32 = 1.0 / 60.0;

/// Ground point of the test vehicle, within reach of the agent spawn.
const VEHICLE_POINT: Vec3 = Vec3::new(2.0, 0.0, 10.0);

/// A scripted input phase.
struct Phase {
    name: &'static str,
    duration: f32,
    keys: &'static [Key],
}

const COURSE: &[Phase] = &[
    Phase {
        name: "accelerate",
        duration: 8.0,
        keys: &[Key::Forward],
    },
    Phase {
        name: "turn",
        duration: 4.0,
        keys: &[Key::Forward, Key::Right],
    },
    Phase {
        name: "coast",
        duration: 3.0,
        keys: &[],
    },
    Phase {
        name: "brake",
        duration: 4.0,
        keys: &[Key::Back],
    },
    Phase {
        name: "reverse",
        duration: 3.0,
        keys: &[Key::Back, Key::Left],
    },
];

const CSV_HEADER: &str = "time,phase,speed_kmh,forward_speed,steering_angle,yaw_rate,x,z";

/// Tracked results of the run.
#[derive(Default)]
struct Measurements {
    top_speed_kmh: f32,
    time_to_50_kmh: Option<f32>,
    brake_start_speed_kmh: Option<f32>,
    stop_time: Option<f32>,
}

fn load_config() -> SimulationConfig {
    let Some(path) = env::args().nth(1) else {
        return SimulationConfig::default();
    };
    match SimulationConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("# ERROR: {e}");
            process::exit(1);
        }
    }
}

fn input_for(keys: &[Key]) -> InputState {
    keys.iter()
        .fold(InputState::default(), |input, &key| input.with_key(key))
}

fn main() {
    let config = load_config();

    let mut world = FlatWorld::new();
    let agent = world.add_body(&config.agent.body_desc());
    let vehicle_body = world.add_body(&config.vehicle.body_desc(VEHICLE_POINT, 0.0));

    let mut sim = Simulation::new(config, agent);
    sim.add_vehicle(vehicle_body, VehicleAppearance::Colored(0x44_aa_ff));

    for _ in 0..SETTLE_TICKS {
        sim.tick(&mut world, &InputState::default(), DT);
    }
    sim.tick(&mut world, &input_for(&[Key::Interact]), DT);
    if sim.mode() != ControlMode::Driving {
        eprintln!(
            "# ERROR: agent could not enter the vehicle (nearest: {:?})",
            sim.proximity()
        );
        process::exit(1);
    }
    eprintln!("# Entered vehicle, running course...");

    println!("{CSV_HEADER}");
    let mut results = Measurements::default();
    let mut elapsed = 0.0;
    for phase in COURSE {
        let input = input_for(phase.keys);
        let phase_end = elapsed + phase.duration;
        while elapsed < phase_end {
            sim.tick(&mut world, &input, DT);
            elapsed += DT;

            let Some(vehicle) = sim.driven_vehicle() else {
                eprintln!("# ERROR: vehicle lost control");
                process::exit(1);
            };
            let Some(state) = world.body(vehicle.body) else {
                eprintln!("# ERROR: vehicle body missing");
                process::exit(1);
            };

            let speed = vehicle.speed_kmh;
            results.top_speed_kmh = results.top_speed_kmh.max(speed);
            if results.time_to_50_kmh.is_none() && speed >= 50.0 {
                results.time_to_50_kmh = Some(elapsed);
            }
            if phase.name == "brake" {
                if results.brake_start_speed_kmh.is_none() {
                    results.brake_start_speed_kmh = Some(speed);
                }
                if results.stop_time.is_none() && state.forward_speed() <= 0.0 {
                    results.stop_time = Some(elapsed - (phase_end - phase.duration));
                }
            }

            println!(
                "{:.3},{},{:.2},{:.3},{:.4},{:.4},{:.2},{:.2}",
                elapsed,
                phase.name,
                speed,
                state.forward_speed(),
                vehicle.steering_angle,
                state.angular_velocity.y,
                state.position.x,
                state.position.z,
            );
        }
    }

    eprintln!("# Results:");
    eprintln!("#   Top speed: {:.1} km/h", results.top_speed_kmh);
    match results.time_to_50_kmh {
        Some(t) => eprintln!("#   0-50 km/h: {t:.2} s"),
        None => eprintln!("#   0-50 km/h: not reached"),
    }
    if let Some(start) = results.brake_start_speed_kmh {
        match results.stop_time {
            Some(t) => eprintln!("#   Braking from {start:.1} km/h: stopped in {t:.2} s"),
            None => eprintln!("#   Braking from {start:.1} km/h: did not stop"),
        }
    }
}
