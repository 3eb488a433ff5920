#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that walks a Strider creature across seeded terrain.

mod config_file;
mod terrain;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use strider_controller::GaitController;
use strider_core::{BodyPose, Event, LimbSetup, Quat, Vec3};
use tracing::info;

use crate::{config_file::RunFile, terrain::Terrain};

const TERRAIN_EXTENT: f32 = 40.0;
const TERRAIN_HILLS: usize = 120;

/// Command-line arguments accepted by the `strider` binary.
#[derive(Debug, Parser)]
#[command(
    name = "strider",
    version,
    about = "Walks a procedurally animated creature across seeded terrain"
)]
struct CliArgs {
    /// TOML file with a `[gait]` table and optional `[[limbs]]` entries.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Tick length in milliseconds.
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,
    /// Forward speed of the body in units per second.
    #[arg(long, default_value_t = 1.2)]
    speed: f32,
    /// Turning rate of the body in radians per second.
    #[arg(long, default_value_t = 0.3)]
    turn_rate: f32,
    /// Seed for the procedural terrain.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Number of limbs laid out around the body when the config names none.
    #[arg(long, default_value_t = 6)]
    limbs: usize,
    /// Distance of radially laid out limbs from the body centre.
    #[arg(long, default_value_t = 1.0)]
    radius: f32,
    /// Height of the body above the terrain directly beneath it.
    #[arg(long, default_value_t = 0.8)]
    ride_height: f32,
    /// Tick at which the gait is reset, cancelling every step in flight.
    #[arg(long)]
    reset_at: Option<u32>,
    /// Prints every step event as it happens.
    #[arg(long)]
    verbose: bool,
}

/// Entry point for the Strider command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();
    run(&args)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn run(args: &CliArgs) -> Result<()> {
    let run_file = match &args.config {
        Some(path) => config_file::load(path)?,
        None => RunFile::default(),
    };
    let gait_config = run_file.gait_config()?;
    let offsets = run_file.limb_offsets(args.limbs, args.radius)?;

    let terrain = Terrain::generate(args.seed, TERRAIN_EXTENT, TERRAIN_HILLS);
    let start_height = terrain.height_at(0.0, 0.0) + args.ride_height;
    let mut pose = BodyPose::at(Vec3::new(0.0, start_height, 0.0));
    let limbs = offsets
        .iter()
        .map(|offset| LimbSetup::at(pose.local_to_world(*offset)).with_home_offset(*offset))
        .collect();

    info!(
        seed = args.seed,
        ticks = args.ticks,
        dt_ms = args.dt_ms,
        limbs = offsets.len(),
        speed = args.speed,
        "starting walk"
    );

    let mut controller = GaitController::new(gait_config, pose, limbs, terrain)
        .context("failed to create gait controller")?;

    let dt = Duration::from_millis(args.dt_ms);
    let mut summary = Summary::default();
    let mut heading = 0.0_f32;
    for tick in 0..args.ticks {
        heading += args.turn_rate * dt.as_secs_f32();
        let orientation = Quat::from_rotation_y(heading);
        let mut position = pose.position + orientation * Vec3::Z * args.speed * dt.as_secs_f32();
        position.y = controller.ground().height_at(position.x, position.z) + args.ride_height;
        pose = BodyPose::new(position, orientation);

        let events = controller.tick(pose, dt);
        summary.record(tick, events, args.verbose);
        summary.observe_concurrency(controller.gait_snapshot().moving_count);

        if args.reset_at == Some(tick) {
            let events = controller.reset();
            summary.record(tick, events, args.verbose);
        }
    }

    summary.print(&controller.foot_anchors(), controller.visual_body_anchor());
    info!(
        started = summary.started,
        completed = summary.completed,
        cancelled = summary.cancelled,
        rejected = summary.rejected,
        "walk finished"
    );
    Ok(())
}

#[derive(Debug, Default)]
struct Summary {
    started: u32,
    completed: u32,
    cancelled: u32,
    rejected: u32,
    peak_concurrency: u32,
}

impl Summary {
    fn record(&mut self, tick: u32, events: &[Event], verbose: bool) {
        for event in events {
            match event {
                Event::StepStarted { limb, from, to } => {
                    self.started += 1;
                    if verbose {
                        println!(
                            "[{tick:>5}] limb {} lifts  {} -> {}",
                            limb.get(),
                            format_point(*from),
                            format_point(*to)
                        );
                    }
                }
                Event::StepCompleted { limb, position } => {
                    self.completed += 1;
                    if verbose {
                        println!(
                            "[{tick:>5}] limb {} lands  {}",
                            limb.get(),
                            format_point(*position)
                        );
                    }
                }
                Event::StepCancelled { limb, position } => {
                    self.cancelled += 1;
                    if verbose {
                        println!(
                            "[{tick:>5}] limb {} grounded early at {}",
                            limb.get(),
                            format_point(*position)
                        );
                    }
                }
                Event::StepRejected { limb, reason } => {
                    self.rejected += 1;
                    if verbose {
                        println!("[{tick:>5}] limb {} step refused: {reason:?}", limb.get());
                    }
                }
                Event::GaitReset if verbose => println!("[{tick:>5}] gait reset"),
                _ => {}
            }
        }
    }

    fn observe_concurrency(&mut self, moving: u32) {
        self.peak_concurrency = self.peak_concurrency.max(moving);
    }

    fn print(&self, anchors: &[Vec3], body: Vec3) {
        println!("steps started:    {}", self.started);
        println!("steps completed:  {}", self.completed);
        println!("steps cancelled:  {}", self.cancelled);
        println!("steps refused:    {}", self.rejected);
        println!("peak concurrency: {}", self.peak_concurrency);
        println!("visual body:      {}", format_point(body));
        for (index, anchor) in anchors.iter().enumerate() {
            println!("foot {index:>2}:          {}", format_point(*anchor));
        }
    }
}

fn format_point(point: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", point.x, point.y, point.z)
}
