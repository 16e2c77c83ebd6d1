// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the obstacle cue pipeline
//!
//! This module provides command-line functionality for:
//! - Simulating a walk toward an obstacle in a synthetic scene
//! - Replaying a recorded depth image through the pipeline
//! - Printing and saving configurations

use depthcue::audio::{AudioRenderer, CueTrigger};
use depthcue::depth::ReplayDepthSource;
use depthcue::detection::NoPlanes;
use depthcue::geometry::{CameraIntrinsics, PinholeCamera};
use depthcue::sim::{SyntheticDepthSource, SyntheticScene};
use depthcue::{CycleOutcome, DetectorPreset, ObstaclePipeline, PipelineConfig, PipelineStats};
use nalgebra::Point3;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Synthetic depth resolution
const SIM_WIDTH: u32 = 64;
const SIM_HEIGHT: u32 = 48;
/// Eye height of the simulated walker (meters)
const SIM_EYE_HEIGHT: f32 = 1.4;
/// Downward tilt of the simulated camera (degrees)
const SIM_PITCH_DOWN: f32 = 10.0;
/// Walking speed (meters per second)
const SIM_WALK_SPEED: f32 = 0.8;
/// Distance of the box from the start position (meters)
const SIM_BOX_DISTANCE: f32 = 6.0;
/// The walker stops this far in front of the box (meters)
const SIM_STOP_GAP: f32 = 0.6;

/// Options of the `simulate` command
pub struct SimulateOptions {
    pub frames: u64,
    pub fps: u32,
    pub json: bool,
    pub realtime: bool,
}

/// Parse a preset name from the command line
pub fn parse_preset(name: &str) -> Result<DetectorPreset, String> {
    match name.to_lowercase().replace('_', "-").as_str() {
        "sparse" => Ok(DetectorPreset::Sparse),
        "dense" => Ok(DetectorPreset::Dense),
        "floor-aware" => Ok(DetectorPreset::FloorAware),
        other => Err(format!(
            "unknown preset '{}' (expected one of: sparse, dense, floor-aware)",
            other
        )),
    }
}

/// Pick the configuration: explicit file, then preset, then the user's saved one
pub fn resolve_config(
    preset: Option<DetectorPreset>,
    path: Option<&Path>,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(PipelineConfig::load(path)?);
    }
    Ok(match preset {
        Some(preset) => preset.config(),
        None => PipelineConfig::load_or_default(),
    })
}

/// Print the configuration as JSON, optionally saving it
pub fn print_config(
    config: &PipelineConfig,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Some(path) = output {
        config.save(path)?;
        eprintln!("Configuration saved: {}", path.display());
    }
    Ok(())
}

/// Renderer printing cues as they are emitted
struct ConsoleRenderer {
    enabled: bool,
}

impl AudioRenderer for ConsoleRenderer {
    fn play(&mut self, trigger: &CueTrigger) {
        if self.enabled {
            println!(
                "          BEEP pitch {:.2} at ({:.2}, {:.2}, {:.2}), next in {:.2}s",
                trigger.pitch,
                trigger.world_position.x,
                trigger.world_position.y,
                trigger.world_position.z,
                trigger.interval
            );
        }
    }
}

/// Walk a synthetic camera toward a box and print each cycle
pub fn simulate(
    options: SimulateOptions,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.fps == 0 {
        return Err("fps must be at least 1".into());
    }

    let scene = SyntheticScene::corridor(SIM_BOX_DISTANCE);
    let camera = walker_camera(0.0);
    let source = SyntheticDepthSource::new(scene.clone(), camera, SIM_WIDTH, SIM_HEIGHT)?;
    let renderer = ConsoleRenderer {
        enabled: !options.json,
    };
    let mut pipeline = ObstaclePipeline::new(config, source, camera, scene, renderer)?;

    if !options.json {
        println!("Simulating {} ticks at {} fps", options.frames, options.fps);
        println!(
            "Box {:.1} m ahead, walking at {:.1} m/s",
            SIM_BOX_DISTANCE, SIM_WALK_SPEED
        );
        println!();
    }

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    if options.realtime {
        let stop_flag_clone = stop_flag.clone();
        ctrlc::set_handler(move || {
            stop_flag_clone.store(true, Ordering::SeqCst);
        })?;
    }

    let tick = 1.0 / options.fps as f64;
    for frame in 0..options.frames {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let now = frame as f64 * tick;
        let camera = walker_camera(now as f32);
        pipeline.source_mut().set_camera(camera);
        pipeline
            .pose_mut()
            .set_pose(camera.position(), camera.orientation());

        let outcome = pipeline.tick(now);
        if options.json {
            println!("{}", serde_json::to_string(&outcome)?);
        } else {
            print_outcome(now, &outcome);
        }

        if options.realtime {
            std::thread::sleep(Duration::from_secs_f64(tick));
        }
    }

    if !options.json {
        print_stats(pipeline.stats());
    }
    Ok(())
}

/// Run the pipeline over a recorded depth image
pub fn replay(
    input: &Path,
    frames: u64,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ReplayDepthSource::open(input)?.with_frame_limit(frames);
    let camera = PinholeCamera::new(CameraIntrinsics::default());
    let mut cues: Vec<CueTrigger> = Vec::new();
    let mut pipeline = ObstaclePipeline::new(config, source, camera, NoPlanes, &mut cues)?;

    println!("Replaying: {}", input.display());
    println!();

    let tick = 1.0 / 30.0;
    let mut last = CycleOutcome::NoFrame;
    for frame in 0..frames {
        let outcome = pipeline.tick(frame as f64 * tick);
        if outcome != CycleOutcome::NoFrame {
            last = outcome;
        }
    }
    let stats = *pipeline.stats();
    drop(pipeline);

    match last.estimate() {
        Some(estimate) => {
            println!(
                "Nearest obstacle: {:.2} m (cell {}) at ({:.2}, {:.2}, {:.2})",
                estimate.distance,
                estimate.cell,
                estimate.position.x,
                estimate.position.y,
                estimate.position.z
            );
        }
        None => println!("No obstacle in range"),
    }
    if let Some(first) = cues.first() {
        println!(
            "Cues: {} (pitch {:.2}, interval {:.2}s)",
            cues.len(),
            first.pitch,
            first.interval
        );
    }
    print_stats(&stats);
    Ok(())
}

/// Camera of the simulated walker at time `t`
fn walker_camera(t: f32) -> PinholeCamera {
    let stop = SIM_BOX_DISTANCE - SIM_STOP_GAP - 0.3;
    let z = (t * SIM_WALK_SPEED).min(stop);
    PinholeCamera::new(CameraIntrinsics::default())
        .with_position(Point3::new(0.0, SIM_EYE_HEIGHT, z))
        .with_pitch_down(SIM_PITCH_DOWN)
}

fn print_outcome(now: f64, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::NoFrame => println!("t={:6.2}s  no frame", now),
        CycleOutcome::NoObstacle => println!("t={:6.2}s  clear", now),
        CycleOutcome::Obstacle { estimate, held, .. } => println!(
            "t={:6.2}s  obstacle {:5.2} m  cell {:2}{}",
            now,
            estimate.distance,
            estimate.cell,
            if *held { "  (held)" } else { "" }
        ),
    }
}

fn print_stats(stats: &PipelineStats) {
    println!();
    println!(
        "Cycles: {}  frames: {}  skipped: {}  cues: {}",
        stats.cycles, stats.frames, stats.skipped, stats.cues
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preset() {
        assert_eq!(parse_preset("Sparse"), Ok(DetectorPreset::Sparse));
        assert_eq!(parse_preset("floor_aware"), Ok(DetectorPreset::FloorAware));
        assert_eq!(parse_preset("floor-aware"), Ok(DetectorPreset::FloorAware));
        assert!(parse_preset("lidar").is_err());
    }

    #[test]
    fn test_walker_stops_before_the_box() {
        let far = walker_camera(1000.0);
        assert!(far.position().z < SIM_BOX_DISTANCE - 0.3);
        assert_eq!(walker_camera(0.0).position().z, 0.0);
    }
}
