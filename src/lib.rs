// SPDX-License-Identifier: MPL-2.0

//! depthcue - Obstacle detection and audio cues from AR depth frames
//!
//! This library turns a noisy, low-resolution depth buffer into one stable
//! nearest-obstacle estimate and a spatial beacon whose pitch and cadence
//! communicate distance.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`depth`]: Depth frame views, the depth range and depth sources
//! - [`geometry`]: World rays and the pose/projection provider
//! - [`detection`]: Grid sampling, floor/ceiling rejection, plane cache and tracking
//! - [`audio`]: Distance to pitch/interval mapping and the audio renderer seam
//! - [`pipeline`]: The per-tick pipeline wiring everything together
//! - [`config`]: Pipeline configuration and presets
//! - [`sim`]: Synthetic scenes for simulation and tests
//!
//! # Example
//!
//! ```ignore
//! let config = PipelineConfig::default();
//! let mut pipeline = ObstaclePipeline::new(&config, source, camera, NoPlanes, Vec::new())?;
//! let outcome = pipeline.tick(now);
//! ```

pub mod audio;
pub mod config;
pub mod constants;
pub mod depth;
pub mod detection;
pub mod errors;
pub mod geometry;
pub mod pipeline;
pub mod sim;

// Re-export commonly used types
pub use audio::{AudioRenderer, CueTrigger};
pub use config::PipelineConfig;
pub use constants::DetectorPreset;
pub use detection::{ObstacleEstimate, SurfaceStrategy};
pub use errors::{AppError, AppResult, ConfigError, FrameError};
pub use pipeline::{CycleOutcome, ObstaclePipeline, PipelineStats};
