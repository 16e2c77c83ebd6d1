// SPDX-License-Identifier: GPL-3.0-only

use crate::audio::{CueConfig, PitchCurve};
use crate::constants::{DetectorPreset, cue, depth, surface, tracking};
use crate::depth::DepthRange;
use crate::detection::{Cadence, GridSpec, SurfaceStrategy, TrackerConfig};
use crate::errors::{AppResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pipeline parameters, supplied once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where the depth frame is probed
    pub grid: GridSpec,
    /// Neighborhood radius around each probe (pixels)
    pub sample_radius: u32,
    /// Nearest usable distance (meters, exclusive)
    pub min_depth: f32,
    /// Farthest usable distance (meters, exclusive)
    pub max_depth: f32,
    /// Minimum per-pixel confidence, 0 accepts everything
    pub min_confidence: u8,
    /// Weight of the previous position when smoothing, in [0, 1)
    pub smoothing_factor: f32,
    /// Deadband radius (meters)
    pub min_movement_threshold: f32,
    /// Seconds without an obstacle before the tracked position is dropped
    pub staleness_timeout: Option<f64>,
    /// Floor/ceiling rejection strategy
    pub surface: SurfaceStrategy,
    /// How often the plane cache re-reads the plane provider
    pub plane_refresh: Cadence,
    /// Beep interval at min depth (seconds)
    pub min_beep_interval: f64,
    /// Beep interval at max depth (seconds)
    pub max_beep_interval: f64,
    /// Pitch response to distance
    pub pitch_curve: PitchCurve,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            sample_radius: depth::DEFAULT_SAMPLE_RADIUS,
            min_depth: depth::DEFAULT_MIN_DEPTH_M,
            max_depth: depth::DEFAULT_MAX_DEPTH_M,
            min_confidence: 0,
            smoothing_factor: tracking::DEFAULT_SMOOTHING_FACTOR,
            min_movement_threshold: tracking::DEFAULT_MIN_MOVEMENT_M,
            staleness_timeout: Some(tracking::DEFAULT_STALENESS_TIMEOUT_S),
            surface: SurfaceStrategy::default(),
            plane_refresh: Cadence::EveryFrames(surface::DEFAULT_PLANE_REFRESH_FRAMES),
            min_beep_interval: cue::DEFAULT_MIN_BEEP_INTERVAL_S,
            max_beep_interval: cue::DEFAULT_MAX_BEEP_INTERVAL_S,
            pitch_curve: PitchCurve::default(),
        }
    }
}

impl PipelineConfig {
    /// Parameters of a named detector variant
    pub fn from_preset(preset: DetectorPreset) -> Self {
        let base = Self::default();
        match preset {
            DetectorPreset::Sparse => base,
            DetectorPreset::Dense => Self {
                grid: GridSpec::regular(8, 6),
                sample_radius: 1,
                smoothing_factor: 0.6,
                min_movement_threshold: 0.03,
                ..base
            },
            DetectorPreset::FloorAware => Self {
                grid: GridSpec::regular(5, 5).with_band(0.1, 0.2),
                surface: SurfaceStrategy::plane_bounded(),
                ..base
            },
        }
    }

    /// Check every parameter, reporting the first inconsistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.depth_range()?;
        self.tracker_config().validate()?;
        self.surface.validate()?;
        self.plane_refresh.validate()?;
        self.cue_config().validate()
    }

    /// Usable depth interval
    pub fn depth_range(&self) -> Result<DepthRange, ConfigError> {
        DepthRange::new(self.min_depth, self.max_depth)
    }

    /// Tracker parameters
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            smoothing_factor: self.smoothing_factor,
            min_movement_threshold: self.min_movement_threshold,
            staleness_timeout: self.staleness_timeout,
        }
    }

    /// Cue mapper parameters
    pub fn cue_config(&self) -> CueConfig {
        CueConfig {
            pitch_curve: self.pitch_curve.clone(),
            min_beep_interval: self.min_beep_interval,
            max_beep_interval: self.max_beep_interval,
        }
    }

    /// Default location: `<config dir>/depthcue/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("depthcue").join("config.json"))
    }

    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved pipeline configuration");
        Ok(())
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid configuration");
                Self::default()
            }
        }
    }
}

impl DetectorPreset {
    /// Pipeline parameters for this preset
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::from_preset(*self)
    }
}
