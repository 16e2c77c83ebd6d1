// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// Millimeters per meter, for integer depth encodings
pub const MM_PER_METER: f32 = 1000.0;

/// Depth values the cue pipeline considers (meters)
pub mod depth {
    /// Closest distance treated as a real reading
    pub const DEFAULT_MIN_DEPTH_M: f32 = 0.3;
    /// Farthest distance treated as a real reading
    pub const DEFAULT_MAX_DEPTH_M: f32 = 8.0;
    /// Neighborhood radius (pixels) aggregated per grid cell
    pub const DEFAULT_SAMPLE_RADIUS: u32 = 2;
    /// Raw millimeter value meaning "no data"
    pub const DEPTH_INVALID_MM: u16 = 0;
}

/// Obstacle tracking defaults
pub mod tracking {
    /// Weight of the previous smoothed position in the exponential blend
    pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.8;
    /// Raw movement (meters) below which an update is ignored
    pub const DEFAULT_MIN_MOVEMENT_M: f32 = 0.05;
    /// Seconds without an accepted candidate before the estimate is dropped
    pub const DEFAULT_STALENESS_TIMEOUT_S: f64 = 1.5;
}

/// Floor and ceiling rejection defaults
pub mod surface {
    /// Cosine between ray and world up above which a ray counts as vertical
    pub const DEFAULT_VERTICAL_IGNORE_DOT: f32 = 0.75;
    /// Height (meters) above a cached floor plane still considered floor
    pub const DEFAULT_MIN_HEIGHT_ABOVE_FLOOR_M: f32 = 0.3;
    /// Cycles between plane cache refreshes
    pub const DEFAULT_PLANE_REFRESH_FRAMES: u32 = 30;
}

/// Audio cue defaults
pub mod cue {
    /// Beep interval (seconds) at or inside the minimum depth
    pub const DEFAULT_MIN_BEEP_INTERVAL_S: f64 = 0.1;
    /// Beep interval (seconds) at the maximum depth
    pub const DEFAULT_MAX_BEEP_INTERVAL_S: f64 = 1.0;
    /// Pitch multiplier for the nearest obstacle
    pub const DEFAULT_NEAR_PITCH: f32 = 2.0;
    /// Pitch multiplier for the farthest obstacle
    pub const DEFAULT_FAR_PITCH: f32 = 0.5;
}

/// Detector presets
///
/// Each preset bundles grid density, smoothing constants and the floor
/// rejection strategy that suit one kind of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorPreset {
    /// 3x3 grid with the geometric floor/ceiling heuristic (default)
    #[default]
    Sparse,
    /// 8x6 grid, lighter smoothing, faster reaction
    Dense,
    /// 5x5 grid restricted to the middle band, rejects cached floor planes
    FloorAware,
}

impl DetectorPreset {
    /// All preset variants for CLI iteration
    pub const ALL: [DetectorPreset; 3] = [
        DetectorPreset::Sparse,
        DetectorPreset::Dense,
        DetectorPreset::FloorAware,
    ];

    /// Display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            DetectorPreset::Sparse => "Sparse",
            DetectorPreset::Dense => "Dense",
            DetectorPreset::FloorAware => "Floor aware",
        }
    }

    /// Number of cells sampled per cycle
    pub fn cell_count(&self) -> usize {
        self.config().grid.cell_count()
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
