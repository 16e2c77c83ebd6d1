// SPDX-License-Identifier: GPL-3.0-only

//! Obstacle detection
//!
//! Per cycle: grid sampling, candidate construction, floor/ceiling rejection
//! and nearest-obstacle tracking. The plane cache and its cadence controller
//! feed the plane-bounded rejection strategy between cycles.

mod cadence;
mod candidate;
mod grid;
mod plane_cache;
mod surface;
mod tracker;

pub use cadence::{Cadence, CadenceController};
pub use candidate::Candidate;
pub use grid::{CellSample, GridLayout, GridSampler, GridSpec, median};
pub use plane_cache::{
    FloorPlane, NoPlanes, PlaneAlignment, PlaneCache, PlaneProvider, TrackedPlane,
};
pub use surface::{SurfaceContext, SurfaceFilter, SurfaceStrategy};
pub use tracker::{
    ObstacleEstimate, ObstacleTracker, SmoothingState, TrackerConfig, TrackerUpdate,
    select_nearest,
};
