// SPDX-License-Identifier: GPL-3.0-only

//! Cached floor planes
//!
//! Plane geometry changes slowly compared to the detection rate, so the
//! tracked planes are only copied in on the configured cadence. Each refresh
//! swaps in a fresh immutable snapshot; readers holding the previous one keep
//! a consistent view.

use std::sync::Arc;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cadence::{Cadence, CadenceController};

/// Orientation class reported by the plane tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneAlignment {
    /// Floors, tables
    HorizontalUp,
    /// Ceilings
    HorizontalDown,
    /// Walls
    Vertical,
    Other,
}

/// A plane as reported by the platform's plane tracker
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPlane {
    /// Tracker-assigned identifier
    pub id: u64,
    pub alignment: PlaneAlignment,
    /// World-space center
    pub center: Point3<f32>,
    /// Half extents along the plane's local X and Z axes (meters)
    pub extents: [f32; 2],
    /// Rotation from plane-local to world space
    pub rotation: UnitQuaternion<f32>,
}

/// Provider of the currently tracked planes
pub trait PlaneProvider {
    /// Every plane the tracker currently knows about
    fn planes(&self) -> Vec<TrackedPlane>;
}

impl<T: PlaneProvider + ?Sized> PlaneProvider for &T {
    fn planes(&self) -> Vec<TrackedPlane> {
        (**self).planes()
    }
}

/// Provider for platforms without plane tracking
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlanes;

impl PlaneProvider for NoPlanes {
    fn planes(&self) -> Vec<TrackedPlane> {
        Vec::new()
    }
}

/// Upward-facing plane used for floor rejection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorPlane {
    pub center: Point3<f32>,
    /// Height of the plane surface
    pub y_position: f32,
    /// Half extents along the local X and Z axes (meters)
    pub extents_xz: [f32; 2],
    /// Rotation from plane-local to world space
    pub rotation: UnitQuaternion<f32>,
}

impl FloorPlane {
    /// Floor plane for a tracked plane, if it faces upward
    pub fn from_tracked(plane: &TrackedPlane) -> Option<Self> {
        (plane.alignment == PlaneAlignment::HorizontalUp).then(|| Self {
            center: plane.center,
            y_position: plane.center.y,
            extents_xz: plane.extents,
            rotation: plane.rotation,
        })
    }

    /// Signed height of `point` above the plane surface
    #[inline]
    pub fn height_above(&self, point: &Point3<f32>) -> f32 {
        point.y - self.y_position
    }

    /// Whether the horizontal projection of `point` lies within the extents
    pub fn contains_xz(&self, point: &Point3<f32>) -> bool {
        let offset = Vector3::new(point.x - self.center.x, 0.0, point.z - self.center.z);
        let local = self.rotation.inverse_transform_vector(&offset);
        local.x.abs() <= self.extents_xz[0] && local.z.abs() <= self.extents_xz[1]
    }
}

/// Rate-limited snapshot of the floor planes
#[derive(Debug, Clone)]
pub struct PlaneCache {
    planes: Arc<[FloorPlane]>,
    cadence: CadenceController,
    refreshes: u64,
}

impl PlaneCache {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            planes: Arc::from(Vec::<FloorPlane>::new()),
            cadence: CadenceController::new(cadence),
            refreshes: 0,
        }
    }

    /// Poll the cadence and, when due, replace the cached set
    ///
    /// Safe to call every cycle. Returns whether a refresh happened.
    pub fn refresh(&mut self, now: f64, provider: &dyn PlaneProvider) -> bool {
        if !self.cadence.poll(now) {
            return false;
        }
        let floors: Vec<FloorPlane> = provider
            .planes()
            .iter()
            .filter_map(FloorPlane::from_tracked)
            .collect();
        self.replace(floors);
        true
    }

    /// Replace the cached set wholesale
    pub fn replace(&mut self, floors: Vec<FloorPlane>) {
        self.refreshes += 1;
        debug!(
            planes = floors.len(),
            refreshes = self.refreshes,
            "Plane cache refreshed"
        );
        self.planes = Arc::from(floors);
    }

    /// Current snapshot
    pub fn planes(&self) -> &[FloorPlane] {
        &self.planes
    }

    /// Shared handle on the current snapshot
    pub fn snapshot(&self) -> Arc<[FloorPlane]> {
        Arc::clone(&self.planes)
    }

    /// Number of refreshes applied so far
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }
}
