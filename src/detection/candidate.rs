// SPDX-License-Identifier: GPL-3.0-only

//! Obstacle candidates

use std::cell::OnceCell;

use nalgebra::Point3;

use super::grid::CellSample;
use crate::depth::DepthRange;
use crate::geometry::PoseProvider;

/// A grid sample inside the depth range, awaiting surface rejection
///
/// The world position is projected on first use only, so candidates that
/// lose the nearest-distance race never pay for the projection.
#[derive(Debug, Clone)]
pub struct Candidate {
    cell: usize,
    uv: [f32; 2],
    distance: f32,
    world: OnceCell<Point3<f32>>,
}

impl Candidate {
    /// Build a candidate; `None` unless `distance` lies strictly inside `range`
    pub fn new(cell: usize, uv: [f32; 2], distance: f32, range: &DepthRange) -> Option<Self> {
        range.contains(distance).then(|| Self {
            cell,
            uv,
            distance,
            world: OnceCell::new(),
        })
    }

    /// Candidate from a grid sample, dropping invalid cells
    pub fn from_sample(sample: &CellSample, range: &DepthRange) -> Option<Self> {
        sample
            .distance
            .and_then(|d| Self::new(sample.cell, sample.uv, d, range))
    }

    /// Grid cell the candidate came from
    pub fn cell(&self) -> usize {
        self.cell
    }

    /// Normalized viewport coordinate
    pub fn uv(&self) -> [f32; 2] {
        self.uv
    }

    /// Filtered distance along the viewing ray (meters)
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// World position `origin + direction * distance`, computed once
    pub fn world_position(&self, pose: &dyn PoseProvider) -> Point3<f32> {
        *self.world.get_or_init(|| {
            pose.viewport_to_world_ray(self.uv[0], self.uv[1])
                .point_at(self.distance)
        })
    }
}
