// SPDX-License-Identifier: GPL-3.0-only

//! Floor and ceiling rejection
//!
//! Two interchangeable strategies:
//! - **Geometric**: rays that point nearly straight down or up are assumed to
//!   hit the floor or ceiling. Needs nothing but the pose.
//! - **Plane bounded**: points just above a cached floor plane, within its
//!   extents, are floor. Ceilings are not covered.

use nalgebra::{Point3, Unit};
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::plane_cache::FloorPlane;
use crate::constants::surface::{DEFAULT_MIN_HEIGHT_ABOVE_FLOOR_M, DEFAULT_VERTICAL_IGNORE_DOT};
use crate::errors::ConfigError;
use crate::geometry::{PoseProvider, world_up};

/// Floor/ceiling rejection strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SurfaceStrategy {
    /// Reject when `|dot(ray, up)|` exceeds the threshold
    Geometric { vertical_ignore_dot: f32 },
    /// Reject points lower than `min_height_above_floor` over a cached floor
    PlaneBounded { min_height_above_floor: f32 },
}

impl Default for SurfaceStrategy {
    fn default() -> Self {
        Self::Geometric {
            vertical_ignore_dot: DEFAULT_VERTICAL_IGNORE_DOT,
        }
    }
}

impl SurfaceStrategy {
    /// Plane-bounded rejection with the default height margin
    pub fn plane_bounded() -> Self {
        Self::PlaneBounded {
            min_height_above_floor: DEFAULT_MIN_HEIGHT_ABOVE_FLOOR_M,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Geometric {
                vertical_ignore_dot,
            } => {
                if !(0.0..=1.0).contains(&vertical_ignore_dot) {
                    return Err(ConfigError::OutOfRange {
                        name: "vertical_ignore_dot",
                        value: vertical_ignore_dot as f64,
                        allowed: "[0, 1]",
                    });
                }
            }
            Self::PlaneBounded {
                min_height_above_floor,
            } => {
                if !min_height_above_floor.is_finite() || min_height_above_floor < 0.0 {
                    return Err(ConfigError::OutOfRange {
                        name: "min_height_above_floor",
                        value: min_height_above_floor as f64,
                        allowed: "[0, inf)",
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether the strategy reads the plane cache
    pub fn uses_planes(&self) -> bool {
        matches!(self, Self::PlaneBounded { .. })
    }
}

/// Read-only inputs of one filter pass
#[derive(Clone, Copy)]
pub struct SurfaceContext<'a> {
    pub pose: &'a dyn PoseProvider,
    pub planes: &'a [FloorPlane],
}

impl<'a> SurfaceContext<'a> {
    pub fn new(pose: &'a dyn PoseProvider, planes: &'a [FloorPlane]) -> Self {
        Self { pose, planes }
    }
}

/// Accepts or rejects candidates according to a [`SurfaceStrategy`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceFilter {
    strategy: SurfaceStrategy,
}

impl SurfaceFilter {
    pub fn new(strategy: SurfaceStrategy) -> Result<Self, ConfigError> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    pub fn strategy(&self) -> SurfaceStrategy {
        self.strategy
    }

    /// Whether `candidate` is a real obstacle rather than floor or ceiling
    pub fn accepts(&self, candidate: &Candidate, ctx: &SurfaceContext<'_>) -> bool {
        let world = candidate.world_position(ctx.pose);
        self.accepts_point(&world, ctx)
    }

    /// Same decision for an already projected world point
    pub fn accepts_point(&self, world: &Point3<f32>, ctx: &SurfaceContext<'_>) -> bool {
        match self.strategy {
            SurfaceStrategy::Geometric {
                vertical_ignore_dot,
            } => {
                let observer = ctx.pose.observer_position();
                match Unit::try_new(world - observer, f32::EPSILON) {
                    Some(direction) => {
                        direction.dot(&world_up().into_inner()).abs() <= vertical_ignore_dot
                    }
                    None => true,
                }
            }
            SurfaceStrategy::PlaneBounded {
                min_height_above_floor,
            } => !ctx.planes.iter().any(|plane| {
                // Height first; the rotated bounds check is the expensive part
                plane.height_above(world) < min_height_above_floor && plane.contains_xz(world)
            }),
        }
    }
}
