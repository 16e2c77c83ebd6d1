// SPDX-License-Identifier: GPL-3.0-only

//! World projection
//!
//! The pose/projection provider turns a normalized viewport coordinate into a
//! world-space ray. A sampled depth then places a point at
//! `origin + direction * depth`.
//!
//! World convention: +Y is up. Normalized viewport coordinates have `u`
//! growing to the right and `v` growing downward, matching buffer rows.

mod camera;

pub use camera::{CameraIntrinsics, PinholeCamera};

use nalgebra::{Point3, Unit, Vector3};
use serde::Serialize;

/// World-space up direction
pub fn world_up() -> Unit<Vector3<f32>> {
    Vector3::y_axis()
}

/// A world-space ray
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ray {
    /// Ray origin (usually the camera position)
    pub origin: Point3<f32>,
    /// Unit direction
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    /// Point `distance` meters along the ray
    pub fn point_at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction.into_inner() * distance
    }
}

/// Camera pose and projection, owned by the platform's tracking subsystem
pub trait PoseProvider {
    /// Ray through the normalized viewport point `(u, v)`
    fn viewport_to_world_ray(&self, u: f32, v: f32) -> Ray;

    /// Current observer (camera) position
    fn observer_position(&self) -> Point3<f32>;
}

impl<T: PoseProvider + ?Sized> PoseProvider for &T {
    fn viewport_to_world_ray(&self, u: f32, v: f32) -> Ray {
        (**self).viewport_to_world_ray(u, v)
    }

    fn observer_position(&self) -> Point3<f32> {
        (**self).observer_position()
    }
}
