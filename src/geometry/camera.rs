// SPDX-License-Identifier: GPL-3.0-only

//! Pinhole camera pose provider
//!
//! Reference implementation of [`PoseProvider`] for synthetic scenes, replay
//! and tests. Camera space is +X right, +Y up, +Z forward; the orientation
//! rotates camera space into world space.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::{PoseProvider, Ray};

/// Pinhole intrinsics at a reference resolution
///
/// Values are in pixels of the reference resolution; viewport coordinates are
/// scaled by `width`/`height`, so the intrinsics apply to any buffer size
/// with the same aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length X (pixels)
    pub fx: f32,
    /// Focal length Y (pixels)
    pub fy: f32,
    /// Principal point X (pixels)
    pub cx: f32,
    /// Principal point Y (pixels)
    pub cy: f32,
    /// Reference width (pixels)
    pub width: f32,
    /// Reference height (pixels)
    pub height: f32,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        // Kinect v1 depth camera at 640x480
        Self {
            fx: 594.21,
            fy: 591.04,
            cx: 339.5,
            cy: 242.7,
            width: 640.0,
            height: 480.0,
        }
    }
}

impl CameraIntrinsics {
    /// Ideal pinhole with square pixels and a centered principal point
    pub fn from_horizontal_fov(fov_deg: f32, width: f32, height: f32) -> Self {
        let fx = (width / 2.0) / (fov_deg.to_radians() / 2.0).tan();
        Self {
            fx,
            fy: fx,
            cx: width / 2.0,
            cy: height / 2.0,
            width,
            height,
        }
    }

    /// Camera-space direction (not normalized) through viewport `(u, v)`
    fn camera_direction(&self, u: f32, v: f32) -> Vector3<f32> {
        let x = u * self.width;
        let y = v * self.height;
        Vector3::new((x - self.cx) / self.fx, -(y - self.cy) / self.fy, 1.0)
    }
}

/// Posed pinhole camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    intrinsics: CameraIntrinsics,
    position: Point3<f32>,
    orientation: UnitQuaternion<f32>,
}

impl PinholeCamera {
    /// Camera at the origin looking along +Z
    pub fn new(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }

    /// Move the camera
    pub fn with_position(mut self, position: Point3<f32>) -> Self {
        self.position = position;
        self
    }

    /// Rotate the camera
    pub fn with_orientation(mut self, orientation: UnitQuaternion<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Tilt the camera down by `degrees` (negative tilts up), keeping yaw
    pub fn with_pitch_down(self, degrees: f32) -> Self {
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), degrees.to_radians());
        self.with_orientation(pitch)
    }

    /// Update the tracked pose
    pub fn set_pose(&mut self, position: Point3<f32>, orientation: UnitQuaternion<f32>) {
        self.position = position;
        self.orientation = orientation;
    }

    /// Current position
    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Current orientation
    pub fn orientation(&self) -> UnitQuaternion<f32> {
        self.orientation
    }

    /// Intrinsics
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }
}

impl PoseProvider for PinholeCamera {
    fn viewport_to_world_ray(&self, u: f32, v: f32) -> Ray {
        let local = self.intrinsics.camera_direction(u, v);
        Ray {
            origin: self.position,
            direction: Unit::new_normalize(self.orientation * local),
        }
    }

    fn observer_position(&self) -> Point3<f32> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn centered() -> CameraIntrinsics {
        CameraIntrinsics::from_horizontal_fov(90.0, 100.0, 100.0)
    }

    #[test]
    fn test_center_ray_points_forward() {
        let camera = PinholeCamera::new(centered());
        let ray = camera.viewport_to_world_ray(0.5, 0.5);
        assert_relative_eq!(ray.direction.into_inner(), Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_viewport_edges() {
        let camera = PinholeCamera::new(centered());

        // 90 degree FOV: the right edge is 45 degrees off axis
        let right = camera.viewport_to_world_ray(1.0, 0.5).direction;
        assert_relative_eq!(right.x, right.z, epsilon = 1e-6);
        assert!(right.x > 0.0);

        // Bottom of the image looks down
        let bottom = camera.viewport_to_world_ray(0.5, 1.0).direction;
        assert!(bottom.y < 0.0);
    }

    #[test]
    fn test_pitch_down_tilts_center_ray() {
        let camera = PinholeCamera::new(centered()).with_pitch_down(30.0);
        let ray = camera.viewport_to_world_ray(0.5, 0.5);
        assert_relative_eq!(ray.direction.y, -0.5, epsilon = 1e-5);
        assert!(ray.direction.z > 0.0);
    }

    #[test]
    fn test_ray_starts_at_observer() {
        let camera =
            PinholeCamera::new(CameraIntrinsics::default()).with_position(Point3::new(0.0, 1.5, 0.0));
        let ray = camera.viewport_to_world_ray(0.2, 0.7);
        assert_eq!(ray.origin, camera.observer_position());
    }
}
