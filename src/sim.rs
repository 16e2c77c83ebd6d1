// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic depth scenes
//!
//! A tiny ray caster standing in for the platform's depth and plane
//! subsystems:
//! - [`SyntheticScene`]: a bounded floor, an optional ceiling and boxes
//! - [`SyntheticDepthSource`]: renders the scene through a [`PinholeCamera`]
//!   on every acquisition and counts releases of its frame guards
//!
//! The scene also reports its floor and ceiling as tracked planes.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::constants::MM_PER_METER;
use crate::depth::{AcquiredDepth, DepthFrameView, DepthSource, OwnedDepthFrame, SampleUnit};
use crate::detection::{PlaneAlignment, PlaneProvider, TrackedPlane};
use crate::errors::FrameError;
use crate::geometry::{PinholeCamera, PoseProvider, Ray};

/// Plane id reported for the floor
pub const FLOOR_PLANE_ID: u64 = 1;
/// Plane id reported for the ceiling
pub const CEILING_PLANE_ID: u64 = 2;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxObstacle {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoxObstacle {
    /// Box centred on `center` with the given half extents
    pub fn new(center: Point3<f32>, half_extents: Vector3<f32>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Entry distance of `ray`, if it hits the box in front of the origin
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            if dir.abs() < f32::EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - origin) / dir;
            let t2 = (self.max[axis] - origin) / dir;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            None
        } else if t_near > 0.0 {
            Some(t_near)
        } else {
            // Origin inside the box
            Some(t_far)
        }
    }
}

/// Simple indoor scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticScene {
    /// Height of the floor surface
    pub floor_height: f32,
    /// Floor center (only X and Z are used)
    pub floor_center: Point3<f32>,
    /// Floor half extents along X and Z
    pub floor_half_extents: [f32; 2],
    /// Height of an unbounded ceiling, if any
    pub ceiling_height: Option<f32>,
    pub boxes: Vec<BoxObstacle>,
    /// Readings beyond this distance come back invalid (meters)
    pub sensor_max: f32,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self {
            floor_height: 0.0,
            floor_center: Point3::origin(),
            floor_half_extents: [10.0, 10.0],
            ceiling_height: None,
            boxes: Vec::new(),
            sensor_max: 10.0,
        }
    }
}

impl SyntheticScene {
    /// Corridor-like scene with one box straight ahead on the floor
    pub fn corridor(box_distance: f32) -> Self {
        Self {
            ceiling_height: Some(2.6),
            boxes: vec![BoxObstacle::new(
                Point3::new(0.0, 0.6, box_distance),
                Vector3::new(0.4, 0.6, 0.3),
            )],
            ..Self::default()
        }
    }

    /// Add a box
    pub fn with_box(mut self, obstacle: BoxObstacle) -> Self {
        self.boxes.push(obstacle);
        self
    }

    /// Distance along `ray` to the nearest surface within sensor reach
    pub fn cast(&self, ray: &Ray) -> Option<f32> {
        let dir_y = ray.direction.y;
        let mut nearest: Option<f32> = None;
        let mut consider = |t: f32| {
            if t > 0.0 && nearest.is_none_or(|n| t < n) {
                nearest = Some(t);
            }
        };

        if dir_y < -f32::EPSILON {
            let t = (self.floor_height - ray.origin.y) / dir_y;
            let hit = ray.point_at(t);
            if (hit.x - self.floor_center.x).abs() <= self.floor_half_extents[0]
                && (hit.z - self.floor_center.z).abs() <= self.floor_half_extents[1]
            {
                consider(t);
            }
        }
        if let Some(ceiling) = self.ceiling_height
            && dir_y > f32::EPSILON
        {
            consider((ceiling - ray.origin.y) / dir_y);
        }
        for obstacle in &self.boxes {
            if let Some(t) = obstacle.intersect(ray) {
                consider(t);
            }
        }

        nearest.filter(|&t| t <= self.sensor_max)
    }

    /// Render the scene as seen by `camera`
    pub fn render(
        &self,
        camera: &PinholeCamera,
        width: u32,
        height: u32,
        unit: SampleUnit,
    ) -> Result<OwnedDepthFrame, FrameError> {
        let normalized = |i: u32, n: u32| {
            if n > 1 {
                i as f32 / (n - 1) as f32
            } else {
                0.5
            }
        };
        let distances = (0..height).flat_map(|y| {
            (0..width).map(move |x| {
                let ray = camera.viewport_to_world_ray(normalized(x, width), normalized(y, height));
                self.cast(&ray)
            })
        });

        match unit {
            SampleUnit::MillimetersU16 => {
                let samples: Vec<u16> = distances
                    .map(|d| {
                        d.map_or(0, |d| (d * MM_PER_METER).round().min(u16::MAX as f32) as u16)
                    })
                    .collect();
                OwnedDepthFrame::from_millimeters(width, height, &samples)
            }
            SampleUnit::MetersF32 => {
                let samples: Vec<f32> = distances.map(|d| d.unwrap_or(f32::NAN)).collect();
                OwnedDepthFrame::from_meters(width, height, &samples)
            }
        }
    }
}

impl PlaneProvider for SyntheticScene {
    fn planes(&self) -> Vec<TrackedPlane> {
        let mut planes = vec![TrackedPlane {
            id: FLOOR_PLANE_ID,
            alignment: PlaneAlignment::HorizontalUp,
            center: Point3::new(self.floor_center.x, self.floor_height, self.floor_center.z),
            extents: self.floor_half_extents,
            rotation: UnitQuaternion::identity(),
        }];
        if let Some(ceiling) = self.ceiling_height {
            planes.push(TrackedPlane {
                id: CEILING_PLANE_ID,
                alignment: PlaneAlignment::HorizontalDown,
                center: Point3::new(self.floor_center.x, ceiling, self.floor_center.z),
                extents: self.floor_half_extents,
                rotation: UnitQuaternion::identity(),
            });
        }
        planes
    }
}

/// Depth source rendering a [`SyntheticScene`] on demand
#[derive(Debug)]
pub struct SyntheticDepthSource {
    scene: SyntheticScene,
    camera: PinholeCamera,
    width: u32,
    height: u32,
    unit: SampleUnit,
    dropout_every: Option<u64>,
    attempts: u64,
    acquired: u64,
    released: u64,
    current: Option<OwnedDepthFrame>,
}

impl SyntheticDepthSource {
    pub fn new(
        scene: SyntheticScene,
        camera: PinholeCamera,
        width: u32,
        height: u32,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        Ok(Self {
            scene,
            camera,
            width,
            height,
            unit: SampleUnit::default(),
            dropout_every: None,
            attempts: 0,
            acquired: 0,
            released: 0,
            current: None,
        })
    }

    /// Encoding of rendered frames
    pub fn with_unit(mut self, unit: SampleUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Report "no frame" on every `n`-th acquisition attempt
    pub fn with_dropout_every(mut self, n: u64) -> Self {
        self.dropout_every = (n > 0).then_some(n);
        self
    }

    pub fn scene(&self) -> &SyntheticScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SyntheticScene {
        &mut self.scene
    }

    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    /// Move the sensor; takes effect on the next acquisition
    pub fn set_camera(&mut self, camera: PinholeCamera) {
        self.camera = camera;
    }

    /// Frames handed out so far
    pub fn acquired(&self) -> u64 {
        self.acquired
    }

    /// Frame guards dropped so far
    pub fn released(&self) -> u64 {
        self.released
    }
}

/// Frame guard of [`SyntheticDepthSource`]; counts its own release
pub struct SyntheticFrame<'a> {
    frame: &'a OwnedDepthFrame,
    released: &'a mut u64,
}

impl AcquiredDepth for SyntheticFrame<'_> {
    fn frame(&self) -> DepthFrameView<'_> {
        self.frame.view()
    }
}

impl Drop for SyntheticFrame<'_> {
    fn drop(&mut self) {
        *self.released += 1;
    }
}

impl DepthSource for SyntheticDepthSource {
    type Acquired<'a> = SyntheticFrame<'a>;

    fn try_acquire(&mut self) -> Option<SyntheticFrame<'_>> {
        self.attempts += 1;
        if self
            .dropout_every
            .is_some_and(|n| self.attempts % n == 0)
        {
            trace!(attempt = self.attempts, "Synthetic frame dropped");
            return None;
        }

        let rendered = match self
            .scene
            .render(&self.camera, self.width, self.height, self.unit)
        {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to render synthetic depth frame");
                return None;
            }
        };

        self.acquired += 1;
        let frame = self.current.insert(rendered);
        Some(SyntheticFrame {
            frame,
            released: &mut self.released,
        })
    }
}
