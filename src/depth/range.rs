// SPDX-License-Identifier: GPL-3.0-only

//! Usable depth interval and the interpolation helpers built on it

use serde::Serialize;

use crate::errors::ConfigError;

/// Linear interpolation from `a` (t = 0) to `b` (t = 1)
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Position of `value` between `a` (0) and `b` (1), unclamped
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b { 0.0 } else { (value - a) / (b - a) }
}

/// Open interval of distances (meters) treated as real readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthRange {
    min: f32,
    max: f32,
}

impl DepthRange {
    /// Create a range; `min` must be non-negative and strictly below `max`
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min >= max {
            return Err(ConfigError::InvalidDepthRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound (exclusive)
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound (exclusive)
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Whether `distance` lies strictly inside the range (NaN never does)
    #[inline]
    pub fn contains(&self, distance: f32) -> bool {
        distance > self.min && distance < self.max
    }

    /// Clamp `distance` into `[min, max]`
    pub fn clamp(&self, distance: f32) -> f32 {
        distance.clamp(self.min, self.max)
    }

    /// 0 at `max`, 1 at `min`, clamped outside
    pub fn proximity(&self, distance: f32) -> f32 {
        inverse_lerp(self.max, self.min, distance).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_inverted_or_empty_range() {
        assert!(DepthRange::new(2.0, 1.0).is_err());
        assert!(DepthRange::new(1.0, 1.0).is_err());
        assert!(DepthRange::new(-0.1, 1.0).is_err());
        assert!(DepthRange::new(0.0, f32::INFINITY).is_err());
        assert!(DepthRange::new(0.3, 8.0).is_ok());
    }

    #[test]
    fn test_contains_is_open() {
        let range = DepthRange::new(0.3, 8.0).unwrap();
        assert!(!range.contains(0.3));
        assert!(!range.contains(8.0));
        assert!(!range.contains(f32::NAN));
        assert!(range.contains(0.31));
        assert!(range.contains(7.99));
    }

    #[test]
    fn test_proximity() {
        let range = DepthRange::new(0.0, 10.0).unwrap();
        assert_relative_eq!(range.proximity(10.0), 0.0);
        assert_relative_eq!(range.proximity(0.0), 1.0);
        assert_relative_eq!(range.proximity(2.5), 0.75);
        assert_relative_eq!(range.proximity(20.0), 0.0);
        assert_relative_eq!(range.proximity(-3.0), 1.0);
    }

    #[test]
    fn test_lerp_helpers() {
        assert_relative_eq!(lerp(1.0, 0.1, 0.5), 0.55);
        assert_relative_eq!(inverse_lerp(8.0, 0.3, 8.0), 0.0);
        assert_relative_eq!(inverse_lerp(8.0, 0.3, 0.3), 1.0);
        assert_eq!(inverse_lerp(1.0, 1.0, 5.0), 0.0);
    }
}
