// SPDX-License-Identifier: GPL-3.0-only

//! Nearest-obstacle tracking
//!
//! Reduces one cycle's candidates to a single estimate and keeps it stable
//! over time:
//! - **Selection**: nearest accepted candidate, first in scan order on ties
//! - **Deadband**: raw positions closer than `min_movement_threshold` to the
//!   smoothed position leave the estimate untouched
//! - **Smoothing**: exponential blend biased toward the previous position
//! - **Staleness**: a position not refreshed for `staleness_timeout` seconds
//!   is forgotten; shorter dropouts keep it

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::candidate::Candidate;
use super::surface::{SurfaceContext, SurfaceFilter};
use crate::constants::tracking::{
    DEFAULT_MIN_MOVEMENT_M, DEFAULT_SMOOTHING_FACTOR, DEFAULT_STALENESS_TIMEOUT_S,
};
use crate::errors::ConfigError;

/// Smoothing and hysteresis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Weight of the previous position in `[0, 1)`
    pub smoothing_factor: f32,
    /// Deadband radius (meters)
    pub min_movement_threshold: f32,
    /// Seconds without an accepted candidate before the position is dropped
    pub staleness_timeout: Option<f64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            min_movement_threshold: DEFAULT_MIN_MOVEMENT_M,
            staleness_timeout: Some(DEFAULT_STALENESS_TIMEOUT_S),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.smoothing_factor) {
            return Err(ConfigError::OutOfRange {
                name: "smoothing_factor",
                value: self.smoothing_factor as f64,
                allowed: "[0, 1)",
            });
        }
        if !self.min_movement_threshold.is_finite() || self.min_movement_threshold < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "min_movement_threshold",
                value: self.min_movement_threshold as f64,
                allowed: "[0, inf)",
            });
        }
        if let Some(timeout) = self.staleness_timeout
            && !(timeout > 0.0)
        {
            return Err(ConfigError::OutOfRange {
                name: "staleness_timeout",
                value: timeout,
                allowed: "(0, inf]",
            });
        }
        Ok(())
    }
}

/// Current obstacle estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObstacleEstimate {
    /// Smoothed world position
    pub position: Point3<f32>,
    /// Unsmoothed position of the selected candidate
    pub raw_position: Point3<f32>,
    /// Distance from the observer to `position` (meters)
    pub distance: f32,
    /// Grid cell of the selected candidate
    pub cell: usize,
    /// Incremented on every position change
    pub sequence: u64,
    /// Clock value of the last position change
    pub timestamp: f64,
}

/// Result of one tracker update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerUpdate {
    /// The smoothed position moved
    Updated(ObstacleEstimate),
    /// Movement stayed inside the deadband; position unchanged
    Held(ObstacleEstimate),
    /// No candidate survived filtering
    NoObstacle,
}

impl TrackerUpdate {
    pub fn estimate(&self) -> Option<&ObstacleEstimate> {
        match self {
            Self::Updated(estimate) | Self::Held(estimate) => Some(estimate),
            Self::NoObstacle => None,
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self, Self::Held(_))
    }
}

/// State carried between cycles
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothingState {
    /// Smoothed position, present once a candidate was accepted
    pub smoothed: Option<Point3<f32>>,
    /// Clock value of the last accepted candidate
    pub last_accepted_at: Option<f64>,
}

/// Picks and smooths the nearest obstacle across cycles
#[derive(Debug, Clone)]
pub struct ObstacleTracker {
    config: TrackerConfig,
    state: SmoothingState,
    current: Option<ObstacleEstimate>,
    sequence: u64,
}

impl ObstacleTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SmoothingState::default(),
            current: None,
            sequence: 0,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Last published estimate
    pub fn current(&self) -> Option<&ObstacleEstimate> {
        self.current.as_ref()
    }

    pub fn state(&self) -> &SmoothingState {
        &self.state
    }

    /// Forget the tracked position; sequence numbers keep increasing
    pub fn reset(&mut self) {
        self.state = SmoothingState::default();
        self.current = None;
    }

    /// Process one cycle's candidates
    pub fn update(
        &mut self,
        now: f64,
        candidates: &[Candidate],
        filter: &SurfaceFilter,
        ctx: &SurfaceContext<'_>,
    ) -> TrackerUpdate {
        self.expire_stale(now);

        let Some(nearest) = select_nearest(candidates, filter, ctx) else {
            trace!(candidates = candidates.len(), "No obstacle accepted");
            return TrackerUpdate::NoObstacle;
        };

        let raw = nearest.world_position(ctx.pose);
        let observer = ctx.pose.observer_position();
        self.state.last_accepted_at = Some(now);

        if let (Some(previous), Some(current)) = (self.state.smoothed, self.current.as_mut())
            && (raw - previous).norm() < self.config.min_movement_threshold
        {
            // Position stays put; only the observer may have moved
            current.distance = (previous - observer).norm();
            return TrackerUpdate::Held(*current);
        }

        let smoothed = match self.state.smoothed {
            Some(previous) => Point3::from(
                raw.coords
                    .lerp(&previous.coords, self.config.smoothing_factor),
            ),
            None => raw,
        };
        self.state.smoothed = Some(smoothed);
        self.sequence += 1;

        let estimate = ObstacleEstimate {
            position: smoothed,
            raw_position: raw,
            distance: (smoothed - observer).norm(),
            cell: nearest.cell(),
            sequence: self.sequence,
            timestamp: now,
        };
        self.current = Some(estimate);

        trace!(
            cell = estimate.cell,
            distance = estimate.distance,
            sequence = estimate.sequence,
            "Obstacle estimate updated"
        );
        TrackerUpdate::Updated(estimate)
    }

    fn expire_stale(&mut self, now: f64) {
        if let (Some(timeout), Some(last)) = (self.config.staleness_timeout, self.state.last_accepted_at)
            && now - last > timeout
        {
            debug!(
                idle = now - last,
                timeout, "Tracked obstacle went stale, clearing"
            );
            self.reset();
        }
    }
}

/// Nearest accepted candidate; the first one wins ties
///
/// Surface evaluation only runs for candidates strictly nearer than the best
/// so far.
pub fn select_nearest<'c>(
    candidates: &'c [Candidate],
    filter: &SurfaceFilter,
    ctx: &SurfaceContext<'_>,
) -> Option<&'c Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if best.is_some_and(|b| candidate.distance() >= b.distance()) {
            continue;
        }
        if filter.accepts(candidate, ctx) {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::DepthRange;
    use crate::detection::plane_cache::FloorPlane;
    use crate::detection::surface::SurfaceStrategy;
    use crate::geometry::{PoseProvider, Ray};
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    /// Pose whose viewport maps straight onto world XY at z = 1 direction
    struct FlatPose {
        observer: Point3<f32>,
    }

    impl PoseProvider for FlatPose {
        fn viewport_to_world_ray(&self, u: f32, v: f32) -> Ray {
            Ray {
                origin: self.observer,
                direction: nalgebra::Unit::new_normalize(Vector3::new(u - 0.5, 0.5 - v, 1.0)),
            }
        }

        fn observer_position(&self) -> Point3<f32> {
            self.observer
        }
    }

    fn pose() -> FlatPose {
        FlatPose {
            observer: Point3::origin(),
        }
    }

    fn range() -> DepthRange {
        DepthRange::new(0.3, 8.0).unwrap()
    }

    fn candidate(cell: usize, distance: f32) -> Candidate {
        Candidate::new(cell, [0.5, 0.5], distance, &range()).unwrap()
    }

    fn accept_all() -> SurfaceFilter {
        SurfaceFilter::new(SurfaceStrategy::PlaneBounded {
            min_height_above_floor: 0.3,
        })
        .unwrap()
    }

    fn tracker(smoothing_factor: f32, min_movement_threshold: f32) -> ObstacleTracker {
        ObstacleTracker::new(TrackerConfig {
            smoothing_factor,
            min_movement_threshold,
            staleness_timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn test_selects_nearest_with_first_tie_break() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let candidates = [candidate(0, 3.0), candidate(1, 1.2), candidate(2, 1.2), candidate(3, 2.0)];
        let nearest = select_nearest(&candidates, &accept_all(), &ctx).unwrap();
        assert_eq!(nearest.cell(), 1);
    }

    #[test]
    fn test_rejected_candidates_are_skipped() {
        let pose = pose();
        // Floor right under the nearest candidate
        let planes = [FloorPlane {
            center: Point3::new(0.0, 0.0, 1.0),
            y_position: 0.0,
            extents_xz: [1.0, 1.0],
            rotation: UnitQuaternion::identity(),
        }];
        let ctx = SurfaceContext::new(&pose, &planes);
        let candidates = [candidate(0, 3.0), candidate(1, 1.0)];
        let nearest = select_nearest(&candidates, &accept_all(), &ctx).unwrap();
        assert_eq!(nearest.cell(), 0);
    }

    #[test]
    fn test_farther_candidates_are_never_projected() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let candidates = [candidate(0, 1.0), candidate(1, 4.0)];
        select_nearest(&candidates, &accept_all(), &ctx);

        // Projecting with another pose shows whether a cached value exists
        let moved = FlatPose {
            observer: Point3::new(10.0, 0.0, 0.0),
        };
        assert_relative_eq!(candidates[0].world_position(&moved).x, 0.0);
        assert_relative_eq!(candidates[1].world_position(&moved).x, 10.0);
    }

    #[test]
    fn test_no_obstacle_keeps_state() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let filter = accept_all();
        let mut tracker = tracker(0.5, 0.0);

        assert!(matches!(
            tracker.update(0.0, &[candidate(0, 2.0)], &filter, &ctx),
            TrackerUpdate::Updated(_)
        ));
        let before = *tracker.state();
        assert_eq!(tracker.update(0.1, &[], &filter, &ctx), TrackerUpdate::NoObstacle);
        assert_eq!(tracker.state().smoothed, before.smoothed);
        assert!(tracker.current().is_some());
    }

    #[test]
    fn test_no_candidates_ever_means_no_state() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let mut tracker = tracker(0.5, 0.0);
        assert_eq!(tracker.update(0.0, &[], &accept_all(), &ctx), TrackerUpdate::NoObstacle);
        assert_eq!(tracker.state().smoothed, None);
    }

    #[test]
    fn test_smoothing_converges_without_overshoot() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let filter = accept_all();
        let mut tracker = tracker(0.8, 0.0);

        tracker.update(0.0, &[candidate(0, 1.0)], &filter, &ctx);
        let mut previous = tracker.current().unwrap().position.z;
        for i in 1..200 {
            let update = tracker.update(i as f64 * 0.01, &[candidate(0, 5.0)], &filter, &ctx);
            let z = update.estimate().unwrap().position.z;
            assert!(z >= previous, "moved backwards at step {}", i);
            assert!(z <= 5.0 + 1e-5, "overshot at step {}", i);
            previous = z;
        }
        assert_relative_eq!(previous, 5.0, epsilon = 1e-3);
    }

    #[test]
    fn test_first_update_uses_raw_position() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let mut tracker = tracker(0.9, 0.0);
        let update = tracker.update(0.0, &[candidate(4, 2.0)], &accept_all(), &ctx);
        let estimate = update.estimate().unwrap();
        assert_relative_eq!(estimate.position, Point3::new(0.0, 0.0, 2.0), epsilon = 1e-6);
        assert_eq!(estimate.position, estimate.raw_position);
        assert_eq!(estimate.cell, 4);
        assert_eq!(estimate.sequence, 1);
    }

    #[test]
    fn test_deadband_holds_position_bit_for_bit() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let filter = accept_all();
        let mut tracker = tracker(0.5, 0.05);

        let first = *tracker
            .update(0.0, &[candidate(0, 2.0)], &filter, &ctx)
            .estimate()
            .unwrap();
        for (i, distance) in [2.01, 1.99, 2.03, 1.97].into_iter().enumerate() {
            let update = tracker.update(0.1 * (i + 1) as f64, &[candidate(0, distance)], &filter, &ctx);
            assert!(update.is_held());
            let held = update.estimate().unwrap();
            assert_eq!(held.position, first.position);
            assert_eq!(held.sequence, first.sequence);
        }

        // A real move leaves the deadband
        let moved = tracker.update(1.0, &[candidate(0, 3.0)], &filter, &ctx);
        assert!(matches!(moved, TrackerUpdate::Updated(e) if e.sequence == 2));
    }

    #[test]
    fn test_held_distance_follows_observer() {
        let ctx_pose = pose();
        let filter = accept_all();
        let mut tracker = tracker(0.5, 0.5);
        tracker.update(0.0, &[candidate(0, 4.0)], &filter, &SurfaceContext::new(&ctx_pose, &[]));

        // Observer stepped 1 m forward; the obstacle reads 0.1 m off its old spot
        let closer = FlatPose {
            observer: Point3::new(0.0, 0.0, 1.0),
        };
        let update = tracker.update(0.5, &[candidate(0, 3.1)], &filter, &SurfaceContext::new(&closer, &[]));
        assert!(update.is_held());
        assert_relative_eq!(update.estimate().unwrap().distance, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_staleness_clears_state() {
        let pose = pose();
        let ctx = SurfaceContext::new(&pose, &[]);
        let filter = accept_all();
        let mut tracker = ObstacleTracker::new(TrackerConfig {
            smoothing_factor: 0.5,
            min_movement_threshold: 0.0,
            staleness_timeout: Some(1.0),
        })
        .unwrap();

        tracker.update(0.0, &[candidate(0, 2.0)], &filter, &ctx);
        tracker.update(0.9, &[], &filter, &ctx);
        assert!(tracker.state().smoothed.is_some());

        tracker.update(1.5, &[], &filter, &ctx);
        assert_eq!(tracker.state().smoothed, None);
        assert!(tracker.current().is_none());

        // Next obstacle starts fresh from its raw position, sequence keeps counting
        let update = tracker.update(1.6, &[candidate(0, 6.0)], &filter, &ctx);
        let estimate = update.estimate().unwrap();
        assert_relative_eq!(estimate.position.z, 6.0, epsilon = 1e-6);
        assert_eq!(estimate.sequence, 2);
    }

    #[test]
    fn test_config_validation() {
        let bad = |smoothing_factor: f32, min_movement_threshold: f32, staleness_timeout: Option<f64>| {
            ObstacleTracker::new(TrackerConfig {
                smoothing_factor,
                min_movement_threshold,
                staleness_timeout,
            })
            .is_err()
        };
        assert!(bad(1.0, 0.0, None));
        assert!(bad(-0.1, 0.0, None));
        assert!(bad(0.5, -0.01, None));
        assert!(bad(0.5, 0.0, Some(0.0)));
        assert!(!bad(0.0, 0.0, Some(2.0)));
        assert!(TrackerConfig::default().validate().is_ok());
    }
}
