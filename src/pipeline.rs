// SPDX-License-Identifier: GPL-3.0-only

//! Obstacle cue pipeline
//!
//! One [`ObstaclePipeline::tick`] per external frame or timer tick:
//!
//! 1. Refresh the plane cache (rate limited, plane strategies only)
//! 2. Try to acquire a depth frame; skip the cycle when none is ready
//! 3. Sample the grid while the frame is held, then release it
//! 4. Build candidates, track the nearest obstacle, map it to a cue
//! 5. Hand any cue to the audio renderer
//!
//! Everything runs synchronously on the caller's thread. Collaborators are
//! injected at construction.

use serde::Serialize;
use tracing::{debug, info};

use crate::audio::{AudioCueMapper, AudioRenderer, CueTrigger};
use crate::config::PipelineConfig;
use crate::depth::{AcquiredDepth, DepthRange, DepthSource};
use crate::detection::{
    Candidate, CellSample, GridSampler, ObstacleEstimate, ObstacleTracker, PlaneCache,
    PlaneProvider, SurfaceContext, SurfaceFilter, TrackerUpdate,
};
use crate::errors::ConfigError;
use crate::geometry::PoseProvider;

/// What one cycle produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The depth source had nothing ready; nothing was touched
    NoFrame,
    /// No candidate survived filtering
    NoObstacle,
    /// An obstacle is tracked
    Obstacle {
        estimate: ObstacleEstimate,
        /// Position held by the deadband this cycle
        held: bool,
        /// Cue emitted this cycle, if the cooldown allowed one
        cue: Option<CueTrigger>,
    },
}

impl CycleOutcome {
    pub fn estimate(&self) -> Option<&ObstacleEstimate> {
        match self {
            Self::Obstacle { estimate, .. } => Some(estimate),
            _ => None,
        }
    }

    pub fn cue(&self) -> Option<&CueTrigger> {
        match self {
            Self::Obstacle { cue, .. } => cue.as_ref(),
            _ => None,
        }
    }
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Ticks processed
    pub cycles: u64,
    /// Ticks that had a depth frame
    pub frames: u64,
    /// Ticks skipped for lack of a frame
    pub skipped: u64,
    /// Cues handed to the renderer
    pub cues: u64,
}

/// Depth frames in, spatial beeps out
pub struct ObstaclePipeline<S, P, L, A> {
    source: S,
    pose: P,
    planes: L,
    audio: A,
    range: DepthRange,
    sampler: GridSampler,
    filter: SurfaceFilter,
    plane_cache: PlaneCache,
    tracker: ObstacleTracker,
    cue: AudioCueMapper,
    samples: Vec<CellSample>,
    candidates: Vec<Candidate>,
    stats: PipelineStats,
}

impl<S, P, L, A> ObstaclePipeline<S, P, L, A>
where
    S: DepthSource,
    P: PoseProvider,
    L: PlaneProvider,
    A: AudioRenderer,
{
    /// Build the pipeline; every parameter is validated here
    pub fn new(
        config: &PipelineConfig,
        source: S,
        pose: P,
        planes: L,
        audio: A,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let range = config.depth_range()?;
        let sampler = GridSampler::new(&config.grid, config.sample_radius, range)?
            .with_min_confidence(config.min_confidence);
        let cells = sampler.cell_count();

        let pipeline = Self {
            source,
            pose,
            planes,
            audio,
            range,
            sampler,
            filter: SurfaceFilter::new(config.surface)?,
            plane_cache: PlaneCache::new(config.plane_refresh),
            tracker: ObstacleTracker::new(config.tracker_config())?,
            cue: AudioCueMapper::new(config.cue_config(), range)?,
            samples: Vec::with_capacity(cells),
            candidates: Vec::with_capacity(cells),
            stats: PipelineStats::default(),
        };

        info!(
            cells,
            min_depth = range.min(),
            max_depth = range.max(),
            strategy = ?config.surface,
            "Obstacle pipeline ready"
        );
        Ok(pipeline)
    }

    /// Run one processing cycle at clock value `now` (seconds)
    pub fn tick(&mut self, now: f64) -> CycleOutcome {
        self.stats.cycles += 1;

        // Planes are only swapped here, never during a filter pass
        if self.filter.strategy().uses_planes() {
            self.plane_cache.refresh(now, &self.planes);
        }

        {
            let Some(acquired) = self.source.try_acquire() else {
                self.stats.skipped += 1;
                debug!(cycle = self.stats.cycles, "No depth frame, skipping cycle");
                return CycleOutcome::NoFrame;
            };
            self.sampler.sample_into(&acquired.frame(), &mut self.samples);
        }
        self.stats.frames += 1;

        let range = self.range;
        self.candidates.clear();
        self.candidates.extend(
            self.samples
                .iter()
                .filter_map(|sample| Candidate::from_sample(sample, &range)),
        );

        let ctx = SurfaceContext::new(&self.pose, self.plane_cache.planes());
        let update = self
            .tracker
            .update(now, &self.candidates, &self.filter, &ctx);

        let cue = self.cue.tick(now, update.estimate());
        if let Some(trigger) = &cue {
            self.audio.play(trigger);
            self.stats.cues += 1;
        }

        match update {
            TrackerUpdate::NoObstacle => CycleOutcome::NoObstacle,
            TrackerUpdate::Updated(estimate) => CycleOutcome::Obstacle {
                estimate,
                held: false,
                cue,
            },
            TrackerUpdate::Held(estimate) => CycleOutcome::Obstacle {
                estimate,
                held: true,
                cue,
            },
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn pose(&self) -> &P {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut P {
        &mut self.pose
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn tracker(&self) -> &ObstacleTracker {
        &self.tracker
    }

    pub fn cue_mapper(&self) -> &AudioCueMapper {
        &self.cue
    }

    pub fn plane_cache(&self) -> &PlaneCache {
        &self.plane_cache
    }

    /// Samples of the last processed frame
    pub fn last_samples(&self) -> &[CellSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{OwnedDepthFrame, ReplayDepthSource};
    use crate::detection::{GridSpec, NoPlanes};
    use crate::geometry::{CameraIntrinsics, PinholeCamera};

    fn camera() -> PinholeCamera {
        PinholeCamera::new(CameraIntrinsics::from_horizontal_fov(60.0, 1.0, 1.0))
    }

    fn uniform(mm: u16, frames: u64) -> ReplayDepthSource {
        let frame = OwnedDepthFrame::from_millimeters(6, 6, &[mm; 36]).unwrap();
        ReplayDepthSource::from_frame(frame).with_frame_limit(frames)
    }

    #[test]
    fn test_invalid_config_is_rejected_at_construction() {
        let config = PipelineConfig {
            grid: GridSpec::regular(0, 2),
            ..PipelineConfig::default()
        };
        let result = ObstaclePipeline::new(&config, uniform(2000, 1), camera(), NoPlanes, Vec::<CueTrigger>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_frame_skips_cycle() {
        let config = PipelineConfig::default();
        let mut pipeline =
            ObstaclePipeline::new(&config, uniform(2000, 1), camera(), NoPlanes, Vec::<CueTrigger>::new()).unwrap();

        assert!(matches!(pipeline.tick(0.0), CycleOutcome::Obstacle { .. }));
        let tracked = *pipeline.tracker().state();

        assert_eq!(pipeline.tick(0.1), CycleOutcome::NoFrame);
        assert_eq!(*pipeline.tracker().state(), tracked);
        assert_eq!(
            *pipeline.stats(),
            PipelineStats {
                cycles: 2,
                frames: 1,
                skipped: 1,
                cues: 1,
            }
        );
    }

    #[test]
    fn test_out_of_range_frame_has_no_obstacle() {
        let config = PipelineConfig::default();
        let mut pipeline =
            ObstaclePipeline::new(&config, uniform(9500, 3), camera(), NoPlanes, Vec::<CueTrigger>::new()).unwrap();
        assert_eq!(pipeline.tick(0.0), CycleOutcome::NoObstacle);
        assert!(pipeline.audio().is_empty());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_string(&CycleOutcome::NoFrame).unwrap();
        assert_eq!(json, r#"{"outcome":"no_frame"}"#);
    }
}
