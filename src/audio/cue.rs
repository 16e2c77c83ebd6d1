// SPDX-License-Identifier: GPL-3.0-only

//! Distance to audio cue mapping
//!
//! Turns the tracked distance into a variable-rate beacon: pitch rises and the
//! beep interval shrinks as the obstacle gets closer. Emission is gated by a
//! cooldown so cues never come faster than the current interval.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constants::cue::{
    DEFAULT_FAR_PITCH, DEFAULT_MAX_BEEP_INTERVAL_S, DEFAULT_MIN_BEEP_INTERVAL_S, DEFAULT_NEAR_PITCH,
};
use crate::depth::{DepthRange, inverse_lerp, lerp};
use crate::detection::ObstacleEstimate;
use crate::errors::ConfigError;

/// One point of a keyframed pitch curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Meters
    pub distance: f32,
    /// Playback rate multiplier
    pub pitch: f32,
}

/// Pitch as a function of distance; never rises with distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum PitchCurve {
    /// Straight line from `far` at max depth to `near` at min depth
    Linear { near: f32, far: f32 },
    /// `far + (near - far) * proximity^exponent`
    Power { near: f32, far: f32, exponent: f32 },
    /// Piecewise linear through keys sorted by distance, flat past the ends
    Keyframes { keys: Vec<CurveKey> },
}

impl Default for PitchCurve {
    fn default() -> Self {
        Self::Linear {
            near: DEFAULT_NEAR_PITCH,
            far: DEFAULT_FAR_PITCH,
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            allowed: "(0, inf)",
        })
    }
}

fn near_not_below_far(near: f32, far: f32) -> Result<(), ConfigError> {
    positive("pitch_curve.near", near)?;
    positive("pitch_curve.far", far)?;
    if near < far {
        return Err(ConfigError::NonMonotonicCurve(format!(
            "near pitch {} is below far pitch {}",
            near, far
        )));
    }
    Ok(())
}

impl PitchCurve {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Linear { near, far } => near_not_below_far(*near, *far),
            Self::Power {
                near,
                far,
                exponent,
            } => {
                near_not_below_far(*near, *far)?;
                positive("pitch_curve.exponent", *exponent)
            }
            Self::Keyframes { keys } => {
                if keys.is_empty() {
                    return Err(ConfigError::NonMonotonicCurve("no keyframes".to_string()));
                }
                for key in keys {
                    positive("pitch_curve.keys.pitch", key.pitch)?;
                    if !key.distance.is_finite() {
                        return Err(ConfigError::OutOfRange {
                            name: "pitch_curve.keys.distance",
                            value: key.distance as f64,
                            allowed: "finite",
                        });
                    }
                }
                for pair in keys.windows(2) {
                    if pair[1].distance <= pair[0].distance {
                        return Err(ConfigError::NonMonotonicCurve(format!(
                            "key distances must increase: {} then {}",
                            pair[0].distance, pair[1].distance
                        )));
                    }
                    if pair[1].pitch > pair[0].pitch {
                        return Err(ConfigError::NonMonotonicCurve(format!(
                            "pitch rises from {} to {} between {} m and {} m",
                            pair[0].pitch, pair[1].pitch, pair[0].distance, pair[1].distance
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    /// Pitch at `distance`, clamped into `range` first
    pub fn evaluate(&self, distance: f32, range: &DepthRange) -> f32 {
        let distance = range.clamp(distance);
        match self {
            Self::Linear { near, far } => lerp(*far, *near, range.proximity(distance)),
            Self::Power {
                near,
                far,
                exponent,
            } => lerp(*far, *near, range.proximity(distance).powf(*exponent)),
            Self::Keyframes { keys } => evaluate_keys(keys, distance),
        }
    }
}

fn evaluate_keys(keys: &[CurveKey], distance: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return 1.0;
    };
    if distance <= first.distance {
        return first.pitch;
    }
    if distance >= last.distance {
        return last.pitch;
    }
    // First key strictly beyond `distance`; both neighbors exist here
    let upper = keys.partition_point(|k| k.distance <= distance);
    let (a, b) = (keys[upper - 1], keys[upper]);
    lerp(a.pitch, b.pitch, inverse_lerp(a.distance, b.distance, distance))
}

/// Pitch curve and beep cadence bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    pub pitch_curve: PitchCurve,
    /// Interval at or inside min depth (seconds)
    pub min_beep_interval: f64,
    /// Interval at max depth (seconds)
    pub max_beep_interval: f64,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            pitch_curve: PitchCurve::default(),
            min_beep_interval: DEFAULT_MIN_BEEP_INTERVAL_S,
            max_beep_interval: DEFAULT_MAX_BEEP_INTERVAL_S,
        }
    }
}

impl CueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pitch_curve.validate()?;
        if !self.min_beep_interval.is_finite() || self.min_beep_interval <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "min_beep_interval",
                value: self.min_beep_interval,
                allowed: "(0, inf)",
            });
        }
        if !self.max_beep_interval.is_finite() || self.min_beep_interval > self.max_beep_interval {
            return Err(ConfigError::InvalidBeepInterval {
                min: self.min_beep_interval,
                max: self.max_beep_interval,
            });
        }
        Ok(())
    }
}

/// Whether the beacon has something to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CueMode {
    /// No obstacle estimate
    Silent,
    /// Estimate present, waiting for the cooldown to pass
    Armed,
}

/// Mapper state carried between ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioCueState {
    /// Earliest time the next cue may fire; never decreases
    pub next_allowed_trigger_time: f64,
    /// Pitch for the latest distance
    pub current_pitch: f32,
    /// Beep interval for the latest distance (seconds)
    pub current_interval: f64,
}

/// Instruction for the audio renderer to play one spatial beep
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CueTrigger {
    /// Where the sound is placed
    pub world_position: Point3<f32>,
    /// Playback rate multiplier
    pub pitch: f32,
    /// Interval until the next cue may fire (seconds)
    pub interval: f64,
    /// Obstacle distance the cue was computed for (meters)
    pub distance: f32,
}

/// Maps obstacle distance to pitch and cadence and gates emission
#[derive(Debug, Clone)]
pub struct AudioCueMapper {
    config: CueConfig,
    range: DepthRange,
    mode: CueMode,
    state: AudioCueState,
}

impl AudioCueMapper {
    pub fn new(config: CueConfig, range: DepthRange) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = AudioCueState {
            next_allowed_trigger_time: f64::NEG_INFINITY,
            current_pitch: config.pitch_curve.evaluate(range.max(), &range),
            current_interval: config.max_beep_interval,
        };
        Ok(Self {
            config,
            range,
            mode: CueMode::Silent,
            state,
        })
    }

    pub fn config(&self) -> &CueConfig {
        &self.config
    }

    pub fn mode(&self) -> CueMode {
        self.mode
    }

    pub fn state(&self) -> &AudioCueState {
        &self.state
    }

    /// Pitch for `distance` (meters)
    pub fn pitch_for(&self, distance: f32) -> f32 {
        self.config.pitch_curve.evaluate(distance, &self.range)
    }

    /// Beep interval for `distance` (meters)
    pub fn interval_for(&self, distance: f32) -> f64 {
        let proximity = self.range.proximity(distance) as f64;
        self.config.max_beep_interval
            + (self.config.min_beep_interval - self.config.max_beep_interval) * proximity
    }

    /// Advance to `now`; returns a cue when one is due
    pub fn tick(&mut self, now: f64, estimate: Option<&ObstacleEstimate>) -> Option<CueTrigger> {
        let Some(estimate) = estimate else {
            if self.mode == CueMode::Armed {
                debug!("Obstacle lost, cues silenced");
                self.mode = CueMode::Silent;
            }
            return None;
        };

        if self.mode == CueMode::Silent {
            debug!(distance = estimate.distance, "Obstacle acquired, cues armed");
            self.mode = CueMode::Armed;
        }

        self.state.current_pitch = self.pitch_for(estimate.distance);
        self.state.current_interval = self.interval_for(estimate.distance);

        if now < self.state.next_allowed_trigger_time {
            return None;
        }

        self.state.next_allowed_trigger_time = self
            .state
            .next_allowed_trigger_time
            .max(now + self.state.current_interval);

        let trigger = CueTrigger {
            world_position: estimate.position,
            pitch: self.state.current_pitch,
            interval: self.state.current_interval,
            distance: estimate.distance,
        };
        trace!(
            pitch = trigger.pitch,
            interval = trigger.interval,
            distance = trigger.distance,
            "Cue triggered"
        );
        Some(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn range() -> DepthRange {
        DepthRange::new(0.3, 8.0).unwrap()
    }

    fn estimate(distance: f32) -> ObstacleEstimate {
        ObstacleEstimate {
            position: Point3::new(0.0, 0.0, distance),
            raw_position: Point3::new(0.0, 0.0, distance),
            distance,
            cell: 0,
            sequence: 1,
            timestamp: 0.0,
        }
    }

    fn mapper() -> AudioCueMapper {
        AudioCueMapper::new(CueConfig::default(), range()).unwrap()
    }

    #[test]
    fn test_interval_endpoints_and_midpoint() {
        let mapper = mapper();
        assert_relative_eq!(mapper.interval_for(8.0), 1.0);
        assert_relative_eq!(mapper.interval_for(0.3), 0.1);
        // Saturates outside the range
        assert_relative_eq!(mapper.interval_for(0.05), 0.1);
        assert_relative_eq!(mapper.interval_for(20.0), 1.0);

        let t = inverse_lerp(8.0, 0.3, 1.2) as f64;
        assert_relative_eq!(mapper.interval_for(1.2), 1.0 + (0.1 - 1.0) * t, epsilon = 1e-6);
    }

    #[test]
    fn test_cadence_is_monotone_in_distance() {
        let curves = [
            PitchCurve::default(),
            PitchCurve::Power {
                near: 3.0,
                far: 0.8,
                exponent: 2.0,
            },
            PitchCurve::Keyframes {
                keys: vec![
                    CurveKey {
                        distance: 0.5,
                        pitch: 2.0,
                    },
                    CurveKey {
                        distance: 2.0,
                        pitch: 1.2,
                    },
                    CurveKey {
                        distance: 6.0,
                        pitch: 0.6,
                    },
                ],
            },
        ];
        for pitch_curve in curves {
            let mapper = AudioCueMapper::new(
                CueConfig {
                    pitch_curve,
                    ..CueConfig::default()
                },
                range(),
            )
            .unwrap();

            let mut last_interval = f64::INFINITY;
            let mut last_pitch = f32::NEG_INFINITY;
            let mut distance = 8.0_f32;
            while distance >= 0.3 {
                let interval = mapper.interval_for(distance);
                let pitch = mapper.pitch_for(distance);
                assert!(interval <= last_interval);
                assert!(pitch >= last_pitch);
                last_interval = interval;
                last_pitch = pitch;
                distance -= 0.05;
            }
        }
    }

    #[test]
    fn test_keyframes_interpolate_and_clamp() {
        let curve = PitchCurve::Keyframes {
            keys: vec![
                CurveKey {
                    distance: 1.0,
                    pitch: 2.0,
                },
                CurveKey {
                    distance: 3.0,
                    pitch: 1.0,
                },
            ],
        };
        assert_relative_eq!(curve.evaluate(0.5, &range()), 2.0);
        assert_relative_eq!(curve.evaluate(2.0, &range()), 1.5);
        assert_relative_eq!(curve.evaluate(3.0, &range()), 1.0);
        assert_relative_eq!(curve.evaluate(7.0, &range()), 1.0);
    }

    #[test]
    fn test_curve_validation() {
        assert!(PitchCurve::Linear { near: 0.5, far: 2.0 }.validate().is_err());
        assert!(
            PitchCurve::Power {
                near: 2.0,
                far: 1.0,
                exponent: 0.0
            }
            .validate()
            .is_err()
        );
        assert!(PitchCurve::Keyframes { keys: vec![] }.validate().is_err());
        let rising = PitchCurve::Keyframes {
            keys: vec![
                CurveKey {
                    distance: 1.0,
                    pitch: 1.0,
                },
                CurveKey {
                    distance: 2.0,
                    pitch: 1.5,
                },
            ],
        };
        assert!(matches!(rising.validate(), Err(ConfigError::NonMonotonicCurve(_))));
    }

    #[test]
    fn test_interval_bounds_validation() {
        let swapped = CueConfig {
            min_beep_interval: 2.0,
            max_beep_interval: 1.0,
            ..CueConfig::default()
        };
        assert!(matches!(
            AudioCueMapper::new(swapped, range()),
            Err(ConfigError::InvalidBeepInterval { .. })
        ));
        let zero = CueConfig {
            min_beep_interval: 0.0,
            ..CueConfig::default()
        };
        assert!(AudioCueMapper::new(zero, range()).is_err());
    }

    #[test]
    fn test_first_armed_tick_fires() {
        let mut mapper = mapper();
        assert_eq!(mapper.mode(), CueMode::Silent);
        let trigger = mapper.tick(0.0, Some(&estimate(1.2))).unwrap();
        assert_eq!(mapper.mode(), CueMode::Armed);
        assert_eq!(trigger.world_position, Point3::new(0.0, 0.0, 1.2));
        assert_relative_eq!(mapper.state().next_allowed_trigger_time, trigger.interval);
    }

    #[test]
    fn test_cooldown_gates_emission() {
        let mut mapper = mapper();
        let e = estimate(8.0);
        assert!(mapper.tick(0.0, Some(&e)).is_some());
        assert!(mapper.tick(0.5, Some(&e)).is_none());
        assert!(mapper.tick(0.99, Some(&e)).is_none());
        assert!(mapper.tick(1.0, Some(&e)).is_some());
    }

    #[test]
    fn test_silence_does_not_advance_schedule() {
        let mut mapper = mapper();
        mapper.tick(0.0, Some(&estimate(4.0)));
        let scheduled = mapper.state().next_allowed_trigger_time;

        assert!(mapper.tick(0.2, None).is_none());
        assert_eq!(mapper.mode(), CueMode::Silent);
        assert_eq!(mapper.state().next_allowed_trigger_time, scheduled);

        // Re-arming honours the pending cooldown
        assert!(mapper.tick(scheduled - 0.01, Some(&estimate(4.0))).is_none());
        assert_eq!(mapper.mode(), CueMode::Armed);
        assert!(mapper.tick(scheduled, Some(&estimate(4.0))).is_some());
    }

    #[test]
    fn test_next_allowed_never_decreases() {
        let mut mapper = mapper();
        let mut last = f64::NEG_INFINITY;
        let mut distance = 7.5_f32;
        for step in 0..400 {
            let now = step as f64 * 0.02;
            mapper.tick(now, Some(&estimate(distance)));
            let next = mapper.state().next_allowed_trigger_time;
            assert!(next >= last);
            last = next;
            distance = (distance - 0.02).max(0.2);
        }
    }

    #[test]
    fn test_approach_accelerates_cadence() {
        let mut mapper = mapper();
        let mut fired = Vec::new();
        let mut distance = 8.0_f32;
        for step in 0..1000 {
            let now = step as f64 * 0.01;
            if mapper.tick(now, Some(&estimate(distance))).is_some() {
                fired.push(now);
            }
            distance = (distance - 0.008).max(0.3);
        }
        let gaps: Vec<f64> = fired.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.len() > 5);
        assert!(gaps.first().unwrap() > gaps.last().unwrap());
    }
}
