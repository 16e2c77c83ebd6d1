// SPDX-License-Identifier: GPL-3.0-only

//! Refresh cadence controller
//!
//! Owns the "time since last refresh" for work that must not run every cycle.
//! It is driven by whatever clock the caller passes in, so tests can use a
//! synthetic one.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// How often a rate-limited job runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Once every `n` polls (0 behaves like 1)
    EveryFrames(u32),
    /// Once at least this many seconds have elapsed
    Interval(f64),
}

impl Default for Cadence {
    fn default() -> Self {
        Self::EveryFrames(crate::constants::surface::DEFAULT_PLANE_REFRESH_FRAMES)
    }
}

impl Cadence {
    /// Reject negative or non-finite intervals
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::EveryFrames(_) => Ok(()),
            Self::Interval(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(()),
            Self::Interval(seconds) => Err(ConfigError::OutOfRange {
                name: "plane_refresh.interval",
                value: seconds,
                allowed: "[0, inf)",
            }),
        }
    }
}

/// Decides, poll by poll, whether a rate-limited job is due
#[derive(Debug, Clone)]
pub struct CadenceController {
    cadence: Cadence,
    polls_since: u32,
    last_fired: Option<f64>,
}

impl CadenceController {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            polls_since: 0,
            last_fired: None,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Register one poll at `now` and report whether the job should run
    ///
    /// The first poll always fires.
    pub fn poll(&mut self, now: f64) -> bool {
        self.polls_since = self.polls_since.saturating_add(1);

        let due = match (self.last_fired, self.cadence) {
            (None, _) => true,
            (Some(_), Cadence::EveryFrames(n)) => self.polls_since >= n.max(1),
            (Some(last), Cadence::Interval(seconds)) => now - last >= seconds,
        };

        if due {
            self.polls_since = 0;
            self.last_fired = Some(now);
        }
        due
    }

    /// Forget history; the next poll fires
    pub fn reset(&mut self) {
        self.polls_since = 0;
        self.last_fired = None;
    }
}
