// SPDX-License-Identifier: GPL-3.0-only

//! Grid sampling of depth frames
//!
//! The frame is probed at a fixed set of normalized viewport points. Each
//! point reads a small square neighborhood and reduces it to one distance
//! with a median, which shrugs off the isolated near/far outliers that depth
//! sensors produce at object edges.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::depth::{DepthFrameView, DepthRange};
use crate::errors::ConfigError;

/// Where the grid probes the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridLayout {
    /// Evenly spaced cell centres, row-major
    Regular {
        /// Cells per row
        columns: u32,
        /// Cells per column
        rows: u32,
    },
    /// Explicit normalized `[u, v]` points, in list order
    Points(Vec<[f32; 2]>),
}

/// Sampling grid with an optional vertical restriction band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Probe positions
    pub layout: GridLayout,
    /// Fraction of the frame height ignored at the top (ceiling-heavy region)
    #[serde(default)]
    pub top_ignore: f32,
    /// Fraction of the frame height ignored at the bottom (floor-heavy region)
    #[serde(default)]
    pub bottom_ignore: f32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::regular(3, 3)
    }
}

impl GridSpec {
    /// Regular `columns x rows` grid covering the whole frame
    pub fn regular(columns: u32, rows: u32) -> Self {
        Self {
            layout: GridLayout::Regular { columns, rows },
            top_ignore: 0.0,
            bottom_ignore: 0.0,
        }
    }

    /// Explicit list of normalized points
    pub fn points(points: Vec<[f32; 2]>) -> Self {
        Self {
            layout: GridLayout::Points(points),
            top_ignore: 0.0,
            bottom_ignore: 0.0,
        }
    }

    /// Restrict sampling to the vertical band between the two ignored strips
    pub fn with_band(mut self, top_ignore: f32, bottom_ignore: f32) -> Self {
        self.top_ignore = top_ignore;
        self.bottom_ignore = bottom_ignore;
        self
    }

    /// Number of probes per frame
    pub fn cell_count(&self) -> usize {
        match &self.layout {
            GridLayout::Regular { columns, rows } => *columns as usize * *rows as usize,
            GridLayout::Points(points) => points.len(),
        }
    }

    /// Check dimensions, point coordinates and band fractions
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.layout {
            GridLayout::Regular { columns, rows } => {
                if *columns == 0 || *rows == 0 {
                    return Err(ConfigError::EmptyGrid {
                        columns: *columns,
                        rows: *rows,
                    });
                }
            }
            GridLayout::Points(points) => {
                if points.is_empty() {
                    return Err(ConfigError::NoSamplePoints);
                }
                let unit = 0.0..=1.0;
                if let Some([u, v]) = points
                    .iter()
                    .find(|[u, v]| !unit.contains(u) || !unit.contains(v))
                {
                    return Err(ConfigError::SamplePointOutOfRange { u: *u, v: *v });
                }
            }
        }

        let band_ok = (0.0..1.0).contains(&self.top_ignore)
            && (0.0..1.0).contains(&self.bottom_ignore)
            && self.top_ignore + self.bottom_ignore < 1.0;
        if !band_ok {
            return Err(ConfigError::InvalidBand {
                top: self.top_ignore,
                bottom: self.bottom_ignore,
            });
        }

        Ok(())
    }

    /// Viewport points after applying the vertical band, in scan order
    fn viewport_points(&self) -> Vec<[f32; 2]> {
        let span = 1.0 - self.top_ignore - self.bottom_ignore;
        let band = |v: f32| self.top_ignore + v * span;

        match &self.layout {
            GridLayout::Regular { columns, rows } => {
                let mut points = Vec::with_capacity(self.cell_count());
                for row in 0..*rows {
                    let v = (row as f32 + 0.5) / *rows as f32;
                    for column in 0..*columns {
                        let u = (column as f32 + 0.5) / *columns as f32;
                        points.push([u, band(v)]);
                    }
                }
                points
            }
            GridLayout::Points(points) => points.iter().map(|&[u, v]| [u, band(v)]).collect(),
        }
    }
}

/// Filtered distance of one grid probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    /// Position in scan order
    pub cell: usize,
    /// Viewport coordinate the probe represents (band applied)
    pub uv: [f32; 2],
    /// Buffer pixel the neighborhood is centred on
    pub pixel: [u32; 2],
    /// Median of the valid neighborhood samples, `None` if there were none
    pub distance: Option<f32>,
}

/// Median of `values`, reordering them; mean of the central pair for even counts
pub fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) * 0.5)
    }
}

/// Samples depth frames at a fixed logical grid
#[derive(Debug, Clone)]
pub struct GridSampler {
    points: Vec<[f32; 2]>,
    sample_radius: u32,
    range: DepthRange,
    min_confidence: u8,
    scratch: Vec<f32>,
}

impl GridSampler {
    /// Create a sampler; the grid is validated here, never per frame
    pub fn new(spec: &GridSpec, sample_radius: u32, range: DepthRange) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self {
            points: spec.viewport_points(),
            sample_radius,
            range,
            min_confidence: 0,
            // Grows to the largest clipped neighborhood, bounded by the frame
            scratch: Vec::new(),
        })
    }

    /// Ignore pixels whose confidence is below `min_confidence` (0 disables)
    pub fn with_min_confidence(mut self, min_confidence: u8) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Number of cells produced per frame
    pub fn cell_count(&self) -> usize {
        self.points.len()
    }

    /// Accepted distance interval
    pub fn range(&self) -> DepthRange {
        self.range
    }

    /// Sample every grid cell of `frame`
    pub fn sample(&mut self, frame: &DepthFrameView<'_>) -> Vec<CellSample> {
        let mut out = Vec::with_capacity(self.points.len());
        self.sample_into(frame, &mut out);
        out
    }

    /// Sample every grid cell of `frame` into `out`, replacing its contents
    pub fn sample_into(&mut self, frame: &DepthFrameView<'_>, out: &mut Vec<CellSample>) {
        out.clear();

        let (width, height) = (frame.width(), frame.height());
        for cell in 0..self.points.len() {
            let [u, v] = self.points[cell];
            let px = (u * (width - 1) as f32).floor() as i64;
            let py = (v * (height - 1) as f32).floor() as i64;
            let distance = self.filtered_distance(frame, px, py);

            out.push(CellSample {
                cell,
                uv: [u, v],
                pixel: [px.max(0) as u32, py.max(0) as u32],
                distance,
            });
        }

        trace!(
            cells = out.len(),
            valid = out.iter().filter(|s| s.distance.is_some()).count(),
            width,
            height,
            "Sampled depth grid"
        );
    }

    /// Median of the in-range samples in the clipped neighborhood of `(px, py)`
    fn filtered_distance(&mut self, frame: &DepthFrameView<'_>, px: i64, py: i64) -> Option<f32> {
        let r = self.sample_radius as i64;
        let x0 = (px - r).max(0);
        let x1 = (px + r).min(frame.width() as i64 - 1);
        let y0 = (py - r).max(0);
        let y1 = (py + r).min(frame.height() as i64 - 1);
        if x0 > x1 || y0 > y1 {
            return None;
        }

        self.scratch.clear();
        for y in y0 as u32..=y1 as u32 {
            for x in x0 as u32..=x1 as u32 {
                if self.min_confidence > 0
                    && frame
                        .confidence(x, y)
                        .is_some_and(|c| c < self.min_confidence)
                {
                    continue;
                }
                if let Some(d) = frame.depth_m(x, y).filter(|&d| self.range.contains(d)) {
                    self.scratch.push(d);
                }
            }
        }

        median(&mut self.scratch)
    }
}
