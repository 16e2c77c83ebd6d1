// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the obstacle cue pipeline
//!
//! Only construction-time problems are errors. Missing frames, empty grids
//! and rejected samples are normal outcomes of a cycle and never show up here.

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main error type for loading configuration and building sources
#[derive(Debug, Error)]
pub enum AppError {
    /// Inconsistent pipeline parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Depth buffer does not match its declared layout
    #[error("Depth frame error: {0}")]
    Frame(#[from] FrameError),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration file
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    /// Depth image could not be decoded
    #[error("Depth image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Parameter inconsistencies, rejected when a component is constructed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `min_depth` must be strictly below `max_depth`
    #[error("depth range is empty: min {min} m must be below max {max} m")]
    InvalidDepthRange { min: f32, max: f32 },
    /// Regular grid with a zero dimension
    #[error("grid needs at least one column and one row, got {columns}x{rows}")]
    EmptyGrid { columns: u32, rows: u32 },
    /// Point grid without points
    #[error("sample point list is empty")]
    NoSamplePoints,
    /// Point outside the normalized viewport
    #[error("sample point ({u}, {v}) lies outside the unit square")]
    SamplePointOutOfRange { u: f32, v: f32 },
    /// Vertical band that leaves nothing to sample
    #[error("vertical band is invalid: top {top} + bottom {bottom} must stay below 1")]
    InvalidBand { top: f32, bottom: f32 },
    /// Scalar parameter outside its allowed range
    #[error("{name} = {value} is outside the allowed range {allowed}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        allowed: &'static str,
    },
    /// Beep interval bounds are swapped
    #[error("min beep interval {min} s exceeds max beep interval {max} s")]
    InvalidBeepInterval { min: f64, max: f64 },
    /// Pitch response that rises with distance
    #[error("pitch curve must not rise with distance: {0}")]
    NonMonotonicCurve(String),
}

/// Depth buffer layout problems, detected once when a frame view is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Zero width or height
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel stride cannot hold one sample
    #[error("pixel stride {stride} is smaller than the {sample}-byte sample")]
    PixelStrideTooSmall { stride: usize, sample: usize },
    /// Row stride cannot hold one row
    #[error("row stride {stride} is smaller than the {needed}-byte row")]
    RowStrideTooSmall { stride: usize, needed: usize },
    /// Buffer shorter than the layout addresses
    #[error("depth buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
    /// Confidence plane size mismatch
    #[error("confidence plane has {actual} entries, expected {expected}")]
    ConfidenceSizeMismatch { expected: usize, actual: usize },
}
