// SPDX-License-Identifier: GPL-3.0-only

//! Depth source abstraction
//!
//! Acquisition is a non-blocking try: a source either hands out a frame right
//! away or reports that none is ready. The acquired value is a scoped guard;
//! dropping it releases the frame back to the source, on every exit path.

use std::path::Path;

use tracing::{debug, info};

use super::frame::{DepthFrameView, OwnedDepthFrame};
use crate::errors::AppResult;

/// A frame held for the duration of one processing cycle
pub trait AcquiredDepth {
    /// Read-only view of the acquired buffer
    fn frame(&self) -> DepthFrameView<'_>;
}

impl AcquiredDepth for DepthFrameView<'_> {
    fn frame(&self) -> DepthFrameView<'_> {
        *self
    }
}

/// Provider of depth frames (AR depth subsystem, sensor driver, replay file)
pub trait DepthSource {
    /// Guard returned by a successful acquisition; releasing happens on drop
    type Acquired<'a>: AcquiredDepth
    where
        Self: 'a;

    /// Try to acquire the latest frame without blocking
    fn try_acquire(&mut self) -> Option<Self::Acquired<'_>>;
}

/// Replays one depth image as a stream of identical frames
///
/// The image must be 16-bit grayscale with millimeter values, as written by
/// depth cameras' raw depth export.
#[derive(Debug, Clone)]
pub struct ReplayDepthSource {
    frame: OwnedDepthFrame,
    remaining: Option<u64>,
}

impl ReplayDepthSource {
    /// Load a 16-bit millimeter depth image
    pub fn open(path: &Path) -> AppResult<Self> {
        let image = image::open(path)?.into_luma16();
        let (width, height) = image.dimensions();
        let frame = OwnedDepthFrame::from_millimeters(width, height, image.as_raw())?;

        info!(
            path = %path.display(),
            width,
            height,
            "Loaded depth image for replay"
        );

        Ok(Self::from_frame(frame))
    }

    /// Replay an in-memory frame
    pub fn from_frame(frame: OwnedDepthFrame) -> Self {
        Self {
            frame,
            remaining: None,
        }
    }

    /// Stop yielding frames after `count` acquisitions
    pub fn with_frame_limit(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }
}

impl DepthSource for ReplayDepthSource {
    type Acquired<'a> = DepthFrameView<'a>;

    fn try_acquire(&mut self) -> Option<DepthFrameView<'_>> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                debug!("Replay source exhausted");
                return None;
            }
            *remaining -= 1;
        }
        Some(self.frame.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_limit() {
        let frame = OwnedDepthFrame::from_millimeters(1, 1, &[1200]).unwrap();
        let mut source = ReplayDepthSource::from_frame(frame).with_frame_limit(2);

        assert!(source.try_acquire().is_some());
        assert!(source.try_acquire().is_some());
        assert!(source.try_acquire().is_none());
    }

    #[test]
    fn test_open_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.png");
        let image = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
            2,
            1,
            vec![1500, 0],
        )
        .unwrap();
        image.save(&path).unwrap();

        let mut source = ReplayDepthSource::open(&path).unwrap();
        let acquired = source.try_acquire().unwrap();
        let view = acquired.frame();
        assert_eq!(view.width(), 2);
        assert_eq!(view.depth_m(0, 0), Some(1.5));
        assert_eq!(view.depth_m(1, 0), None);
    }

    #[test]
    fn test_open_missing_file_is_an_error() {
        let result = ReplayDepthSource::open(Path::new("/nonexistent/depth.png"));
        assert!(result.is_err());
    }
}
