// SPDX-License-Identifier: GPL-3.0-only

//! Bounds-checked views over acquired depth buffers
//!
//! A depth buffer arrives as an opaque byte span plus a layout (dimensions,
//! row and pixel strides, sample encoding). The layout is validated once when
//! the view is built; per-pixel reads afterwards only assert that the pixel
//! lies inside the frame.

use bytemuck::pod_read_unaligned;
use serde::{Deserialize, Serialize};

use crate::constants::{MM_PER_METER, depth::DEPTH_INVALID_MM};
use crate::errors::FrameError;

/// Encoding of one depth sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleUnit {
    /// Unsigned 16-bit millimeters, 0 = no data (Kinect, ARCore)
    #[default]
    MillimetersU16,
    /// 32-bit float meters, non-finite or non-positive = no data (ARKit)
    MetersF32,
}

impl SampleUnit {
    /// Size of one sample in bytes
    pub const fn sample_size(self) -> usize {
        match self {
            SampleUnit::MillimetersU16 => 2,
            SampleUnit::MetersF32 => 4,
        }
    }
}

impl std::fmt::Display for SampleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleUnit::MillimetersU16 => write!(f, "u16 mm"),
            SampleUnit::MetersF32 => write!(f, "f32 m"),
        }
    }
}

/// Memory layout of a depth buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLayout {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes between the starts of consecutive rows
    pub row_stride: usize,
    /// Bytes between the starts of consecutive pixels in a row
    pub pixel_stride: usize,
    /// Sample encoding
    pub unit: SampleUnit,
}

impl DepthLayout {
    /// Tightly packed layout (no row padding, no interleaving)
    pub fn packed(width: u32, height: u32, unit: SampleUnit) -> Self {
        let pixel_stride = unit.sample_size();
        Self {
            width,
            height,
            row_stride: width as usize * pixel_stride,
            pixel_stride,
            unit,
        }
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Smallest buffer length that covers every addressable sample
    pub fn required_len(&self) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        (self.height as usize - 1)
            .saturating_mul(self.row_stride)
            .saturating_add((self.width as usize - 1).saturating_mul(self.pixel_stride))
            .saturating_add(self.unit.sample_size())
    }

    /// Check the layout against a buffer of `len` bytes
    pub fn validate(&self, len: usize) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let sample = self.unit.sample_size();
        if self.pixel_stride < sample {
            return Err(FrameError::PixelStrideTooSmall {
                stride: self.pixel_stride,
                sample,
            });
        }

        let row_bytes = (self.width as usize - 1)
            .saturating_mul(self.pixel_stride)
            .saturating_add(sample);
        if self.height > 1 && self.row_stride < row_bytes {
            return Err(FrameError::RowStrideTooSmall {
                stride: self.row_stride,
                needed: row_bytes,
            });
        }

        let needed = self.required_len();
        if len < needed {
            return Err(FrameError::BufferTooSmall {
                needed,
                actual: len,
            });
        }

        Ok(())
    }
}

/// Read-only view over one acquired depth buffer
///
/// Borrowing the buffer ties the view to the acquisition that produced it, so
/// a view can never outlive the frame's release.
#[derive(Debug, Clone, Copy)]
pub struct DepthFrameView<'a> {
    layout: DepthLayout,
    data: &'a [u8],
    confidence: Option<&'a [u8]>,
}

impl<'a> DepthFrameView<'a> {
    /// Build a view after validating `data` against `layout`
    pub fn new(layout: DepthLayout, data: &'a [u8]) -> Result<Self, FrameError> {
        layout.validate(data.len())?;
        Ok(Self {
            layout,
            data,
            confidence: None,
        })
    }

    /// Attach a packed per-pixel confidence plane (one byte per pixel, row-major)
    pub fn with_confidence(mut self, confidence: &'a [u8]) -> Result<Self, FrameError> {
        let expected = self.layout.pixel_count();
        if confidence.len() != expected {
            return Err(FrameError::ConfidenceSizeMismatch {
                expected,
                actual: confidence.len(),
            });
        }
        self.confidence = Some(confidence);
        Ok(self)
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.layout.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.layout.height
    }

    /// Buffer layout
    pub fn layout(&self) -> &DepthLayout {
        &self.layout
    }

    /// Whether a confidence plane is attached
    pub fn has_confidence(&self) -> bool {
        self.confidence.is_some()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.layout.width && y < self.layout.height,
            "depth pixel ({}, {}) outside {}x{} frame",
            x,
            y,
            self.layout.width,
            self.layout.height
        );
        y as usize * self.layout.row_stride + x as usize * self.layout.pixel_stride
    }

    /// Distance in meters at `(x, y)`, or `None` when the sensor has no data
    ///
    /// # Panics
    ///
    /// Panics if the pixel lies outside the frame.
    pub fn depth_m(&self, x: u32, y: u32) -> Option<f32> {
        let offset = self.offset(x, y);
        match self.layout.unit {
            SampleUnit::MillimetersU16 => {
                let raw: u16 = pod_read_unaligned(&self.data[offset..offset + 2]);
                (raw != DEPTH_INVALID_MM).then(|| raw as f32 / MM_PER_METER)
            }
            SampleUnit::MetersF32 => {
                let meters: f32 = pod_read_unaligned(&self.data[offset..offset + 4]);
                (meters.is_finite() && meters > 0.0).then_some(meters)
            }
        }
    }

    /// Confidence at `(x, y)`, if a confidence plane is attached
    pub fn confidence(&self, x: u32, y: u32) -> Option<u8> {
        let plane = self.confidence?;
        assert!(
            x < self.layout.width && y < self.layout.height,
            "confidence pixel ({}, {}) outside {}x{} frame",
            x,
            y,
            self.layout.width,
            self.layout.height
        );
        Some(plane[y as usize * self.layout.width as usize + x as usize])
    }
}

/// Depth frame that owns its bytes
///
/// Used by sources that synthesize or load frames instead of mapping sensor
/// memory.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedDepthFrame {
    layout: DepthLayout,
    bytes: Vec<u8>,
    confidence: Option<Vec<u8>>,
}

impl OwnedDepthFrame {
    /// Wrap raw bytes after validating them against `layout`
    pub fn new(layout: DepthLayout, bytes: Vec<u8>) -> Result<Self, FrameError> {
        layout.validate(bytes.len())?;
        Ok(Self {
            layout,
            bytes,
            confidence: None,
        })
    }

    /// Packed frame from millimeter samples (row-major, 0 = no data)
    pub fn from_millimeters(width: u32, height: u32, samples: &[u16]) -> Result<Self, FrameError> {
        let layout = DepthLayout::packed(width, height, SampleUnit::MillimetersU16);
        Self::new(layout, bytemuck::cast_slice(samples).to_vec())
    }

    /// Packed frame from meter samples (row-major)
    pub fn from_meters(width: u32, height: u32, samples: &[f32]) -> Result<Self, FrameError> {
        let layout = DepthLayout::packed(width, height, SampleUnit::MetersF32);
        Self::new(layout, bytemuck::cast_slice(samples).to_vec())
    }

    /// Attach a packed confidence plane
    pub fn with_confidence(mut self, confidence: Vec<u8>) -> Result<Self, FrameError> {
        let expected = self.layout.pixel_count();
        if confidence.len() != expected {
            return Err(FrameError::ConfidenceSizeMismatch {
                expected,
                actual: confidence.len(),
            });
        }
        self.confidence = Some(confidence);
        Ok(self)
    }

    /// Buffer layout
    pub fn layout(&self) -> &DepthLayout {
        &self.layout
    }

    /// Borrow a read-only view
    pub fn view(&self) -> DepthFrameView<'_> {
        // Layout and confidence size were validated on construction
        DepthFrameView {
            layout: self.layout,
            data: &self.bytes,
            confidence: self.confidence.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millimeter_decoding() {
        let frame = OwnedDepthFrame::from_millimeters(2, 1, &[1500, 0]).unwrap();
        let view = frame.view();
        assert_eq!(view.depth_m(0, 0), Some(1.5));
        // Zero means the sensor had no return
        assert_eq!(view.depth_m(1, 0), None);
    }

    #[test]
    fn test_meter_decoding_rejects_non_finite() {
        let frame = OwnedDepthFrame::from_meters(3, 1, &[2.25, f32::NAN, -1.0]).unwrap();
        let view = frame.view();
        assert_eq!(view.depth_m(0, 0), Some(2.25));
        assert_eq!(view.depth_m(1, 0), None);
        assert_eq!(view.depth_m(2, 0), None);
    }

    #[test]
    fn test_strided_layout() {
        // 2x2 u16 frame, each pixel padded to 4 bytes, each row padded to 12 bytes
        let layout = DepthLayout {
            width: 2,
            height: 2,
            row_stride: 12,
            pixel_stride: 4,
            unit: SampleUnit::MillimetersU16,
        };
        let mut bytes = vec![0u8; 12 + 6];
        bytes[0..2].copy_from_slice(bytemuck::bytes_of(&1000u16));
        bytes[4..6].copy_from_slice(bytemuck::bytes_of(&2000u16));
        bytes[12..14].copy_from_slice(bytemuck::bytes_of(&3000u16));
        bytes[16..18].copy_from_slice(bytemuck::bytes_of(&4000u16));

        let view = DepthFrameView::new(layout, &bytes).unwrap();
        assert_eq!(view.depth_m(0, 0), Some(1.0));
        assert_eq!(view.depth_m(1, 0), Some(2.0));
        assert_eq!(view.depth_m(0, 1), Some(3.0));
        assert_eq!(view.depth_m(1, 1), Some(4.0));
    }

    #[test]
    fn test_layout_validation() {
        let layout = DepthLayout::packed(4, 4, SampleUnit::MetersF32);
        assert_eq!(layout.required_len(), 64);
        assert_eq!(
            DepthFrameView::new(layout, &[0u8; 60]).unwrap_err(),
            FrameError::BufferTooSmall {
                needed: 64,
                actual: 60
            }
        );

        let zero = DepthLayout::packed(0, 4, SampleUnit::MetersF32);
        assert!(matches!(
            zero.validate(0),
            Err(FrameError::InvalidDimensions { .. })
        ));

        let narrow = DepthLayout {
            pixel_stride: 1,
            ..DepthLayout::packed(4, 4, SampleUnit::MillimetersU16)
        };
        assert!(matches!(
            narrow.validate(1024),
            Err(FrameError::PixelStrideTooSmall { .. })
        ));
    }

    #[test]
    fn test_confidence_plane() {
        let frame = OwnedDepthFrame::from_millimeters(2, 1, &[1000, 1000])
            .unwrap()
            .with_confidence(vec![10, 200])
            .unwrap();
        let view = frame.view();
        assert!(view.has_confidence());
        assert_eq!(view.confidence(1, 0), Some(200));

        let err = OwnedDepthFrame::from_millimeters(2, 1, &[1000, 1000])
            .unwrap()
            .with_confidence(vec![1, 2, 3])
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::ConfidenceSizeMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    #[should_panic(expected = "outside 2x1 frame")]
    fn test_out_of_bounds_read_panics() {
        let frame = OwnedDepthFrame::from_millimeters(2, 1, &[1000, 1000]).unwrap();
        frame.view().depth_m(2, 0);
    }
}
