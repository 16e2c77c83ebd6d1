// SPDX-License-Identifier: GPL-3.0-only

//! Depth buffers and the sources that produce them

mod frame;
mod range;
mod source;

pub use frame::{DepthFrameView, DepthLayout, OwnedDepthFrame, SampleUnit};
pub use range::{DepthRange, inverse_lerp, lerp};
pub use source::{AcquiredDepth, DepthSource, ReplayDepthSource};
