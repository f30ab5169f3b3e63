//! Shared data model for the tigas renderer/encoder pipeline.
//!
//! The pipeline moves three kinds of values between its subsystems:
//!
//! - [`SplatPoint`]: one Gaussian splat decoded from a PLY vertex
//! - [`MovementSample`]: one camera pose from the movement trace
//! - [`RgbFrame`] / [`FrameMetadata`]: one rendered frame and the record
//!   that correlates it back to its source sample

pub mod frame;
pub mod sample;
pub mod splat;

pub use frame::{FrameMetadata, RgbFrame};
pub use sample::MovementSample;
pub use splat::SplatPoint;
