//! Synthetic Gaussian-splat fly-through renderer and encoder.
//!
//! A movement trace drives one render per sample; the frame fans out to a
//! lossless archival encoder, a lossy test-stream encoder (MP4 or live
//! DASH) and optional CRF-ladder encoders, while a CSV sidecar and
//! in-band SEI records keep every encoded frame correlated to its source
//! sample.

pub use tigas_core as core;
pub use tigas_encode as encode;
pub use tigas_io as io;
pub use tigas_render as render;

pub mod pipeline;

pub use pipeline::{Error, Pipeline, Result};
