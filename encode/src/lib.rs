//! Encoding half of the pipeline.
//!
//! One [`VideoEncoder`] owns one codec instance and one muxer. The same
//! rendered frame fans out to several encoders per iteration: the FFV1
//! archival stream, the lossy test stream (MP4 or live DASH) and any CRF
//! ladder entries. Each H.264/HEVC frame carries an in-band SEI record
//! built by [`sei`]; [`MetadataSidecar`] mirrors the record into a CSV.

pub mod config;
pub mod dash;
pub mod encoder;
pub mod sei;
pub mod sidecar;

pub use config::EncodeConfig;
pub use encoder::VideoEncoder;
pub use sidecar::MetadataSidecar;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO failure: {0}")]
    IoFailure(String),

    #[error("Encoder setup failed: {0}")]
    EncoderSetupFailed(String),

    #[error("Encode packet failed: {0}")]
    EncodePacketFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
