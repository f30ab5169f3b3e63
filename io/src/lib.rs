//! File inputs for the renderer/encoder pipeline.
//!
//! Two loaders live here: the PLY Gaussian-splat reader ([`ply`]) and the
//! JSON movement-trace provider ([`trace`]). Both parse once at startup;
//! everything downstream treats their output as read-only.

pub mod ply;
pub mod trace;

pub use ply::load_splat_points;
pub use trace::{JsonTrace, TraceProvider};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO failure: {0}")]
    IoFailure(String),

    #[error("Movement trace malformed: {0}")]
    TraceMalformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
