//! CPU splat rendering for the camera fly-through.
//!
//! [`GaussianRenderer`] projects the loaded splat cloud for each movement
//! sample and composites screen-space Gaussians into a packed RGB frame.
//! An optional accelerated backend ([`gpu::GpuBackend`]) can take over the
//! whole render; it is demoted permanently on its first failure.

pub mod gpu;
pub mod renderer;

pub use gpu::{GpuBackend, NoopGpuBackend};
pub use renderer::GaussianRenderer;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Point cloud load failed: no points parsed from '{0}'")]
    LoadFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
