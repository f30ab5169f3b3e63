use tigas_core::{MovementSample, RgbFrame, SplatPoint};

/// Optional accelerated splat renderer.
///
/// The capability must be implementable as a stub: `available()` may
/// return `false` and `try_render` may always fail. The CPU renderer
/// queries availability once at construction and never re-enables the
/// backend after a render failure.
pub trait GpuBackend {
    fn available(&self) -> bool;

    /// Render the full frame, or explain why the backend cannot.
    fn try_render(
        &self,
        points: &[SplatPoint],
        sample: &MovementSample,
        frame: &mut RgbFrame,
    ) -> std::result::Result<(), String>;
}

/// Stub backend for builds without GPU support.
#[derive(Debug, Default)]
pub struct NoopGpuBackend;

impl GpuBackend for NoopGpuBackend {
    fn available(&self) -> bool {
        false
    }

    fn try_render(
        &self,
        _points: &[SplatPoint],
        _sample: &MovementSample,
        _frame: &mut RgbFrame,
    ) -> std::result::Result<(), String> {
        Err("GPU backend unavailable in this build".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_backend_reports_unavailable() {
        let backend = NoopGpuBackend;
        assert!(!backend.available());
        let mut frame = RgbFrame::new(64, 64);
        let sample = MovementSample::default();
        assert!(backend.try_render(&[], &sample, &mut frame).is_err());
    }
}
