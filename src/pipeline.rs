//! The per-sample encode loop.

use std::time::{Duration, Instant};

use tigas_core::FrameMetadata;
use tigas_encode::{MetadataSidecar, VideoEncoder};
use tigas_io::TraceProvider;
use tigas_render::GaussianRenderer;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Trace(#[from] tigas_io::Error),

    #[error(transparent)]
    Render(#[from] tigas_render::Error),

    #[error(transparent)]
    Encode(#[from] tigas_encode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Single-writer, multi-encoder loop: renders each movement sample once
/// and feeds the same frame to every encoder in list order.
///
/// In realtime mode (implied by live DASH) each iteration waits until the
/// sample's trace timestamp relative to the loop start; the sleep never
/// goes backward. Any encoder error aborts the run; partial outputs stay
/// on disk.
pub struct Pipeline {
    encoders: Vec<VideoEncoder>,
    sidecar: MetadataSidecar,
    realtime: bool,
}

impl Pipeline {
    pub fn new(encoders: Vec<VideoEncoder>, sidecar: MetadataSidecar, realtime: bool) -> Self {
        Self {
            encoders,
            sidecar,
            realtime,
        }
    }

    pub fn run(
        &mut self,
        renderer: &mut GaussianRenderer,
        trace: &dyn TraceProvider,
    ) -> Result<()> {
        let start = Instant::now();

        for sample in trace.samples() {
            let frame = renderer.render(sample);
            let metadata = FrameMetadata {
                frame_id: sample.frame_id,
                timestamp_ms: sample.t_ms,
            };

            for encoder in &mut self.encoders {
                encoder.encode(&frame, &metadata)?;
            }
            self.sidecar.append(&metadata)?;
            log::debug!(
                "frame {} at {}ms encoded to {} outputs",
                metadata.frame_id,
                metadata.timestamp_ms,
                self.encoders.len()
            );

            if self.realtime {
                sleep_until_offset(start, sample.t_ms);
            }
        }

        for encoder in &mut self.encoders {
            encoder.flush()?;
        }
        self.sidecar.finish()?;
        Ok(())
    }
}

fn sleep_until_offset(start: Instant, t_ms: i64) {
    if t_ms <= 0 {
        return;
    }
    let target = start + Duration::from_millis(t_ms as u64);
    if let Some(remaining) = target.checked_duration_since(Instant::now()) {
        std::thread::sleep(remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeping_toward_the_past_returns_immediately() {
        let start = Instant::now() - Duration::from_secs(5);
        let before = Instant::now();
        sleep_until_offset(start, 100);
        sleep_until_offset(start, -100);
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn sleeping_toward_the_future_waits() {
        let start = Instant::now();
        sleep_until_offset(start, 30);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
