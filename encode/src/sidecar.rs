//! Frame metadata CSV sidecar.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tigas_core::FrameMetadata;

use crate::{Error, Result};

/// Appends one `frame_id,timestamp_ms` line per encoded frame.
pub struct MetadataSidecar {
    writer: BufWriter<File>,
}

impl MetadataSidecar {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| {
            Error::IoFailure(format!(
                "unable to open metadata output '{}': {err}",
                path.display()
            ))
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, metadata: &FrameMetadata) -> Result<()> {
        writeln!(
            self.writer,
            "{},{}",
            metadata.frame_id, metadata.timestamp_ms
        )
        .map_err(|err| Error::IoFailure(format!("metadata append failed: {err}")))
    }

    pub fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|err| Error::IoFailure(format!("metadata flush failed: {err}")))
    }
}

impl Drop for MetadataSidecar {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_metadata.csv");
        {
            let mut sidecar = MetadataSidecar::create(&path).unwrap();
            sidecar
                .append(&FrameMetadata {
                    frame_id: 0,
                    timestamp_ms: 0,
                })
                .unwrap();
            sidecar
                .append(&FrameMetadata {
                    frame_id: 1,
                    timestamp_ms: 16,
                })
                .unwrap();
            sidecar.finish().unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0,0\n1,16\n");
    }

    #[test]
    fn unopenable_path_is_io_failure() {
        let err = MetadataSidecar::create("/nonexistent/dir/frame_metadata.csv").unwrap_err();
        assert!(matches!(err, Error::IoFailure(_)));
    }
}
