//! Movement trace loading.
//!
//! The trace is a JSON array of camera samples. Every field is optional
//! with fixed defaults; `frame_id` is assigned by enumeration order and
//! never read from the file. A non-array root is fatal.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tigas_core::MovementSample;

use crate::{Error, Result};

/// Yields the ordered, validated sequence of movement samples.
///
/// The pipeline consumes this capability so it never touches JSON itself.
pub trait TraceProvider {
    fn samples(&self) -> &[MovementSample];
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSample {
    #[serde(rename = "tMs")]
    t_ms: i64,
    #[serde(rename = "durationMs")]
    duration_ms: i32,
    x: f32,
    y: f32,
    z: f32,
    angle: f32,
    elevation: f32,
    width: i32,
    height: i32,
}

impl Default for RawSample {
    fn default() -> Self {
        let defaults = MovementSample::default();
        Self {
            t_ms: defaults.t_ms,
            duration_ms: defaults.duration_ms,
            x: defaults.x,
            y: defaults.y,
            z: defaults.z,
            angle: defaults.angle,
            elevation: defaults.elevation,
            width: defaults.width,
            height: defaults.height,
        }
    }
}

/// A movement trace loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonTrace {
    samples: Vec<MovementSample>,
}

impl JsonTrace {
    /// Load at most `max_frames` samples (`<= 0` means unlimited).
    pub fn from_path<P: AsRef<Path>>(path: P, max_frames: i32) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::IoFailure(format!(
                "unable to open movement trace '{}': {err}",
                path.display()
            ))
        })?;
        Self::from_json(&text, max_frames)
    }

    pub fn from_json(text: &str, max_frames: i32) -> Result<Self> {
        let root: serde_json::Value = serde_json::from_str(text)
            .map_err(|err| Error::TraceMalformed(err.to_string()))?;
        let items = root
            .as_array()
            .ok_or_else(|| Error::TraceMalformed("root must be a JSON array".to_string()))?;

        let mut samples = Vec::with_capacity(items.len());
        for (frame_id, item) in items.iter().enumerate() {
            if max_frames > 0 && frame_id >= max_frames as usize {
                break;
            }
            let raw: RawSample = serde_json::from_value(item.clone())
                .map_err(|err| Error::TraceMalformed(format!("sample {frame_id}: {err}")))?;
            samples.push(MovementSample {
                frame_id: frame_id as i32,
                t_ms: raw.t_ms,
                duration_ms: raw.duration_ms,
                x: raw.x,
                y: raw.y,
                z: raw.z,
                angle: raw.angle,
                elevation: raw.elevation,
                width: raw.width,
                height: raw.height,
            });
        }

        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl TraceProvider for JsonTrace {
    fn samples(&self) -> &[MovementSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_per_sample() {
        let trace = JsonTrace::from_json("[{}, {\"tMs\": 16, \"width\": 1920}]", 0).unwrap();
        assert_eq!(trace.len(), 2);
        let first = &trace.samples()[0];
        assert_eq!(first.frame_id, 0);
        assert_eq!(first.t_ms, 0);
        assert_eq!(first.duration_ms, 16);
        assert_eq!((first.width, first.height), (800, 600));
        let second = &trace.samples()[1];
        assert_eq!(second.frame_id, 1);
        assert_eq!(second.t_ms, 16);
        assert_eq!(second.width, 1920);
    }

    #[test]
    fn non_array_root_is_fatal() {
        let err = JsonTrace::from_json("{\"tMs\": 0}", 0).unwrap_err();
        assert!(matches!(err, Error::TraceMalformed(_)));
    }

    #[test]
    fn max_frames_bounds_the_trace() {
        let trace = JsonTrace::from_json("[{}, {}, {}, {}]", 2).unwrap();
        assert_eq!(trace.len(), 2);
        let trace = JsonTrace::from_json("[{}, {}, {}, {}]", 0).unwrap();
        assert_eq!(trace.len(), 4);
        let trace = JsonTrace::from_json("[{}, {}, {}, {}]", -3).unwrap();
        assert_eq!(trace.len(), 4);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let trace = JsonTrace::from_json("[{\"pose\": \"spline\", \"angle\": 90.0}]", 0).unwrap();
        assert_eq!(trace.samples()[0].angle, 90.0);
    }

    #[test]
    fn missing_file_is_io_failure() {
        let err = JsonTrace::from_path("/nonexistent/trace.json", 0).unwrap_err();
        assert!(matches!(err, Error::IoFailure(_)));
    }
}
