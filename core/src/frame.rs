/// An 8-bit packed RGB frame, row-major, no padding.
///
/// `data.len() == 3 * width * height` always holds for frames produced
/// by [`RgbFrame::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Allocate a zeroed frame.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 3],
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> [u8; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, rgb: [u8; 3]) {
        let idx = ((y * self.width + x) * 3) as usize;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }
}

/// The record correlating an encoded frame back to its source sample.
///
/// Always equals the sample's `frame_id` and `t_ms`; carried in-band as
/// an SEI message for H.264/HEVC outputs and in the CSV sidecar for all
/// outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub frame_id: i32,
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_zeroed_and_sized() {
        let frame = RgbFrame::new(64, 48);
        assert_eq!(frame.data.len(), 64 * 48 * 3);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn pixel_roundtrip() {
        let mut frame = RgbFrame::new(8, 8);
        frame.put_pixel(3, 5, [10, 20, 30]);
        assert_eq!(frame.pixel(3, 5), [10, 20, 30]);
        assert_eq!(frame.pixel(3, 4), [0, 0, 0]);
    }
}
