/// Per-encoder configuration.
///
/// `lossless` overrides `codec_name` with FFV1. The DASH fields only
/// matter when `live_dash` is set; `dash_archive` keeps every segment on
/// disk by forcing an unbounded window.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeConfig {
    pub codec_name: String,
    pub fps: i32,
    pub crf: i32,
    pub lossless: bool,
    pub live_dash: bool,
    pub dash_window_size: i32,
    pub dash_archive: bool,
    pub dash_init_seg_name: String,
    pub dash_media_seg_name: String,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            codec_name: "h264_nvenc".to_string(),
            fps: 60,
            crf: 26,
            lossless: false,
            live_dash: false,
            dash_window_size: 5,
            dash_archive: false,
            dash_init_seg_name: "init_$RepresentationID$.mp4".to_string(),
            dash_media_seg_name: "chunk_$RepresentationID$_$Number$.m4s".to_string(),
        }
    }
}

impl EncodeConfig {
    pub fn lossless(fps: i32) -> Self {
        Self {
            codec_name: "ffv1".to_string(),
            fps,
            crf: 0,
            lossless: true,
            ..Self::default()
        }
    }

    pub fn lossy(codec_name: &str, fps: i32, crf: i32) -> Self {
        Self {
            codec_name: codec_name.to_string(),
            fps,
            crf,
            ..Self::default()
        }
    }

    /// NVENC encoders are told apart by name only; they take `cq` instead
    /// of `crf`, `preset=p2` and NV12 input.
    pub fn is_nvenc(&self) -> bool {
        !self.lossless && self.codec_name.contains("nvenc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossless_config_forces_ffv1() {
        let config = EncodeConfig::lossless(30);
        assert!(config.lossless);
        assert_eq!(config.fps, 30);
        assert!(!config.is_nvenc());
    }

    #[test]
    fn nvenc_detection_is_name_based() {
        assert!(EncodeConfig::lossy("h264_nvenc", 60, 26).is_nvenc());
        assert!(EncodeConfig::lossy("hevc_nvenc", 60, 26).is_nvenc());
        assert!(!EncodeConfig::lossy("libx264", 60, 26).is_nvenc());
    }
}
