//! DASH muxer option assembly.

use ffmpeg_next::Dictionary;

use crate::config::EncodeConfig;

/// Muxer options for the live DASH output.
///
/// One segment per frame (`seg_duration = 1/fps`) keeps the live window
/// semantics aligned with the pacing loop. Archive mode keeps every
/// segment by forcing `window_size=0`.
pub fn muxer_options(config: &EncodeConfig) -> Dictionary<'static> {
    let mut options = Dictionary::new();
    options.set("streaming", "1");
    options.set("use_timeline", "1");
    options.set("use_template", "1");
    options.set("remove_at_exit", "0");
    let window_size = if config.dash_archive {
        0
    } else {
        config.dash_window_size
    };
    options.set("window_size", &window_size.to_string());
    options.set("seg_duration", &format!("{:.6}", 1.0 / config.fps as f64));
    options.set("init_seg_name", &config.dash_init_seg_name);
    options.set("media_seg_name", &config.dash_media_seg_name);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dash_config() -> EncodeConfig {
        EncodeConfig {
            live_dash: true,
            dash_window_size: 3,
            fps: 30,
            ..EncodeConfig::lossy("libx264", 30, 26)
        }
    }

    #[test]
    fn live_options_carry_window_and_segment_names() {
        let options = muxer_options(&dash_config());
        assert_eq!(options.get("streaming"), Some("1"));
        assert_eq!(options.get("use_timeline"), Some("1"));
        assert_eq!(options.get("use_template"), Some("1"));
        assert_eq!(options.get("remove_at_exit"), Some("0"));
        assert_eq!(options.get("window_size"), Some("3"));
        assert_eq!(options.get("seg_duration"), Some("0.033333"));
        assert_eq!(options.get("init_seg_name"), Some("init_$RepresentationID$.mp4"));
        assert_eq!(
            options.get("media_seg_name"),
            Some("chunk_$RepresentationID$_$Number$.m4s")
        );
    }

    #[test]
    fn archive_mode_forces_unbounded_window() {
        let mut config = dash_config();
        config.dash_archive = true;
        let options = muxer_options(&config);
        assert_eq!(options.get("window_size"), Some("0"));
    }
}
