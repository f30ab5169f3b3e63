use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use tigas_encode::{EncodeConfig, MetadataSidecar, VideoEncoder};
use tigas_io::{JsonTrace, TraceProvider};
use tigas_render::GaussianRenderer;
use tigas_renderer_encoder::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "tigas_renderer_encoder",
    version,
    about = "Render a Gaussian-splat camera fly-through and encode lossless + lossy test streams"
)]
struct Cli {
    /// Movement trace JSON (array of camera samples).
    #[arg(long)]
    movement: PathBuf,

    /// Directory for the encoded streams and the metadata sidecar.
    #[arg(long = "output-dir")]
    output_dir: PathBuf,

    /// Optional Gaussian splat PLY file; without it a procedural test
    /// texture is rendered.
    #[arg(long)]
    ply: Option<PathBuf>,

    /// Maximum number of trace samples to encode (<= 0 encodes all).
    #[arg(long = "max-frames", default_value_t = 600)]
    max_frames: i32,

    #[arg(long, default_value_t = 60)]
    fps: i32,

    #[arg(long, default_value_t = 26)]
    crf: i32,

    /// Encoder name for the lossy stream.
    #[arg(long, default_value = "h264_nvenc")]
    codec: String,

    /// Skip the GPU fast path even if a backend is available.
    #[arg(long = "disable-gpu", default_value_t = false)]
    disable_gpu: bool,

    /// Comma-separated CRF ladder; entries equal to --crf are skipped.
    #[arg(long = "crf-ladder")]
    crf_ladder: Option<String>,

    /// Emit a live DASH stream instead of an MP4 (implies --realtime;
    /// suppresses the lossless and ladder outputs).
    #[arg(long = "live-dash", default_value_t = false)]
    live_dash: bool,

    /// Pace encoding against the trace timestamps.
    #[arg(long, default_value_t = false)]
    realtime: bool,

    #[arg(long = "dash-window-size", default_value_t = 5)]
    dash_window_size: i32,
}

fn parse_crf_ladder(input: Option<&str>) -> anyhow::Result<Vec<i32>> {
    let mut values = Vec::new();
    if let Some(input) = input {
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let value = token
                .parse()
                .with_context(|| format!("unparsable CRF ladder entry '{token}'"))?;
            values.push(value);
        }
    }
    Ok(values)
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return;
            }
            let rendered = err.to_string();
            let line = rendered.lines().next().unwrap_or("invalid arguments");
            eprintln!("[tigas_renderer_encoder] {line}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("[tigas_renderer_encoder] {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!(
            "unable to create output directory '{}'",
            cli.output_dir.display()
        )
    })?;
    let ladder = parse_crf_ladder(cli.crf_ladder.as_deref())?;

    let trace = JsonTrace::from_path(&cli.movement, cli.max_frames)?;
    anyhow::ensure!(!trace.is_empty(), "movement trace has no samples");

    let mut renderer = GaussianRenderer::new(cli.ply.as_deref(), !cli.disable_gpu)?;
    log::info!(
        "renderer backend: {} ({} points)",
        if renderer.is_using_gpu() { "gpu" } else { "cpu" },
        renderer.num_points()
    );

    // The first frame fixes the encoder dimensions for the whole run.
    let probe = renderer.render(&trace.samples()[0]);
    let realtime = cli.realtime || cli.live_dash;

    let mut encoders = Vec::new();
    if !cli.live_dash {
        let lossless_path = cli.output_dir.join("ground_truth_lossless.mkv");
        encoders.push(VideoEncoder::new(
            &lossless_path,
            &EncodeConfig::lossless(cli.fps),
            probe.width,
            probe.height,
        )?);
    }

    let lossy_path = if cli.live_dash {
        cli.output_dir.join("stream.mpd")
    } else {
        cli.output_dir.join("test_stream_lossy.mp4")
    };
    let lossy_config = EncodeConfig {
        live_dash: cli.live_dash,
        dash_window_size: cli.dash_window_size,
        ..EncodeConfig::lossy(&cli.codec, cli.fps, cli.crf)
    };
    encoders.push(VideoEncoder::new(
        &lossy_path,
        &lossy_config,
        probe.width,
        probe.height,
    )?);

    if !cli.live_dash {
        for (idx, &ladder_crf) in ladder.iter().enumerate() {
            if ladder_crf == cli.crf {
                continue;
            }
            let ladder_path = cli.output_dir.join(format!("test_stream_lossy_p{idx}.mp4"));
            encoders.push(VideoEncoder::new(
                &ladder_path,
                &EncodeConfig::lossy(&cli.codec, cli.fps, ladder_crf),
                probe.width,
                probe.height,
            )?);
        }
    }

    let sidecar = MetadataSidecar::create(cli.output_dir.join("frame_metadata.csv"))?;

    let frame_count = trace.len();
    let mut pipeline = Pipeline::new(encoders, sidecar, realtime);
    pipeline.run(&mut renderer, &trace)?;

    log::info!(
        "encoded {frame_count} frames into '{}'",
        cli.output_dir.display()
    );
    Ok(())
}
