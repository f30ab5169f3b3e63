//! Projection and screen-space splatting.

use std::f32::consts::PI;
use std::path::Path;

use nalgebra::Point3;
use tigas_core::{MovementSample, RgbFrame, SplatPoint};
use tigas_io::load_splat_points;

use crate::gpu::{GpuBackend, NoopGpuBackend};
use crate::{Error, Result};

const MIN_WIDTH: i32 = 64;
const MAX_WIDTH: i32 = 1280;
const MIN_HEIGHT: i32 = 64;
const MAX_HEIGHT: i32 = 720;

/// Near-plane cutoff for the camera-space depth.
const NEAR_Z: f32 = 0.01;

pub struct GaussianRenderer {
    points: Vec<SplatPoint>,
    gpu: Box<dyn GpuBackend>,
    use_gpu: bool,
}

impl std::fmt::Debug for GaussianRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianRenderer")
            .field("points", &self.points.len())
            .field("use_gpu", &self.use_gpu)
            .finish()
    }
}

impl GaussianRenderer {
    /// Load the splat cloud and pick the render path.
    ///
    /// A present path that parses to zero points is fatal: an empty frame
    /// stream from a misread cloud is worse than failing fast.
    pub fn new(ply_path: Option<&Path>, prefer_gpu: bool) -> Result<Self> {
        Self::with_backend(ply_path, prefer_gpu, Box::new(NoopGpuBackend))
    }

    pub fn with_backend(
        ply_path: Option<&Path>,
        prefer_gpu: bool,
        gpu: Box<dyn GpuBackend>,
    ) -> Result<Self> {
        let ply_path = ply_path.filter(|p| !p.as_os_str().is_empty());
        let points = match ply_path {
            Some(path) => {
                let points = load_splat_points(path);
                if points.is_empty() {
                    return Err(Error::LoadFailed(path.display().to_string()));
                }
                points
            }
            None => Vec::new(),
        };

        let use_gpu = prefer_gpu && gpu.available();
        Ok(Self {
            points,
            gpu,
            use_gpu,
        })
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_using_gpu(&self) -> bool {
        self.use_gpu
    }

    /// Render one sample into a fresh frame.
    ///
    /// Frame dimensions are the sample's, clamped to 64..=1280 x 64..=720.
    pub fn render(&mut self, sample: &MovementSample) -> RgbFrame {
        let width = sample.width.clamp(MIN_WIDTH, MAX_WIDTH);
        let height = sample.height.clamp(MIN_HEIGHT, MAX_HEIGHT);
        let mut frame = RgbFrame::new(width, height);

        if self.use_gpu && !self.points.is_empty() {
            match self.gpu.try_render(&self.points, sample, &mut frame) {
                Ok(()) => return frame,
                Err(message) => {
                    // Permanent demotion; the backend is never retried.
                    self.use_gpu = false;
                    log::warn!("GPU render failed, falling back to CPU: {message}");
                }
            }
        }

        if self.points.is_empty() {
            self.fill_fallback_texture(sample, &mut frame);
        } else {
            self.splat_points(sample, &mut frame);
        }
        frame
    }

    fn splat_points(&self, sample: &MovementSample, frame: &mut RgbFrame) {
        let width = frame.width;
        let height = frame.height;
        let (sin_yaw, cos_yaw) = sample.angle.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = sample.elevation.to_radians().sin_cos();
        let cx = width as f32 * 0.5;
        let cy = height as f32 * 0.5;
        let eye = Point3::new(sample.x, sample.y, sample.z);

        // Compositing does not commute; iterate in loader order.
        for point in &self.points {
            let t = point.position - eye;

            let xz_x = cos_yaw * t.x - sin_yaw * t.z;
            let xz_z = sin_yaw * t.x + cos_yaw * t.z;
            let yz_y = cos_pitch * t.y - sin_pitch * xz_z;
            let yz_z = sin_pitch * t.y + cos_pitch * xz_z;

            if yz_z <= NEAR_Z {
                continue;
            }

            let px = (cx + (xz_x / yz_z) * width as f32 * 0.5) as i32;
            let py = (cy - (yz_y / yz_z) * height as f32 * 0.5) as i32;
            if px < 1 || py < 1 || px >= width - 1 || py >= height - 1 {
                continue;
            }

            let depth_weight = (2.0 / (1.0 + yz_z * yz_z)).clamp(0.15, 1.0);
            let screen_radius =
                ((point.radius * width as f32 / yz_z.max(0.05)) * 0.05).clamp(1.0, 9.0);
            let radius_px = screen_radius.ceil() as i32;
            let sigma_sq = (screen_radius * screen_radius * 0.5).max(0.5);
            let peak = point.opacity * depth_weight;
            let color = [point.r as f32, point.g as f32, point.b as f32];

            let y0 = (py - radius_px).max(0);
            let y1 = (py + radius_px).min(height - 1);
            let x0 = (px - radius_px).max(0);
            let x1 = (px + radius_px).min(width - 1);

            for y in y0..=y1 {
                let dy = (y - py) as f32;
                for x in x0..=x1 {
                    let dx = (x - px) as f32;
                    let falloff = (-(dx * dx + dy * dy) / (2.0 * sigma_sq)).exp();
                    let alpha = (falloff * peak).clamp(0.0, 1.0);

                    let idx = ((y * width + x) * 3) as usize;
                    for channel in 0..3 {
                        let base = frame.data[idx + channel] as f32;
                        let blended = base * (1.0 - alpha) + color[channel] * alpha;
                        frame.data[idx + channel] = blended.clamp(0.0, 255.0) as u8;
                    }
                }
            }
        }
    }

    /// Deterministic procedural texture used when no cloud is loaded.
    fn fill_fallback_texture(&self, sample: &MovementSample, frame: &mut RgbFrame) {
        let width = frame.width;
        let height = frame.height;
        let yaw = sample.angle.to_radians();
        let phase = 0.6 * sample.x + 0.4 * sample.z + yaw;
        let elev = sample.elevation.to_radians();

        for y in 0..height {
            let ny = y as f32 / height as f32;
            for x in 0..width {
                let nx = x as f32 / width as f32;

                let r = ((nx + phase) * PI).sin() * 0.5 + 0.5;
                let g = ((ny + elev) * PI).cos() * 0.5 + 0.5;
                let b = ((nx + ny + phase) * PI).sin() * 0.5 + 0.5;

                frame.put_pixel(
                    x,
                    y,
                    [
                        (r.clamp(0.0, 1.0) * 255.0) as u8,
                        (g.clamp(0.0, 1.0) * 255.0) as u8,
                        (b.clamp(0.0, 1.0) * 255.0) as u8,
                    ],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FlakyBackend;

    impl GpuBackend for FlakyBackend {
        fn available(&self) -> bool {
            true
        }

        fn try_render(
            &self,
            _points: &[SplatPoint],
            _sample: &MovementSample,
            _frame: &mut RgbFrame,
        ) -> std::result::Result<(), String> {
            Err("device lost".to_string())
        }
    }

    fn single_red_point_ply() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "ply\nformat ascii 1.0\nelement vertex 1\n\
             property float x\nproperty float y\nproperty float z\n\
             property uchar red\nproperty uchar green\nproperty uchar blue\n\
             end_header\n0 0 0 255 0 0\n"
        )
        .unwrap();
        file
    }

    fn sample(x: f32, y: f32, z: f32, width: i32, height: i32) -> MovementSample {
        MovementSample {
            x,
            y,
            z,
            width,
            height,
            ..MovementSample::default()
        }
    }

    #[test]
    fn dimensions_clamp_both_ways() {
        let mut renderer = GaussianRenderer::new(None, false).unwrap();
        let frame = renderer.render(&sample(0.0, 0.0, 0.0, -10, 0));
        assert_eq!((frame.width, frame.height), (64, 64));
        let frame = renderer.render(&sample(0.0, 0.0, 0.0, 5000, 5000));
        assert_eq!((frame.width, frame.height), (1280, 720));
        assert_eq!(frame.data.len(), 1280 * 720 * 3);
    }

    #[test]
    fn fallback_texture_is_deterministic() {
        let mut renderer = GaussianRenderer::new(None, false).unwrap();
        let s = MovementSample {
            x: 1.5,
            z: -0.5,
            angle: 30.0,
            elevation: 10.0,
            width: 160,
            height: 120,
            ..MovementSample::default()
        };
        let a = renderer.render(&s);
        let b = renderer.render(&s);
        assert_eq!(a.data, b.data);
        // and it is not a blank frame
        assert!(a.data.iter().any(|&v| v != 0));
    }

    #[test]
    fn single_point_splats_centered_red_blob() {
        let ply = single_red_point_ply();
        let mut renderer = GaussianRenderer::new(Some(ply.path()), false).unwrap();
        assert_eq!(renderer.num_points(), 1);

        let frame = renderer.render(&sample(0.0, 0.0, -2.0, 128, 128));
        let [r, g, b] = frame.pixel(64, 64);
        // depth 2 gives depth_weight 0.4; the peak is opacity * 0.4 of full red
        assert!(r > 90, "peak red {r} too low");
        assert_eq!((g, b), (0, 0));
        // falloff: the center outshines the blob edge
        assert!(r >= frame.pixel(66, 64)[0]);
        // far corners untouched
        assert_eq!(frame.pixel(5, 5), [0, 0, 0]);
    }

    #[test]
    fn points_behind_camera_touch_nothing() {
        let ply = single_red_point_ply();
        let mut renderer = GaussianRenderer::new(Some(ply.path()), false).unwrap();
        // camera in front of the point, looking further away
        let frame = renderer.render(&sample(0.0, 0.0, 2.0, 128, 128));
        assert!(frame.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn zero_point_cloud_is_load_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "ply\nformat ascii 1.0\nelement vertex 1\n\
             property float x\nproperty list uchar int idx\nend_header\n0\n"
        )
        .unwrap();
        let err = GaussianRenderer::new(Some(file.path()), false).unwrap_err();
        assert!(matches!(err, Error::LoadFailed(_)));
    }

    #[test]
    fn gpu_failure_demotes_permanently() {
        let ply = single_red_point_ply();
        let mut renderer =
            GaussianRenderer::with_backend(Some(ply.path()), true, Box::new(FlakyBackend))
                .unwrap();
        assert!(renderer.is_using_gpu());

        let frame = renderer.render(&sample(0.0, 0.0, -2.0, 128, 128));
        // CPU fallback still produced the splat
        assert!(frame.pixel(64, 64)[0] > 0);
        assert!(!renderer.is_using_gpu());
    }

    #[test]
    fn gpu_preference_requires_availability() {
        let renderer = GaussianRenderer::new(None, true).unwrap();
        assert!(!renderer.is_using_gpu());
    }
}
