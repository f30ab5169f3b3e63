use nalgebra::Point3;

/// A single Gaussian splat: position, DC color, opacity and footprint radius.
///
/// `opacity` is the logistic of the raw PLY opacity clamped to
/// `[0.02, 1.0]`; `radius` is `exp(mean(scale_0..2))` clamped to
/// `[0.25, 8.0]`. The loader enforces both ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct SplatPoint {
    pub position: Point3<f32>,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub opacity: f32,
    pub radius: f32,
}

impl SplatPoint {
    pub fn new(position: Point3<f32>, r: u8, g: u8, b: u8, opacity: f32, radius: f32) -> Self {
        Self {
            position,
            r,
            g,
            b,
            opacity,
            radius,
        }
    }

    pub fn color(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}
