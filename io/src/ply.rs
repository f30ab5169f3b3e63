//! PLY reader for Gaussian splat clouds.
//!
//! Supports `format ascii 1.0` and `format binary_little_endian 1.0` with
//! an arbitrary vertex property layout. Properties are decoded in
//! declaration order as `f64` and assigned by name: direct `red/green/blue`
//! (or `r/g/b`) colors win over spherical-harmonic DC terms (`f_dc_*`),
//! which win over plain white. `opacity` goes through a logistic, the
//! three log-scales through `exp(mean)`.
//!
//! The loader never fails loudly: a missing file, unsupported format,
//! list property in the vertex element, or truncated body all yield an
//! empty vector. Callers decide whether that is fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::Point3;
use tigas_core::SplatPoint;

/// Zeroth-order spherical harmonic basis factor.
const SH_C0: f64 = 0.282_094_791_773_878_14;

const OPACITY_MIN: f32 = 0.02;
const OPACITY_MAX: f32 = 1.0;
const RADIUS_MIN: f32 = 0.25;
const RADIUS_MAX: f32 = 8.0;
const DEFAULT_LOG_SCALE: f64 = -1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "char" | "int8" => Some(Self::I8),
            "uchar" | "uint8" => Some(Self::U8),
            "short" | "int16" => Some(Self::I16),
            "ushort" | "uint16" => Some(Self::U16),
            "int" | "int32" => Some(Self::I32),
            "uint" | "uint32" => Some(Self::U32),
            "float" | "float32" => Some(Self::F32),
            "double" | "float64" => Some(Self::F64),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn read_le(self, bytes: &[u8]) -> f64 {
        match self {
            Self::I8 => bytes[0] as i8 as f64,
            Self::U8 => bytes[0] as f64,
            Self::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::F64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }
}

#[derive(Debug)]
struct Header {
    format: Format,
    vertex_count: usize,
    properties: Vec<(String, ScalarType)>,
}

/// Indices of the recognized vertex properties in declaration order.
#[derive(Debug, Default)]
struct FieldMap {
    x: Option<usize>,
    y: Option<usize>,
    z: Option<usize>,
    red: Option<usize>,
    green: Option<usize>,
    blue: Option<usize>,
    dc: [Option<usize>; 3],
    opacity: Option<usize>,
    scales: [Option<usize>; 3],
}

impl FieldMap {
    fn build(properties: &[(String, ScalarType)]) -> Self {
        let mut map = Self::default();
        for (idx, (name, _)) in properties.iter().enumerate() {
            match name.as_str() {
                "x" => map.x = Some(idx),
                "y" => map.y = Some(idx),
                "z" => map.z = Some(idx),
                "red" | "r" => map.red = Some(idx),
                "green" | "g" => map.green = Some(idx),
                "blue" | "b" => map.blue = Some(idx),
                "f_dc_0" => map.dc[0] = Some(idx),
                "f_dc_1" => map.dc[1] = Some(idx),
                "f_dc_2" => map.dc[2] = Some(idx),
                "opacity" => map.opacity = Some(idx),
                "scale_0" => map.scales[0] = Some(idx),
                "scale_1" => map.scales[1] = Some(idx),
                "scale_2" => map.scales[2] = Some(idx),
                _ => {}
            }
        }
        map
    }

    fn synthesize(&self, values: &[f64]) -> SplatPoint {
        let get = |idx: Option<usize>| idx.and_then(|i| values.get(i).copied());

        let x = get(self.x).unwrap_or(0.0) as f32;
        let y = get(self.y).unwrap_or(0.0) as f32;
        let z = get(self.z).unwrap_or(0.0) as f32;

        let (r, g, b) = match (get(self.red), get(self.green), get(self.blue)) {
            (Some(r), Some(g), Some(b)) => (
                r.clamp(0.0, 255.0) as u8,
                g.clamp(0.0, 255.0) as u8,
                b.clamp(0.0, 255.0) as u8,
            ),
            _ => match (get(self.dc[0]), get(self.dc[1]), get(self.dc[2])) {
                (Some(d0), Some(d1), Some(d2)) => {
                    (dc_channel(d0), dc_channel(d1), dc_channel(d2))
                }
                _ => (255, 255, 255),
            },
        };

        let opacity = match get(self.opacity) {
            Some(raw) => (sigmoid(raw) as f32).clamp(OPACITY_MIN, OPACITY_MAX),
            None => OPACITY_MAX,
        };

        let present: Vec<f64> = self.scales.iter().filter_map(|&idx| get(idx)).collect();
        let log_scale = if present.is_empty() {
            DEFAULT_LOG_SCALE
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };
        let radius = (log_scale.exp() as f32).clamp(RADIUS_MIN, RADIUS_MAX);

        SplatPoint::new(Point3::new(x, y, z), r, g, b, opacity, radius)
    }
}

fn dc_channel(dc: f64) -> u8 {
    ((0.5 + SH_C0 * dc).clamp(0.0, 1.0) * 255.0) as u8
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Load splat points from a PLY file. Any failure yields an empty vector.
pub fn load_splat_points<P: AsRef<Path>>(path: P) -> Vec<SplatPoint> {
    let file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(_) => return Vec::new(),
    };
    read_splat_points(BufReader::new(file)).unwrap_or_default()
}

/// Reader-based entry point, used directly by tests.
fn read_splat_points<R: BufRead>(mut reader: R) -> Option<Vec<SplatPoint>> {
    let header = parse_header(&mut reader)?;
    let fields = FieldMap::build(&header.properties);

    let mut points = Vec::with_capacity(header.vertex_count);
    let mut values = vec![0.0f64; header.properties.len()];

    match header.format {
        Format::Ascii => {
            let mut line = String::new();
            for _ in 0..header.vertex_count {
                line.clear();
                if reader.read_line(&mut line).ok()? == 0 {
                    return None;
                }
                let mut tokens = line.split_whitespace();
                for slot in values.iter_mut() {
                    *slot = tokens.next()?.parse().ok()?;
                }
                points.push(fields.synthesize(&values));
            }
        }
        Format::BinaryLittleEndian => {
            let record_size: usize = header.properties.iter().map(|(_, ty)| ty.width()).sum();
            let mut record = vec![0u8; record_size];
            for _ in 0..header.vertex_count {
                reader.read_exact(&mut record).ok()?;
                let mut offset = 0;
                for (slot, (_, ty)) in values.iter_mut().zip(&header.properties) {
                    *slot = ty.read_le(&record[offset..offset + ty.width()]);
                    offset += ty.width();
                }
                points.push(fields.synthesize(&values));
            }
        }
    }

    Some(points)
}

fn parse_header<R: BufRead>(reader: &mut R) -> Option<Header> {
    let mut format = None;
    let mut vertex_count = 0usize;
    let mut properties = Vec::new();
    let mut in_vertex_element = false;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).ok()? == 0 {
            // EOF before end_header
            return None;
        }
        let line = line.trim();
        if line == "end_header" {
            break;
        }

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("format") => {
                format = match tokens.next() {
                    Some("ascii") => Some(Format::Ascii),
                    Some("binary_little_endian") => Some(Format::BinaryLittleEndian),
                    _ => return None,
                };
            }
            Some("element") => {
                let name = tokens.next()?;
                in_vertex_element = name == "vertex";
                if in_vertex_element {
                    vertex_count = tokens.next()?.parse().ok()?;
                }
            }
            Some("property") if in_vertex_element => {
                let ty = tokens.next()?;
                if ty == "list" {
                    return None;
                }
                let ty = ScalarType::parse(ty)?;
                let name = tokens.next()?;
                properties.push((name.to_string(), ty));
            }
            _ => {}
        }
    }

    Some(Header {
        format: format?,
        vertex_count,
        properties,
    })
}
