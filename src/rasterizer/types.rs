//! Core types for the pipeline

use std::ops::{Add, Mul};
use serde::{Deserialize, Serialize};
use super::math::{Mat4, Vec3};

/// RGBA color (0-255 per channel)
///
/// Every constructor and operator clamps instead of wrapping or rejecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build from integer channels, clamping each to [0, 255]
    pub fn from_int(r: i32, g: i32, b: i32, a: i32) -> Self {
        let ch = |v: i32| v.clamp(0, 255) as u8;
        Self { r: ch(r), g: ch(g), b: ch(b), a: ch(a) }
    }

    /// Build from normalized channels; 1.0 maps to 255 and anything outside
    /// [0, 1] clamps. NaN maps to 0.
    pub fn from_float(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: unit_to_channel(r),
            g: unit_to_channel(g),
            b: unit_to_channel(b),
            a: unit_to_channel(a),
        }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

fn unit_to_channel(v: f32) -> u8 {
    // `as` saturates and sends NaN to 0
    (v * 255.0).clamp(0.0, 255.0) as u8
}

fn scale_channel(c: u8, factor: f32) -> u8 {
    (c as f32 * factor).clamp(0.0, 255.0) as u8
}

impl Add for Color {
    type Output = Color;
    fn add(self, o: Color) -> Color {
        Color {
            r: self.r.saturating_add(o.r),
            g: self.g.saturating_add(o.g),
            b: self.b.saturating_add(o.b),
            a: self.a.saturating_add(o.a),
        }
    }
}

impl Mul<f32> for Color {
    type Output = Color;
    fn mul(self, factor: f32) -> Color {
        Color {
            r: scale_channel(self.r, factor),
            g: scale_channel(self.g, factor),
            b: scale_channel(self.b, factor),
            a: scale_channel(self.a, factor),
        }
    }
}

impl Mul<Color> for f32 {
    type Output = Color;
    fn mul(self, color: Color) -> Color {
        color * self
    }
}

/// A vertex: position plus a color carried through the transform stage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Color,
}

impl Vertex {
    pub fn new(position: Vec3, color: Color) -> Self {
        Self { position, color }
    }

    pub fn from_pos(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            color: Color::WHITE,
        }
    }
}

/// A candidate pixel write: screen x, y and interpolated depth in `position.z`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub position: Vec3,
    pub color: Color,
}

impl Fragment {
    pub fn new(x: f32, y: f32, depth: f32, color: Color) -> Self {
        Self {
            position: Vec3::new(x, y, depth),
            color,
        }
    }

    pub fn depth(&self) -> f32 {
        self.position.z
    }
}

/// Three screen-space vertices, in submission order
pub type Triangle = [Vertex; 3];

/// Per-frame transform bundle. Built once per frame, read-only afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Uniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
}

impl Uniforms {
    /// `viewport * projection * view * model`
    pub fn combined(&self) -> Mat4 {
        self.viewport * self.projection * self.view * self.model
    }
}

/// Flat lighting parameters shared by every triangle of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shading {
    /// Normalized direction towards the light
    pub light_dir: Vec3,
    /// Multiplier applied to `dot(normal, light_dir)` before color conversion
    pub intensity_scale: f32,
}

impl Shading {
    pub fn new(light_dir: Vec3, intensity_scale: f32) -> Self {
        Self {
            light_dir: light_dir.normalize(),
            intensity_scale,
        }
    }

    /// Unclamped lighting intensity for a face normal
    pub fn intensity(&self, normal: Vec3) -> f32 {
        normal.dot(self.light_dir) * self.intensity_scale
    }
}

impl Default for Shading {
    fn default() -> Self {
        Self::new(Vec3::new(0.5, 2.0, 2.0), 10.0)
    }
}
