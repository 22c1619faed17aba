//! Process parameters
//!
//! Uses RON (Rusty Object Notation) for human-readable config files. Every
//! field has a default, so a config file only needs the values it changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::rasterizer::{Color, Mat4, Shading, Vec3, HEIGHT, WIDTH};

/// Camera placement for the view matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, -5.0),
            center: Vec3::ZERO,
            up: Vec3::UP,
        }
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 85.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Fixed part of the model transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub translation: Vec3,
    pub scale: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            translation: Vec3::new(0.2, -0.09, 0.0),
            scale: 0.15,
        }
    }
}

/// Starting angles and per-frame increments of the model rotation, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub start_yaw: f32,
    pub start_pitch: f32,
    pub yaw_step: f32,
    pub pitch_step: f32,
}

/// A third of 3.14, in degrees
const DEFAULT_START_YAW: f32 = 1.046_666_7;

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            start_yaw: DEFAULT_START_YAW,
            start_pitch: 0.81,
            yaw_step: 1.0,
            pitch_step: 0.1,
        }
    }
}

/// Everything the frame controller needs to build a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub camera: CameraConfig,
    pub projection: ProjectionConfig,
    pub model: ModelConfig,
    pub animation: AnimationConfig,
    /// Direction towards the light (normalized on use)
    pub light_dir: Vec3,
    pub intensity_scale: f32,
    pub clear_color: Color,
    /// Color given to every vertex built from a raw position
    pub vertex_color: Color,
    pub frame_rate: u32,
    /// Where to write the depth image after each frame (None = don't)
    pub depth_export: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            camera: CameraConfig::default(),
            projection: ProjectionConfig::default(),
            model: ModelConfig::default(),
            animation: AnimationConfig::default(),
            light_dir: Vec3::new(0.5, 2.0, 2.0),
            intensity_scale: 10.0,
            clear_color: Color::BLACK,
            vertex_color: Color::WHITE,
            frame_rate: 60,
            depth_export: Some(PathBuf::from("draw.bmp")),
        }
    }
}

impl RenderConfig {
    /// Load a config from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        ron::from_str(&contents).map_err(|source| RasterError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save a config to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());

        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn shading(&self) -> Shading {
        Shading::new(self.light_dir, self.intensity_scale)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.camera.eye, self.camera.center, self.camera.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let p = &self.projection;
        Mat4::perspective(p.fov_degrees.to_radians(), self.aspect_ratio(), p.near, p.far)
    }

    pub fn viewport_matrix(&self) -> Mat4 {
        Mat4::viewport(self.width as f32, self.height as f32)
    }

    /// Fixed delay between frames
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}
