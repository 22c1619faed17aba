//! Frame controller
//!
//! Owns everything that lives across frames: the framebuffer, the vertex
//! buffer and the animation angles. Each frame is one synchronous pass:
//! clear, build uniforms, run the pipeline. Presentation and pacing belong
//! to the caller.

use log::{debug, info};

use crate::config::{AnimationConfig, ModelConfig, RenderConfig};
use crate::depth_export::write_depth_bmp;
use crate::error::{RasterError, Result};
use crate::rasterizer::{render, FrameStats, Framebuffer, Mat4, Shading, Uniforms, Vec3, Vertex};

/// Model rotation state, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub yaw: f32,
    pub pitch: f32,
    yaw_step: f32,
    pitch_step: f32,
}

impl Animation {
    pub fn new(cfg: &AnimationConfig) -> Self {
        Self {
            yaw: cfg.start_yaw,
            pitch: cfg.start_pitch,
            yaw_step: cfg.yaw_step,
            pitch_step: cfg.pitch_step,
        }
    }

    /// Angles for the next frame as `(yaw, pitch)`.
    ///
    /// Yaw is used and then stepped; pitch is stepped and then used.
    pub fn advance(&mut self) -> (f32, f32) {
        let yaw = self.yaw;
        self.yaw += self.yaw_step;
        self.pitch += self.pitch_step;
        (yaw, self.pitch)
    }
}

/// `translate * scale * rotate_x(pitch) * rotate_y(yaw)`, angles in degrees
pub fn model_matrix(model: &ModelConfig, yaw: f32, pitch: f32) -> Mat4 {
    Mat4::translate(model.translation)
        * Mat4::scale(Vec3::new(model.scale, model.scale, model.scale))
        * Mat4::rotate(pitch.to_radians(), Vec3::new(1.0, 0.0, 0.0))
        * Mat4::rotate(yaw.to_radians(), Vec3::UP)
}

/// Per-frame driver for the pipeline
pub struct FrameController {
    pub config: RenderConfig,
    pub framebuffer: Framebuffer,
    vertices: Vec<Vertex>,
    animation: Animation,
    shading: Shading,
    frame: u64,
}

impl FrameController {
    pub fn new(config: RenderConfig) -> Result<Self> {
        let framebuffer = Framebuffer::new(config.width, config.height)?;
        info!("Framebuffer {}x{}", config.width, config.height);

        Ok(Self {
            framebuffer,
            vertices: Vec::new(),
            animation: Animation::new(&config.animation),
            shading: config.shading(),
            frame: 0,
            config,
        })
    }

    /// Replace the vertex buffer. Every position gets the configured vertex
    /// color. A length that is not a multiple of 3 is rejected and the
    /// previous geometry is kept.
    pub fn set_geometry(&mut self, positions: &[Vec3]) -> Result<()> {
        if positions.len() % 3 != 0 {
            return Err(RasterError::IncompleteTriangle { len: positions.len() });
        }

        let color = self.config.vertex_color;
        self.vertices = positions.iter().map(|&p| Vertex::new(p, color)).collect();
        info!("Geometry: {} triangles", self.vertices.len() / 3);
        Ok(())
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of frames rendered so far
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Build this frame's uniform bundle, stepping the animation
    pub fn next_uniforms(&mut self) -> Uniforms {
        let (yaw, pitch) = self.animation.advance();
        Uniforms {
            model: model_matrix(&self.config.model, yaw, pitch),
            view: self.config.view_matrix(),
            projection: self.config.projection_matrix(),
            viewport: self.config.viewport_matrix(),
        }
    }

    /// Clear the buffers and run the whole pipeline once
    pub fn render_frame(&mut self) -> Result<FrameStats> {
        self.framebuffer.clear(self.config.clear_color);
        let uniforms = self.next_uniforms();
        let stats = render(&mut self.framebuffer, &uniforms, &self.vertices, &self.shading)?;
        self.frame += 1;
        debug!("Frame {}: {:?}", self.frame, stats);
        Ok(stats)
    }

    /// Write the depth image if an export path is configured
    pub fn export_depth(&self) -> Result<()> {
        if let Some(path) = &self.config.depth_export {
            write_depth_bmp(&self.framebuffer, path)?;
        }
        Ok(())
    }
}
