//! Software rasterization pipeline
//!
//! vertex buffer -> transform -> primitive assembly -> rasterize -> depth merge
//!
//! Features:
//! - Homogeneous transform with perspective divide (no clipping)
//! - Barycentric coverage with a closed [0, 1] test
//! - Linear screen-space depth interpolation
//! - Flat shading from one face normal and one directional light
//! - Z-buffer with first-writer-wins ties

mod math;
mod pipeline;
mod render;
mod types;

pub use math::*;
pub use pipeline::*;
pub use render::*;
pub use types::*;

/// Default output dimensions
pub const WIDTH: usize = 840;
pub const HEIGHT: usize = 680;
