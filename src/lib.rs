//! sr2: a minimal software rasterization pipeline
//!
//! Object-space vertices go through model/view/projection/viewport
//! matrices, get grouped into triangles, rasterized with barycentric
//! coverage and merged into a color target through a z-buffer.
//!
//! The window, presentation and frame pacing live in the binary; this
//! library is everything that runs without a display.

pub mod app;
pub mod config;
pub mod depth_export;
pub mod error;
pub mod mesh;
pub mod rasterizer;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
