//! Pipeline error types

use std::path::PathBuf;
use thiserror::Error;

use crate::mesh::MeshError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RasterError>;

/// Main error type for the pipeline and its I/O collaborators
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Vertex buffer length {len} is not a multiple of 3")]
    IncompleteTriangle { len: usize },

    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: usize, height: usize },

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("Config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("Config serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Image export error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
