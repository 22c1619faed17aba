//! Vertex stage: transform and primitive assembly

use super::math::Vec4;
use super::types::{Triangle, Uniforms, Vertex};
use crate::error::{RasterError, Result};

/// Transform an object-space vertex to screen space.
///
/// Applies `viewport * projection * view * model` and divides by w. There is
/// no clipping: a vertex that ends up with w == 0 comes back with non-finite
/// coordinates, and the rasterizer drops any triangle that contains one.
pub fn transform_vertex(vertex: &Vertex, uniforms: &Uniforms) -> Vertex {
    let clip = uniforms.combined() * Vec4::from_point(vertex.position);
    Vertex {
        position: clip.to_point(),
        color: vertex.color,
    }
}

/// Transform a whole vertex buffer with one precomputed matrix
pub fn transform_vertices(vertices: &[Vertex], uniforms: &Uniforms) -> Vec<Vertex> {
    let mvp = uniforms.combined();
    vertices
        .iter()
        .map(|v| Vertex {
            position: (mvp * Vec4::from_point(v.position)).to_point(),
            color: v.color,
        })
        .collect()
}

/// Group a flat vertex stream into triangles (3i, 3i+1, 3i+2).
///
/// A trailing partial group is an error, not silently dropped.
pub fn assemble_triangles(vertices: &[Vertex]) -> Result<Vec<Triangle>> {
    if vertices.len() % 3 != 0 {
        return Err(RasterError::IncompleteTriangle { len: vertices.len() });
    }

    Ok(vertices
        .chunks_exact(3)
        .map(|tri| [tri[0], tri[1], tri[2]])
        .collect())
}
