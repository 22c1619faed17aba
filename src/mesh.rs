//! OBJ mesh loading
//!
//! Only positions and the position index of each face corner are used.
//! Faces with more than three corners are fan-triangulated, so the flattened
//! vertex array always groups cleanly into triangles.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::rasterizer::Vec3;

/// Error type for mesh loading
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("Failed to parse OBJ data: {0}")]
    Parse(#[from] tobj::LoadError),

    #[error("Face references position {index} but the mesh has {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Positions plus triangles of 0-based position indices, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[usize; 3]>,
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

impl ObjMesh {
    /// Load a mesh from an OBJ file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(path, &load_options()).map_err(|source| MeshError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let mesh = Self::from_models(models);
        info!(
            "Loaded mesh {}: {} positions, {} triangles",
            path.display(),
            mesh.positions.len(),
            mesh.triangles.len()
        );
        Ok(mesh)
    }

    /// Parse OBJ text (for embedded meshes and testing). `mtllib` lines are ignored.
    pub fn parse(source: &str) -> Result<Self, MeshError> {
        let mut reader = BufReader::new(source.as_bytes());
        let (models, _materials) =
            tobj::load_obj_buf(&mut reader, &load_options(), |_| Err(tobj::LoadError::OpenFileFailed))?;
        Ok(Self::from_models(models))
    }

    /// Merge every object/group into one position list, keeping face order
    fn from_models(models: Vec<tobj::Model>) -> Self {
        let mut mesh = ObjMesh::default();

        for model in models {
            let base = mesh.positions.len();
            mesh.positions.extend(
                model
                    .mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2])),
            );
            mesh.triangles.extend(model.mesh.indices.chunks_exact(3).map(|t| {
                [
                    base + t[0] as usize,
                    base + t[1] as usize,
                    base + t[2] as usize,
                ]
            }));
        }

        mesh
    }

    /// Flatten the faces into a vertex buffer, three positions per triangle
    pub fn vertex_array(&self) -> Result<Vec<Vec3>, MeshError> {
        let mut out = Vec::with_capacity(self.triangles.len() * 3);
        for &index in self.triangles.iter().flatten() {
            let position = self.positions.get(index).ok_or(MeshError::IndexOutOfRange {
                index,
                len: self.positions.len(),
            })?;
            out.push(*position);
        }
        Ok(out)
    }
}

/// Two stacked triangles (z = 0 and z = -1), used when no mesh is given
pub fn demo_vertex_buffer() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(-0.87, -0.5, 0.0),
        Vec3::new(0.87, -0.5, 0.0),
        Vec3::new(0.0, 1.0, -1.0),
        Vec3::new(-0.87, -0.5, -1.0),
        Vec3::new(0.87, -0.5, -1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vn 0 0 1
f 1/1/1 2/1/1 3/1/1 4/1/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = ObjMesh::parse(QUAD).unwrap();
        assert_eq!(mesh.triangles.len(), 2);

        let verts = mesh.vertex_array().unwrap();
        assert_eq!(
            verts,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_faces_keep_file_order() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 4 2 3\nf 1 2 3\n";
        let verts = ObjMesh::parse(src).unwrap().vertex_array().unwrap();
        assert_eq!(verts.len(), 6);
        assert_eq!(verts[0], Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(verts[3], Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_negative_indices_count_from_end() {
        let src = "v 0 0 0\nv 2 0 0\nv 0 2 0\nf -3 -2 -1\n";
        let verts = ObjMesh::parse(src).unwrap().vertex_array().unwrap();
        assert_eq!(verts[1], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(verts[2], Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_vertex_array_checks_indices() {
        let mesh = ObjMesh {
            positions: vec![Vec3::ZERO],
            triangles: vec![[0, 0, 5]],
        };
        assert!(matches!(
            mesh.vertex_array(),
            Err(MeshError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(QUAD.as_bytes()).unwrap();
        let mesh = ObjMesh::load(file.path()).unwrap();
        assert_eq!(mesh.vertex_array().unwrap().len(), 6);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ObjMesh::load("/nonexistent/mesh.obj").unwrap_err();
        assert!(matches!(err, MeshError::Load { .. }));
    }

    #[test]
    fn test_demo_buffer_is_whole_triangles() {
        assert_eq!(demo_vertex_buffer().len() % 3, 0);
    }
}
