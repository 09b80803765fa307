//! Triangle mesh geometry.
//!
//! Meshes are stored as an indexed triangle soup. Construction validates
//! the index buffer and any per-vertex attributes so that intersection code
//! can index without bounds failures.

use log::warn;
use thiserror::Error;
use umbra_math::{Aabb, Transform, Vec2, Vec3};

/// Errors raised while assembling a mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("triangle {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("{attribute} has {len} entries, expected one per vertex ({expected})")]
    AttributeLength {
        attribute: &'static str,
        len: usize,
        expected: usize,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// Indexed triangle soup with optional per-vertex attributes.
///
/// Triangles are wound counter-clockwise when viewed from the side their
/// computed normal points to.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    /// Three vertex indices per face
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a mesh from positions and indices.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> MeshResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }
        for (i, &index) in indices.iter().enumerate() {
            if index as usize >= positions.len() {
                return Err(MeshError::IndexOutOfRange {
                    face: i / 3,
                    index,
                    vertex_count: positions.len(),
                });
            }
        }

        let bounds = Self::bounds_of(&positions);
        let mesh = Self {
            positions,
            normals: None,
            uvs: None,
            indices,
            bounds,
        };

        // Zero-area faces never report a hit but still cost a test
        let degenerate = (0..mesh.triangle_count())
            .filter(|&face| {
                let [p0, p1, p2] = mesh.face_positions(face);
                (p1 - p0).cross(p2 - p0).length_squared() == 0.0
            })
            .count();
        if degenerate > 0 {
            warn!("Mesh has {} degenerate triangles out of {}", degenerate, mesh.triangle_count());
        }

        Ok(mesh)
    }

    /// Attach per-vertex shading normals.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> MeshResult<Self> {
        Self::check_attribute("normals", normals.len(), self.positions.len())?;
        self.normals = Some(normals.into_iter().map(|n| n.normalize_or_zero()).collect());
        Ok(self)
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> MeshResult<Self> {
        Self::check_attribute("uvs", uvs.len(), self.positions.len())?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    fn check_attribute(attribute: &'static str, len: usize, expected: usize) -> MeshResult<()> {
        if len != expected {
            return Err(MeshError::AttributeLength {
                attribute,
                len,
                expected,
            });
        }
        Ok(())
    }

    fn bounds_of(positions: &[Vec3]) -> Aabb {
        positions.iter().fold(Aabb::EMPTY, |mut acc, &p| {
            acc.enclose_point(p);
            acc
        })
    }

    /// Bake a placement transform into positions and normals.
    pub fn transformed(&self, xform: &Transform) -> Mesh {
        let positions: Vec<Vec3> = self.positions.iter().map(|&p| xform.point(p)).collect();
        let normals = self
            .normals
            .as_ref()
            .map(|ns| ns.iter().map(|&n| xform.normal(n)).collect());
        let bounds = Self::bounds_of(&positions);

        Mesh {
            positions,
            normals,
            uvs: self.uvs.clone(),
            indices: self.indices.clone(),
            bounds,
        }
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for face in 0..self.triangle_count() {
            let [p0, p1, p2] = self.face_positions(face);
            // Unnormalized cross product, so larger faces weigh more
            let weighted = (p1 - p0).cross(p2 - p0);
            for vertex in self.face(face) {
                normals[vertex] += weighted;
            }
        }

        // Isolated or degenerate vertices fall back to +Y
        self.normals = Some(
            normals
                .into_iter()
                .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
                .collect(),
        );
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of one triangle.
    #[inline]
    pub fn face(&self, face: usize) -> [usize; 3] {
        let base = face * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Corner positions of one triangle.
    #[inline]
    pub fn face_positions(&self, face: usize) -> [Vec3; 3] {
        let [i0, i1, i2] = self.face(face);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    /// World bounds of one triangle.
    pub fn face_bounds(&self, face: usize) -> Aabb {
        let [p0, p1, p2] = self.face_positions(face);
        Aabb::from_points(p0.min(p1).min(p2), p0.max(p1).max(p2))
    }
}
