//! Procedural mesh generation.
//!
//! Meshes are flat lists of independent triangles (no index buffer). They
//! are generated once and handed to the renderer unchanged.
//!
//! # Invariants
//! - `vertices().len()` is always a multiple of three (whole triangles).
//! - A generated sphere has exactly `sectors * stacks * 6` vertices, and
//!   that count fits in a `u32` draw range.

mod sphere;

pub use sphere::{DEFAULT_RADIUS, DEFAULT_SECTORS, DEFAULT_STACKS, SphereParams};

use serde::{Deserialize, Serialize};
use spherefield_common::Vertex;

/// Errors from mesh generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("sphere needs at least one sector and one stack (got {sectors}x{stacks})")]
    InvalidResolution { sectors: u32, stacks: u32 },
    #[error("sphere radius must be finite and positive (got {0})")]
    InvalidRadius(f32),
    #[error("sphere of {sectors}x{stacks} needs more than u32::MAX vertices")]
    TooLarge { sectors: u32, stacks: u32 },
}

/// Immutable triangle soup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    vertices: Vec<Vertex>,
}

impl Mesh {
    /// Generate a latitude/longitude sphere centered at the origin.
    pub fn sphere(params: SphereParams) -> Result<Self, MeshError> {
        sphere::generate(params).map(|vertices| Self { vertices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The interleaved float view uploaded to the vertex buffer.
    pub fn as_floats(&self) -> &[f32] {
        Vertex::as_floats(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Largest distance of any vertex from the origin.
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.position().length())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sphere_counts() {
        let mesh = Mesh::sphere(SphereParams::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 32 * 16 * 6);
        assert_eq!(mesh.triangle_count(), 32 * 16 * 2);
        assert_eq!(mesh.as_floats().len(), mesh.vertex_count() * 6);
    }

    #[test]
    fn empty_mesh() {
        let mesh = Mesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounding_radius(), 0.0);
    }

    #[test]
    fn bounding_radius_matches_params() {
        let mesh = Mesh::sphere(SphereParams {
            radius: 2.5,
            ..SphereParams::default()
        })
        .unwrap();
        assert!((mesh.bounding_radius() - 2.5).abs() < 1e-4);
    }
}
