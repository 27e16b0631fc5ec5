use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A single mesh vertex: position followed by color, packed as six `f32`s.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    /// Number of floats per packed vertex.
    pub const FLOATS: usize = 6;
    /// Byte distance between consecutive vertices.
    pub const STRIDE: usize = Self::FLOATS * std::mem::size_of::<f32>();
    /// Byte offset of the color attribute.
    pub const COLOR_OFFSET: usize = 3 * std::mem::size_of::<f32>();

    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.color)
    }

    /// View a vertex slice as the flat interleaved float array uploaded to the GPU.
    pub fn as_floats(vertices: &[Vertex]) -> &[f32] {
        bytemuck::cast_slice(vertices)
    }

    /// Reinterpret flat interleaved floats as vertices.
    ///
    /// Fails unless the length is a multiple of [`Vertex::FLOATS`].
    pub fn from_floats(floats: &[f32]) -> Result<&[Vertex], VertexDataError> {
        if floats.len() % Self::FLOATS != 0 {
            return Err(VertexDataError::Misaligned { len: floats.len() });
        }
        bytemuck::try_cast_slice(floats)
            .map_err(|_| VertexDataError::Misaligned { len: floats.len() })
    }
}

/// Errors from interpreting raw vertex data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VertexDataError {
    #[error("vertex data has {len} floats, expected a multiple of 6")]
    Misaligned { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_six_packed_floats() {
        assert_eq!(std::mem::size_of::<Vertex>(), Vertex::STRIDE);
        assert_eq!(Vertex::STRIDE, 24);
        assert_eq!(Vertex::COLOR_OFFSET, 12);
    }

    #[test]
    fn floats_round_trip_through_vertices() {
        let vertices = [
            Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.1, 0.2, 0.3)),
            Vertex::new(Vec3::new(-1.0, 0.0, 4.0), Vec3::ONE),
        ];
        let floats = Vertex::as_floats(&vertices);
        assert_eq!(floats.len(), 12);
        assert_eq!(&floats[..6], &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3]);

        let back = Vertex::from_floats(floats).unwrap();
        assert_eq!(back, &vertices);
    }

    #[test]
    fn misaligned_floats_are_rejected() {
        let floats = [0.0_f32; 7];
        assert_eq!(
            Vertex::from_floats(&floats),
            Err(VertexDataError::Misaligned { len: 7 })
        );
    }

    #[test]
    fn empty_float_slice_is_empty_vertex_slice() {
        assert!(Vertex::from_floats(&[]).unwrap().is_empty());
    }
}
