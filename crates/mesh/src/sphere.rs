use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use spherefield_common::Vertex;

use crate::MeshError;

pub const DEFAULT_RADIUS: f32 = 0.5;
pub const DEFAULT_SECTORS: u32 = 32;
pub const DEFAULT_STACKS: u32 = 16;

/// Sampling parameters for a latitude/longitude sphere.
///
/// The default is a unit-diameter sphere, so a model matrix scaling by
/// `2 * radius` yields a sphere of that radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereParams {
    pub radius: f32,
    /// Longitude divisions.
    pub sectors: u32,
    /// Latitude divisions, pole to pole.
    pub stacks: u32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            sectors: DEFAULT_SECTORS,
            stacks: DEFAULT_STACKS,
        }
    }
}

pub(crate) fn generate(params: SphereParams) -> Result<Vec<Vertex>, MeshError> {
    let SphereParams {
        radius,
        sectors,
        stacks,
    } = params;
    if sectors == 0 || stacks == 0 {
        return Err(MeshError::InvalidResolution { sectors, stacks });
    }
    if !radius.is_finite() || radius <= 0.0 {
        return Err(MeshError::InvalidRadius(radius));
    }
    let vertex_count = sphere_vertex_count(sectors, stacks)
        .ok_or(MeshError::TooLarge { sectors, stacks })?;

    // (stacks + 1) rings of (sectors + 1) samples; the seam column is duplicated.
    let ring = sectors as usize + 1;
    let mut grid = Vec::with_capacity(ring * (stacks as usize + 1));
    for i in 0..=stacks {
        let stack_angle = FRAC_PI_2 - i as f32 * (PI / stacks as f32);
        let xy = radius * stack_angle.cos();
        let z = radius * stack_angle.sin();

        for j in 0..=sectors {
            let sector_angle = j as f32 * TAU / sectors as f32;
            let position = Vec3::new(xy * sector_angle.cos(), xy * sector_angle.sin(), z);
            let color = Vec3::splat(0.5) + 0.5 * position / radius;
            grid.push(Vertex::new(position, color));
        }
    }

    let mut vertices = Vec::with_capacity(vertex_count as usize);
    for i in 0..stacks as usize {
        for j in 0..sectors as usize {
            let k1 = i * ring + j;
            let k2 = k1 + ring;
            vertices.extend_from_slice(&[grid[k1], grid[k2], grid[k1 + 1]]);
            vertices.extend_from_slice(&[grid[k1 + 1], grid[k2], grid[k2 + 1]]);
        }
    }

    tracing::debug!(
        sectors,
        stacks,
        radius,
        vertices = vertices.len(),
        "generated sphere mesh"
    );
    Ok(vertices)
}

/// Six vertices per quad, or `None` when the count does not fit a `u32`.
fn sphere_vertex_count(sectors: u32, stacks: u32) -> Option<u32> {
    sectors.checked_mul(stacks)?.checked_mul(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(radius: f32, sectors: u32, stacks: u32) -> SphereParams {
        SphereParams {
            radius,
            sectors,
            stacks,
        }
    }

    #[test]
    fn vertex_count_is_six_per_quad() {
        for (sectors, stacks) in [(1, 1), (3, 2), (8, 4), (32, 16), (17, 9)] {
            let vertices = generate(params(1.0, sectors, stacks)).unwrap();
            assert_eq!(vertices.len(), (sectors * stacks * 6) as usize);
        }
    }

    #[test]
    fn every_vertex_lies_on_the_sphere() {
        for radius in [0.5, 1.0, 3.75] {
            for vertex in generate(params(radius, 24, 12)).unwrap() {
                let distance = vertex.position().length();
                assert!(
                    (distance - radius).abs() < 1e-4 * radius.max(1.0),
                    "vertex at distance {distance}, expected {radius}"
                );
            }
        }
    }

    #[test]
    fn colors_follow_normalized_position() {
        for vertex in generate(params(2.0, 8, 4)).unwrap() {
            let expected = Vec3::splat(0.5) + 0.5 * vertex.position() / 2.0;
            assert!(vertex.color().abs_diff_eq(expected, 1e-6));
            assert!(vertex.color().cmpge(Vec3::splat(-1e-6)).all());
            assert!(vertex.color().cmple(Vec3::splat(1.0 + 1e-6)).all());
        }
    }

    #[test]
    fn first_triangle_starts_at_north_pole() {
        let vertices = generate(params(1.0, 4, 2)).unwrap();
        assert!(vertices[0].position().abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn rejects_degenerate_resolution() {
        assert_eq!(
            generate(params(1.0, 0, 4)),
            Err(MeshError::InvalidResolution {
                sectors: 0,
                stacks: 4
            })
        );
        assert!(generate(params(1.0, 4, 0)).is_err());
    }

    #[test]
    fn rejects_bad_radius() {
        assert!(generate(params(0.0, 4, 4)).is_err());
        assert!(generate(params(-1.0, 4, 4)).is_err());
        assert!(generate(params(f32::NAN, 4, 4)).is_err());
    }

    #[test]
    fn oversized_resolution_is_an_error() {
        for (sectors, stacks) in [(u32::MAX, u32::MAX), (65_536, 65_536), (u32::MAX / 6 + 1, 1)] {
            assert_eq!(
                generate(params(1.0, sectors, stacks)),
                Err(MeshError::TooLarge { sectors, stacks })
            );
        }
    }

    #[test]
    fn vertex_count_limit() {
        assert_eq!(sphere_vertex_count(32, 16), Some(3072));
        assert_eq!(sphere_vertex_count(u32::MAX / 6, 1), Some(u32::MAX / 6 * 6));
        assert_eq!(sphere_vertex_count(u32::MAX / 6 + 1, 1), None);
    }
}
