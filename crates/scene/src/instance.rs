use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

pub const CENTER_COLOR: Vec3 = Vec3::new(1.0, 0.2, 0.2);

pub const SATELLITE_COUNT: usize = 6;

/// Satellite colors in orbit order: green, blue, yellow, magenta, cyan, orange.
pub const SATELLITE_PALETTE: [Vec3; SATELLITE_COUNT] = [
    Vec3::new(0.2, 1.0, 0.2),
    Vec3::new(0.2, 0.2, 1.0),
    Vec3::new(1.0, 1.0, 0.2),
    Vec3::new(1.0, 0.2, 1.0),
    Vec3::new(0.2, 1.0, 1.0),
    Vec3::new(1.0, 0.5, 0.2),
];

/// A placed sphere. Only used to derive a model matrix for the shared mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereInstance {
    pub position: Vec3,
    pub radius: f32,
    pub color: Vec3,
}

impl Default for SphereInstance {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            radius: 0.5,
            color: Vec3::new(1.0, 0.5, 0.2),
        }
    }
}

impl SphereInstance {
    pub fn new(position: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            position,
            radius,
            color,
        }
    }

    /// Translate to `position`, then scale uniformly by the diameter.
    ///
    /// The shared mesh has unit diameter, so the result has radius `radius`.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.radius * 2.0))
    }
}

/// Satellite `index` of the sphere field (wrapping past the palette size).
///
/// Satellites sit every 60° around the Y axis, each one a little farther
/// out, higher and larger than the last.
pub fn satellite(index: usize) -> SphereInstance {
    let i = index as f32;
    let angle = (60.0 * i).to_radians();
    let orbit = 4.0 + 0.5 * i;
    let height = 0.5 + 0.3 * i;
    SphereInstance::new(
        Vec3::new(angle.sin() * orbit, height, angle.cos() * orbit),
        0.3 + 0.05 * i,
        SATELLITE_PALETTE[index % SATELLITE_COUNT],
    )
}
