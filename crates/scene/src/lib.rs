//! Sphere instances and the default sphere field.
//!
//! Every instance shares one origin-centered, unit-diameter mesh; an
//! instance only contributes a model matrix.
//!
//! # Invariants
//! - Instances are drawn in declaration order.
//! - Satellite `i` always takes `SATELLITE_PALETTE[i]`.

mod instance;

pub use instance::{CENTER_COLOR, SATELLITE_COUNT, SATELLITE_PALETTE, SphereInstance, satellite};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use spherefield_render::Renderer;

/// An ordered collection of sphere instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    instances: Vec<SphereInstance>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A large red sphere at the origin ringed by six satellites.
    pub fn sphere_field() -> Self {
        let mut scene = Self::new();
        scene.push(SphereInstance::new(Vec3::ZERO, 1.0, CENTER_COLOR));
        for i in 0..SATELLITE_COUNT {
            scene.push(satellite(i));
        }
        tracing::debug!(instances = scene.len(), "sphere field built");
        scene
    }

    pub fn push(&mut self, instance: SphereInstance) {
        self.instances.push(instance);
    }

    pub fn instances(&self) -> &[SphereInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn model_matrices(&self) -> impl Iterator<Item = Mat4> + '_ {
        self.instances.iter().map(SphereInstance::model_matrix)
    }

    /// Submit one frame: set `view`, then begin, draw every instance, end.
    pub fn render<R: Renderer>(&self, renderer: &mut R, view: Mat4) -> Result<(), R::Error> {
        renderer.set_view_matrix(view);
        renderer.begin_frame();
        for model in self.model_matrices() {
            renderer.draw_object(&model);
        }
        renderer.end_frame()
    }
}
