use glam::{Mat4, Vec3};

use crate::uniform::UniformBlock;

/// Vertical field of view of the default projection, in degrees.
pub const DEFAULT_FOV_DEGREES: f32 = 45.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 100.0;

/// View matrix used until the application supplies one: three units back from the origin.
pub fn default_view_matrix() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0))
}

/// 45° perspective for a `width` x `height` surface. A zero height is treated as square.
pub fn default_projection_matrix(width: u32, height: u32) -> Mat4 {
    let aspect = if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    };
    Mat4::perspective_rh(
        DEFAULT_FOV_DEGREES.to_radians(),
        aspect,
        DEFAULT_NEAR,
        DEFAULT_FAR,
    )
}

/// One non-indexed triangle draw with the uniform values it was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub uniforms: Vec<u8>,
    pub vertex_count: u32,
}

/// Why a draw was dropped. Skips are logged and never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DrawSkipped {
    #[error("cannot draw object: shader not loaded")]
    ShaderNotLoaded,
    #[error("cannot draw object: vertex buffer not initialized")]
    BufferNotInitialized,
}

/// Backend-independent half of a renderer: current matrices and the draws
/// recorded since the last `begin_frame`.
#[derive(Debug, Clone)]
pub struct FrameRecorder {
    view: Mat4,
    projection: Mat4,
    draws: Vec<DrawCommand>,
}

impl FrameRecorder {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            draws: Vec::new(),
        }
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Start a frame: drop old draws and bind `view`/`projection` into the program's uniforms.
    pub fn begin_frame(&mut self, uniforms: Option<&mut UniformBlock>) {
        self.draws.clear();
        if let Some(uniforms) = uniforms {
            uniforms.set_mat4("view", &self.view);
            uniforms.set_mat4("projection", &self.projection);
        }
    }

    /// Record a draw of every uploaded vertex with `model` bound.
    ///
    /// `uniforms` is `None` when no program is loaded, `vertex_count` is
    /// `None` when there is no vertex buffer.
    pub fn draw_object(
        &mut self,
        uniforms: Option<&mut UniformBlock>,
        vertex_count: Option<u32>,
        model: &Mat4,
    ) -> Result<(), DrawSkipped> {
        let result = match (uniforms, vertex_count) {
            (None, _) => Err(DrawSkipped::ShaderNotLoaded),
            (Some(_), None) => Err(DrawSkipped::BufferNotInitialized),
            (Some(uniforms), Some(vertex_count)) => {
                uniforms.set_mat4("model", model);
                self.draws.push(DrawCommand {
                    uniforms: uniforms.as_bytes().to_vec(),
                    vertex_count,
                });
                Ok(())
            }
        };
        if let Err(skip) = result {
            tracing::error!("{skip}");
        }
        result
    }

    pub fn draws(&self) -> &[DrawCommand] {
        &self.draws
    }

    /// Hand the recorded draws to the backend, leaving the recorder empty.
    pub fn take_draws(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.draws)
    }
}

impl Default for FrameRecorder {
    fn default() -> Self {
        Self::new(default_view_matrix(), default_projection_matrix(1, 1))
    }
}
