//! wgpu render backend for the sphere field.
//!
//! Draws one shared vertex buffer many times, each draw with its own
//! model/view/projection snapshot. Shaders are WGSL, validated and reflected
//! with naga before the pipeline is created, so named uniforms resolve to
//! byte offsets without a GPU.
//!
//! # Invariants
//! - Camera motion never touches the renderer except through the view matrix.
//! - A shader program is either fully linked or not loaded; never half of it.
//! - Per-draw precondition failures skip that draw only.

mod camera;
mod gpu;
mod search;
mod shader;
mod shaders;

pub use camera::{FlyCamera, PITCH_LIMIT_DEGREES};
pub use gpu::{DEPTH_FORMAT, RenderError, RendererSettings, WgpuRenderer};
pub use search::{
    DEFAULT_SHADER_DIRS, FRAGMENT_SHADER_FILE, ShaderPaths, ShaderSearch, ShaderSearchError,
    VERTEX_SHADER_FILE,
};
pub use shader::{
    CompiledProgram, CompiledStage, ProgramTarget, ShaderError, ShaderProgram, ShaderStage,
    UNIFORM_BINDING, UNIFORM_GROUP,
};
pub use shaders::{SPHERE_FRAGMENT_SHADER, SPHERE_VERTEX_SHADER};
