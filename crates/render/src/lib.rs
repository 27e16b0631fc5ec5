//! Rendering Adapter: renderer-agnostic frame interface.
//!
//! # Invariants
//! - The view and projection bound by `begin_frame` are exactly the last
//!   matrices set; no transformation is applied in between.
//! - A draw that fails its preconditions is skipped, never fatal.
//! - Uniforms are addressed by name; unknown names are ignored.
//!
//! The GPU backend lives in `spherefield-render-wgpu`; this crate holds the
//! parts that do not need a device, plus a headless recorder.

mod frame;
mod renderer;
mod uniform;

pub use frame::{
    DEFAULT_FAR, DEFAULT_FOV_DEGREES, DEFAULT_NEAR, DrawCommand, DrawSkipped, FrameRecorder,
    default_projection_matrix, default_view_matrix,
};
pub use renderer::{FrameRecord, RecordingRenderer, Renderer};
pub use uniform::{
    ScalarKind, UniformBlock, UniformLayout, UniformLayoutError, UniformMember, UniformType,
};

pub fn crate_info() -> &'static str {
    "spherefield-render v0.1.0"
}
