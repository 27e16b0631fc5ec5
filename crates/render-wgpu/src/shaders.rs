/// Built-in vertex stage: transforms positions by `projection * view * model`
/// and passes the per-vertex color through.
pub const SPHERE_VERTEX_SHADER: &str = include_str!("../../../shaders/sphere.vert.wgsl");

/// Built-in fragment stage: opaque interpolated vertex color.
pub const SPHERE_FRAGMENT_SHADER: &str = include_str!("../../../shaders/sphere.frag.wgsl");
