//! Shared types for the spherefield workspace.
//!
//! # Invariants
//! - A vertex is always six tightly packed `f32`s: position then color.
//! - Flat vertex data is only accepted when its length is a multiple of six.

mod vertex;

pub use vertex::{Vertex, VertexDataError};
