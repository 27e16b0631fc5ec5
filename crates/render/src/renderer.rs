use std::convert::Infallible;
use std::fmt::Write as _;

use glam::Mat4;

use crate::frame::{
    DrawCommand, FrameRecorder, default_projection_matrix, default_view_matrix,
};
use crate::uniform::{UniformBlock, UniformLayout};

/// Renderer-agnostic frame interface. All renderers implement this trait.
///
/// A frame is `begin_frame`, any number of `draw_object` calls, then
/// `end_frame`. Matrix setters take effect at the next `begin_frame`.
pub trait Renderer {
    type Error;

    fn set_view_matrix(&mut self, view: Mat4);

    fn set_projection_matrix(&mut self, projection: Mat4);

    /// Clear the frame and bind the current view and projection.
    fn begin_frame(&mut self);

    /// Draw the shared mesh once with `model` as its world transform.
    ///
    /// A draw whose preconditions fail is logged and skipped; it never
    /// aborts the frame.
    fn draw_object(&mut self, model: &Mat4);

    /// Submit and present the frame.
    fn end_frame(&mut self) -> Result<(), Self::Error>;
}

/// A finished frame captured by [`RecordingRenderer`].
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub view: Mat4,
    pub projection: Mat4,
    pub draws: Vec<DrawCommand>,
}

/// Headless renderer that keeps every submitted frame in memory.
///
/// Useful for CLI output, logging, and testing the render interface
/// without a window or GPU.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    recorder: FrameRecorder,
    uniforms: Option<UniformBlock>,
    vertex_count: Option<u32>,
    frames: Vec<FrameRecord>,
}

impl RecordingRenderer {
    /// `layout` is `None` to model a renderer whose shader failed to load;
    /// a `vertex_count` of zero models an empty vertex buffer, as does one
    /// too large for a `u32` draw range.
    pub fn new(layout: Option<UniformLayout>, vertex_count: usize) -> Self {
        let vertex_count = match u32::try_from(vertex_count) {
            Ok(0) => {
                tracing::error!("vertex data is empty; draws will be skipped");
                None
            }
            Ok(count) => Some(count),
            Err(_) => {
                tracing::error!(
                    vertex_count,
                    "vertex data exceeds u32 draw range; draws will be skipped"
                );
                None
            }
        };
        Self {
            recorder: FrameRecorder::new(default_view_matrix(), default_projection_matrix(1, 1)),
            uniforms: layout.map(UniformBlock::new),
            vertex_count,
            frames: Vec::new(),
        }
    }

    /// The program uniforms as currently bound.
    pub fn uniforms(&self) -> Option<&UniformBlock> {
        self.uniforms.as_ref()
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Model matrices of every draw in `frame`, in submission order.
    pub fn model_matrices(&self, frame: usize) -> Vec<Mat4> {
        let (Some(record), Some(uniforms)) = (self.frames.get(frame), &self.uniforms) else {
            return Vec::new();
        };
        record
            .draws
            .iter()
            .filter_map(|draw| {
                UniformBlock::from_bytes(uniforms.layout().clone(), draw.uniforms.clone())
            })
            .filter_map(|block| block.mat4("model"))
            .collect()
    }

    /// Human-readable report of the captured frames.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Recorded frames: {} (shader loaded: {}, vertices: {}) ===",
            self.frames.len(),
            self.uniforms.is_some(),
            self.vertex_count.unwrap_or(0)
        );
        for (index, frame) in self.frames.iter().enumerate() {
            let eye = frame.view.inverse().w_axis;
            let _ = writeln!(
                out,
                "frame {index}: draws={} eye=({:.2}, {:.2}, {:.2})",
                frame.draws.len(),
                eye.x,
                eye.y,
                eye.z
            );
            for model in self.model_matrices(index) {
                let (scale, _, translation) = model.to_scale_rotation_translation();
                let _ = writeln!(
                    out,
                    "  pos=({:.2}, {:.2}, {:.2}) scale={:.2}",
                    translation.x, translation.y, translation.z, scale.x
                );
            }
        }
        out
    }
}

impl Renderer for RecordingRenderer {
    type Error = Infallible;

    fn set_view_matrix(&mut self, view: Mat4) {
        self.recorder.set_view_matrix(view);
    }

    fn set_projection_matrix(&mut self, projection: Mat4) {
        self.recorder.set_projection_matrix(projection);
    }

    fn begin_frame(&mut self) {
        self.recorder.begin_frame(self.uniforms.as_mut());
    }

    fn draw_object(&mut self, model: &Mat4) {
        let _ = self
            .recorder
            .draw_object(self.uniforms.as_mut(), self.vertex_count, model);
    }

    fn end_frame(&mut self) -> Result<(), Infallible> {
        self.frames.push(FrameRecord {
            view: self.recorder.view(),
            projection: self.recorder.projection(),
            draws: self.recorder.take_draws(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn frame<R: Renderer>(renderer: &mut R, models: &[Mat4]) -> Result<(), R::Error> {
        renderer.begin_frame();
        for model in models {
            renderer.draw_object(model);
        }
        renderer.end_frame()
    }

    #[test]
    fn records_frames_and_models() {
        let mut renderer = RecordingRenderer::new(Some(UniformLayout::mvp()), 36);
        let models = [
            Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
        ];
        frame(&mut renderer, &models).unwrap();
        frame(&mut renderer, &models[..1]).unwrap();

        assert_eq!(renderer.frames().len(), 2);
        assert_eq!(renderer.frames()[0].draws.len(), 2);
        assert_eq!(renderer.frames()[1].draws.len(), 1);
        assert_eq!(renderer.model_matrices(0), models.to_vec());
    }

    #[test]
    fn view_set_before_begin_is_the_bound_uniform() {
        let mut renderer = RecordingRenderer::new(Some(UniformLayout::mvp()), 6);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 5.0, 15.0), Vec3::ZERO, Vec3::Y);
        renderer.set_view_matrix(view);
        renderer.begin_frame();
        assert_eq!(renderer.uniforms().unwrap().mat4("view"), Some(view));
    }

    #[test]
    fn empty_vertex_data_skips_draws() {
        let mut renderer = RecordingRenderer::new(Some(UniformLayout::mvp()), 0);
        frame(&mut renderer, &[Mat4::IDENTITY, Mat4::IDENTITY]).unwrap();
        assert_eq!(renderer.frames().len(), 1);
        assert!(renderer.frames()[0].draws.is_empty());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_vertex_data_skips_draws() {
        let oversized = u32::MAX as usize + 1;
        let mut renderer = RecordingRenderer::new(Some(UniformLayout::mvp()), oversized);
        frame(&mut renderer, &[Mat4::IDENTITY]).unwrap();
        assert!(renderer.frames()[0].draws.is_empty());
    }

    #[test]
    fn missing_shader_skips_draws() {
        let mut renderer = RecordingRenderer::new(None, 36);
        frame(&mut renderer, &[Mat4::IDENTITY]).unwrap();
        assert!(renderer.frames()[0].draws.is_empty());
        assert!(renderer.model_matrices(0).is_empty());
    }

    #[test]
    fn summary_lists_draws() {
        let mut renderer = RecordingRenderer::new(Some(UniformLayout::mvp()), 36);
        renderer.set_view_matrix(Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y));
        frame(&mut renderer, &[Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))]).unwrap();

        let summary = renderer.summary();
        assert!(summary.contains("Recorded frames: 1"));
        assert!(summary.contains("draws=1"));
        assert!(summary.contains("eye=(0.00, 0.00, 3.00)"));
        assert!(summary.contains("pos=(1.00, 2.00, 3.00)"));
    }
}
