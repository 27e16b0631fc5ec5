use std::sync::Arc;

use glam::Mat4;
use spherefield_common::Vertex;
use spherefield_input::{Action, InputState};
use spherefield_render::{
    DrawCommand, FrameRecorder, Renderer, default_projection_matrix, default_view_matrix,
};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use crate::search::{ShaderSearch, ShaderSearchError};
use crate::shader::{ProgramTarget, ShaderProgram, UNIFORM_BINDING};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Window and shader configuration for [`WgpuRenderer::initialize`].
#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub shader_search: ShaderSearch,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            title: "Spherefield".into(),
            shader_search: ShaderSearch::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface supports no texture formats on this adapter")]
    UnsupportedSurface,
    #[error("no usable shader program: {0}")]
    ShaderUnavailable(#[from] ShaderSearchError),
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("{0} vertices exceed the u32 draw range")]
    TooManyVertices(usize),
}

/// Per-frame uniform snapshots, one aligned slot per draw.
struct FrameUniforms {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    slots: u64,
}

/// Window, GPU session and the single static vertex buffer.
///
/// Every instance is drawn from the same vertex buffer; only the uniform
/// snapshot changes between draws. Resources are released by [`cleanup`],
/// which `Drop` also calls.
///
/// [`cleanup`]: WgpuRenderer::cleanup
pub struct WgpuRenderer {
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    frame_uniforms: Option<FrameUniforms>,
    shader: ShaderProgram,
    depth_view: Option<wgpu::TextureView>,
    surface: Option<wgpu::Surface<'static>>,
    config: wgpu::SurfaceConfiguration,
    window: Option<Arc<Window>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    uniform_alignment: u64,
    recorder: FrameRecorder,
    should_close: bool,
}

impl WgpuRenderer {
    /// Open the window, bring up the GPU, load shaders and upload `vertices`.
    ///
    /// Empty `vertices` is not an error: it is logged and every draw is
    /// then skipped.
    pub fn initialize(
        event_loop: &ActiveEventLoop,
        settings: &RendererSettings,
        vertices: &[Vertex],
    ) -> Result<Self, RenderError> {
        let vertex_count = draw_vertex_count(vertices.len())?;
        let attrs = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(PhysicalSize::new(settings.width, settings.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("spherefield_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::error!("uncaptured GPU error: {err}");
        }));

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = info.backend.to_str(),
            driver = %info.driver,
            driver_info = %info.driver_info,
            "GPU initialized"
        );

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or(RenderError::UnsupportedSurface)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let target = ProgramTarget {
            color_format: format,
            depth_format: Some(DEPTH_FORMAT),
        };
        let mut shader = ShaderProgram::new();
        let (paths, ()) = settings
            .shader_search
            .resolve(|vertex, fragment| shader.load(&device, &target, vertex, fragment))?;
        tracing::info!(%paths, "shader program ready");

        let vertex_buffer = upload_vertices(&device, vertices);
        let depth_view = create_depth_view(&device, config.width, config.height);
        let uniform_alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);

        Ok(Self {
            vertex_buffer,
            vertex_count,
            frame_uniforms: None,
            shader,
            depth_view: Some(depth_view),
            surface: Some(surface),
            recorder: FrameRecorder::new(
                default_view_matrix(),
                default_projection_matrix(config.width, config.height),
            ),
            config,
            window: Some(window),
            device: Some(device),
            queue: Some(queue),
            uniform_alignment,
            should_close: false,
        })
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_deref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut ShaderProgram {
        &mut self.shader
    }

    /// Number of vertices drawn per object; zero when no buffer was uploaded.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_buffer.as_ref().map_or(0, |_| self.vertex_count)
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn request_close(&mut self) {
        self.should_close = true;
    }

    /// The close action ends the session.
    pub fn process_input(&mut self, input: &InputState) {
        if input.is_active(Action::Close) {
            self.should_close = true;
        }
    }

    /// Window events the renderer owns: close requests and surface resizes.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            _ => {}
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        if let (Some(surface), Some(device)) = (&self.surface, &self.device) {
            surface.configure(device, &self.config);
            self.depth_view = Some(create_depth_view(device, width, height));
            tracing::debug!(width, height, "surface resized");
        }
    }

    /// Release GPU and window resources. Safe to call more than once.
    pub fn cleanup(&mut self) {
        let mut released = false;
        released |= self.vertex_buffer.take().is_some();
        released |= self.frame_uniforms.take().is_some();
        released |= self.shader.unload();
        released |= self.depth_view.take().is_some();
        released |= self.surface.take().is_some();
        released |= self.window.take().is_some();
        released |= self.device.take().is_some();
        released |= self.queue.take().is_some();
        if released {
            tracing::debug!("renderer resources released");
        }
    }

    fn render_frame(&mut self) -> Result<(), RenderError> {
        let draws = self.recorder.take_draws();
        let (Some(device), Some(queue), Some(surface), Some(depth_view)) =
            (&self.device, &self.queue, &self.surface, &self.depth_view)
        else {
            return Ok(());
        };

        let output = match surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface texture timed out; frame skipped");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(err) => {
                tracing::error!("surface error: {err}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform_size = self
            .shader
            .uniforms()
            .map_or(0, |block| u64::from(block.layout().size()));
        let stride = uniform_stride(uniform_size, self.uniform_alignment);
        let bind_group = match self.shader.bind_group_layout() {
            Some(layout) if !draws.is_empty() => {
                let frame = prepare_frame_uniforms(
                    &mut self.frame_uniforms,
                    device,
                    layout,
                    uniform_size,
                    stride,
                    draws.len() as u64,
                );
                queue.write_buffer(&frame.buffer, 0, &pack_uniforms(&draws, stride));
                Some(&frame.bind_group)
            }
            _ => None,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(vertex_buffer) = &self.vertex_buffer
                && !draws.is_empty()
                && self.shader.bind(&mut pass)
            {
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                for (slot, draw) in draws.iter().enumerate() {
                    if let Some(bind_group) = bind_group {
                        pass.set_bind_group(0, bind_group, &[(slot as u64 * stride) as u32]);
                    }
                    pass.draw(0..draw.vertex_count, 0..1);
                }
            }
        }
        queue.submit(std::iter::once(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(draws = draws.len(), "GPU error during frame: {err}");
        }

        output.present();
        Ok(())
    }
}

impl Renderer for WgpuRenderer {
    type Error = RenderError;

    fn set_view_matrix(&mut self, view: Mat4) {
        self.recorder.set_view_matrix(view);
    }

    fn set_projection_matrix(&mut self, projection: Mat4) {
        self.recorder.set_projection_matrix(projection);
    }

    fn begin_frame(&mut self) {
        self.recorder.begin_frame(self.shader.uniforms_mut());
    }

    fn draw_object(&mut self, model: &Mat4) {
        let vertex_count = self.vertex_buffer.as_ref().map(|_| self.vertex_count);
        let _ = self
            .recorder
            .draw_object(self.shader.uniforms_mut(), vertex_count, model);
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.render_frame()
    }
}

impl Drop for WgpuRenderer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn draw_vertex_count(len: usize) -> Result<u32, RenderError> {
    u32::try_from(len).map_err(|_| RenderError::TooManyVertices(len))
}

fn upload_vertices(device: &wgpu::Device, vertices: &[Vertex]) -> Option<wgpu::Buffer> {
    if vertices.is_empty() {
        tracing::error!("vertex data is empty; objects will not be drawn");
        return None;
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sphere_vertex_buffer"),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        tracing::error!("GPU error after vertex upload: {err}");
    }

    tracing::info!(
        vertices = vertices.len(),
        floats = vertices.len() * Vertex::FLOATS,
        "vertex buffer uploaded"
    );
    Some(buffer)
}

/// Reuse the frame uniform buffer when it has room for `draws` slots; otherwise
/// replace it with one rounded up to the next power of two.
fn prepare_frame_uniforms<'a>(
    frame: &'a mut Option<FrameUniforms>,
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_size: u64,
    stride: u64,
    draws: u64,
) -> &'a FrameUniforms {
    if frame.as_ref().is_some_and(|f| f.slots < draws) {
        *frame = None;
    }
    frame.get_or_insert_with(|| {
        let slots = draws.next_power_of_two();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniform_buffer"),
            size: slots * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_uniform_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: UNIFORM_BINDING,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniform_size),
                }),
            }],
        });
        tracing::debug!(slots, stride, "frame uniform buffer allocated");
        FrameUniforms {
            buffer,
            bind_group,
            slots,
        }
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

/// Distance between per-draw uniform slots.
fn uniform_stride(uniform_size: u64, alignment: u64) -> u64 {
    wgpu::util::align_to(uniform_size.max(1), alignment.max(1))
}

/// Lay every draw's uniform snapshot out at `slot * stride`.
fn pack_uniforms(draws: &[DrawCommand], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; draws.len() * stride];
    for (slot, draw) in draws.iter().enumerate() {
        let start = slot * stride;
        let len = draw.uniforms.len().min(stride);
        bytes[start..start + len].copy_from_slice(&draw.uniforms[..len]);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use spherefield_render::{UniformBlock, UniformLayout};

    #[test]
    fn vertex_count_fits_a_draw_range() {
        assert_eq!(draw_vertex_count(3072).unwrap(), 3072);
        assert_eq!(draw_vertex_count(0).unwrap(), 0);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_vertex_count_is_an_error() {
        let oversized = u32::MAX as usize + 1;
        assert!(matches!(
            draw_vertex_count(oversized),
            Err(RenderError::TooManyVertices(n)) if n == oversized
        ));
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(uniform_stride(192, 256), 256);
        assert_eq!(uniform_stride(256, 256), 256);
        assert_eq!(uniform_stride(300, 256), 512);
        assert_eq!(uniform_stride(192, 64), 192);
    }

    #[test]
    fn packed_snapshots_sit_at_slot_offsets() {
        let mut block = UniformBlock::new(UniformLayout::mvp());
        let models = [
            Mat4::from_translation(glam::Vec3::X),
            Mat4::from_scale(glam::Vec3::splat(3.0)),
        ];
        let draws: Vec<DrawCommand> = models
            .iter()
            .map(|model| {
                block.set_mat4("model", model);
                DrawCommand {
                    uniforms: block.as_bytes().to_vec(),
                    vertex_count: 36,
                }
            })
            .collect();

        let stride = uniform_stride(192, 256);
        let bytes = pack_uniforms(&draws, stride);
        assert_eq!(bytes.len(), 512);
        for (slot, model) in models.iter().enumerate() {
            let start = slot * stride as usize;
            let snapshot = bytes[start..start + 192].to_vec();
            let block = UniformBlock::from_bytes(UniformLayout::mvp(), snapshot).unwrap();
            assert_eq!(block.mat4("model"), Some(*model));
        }
        assert!(bytes[192..256].iter().all(|b| *b == 0));
    }

    #[test]
    fn default_settings_match_demo_window() {
        let settings = RendererSettings::default();
        assert_eq!((settings.width, settings.height), (1000, 1000));
        assert_eq!(settings.title, "Spherefield");
        assert_eq!(settings.shader_search, ShaderSearch::default());
    }
}
