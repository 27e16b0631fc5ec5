use std::fmt;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use spherefield_common::Vertex;
use spherefield_render::{
    ScalarKind, UniformBlock, UniformLayout, UniformLayoutError, UniformMember, UniformType,
};

/// Bind group and binding of the program's uniform block.
pub const UNIFORM_GROUP: u32 = 0;
pub const UNIFORM_BINDING: u32 = 0;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: Vertex::COLOR_OFFSET as u64,
        shader_location: 1,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader compilation failed:\n{message}")]
    Compile { stage: ShaderStage, message: String },
    #[error("{stage} shader has no @{stage} entry point")]
    MissingEntryPoint { stage: ShaderStage },
    #[error("uniform block differs between the vertex and fragment stages")]
    UniformMismatch,
    #[error("invalid uniform block: {0}")]
    UniformLayout(#[from] UniformLayoutError),
    #[error("shader program linking failed: {0}")]
    Link(String),
}

/// One validated stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub source: String,
    pub entry_point: String,
    pub uniforms: Option<UniformLayout>,
}

impl CompiledStage {
    /// Parse and validate `source`, then find its entry point and uniform block.
    pub fn compile(stage: ShaderStage, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Compile {
            stage,
            message: err.emit_to_string(source),
        })?;
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|err| ShaderError::Compile {
                stage,
                message: err.as_inner().to_string(),
            })?;

        let wanted = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        };
        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == wanted)
            .map(|ep| ep.name.clone())
            .ok_or(ShaderError::MissingEntryPoint { stage })?;

        Ok(Self {
            source: source.to_owned(),
            entry_point,
            uniforms: reflect_uniforms(&module)?,
        })
    }
}

/// Both stages compiled with a uniform block they agree on.
///
/// Building one needs no GPU, so sources can be checked before a device exists.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    /// Empty (size 0) when neither stage declares a uniform block.
    pub uniforms: UniformLayout,
}

impl CompiledProgram {
    pub fn compile(vertex_source: &str, fragment_source: &str) -> Result<Self, ShaderError> {
        let vertex = CompiledStage::compile(ShaderStage::Vertex, vertex_source)?;
        let fragment = CompiledStage::compile(ShaderStage::Fragment, fragment_source)?;
        let uniforms = match (&vertex.uniforms, &fragment.uniforms) {
            (Some(a), Some(b)) if a != b => return Err(ShaderError::UniformMismatch),
            (Some(layout), _) | (None, Some(layout)) => layout.clone(),
            (None, None) => UniformLayout::default(),
        };
        Ok(Self {
            vertex,
            fragment,
            uniforms,
        })
    }
}

/// Reflect the struct bound at `@group(0) @binding(0)` in the uniform address space.
fn reflect_uniforms(module: &naga::Module) -> Result<Option<UniformLayout>, ShaderError> {
    let binding = naga::ResourceBinding {
        group: UNIFORM_GROUP,
        binding: UNIFORM_BINDING,
    };
    let Some((_, global)) = module.global_variables.iter().find(|(_, var)| {
        var.space == naga::AddressSpace::Uniform && var.binding.as_ref() == Some(&binding)
    }) else {
        return Ok(None);
    };

    let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
        tracing::warn!("uniform binding is not a struct; no named uniforms available");
        return Ok(None);
    };

    let mut reflected = Vec::with_capacity(members.len());
    for member in members {
        let Some(name) = &member.name else { continue };
        match uniform_type(&module.types[member.ty].inner) {
            Some(ty) => reflected.push(UniformMember::new(name.clone(), member.offset, ty)),
            None => tracing::warn!(uniform = %name, "unsupported uniform member type; skipped"),
        }
    }
    Ok(Some(UniformLayout::new(reflected, *span)?))
}

fn scalar_kind(scalar: naga::Scalar) -> Option<ScalarKind> {
    if scalar.width != 4 {
        return None;
    }
    match scalar.kind {
        naga::ScalarKind::Float => Some(ScalarKind::Float),
        naga::ScalarKind::Sint => Some(ScalarKind::Sint),
        naga::ScalarKind::Uint => Some(ScalarKind::Uint),
        _ => None,
    }
}

fn uniform_type(inner: &naga::TypeInner) -> Option<UniformType> {
    match *inner {
        naga::TypeInner::Scalar(scalar) => scalar_kind(scalar).map(UniformType::Scalar),
        naga::TypeInner::Vector { size, scalar } => {
            scalar_kind(scalar).map(|kind| UniformType::Vector {
                size: size as u8,
                kind,
            })
        }
        naga::TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } if scalar_kind(scalar) == Some(ScalarKind::Float) => Some(UniformType::Matrix {
            columns: columns as u8,
            rows: rows as u8,
        }),
        _ => None,
    }
}

/// Formats the program renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramTarget {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    uniforms: UniformBlock,
}

/// A vertex/fragment pair linked into a render pipeline, plus named uniforms.
///
/// Uniform values live in a CPU-side block; the renderer snapshots it per
/// draw and uploads the snapshots with dynamic offsets.
#[derive(Default)]
pub struct ShaderProgram {
    linked: Option<LinkedProgram>,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile, link and replace the current program.
    ///
    /// On failure the program is left not loaded and the error is logged
    /// before being returned.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        target: &ProgramTarget,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<(), ShaderError> {
        self.linked = None;
        let result = CompiledProgram::compile(vertex_source, fragment_source)
            .and_then(|compiled| link(device, target, &compiled));
        match result {
            Ok(linked) => {
                tracing::debug!(
                    uniforms = linked.uniforms.layout().members().len(),
                    "shader program linked"
                );
                self.linked = Some(linked);
                Ok(())
            }
            Err(err) => {
                tracing::error!("{err}");
                Err(err)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.linked.is_some()
    }

    /// Drop the pipeline and uniforms. Returns whether anything was loaded.
    pub fn unload(&mut self) -> bool {
        self.linked.take().is_some()
    }

    /// Set the pipeline on `pass`. Returns `false` (and does nothing) when not loaded.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        match &self.linked {
            Some(linked) => {
                pass.set_pipeline(&linked.pipeline);
                true
            }
            None => false,
        }
    }

    pub fn uniforms(&self) -> Option<&UniformBlock> {
        self.linked.as_ref().map(|linked| &linked.uniforms)
    }

    pub fn uniforms_mut(&mut self) -> Option<&mut UniformBlock> {
        self.linked.as_mut().map(|linked| &mut linked.uniforms)
    }

    /// Layout of the dynamic-offset uniform binding, if the program has one.
    pub fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.linked.as_ref()?.bind_group_layout.as_ref()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_bool(name, value);
        }
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_int(name, value);
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_float(name, value);
        }
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_vec2(name, value);
        }
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_vec3(name, value);
        }
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_vec4(name, value);
        }
    }

    pub fn set_mat2(&mut self, name: &str, value: &Mat2) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_mat2(name, value);
        }
    }

    pub fn set_mat3(&mut self, name: &str, value: &Mat3) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_mat3(name, value);
        }
    }

    pub fn set_mat4(&mut self, name: &str, value: &Mat4) {
        if let Some(uniforms) = self.uniforms_mut() {
            uniforms.set_mat4(name, value);
        }
    }
}

/// Create the pipeline inside a validation scope so that any GPU-side
/// rejection surfaces as a link error instead of an uncaptured one.
fn link(
    device: &wgpu::Device,
    target: &ProgramTarget,
    compiled: &CompiledProgram,
) -> Result<LinkedProgram, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sphere_vertex_shader"),
        source: wgpu::ShaderSource::Wgsl(compiled.vertex.source.as_str().into()),
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sphere_fragment_shader"),
        source: wgpu::ShaderSource::Wgsl(compiled.fragment.source.as_str().into()),
    });

    let uniform_size = compiled.uniforms.size();
    let bind_group_layout = (uniform_size > 0).then(|| {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("program_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_size as u64),
                },
                count: None,
            }],
        })
    });
    let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layout.iter().collect();
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("program_pipeline_layout"),
        bind_group_layouts: &bind_group_layouts,
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sphere_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some(compiled.vertex.entry_point.as_str()),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: Vertex::STRIDE as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some(compiled.fragment.entry_point.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: target.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(ShaderError::Link(err.to_string()));
    }

    Ok(LinkedProgram {
        pipeline,
        bind_group_layout,
        uniforms: UniformBlock::new(compiled.uniforms.clone()),
    })
}
