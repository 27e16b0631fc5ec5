use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use glam::Vec3;
use spherefield_mesh::{DEFAULT_RADIUS, DEFAULT_SECTORS, DEFAULT_STACKS, Mesh, SphereParams};
use spherefield_render::{RecordingRenderer, Renderer, UniformLayout, UniformType};
use spherefield_render_wgpu::{CompiledProgram, FlyCamera};
use spherefield_scene::Scene;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spherefield-cli", about = "Headless tools for the sphere-field demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Generate a sphere mesh and print its statistics
    Mesh {
        #[arg(long, default_value_t = DEFAULT_SECTORS)]
        sectors: u32,
        #[arg(long, default_value_t = DEFAULT_STACKS)]
        stacks: u32,
        #[arg(long, default_value_t = DEFAULT_RADIUS)]
        radius: f32,
    },
    /// Dump the default scene as JSON
    Scene {
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },
    /// Compile a vertex/fragment pair and list its uniforms
    ShaderCheck { vertex: PathBuf, fragment: PathBuf },
    /// Render frames of the default scene without a window and summarize them
    Frames {
        /// Number of frames to record
        #[arg(short, long, default_value_t = 1)]
        count: u32,
        /// Seconds of forward camera motion between frames
        #[arg(long, default_value_t = 0.0)]
        step: f32,
    },
}

impl Commands {
    /// The subcommand as typed on the command line.
    fn name(&self) -> &'static str {
        match self {
            Commands::Info => "info",
            Commands::Mesh { .. } => "mesh",
            Commands::Scene { .. } => "scene",
            Commands::ShaderCheck { .. } => "shader-check",
            Commands::Frames { .. } => "frames",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
    tracing::debug!(command = cli.command.name(), "spherefield-cli starting");

    match cli.command {
        Commands::Info => {
            println!("spherefield-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", spherefield_render::crate_info());
            println!("input: {}", spherefield_input::crate_info());
            println!(
                "vertex layout: {} floats, stride {} bytes",
                spherefield_common::Vertex::FLOATS,
                spherefield_common::Vertex::STRIDE
            );
        }
        Commands::Mesh {
            sectors,
            stacks,
            radius,
        } => {
            let mesh = Mesh::sphere(SphereParams {
                radius,
                sectors,
                stacks,
            })?;
            print!("{}", mesh_report(&mesh, radius));
        }
        Commands::Scene { pretty } => {
            let scene = Scene::sphere_field();
            let json = if pretty {
                serde_json::to_string_pretty(&scene)?
            } else {
                serde_json::to_string(&scene)?
            };
            println!("{json}");
        }
        Commands::ShaderCheck { vertex, fragment } => {
            let program = CompiledProgram::compile(&read(&vertex)?, &read(&fragment)?)?;
            print!("{}", shader_report(&program));
        }
        Commands::Frames { count, step } => {
            let renderer = record_frames(count, step)?;
            print!("{}", renderer.summary());
        }
    }

    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn mesh_report(mesh: &Mesh, radius: f32) -> String {
    let max_error = mesh
        .vertices()
        .iter()
        .map(|v| (v.position().length() - radius).abs())
        .fold(0.0_f32, f32::max);
    format!(
        "vertices: {}\ntriangles: {}\nfloats: {}\nbounding radius: {:.6}\nmax radius error: {:.3e}\n",
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.as_floats().len(),
        mesh.bounding_radius(),
        max_error
    )
}

fn type_name(ty: UniformType) -> String {
    match ty {
        UniformType::Scalar(kind) => format!("{kind:?}").to_lowercase(),
        UniformType::Vector { size, kind } => {
            format!("vec{size}<{}>", format!("{kind:?}").to_lowercase())
        }
        UniformType::Matrix { columns, rows } => format!("mat{columns}x{rows}"),
    }
}

fn shader_report(program: &CompiledProgram) -> String {
    let mut out = format!(
        "vertex entry: {}\nfragment entry: {}\nuniform block: {} bytes\n",
        program.vertex.entry_point,
        program.fragment.entry_point,
        program.uniforms.size()
    );
    for member in program.uniforms.members() {
        out.push_str(&format!(
            "  {:>4}  {:<12} {}\n",
            member.offset,
            member.name,
            type_name(member.ty)
        ));
    }
    out
}

/// Drive the default scene through a headless renderer, flying forward `step`
/// seconds per frame from the desktop app's starting point.
fn record_frames(count: u32, step: f32) -> anyhow::Result<RecordingRenderer> {
    let mesh = Mesh::sphere(SphereParams::default())?;
    let scene = Scene::sphere_field();
    let mut camera = FlyCamera::new(Vec3::new(0.0, 5.0, 15.0));
    let mut renderer = RecordingRenderer::new(Some(UniformLayout::mvp()), mesh.vertex_count());
    renderer.set_projection_matrix(camera.projection_matrix());

    for _ in 0..count {
        match scene.render(&mut renderer, camera.view_matrix()) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        camera.move_forward(camera.speed * step);
    }
    Ok(renderer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spherefield_render_wgpu::{SPHERE_FRAGMENT_SHADER, SPHERE_VERTEX_SHADER};

    #[test]
    fn command_names_match_the_command_line() {
        for args in [
            vec!["info"],
            vec!["mesh", "--sectors", "8"],
            vec!["scene", "--pretty"],
            vec!["shader-check", "a.wgsl", "b.wgsl"],
            vec!["frames", "-c", "2"],
        ] {
            let cli = Cli::try_parse_from(std::iter::once("spherefield-cli").chain(args.clone()))
                .unwrap();
            assert_eq!(cli.command.name(), args[0]);
        }
    }

    #[test]
    fn mesh_report_lists_counts() {
        let mesh = Mesh::sphere(SphereParams {
            radius: 0.5,
            sectors: 4,
            stacks: 2,
        })
        .unwrap();
        let report = mesh_report(&mesh, 0.5);
        assert!(report.contains("vertices: 48"));
        assert!(report.contains("triangles: 16"));
        assert!(report.contains("floats: 288"));
    }

    #[test]
    fn shader_report_lists_mvp() {
        let program =
            CompiledProgram::compile(SPHERE_VERTEX_SHADER, SPHERE_FRAGMENT_SHADER).unwrap();
        let report = shader_report(&program);
        assert!(report.contains("uniform block: 192 bytes"));
        assert!(report.contains("model"));
        assert!(report.contains("  128  projection   mat4x4"));
    }

    #[test]
    fn recorded_frames_draw_every_instance() {
        let renderer = record_frames(3, 0.5).unwrap();
        assert_eq!(renderer.frames().len(), 3);
        for frame in renderer.frames() {
            assert_eq!(frame.draws.len(), Scene::sphere_field().len());
        }
        assert_ne!(renderer.frames()[0].view, renderer.frames()[2].view);
    }

    #[test]
    fn type_names_read_like_wgsl() {
        use spherefield_render::ScalarKind;
        assert_eq!(type_name(UniformType::Scalar(ScalarKind::Float)), "float");
        assert_eq!(
            type_name(UniformType::Vector {
                size: 3,
                kind: ScalarKind::Uint
            }),
            "vec3<uint>"
        );
        assert_eq!(
            type_name(UniformType::Matrix {
                columns: 4,
                rows: 4
            }),
            "mat4x4"
        );
    }
}
