use anyhow::Result;
use clap::Parser;
use glam::Vec3;
use spherefield_input::{Action, CursorTracker, InputState, Key};
use spherefield_mesh::{DEFAULT_RADIUS, DEFAULT_SECTORS, DEFAULT_STACKS, Mesh, SphereParams};
use spherefield_render::Renderer;
use spherefield_render_wgpu::{
    DEFAULT_SHADER_DIRS, FlyCamera, RendererSettings, ShaderSearch, WgpuRenderer,
};
use spherefield_scene::Scene;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, WindowId};

/// Exit status when the renderer cannot be brought up.
const INIT_FAILURE_EXIT_CODE: i32 = -1;

#[derive(Parser, Debug)]
#[command(name = "spherefield-desktop", about = "Fly around a field of spheres")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Window width in pixels
    #[arg(long, default_value_t = 1000)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 1000)]
    height: u32,

    /// Window title
    #[arg(long, default_value = "Spherefield")]
    title: String,

    /// Directory holding sphere.vert.wgsl and sphere.frag.wgsl; repeat to search several in order
    #[arg(long = "shader-dir", value_name = "DIR")]
    shader_dirs: Vec<PathBuf>,

    /// Sphere longitude subdivisions
    #[arg(long, default_value_t = DEFAULT_SECTORS)]
    sectors: u32,

    /// Sphere latitude subdivisions
    #[arg(long, default_value_t = DEFAULT_STACKS)]
    stacks: u32,

    /// Camera speed in units per second
    #[arg(long, default_value_t = 5.0)]
    speed: f32,

    /// Degrees of rotation per pixel of mouse motion
    #[arg(long, default_value_t = 0.1)]
    sensitivity: f32,
}

impl Cli {
    fn renderer_settings(&self) -> RendererSettings {
        let shader_search = if self.shader_dirs.is_empty() {
            ShaderSearch::from_dirs(DEFAULT_SHADER_DIRS)
        } else {
            ShaderSearch::from_dirs(&self.shader_dirs)
        };
        RendererSettings {
            width: self.width,
            height: self.height,
            title: self.title.clone(),
            shader_search,
        }
    }
}

fn key_from_code(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::Space => Some(Key::Space),
        KeyCode::ShiftLeft => Some(Key::LeftShift),
        KeyCode::Escape => Some(Key::Escape),
        _ => None,
    }
}

/// Counts frames and reports the count once per elapsed second.
struct FpsCounter {
    frames: u32,
    window_start: Instant,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
        }
    }

    fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames;
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

/// Everything the window callbacks mutate besides the renderer.
struct AppContext {
    camera: FlyCamera,
    input: InputState,
    cursor: CursorTracker,
    scene: Scene,
    cursor_locked: bool,
    last_frame: Instant,
    fps: FpsCounter,
}

impl AppContext {
    fn new(cli: &Cli) -> Self {
        let mut camera = FlyCamera::new(Vec3::new(0.0, 5.0, 15.0));
        camera.speed = cli.speed;
        camera.sensitivity = cli.sensitivity;
        camera.set_aspect(cli.width, cli.height);
        let now = Instant::now();
        Self {
            camera,
            input: InputState::new(),
            cursor: CursorTracker::new(),
            scene: Scene::sphere_field(),
            cursor_locked: false,
            last_frame: now,
            fps: FpsCounter::new(now),
        }
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState) {
        if let Some(key) = key_from_code(code) {
            self.input.set_key(key, state == ElementState::Pressed);
        }
    }

    fn cursor_moved(&mut self, x: f64, y: f64) {
        let offset = self.cursor.on_cursor_moved(x, y);
        self.camera.look(offset.x, offset.y);
    }

    /// Move the camera along every held movement action.
    fn update(&mut self, dt: f32) {
        let distance = self.camera.speed * dt;
        for action in self.input.active_actions() {
            match action {
                Action::MoveForward => self.camera.move_forward(distance),
                Action::MoveBackward => self.camera.move_backward(distance),
                Action::MoveLeft => self.camera.move_left(distance),
                Action::MoveRight => self.camera.move_right(distance),
                Action::MoveUp => self.camera.move_up(distance),
                Action::MoveDown => self.camera.move_down(distance),
                Action::Close => {}
            }
        }
    }

    fn release_all(&mut self) {
        self.input.clear();
        self.cursor.reset();
    }
}

struct GpuApp {
    settings: RendererSettings,
    mesh: Mesh,
    context: AppContext,
    renderer: Option<WgpuRenderer>,
    exit_code: i32,
}

impl GpuApp {
    fn new(cli: &Cli, mesh: Mesh) -> Self {
        Self {
            settings: cli.renderer_settings(),
            mesh,
            context: AppContext::new(cli),
            renderer: None,
            exit_code: 0,
        }
    }

    fn grab_cursor(&mut self) {
        let Some(window) = self.renderer.as_ref().and_then(WgpuRenderer::window) else {
            return;
        };
        window.set_cursor_visible(false);
        if window.set_cursor_grab(CursorGrabMode::Locked).is_ok() {
            self.context.cursor_locked = true;
        } else if let Err(err) = window.set_cursor_grab(CursorGrabMode::Confined) {
            tracing::warn!("cursor grab unavailable: {err}");
        }
        tracing::debug!(locked = self.context.cursor_locked, "cursor grabbed");
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        let ctx = &mut self.context;

        let now = Instant::now();
        let dt = now.duration_since(ctx.last_frame).as_secs_f32();
        ctx.last_frame = now;
        if let Some(fps) = ctx.fps.tick(now) {
            tracing::info!("FPS: {fps}");
        }

        renderer.process_input(&ctx.input);
        ctx.update(dt);

        if let Err(err) = ctx.scene.render(renderer, ctx.camera.view_matrix()) {
            tracing::error!("rendering stopped: {err}");
            self.exit_code = INIT_FAILURE_EXIT_CODE;
            event_loop.exit();
            return;
        }
        if let Some(window) = renderer.window() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        match WgpuRenderer::initialize(event_loop, &self.settings, self.mesh.vertices()) {
            Ok(mut renderer) => {
                let size = renderer.size();
                self.context.camera.set_aspect(size.width, size.height);
                renderer.set_projection_matrix(self.context.camera.projection_matrix());
                self.renderer = Some(renderer);
                self.grab_cursor();
                tracing::info!(
                    instances = self.context.scene.len(),
                    "WASD to move, Space/LeftShift for up/down, mouse to look, Escape to quit"
                );
            }
            Err(err) => {
                tracing::error!("failed to initialize renderer: {err}");
                self.exit_code = INIT_FAILURE_EXIT_CODE;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        renderer.handle_window_event(&event);

        match event {
            WindowEvent::Resized(size) => {
                self.context.camera.set_aspect(size.width, size.height);
                renderer.set_projection_matrix(self.context.camera.projection_matrix());
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => self.context.handle_key(code, state),
            WindowEvent::CursorMoved { position, .. } if !self.context.cursor_locked => {
                self.context.cursor_moved(position.x, position.y);
            }
            WindowEvent::Focused(false) => self.context.release_all(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }

        if self.renderer.as_ref().is_some_and(WgpuRenderer::should_close) {
            event_loop.exit();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event
            && self.context.cursor_locked
        {
            // raw motion grows downward; looking up wants a positive offset
            self.context.camera.look(delta.0 as f32, -delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.renderer.as_ref().and_then(WgpuRenderer::window) {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("spherefield-desktop starting");

    let mesh = Mesh::sphere(SphereParams {
        radius: DEFAULT_RADIUS,
        sectors: cli.sectors,
        stacks: cli.stacks,
    })?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(&cli, mesh);
    event_loop.run_app(&mut app)?;

    let exit_code = app.exit_code;
    drop(app);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("spherefield-desktop").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_demo() {
        let cli = cli(&[]);
        assert_eq!((cli.width, cli.height), (1000, 1000));
        assert_eq!(cli.title, "Spherefield");
        assert_eq!((cli.sectors, cli.stacks), (32, 16));
        assert_eq!(cli.speed, 5.0);
        assert_eq!(cli.sensitivity, 0.1);

        let settings = cli.renderer_settings();
        assert_eq!(settings.shader_search, ShaderSearch::default());
    }

    #[test]
    fn shader_dirs_keep_command_line_order() {
        let cli = cli(&["--shader-dir", "b", "--shader-dir", "a"]);
        let search = cli.renderer_settings().shader_search;
        let dirs: Vec<_> = search
            .candidates()
            .iter()
            .map(|paths| paths.vertex.parent().unwrap().to_path_buf())
            .collect();
        assert_eq!(dirs, vec![PathBuf::from("b"), PathBuf::from("a")]);
    }

    #[test]
    fn keys_map_to_bindable_keys() {
        assert_eq!(key_from_code(KeyCode::KeyW), Some(Key::W));
        assert_eq!(key_from_code(KeyCode::ShiftLeft), Some(Key::LeftShift));
        assert_eq!(key_from_code(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(key_from_code(KeyCode::ControlLeft), None);
    }

    #[test]
    fn fps_reports_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        for i in 1..60 {
            assert_eq!(fps.tick(start + Duration::from_millis(i * 16)), None);
        }
        assert_eq!(fps.tick(start + Duration::from_millis(1000)), Some(60));
        assert_eq!(fps.tick(start + Duration::from_millis(1016)), None);
    }

    #[test]
    fn held_keys_move_camera_by_speed_times_dt() {
        let mut ctx = AppContext::new(&cli(&["--speed", "2"]));
        let start = ctx.camera.position;
        ctx.handle_key(KeyCode::KeyW, ElementState::Pressed);
        ctx.handle_key(KeyCode::Space, ElementState::Pressed);
        ctx.update(0.5);
        let expected = start + ctx.camera.front() + Vec3::Y;
        assert!(ctx.camera.position.abs_diff_eq(expected, 1e-5));

        ctx.handle_key(KeyCode::KeyW, ElementState::Released);
        ctx.handle_key(KeyCode::Space, ElementState::Released);
        ctx.update(0.5);
        assert!(ctx.camera.position.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn first_cursor_event_does_not_turn_camera() {
        let mut ctx = AppContext::new(&cli(&[]));
        let yaw = ctx.camera.yaw();
        ctx.cursor_moved(500.0, 500.0);
        assert_eq!(ctx.camera.yaw(), yaw);
        ctx.cursor_moved(510.0, 490.0);
        assert!((ctx.camera.yaw() - (yaw + 1.0)).abs() < 1e-4);
        assert!((ctx.camera.pitch() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn escape_is_an_input_action() {
        let mut ctx = AppContext::new(&cli(&[]));
        ctx.handle_key(KeyCode::Escape, ElementState::Pressed);
        assert!(ctx.input.is_active(Action::Close));
        ctx.release_all();
        assert!(!ctx.input.is_active(Action::Close));
    }
}
