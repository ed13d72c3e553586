mod keys;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use okki_common::{GeometryId, MaterialId};
use okki_input::{ControllerConfig, KeyboardState};
use okki_render::geometry;
use okki_render::{Device, LineType, Material, Mesh, Renderer, Resources};
use okki_render_wgpu::WgpuDevice;
use okki_scene::{Camera, Controller, Node, NodeId, Perspective, SceneGraph};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "okki-desktop", about = "Okki scene viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Controller configuration (YAML)
    #[arg(long)]
    controls: Option<PathBuf>,

    /// Background color as r,g,b in [0, 1]
    #[arg(long, value_parser = parse_color, default_value = "0.1,0.1,0.15")]
    clear_color: Vec3,
}

fn parse_color(s: &str) -> Result<Vec3, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [r, g, b] => Ok(Vec3::new(r, g, b)),
        _ => Err(format!("expected r,g,b, got {} components", parts.len())),
    }
}

/// Scene state driven by the window loop.
struct Viewer {
    graph: SceneGraph,
    resources: Resources,
    renderer: Renderer,
    controller: Controller,
    keyboard: KeyboardState,
    scene: NodeId,
    camera: NodeId,
    spinner: NodeId,
    last_frame: Instant,
}

impl Viewer {
    fn build(
        device: &mut dyn Device,
        config: ControllerConfig,
        clear_color: Vec3,
        aspect: f32,
    ) -> Result<Self> {
        let renderer = Renderer::new(device, clear_color);
        let mut resources = Resources::new();
        let mut graph = SceneGraph::new();
        let scene = graph.insert(Node::group().with_name("scene"));

        let mut surface = Material::surface(device)?;
        surface.set_property("useVertexColors", true)?;
        let surface = resources.add_material(surface);

        let mut wire = Material::surface(device)?;
        wire.set_properties([
            ("baseColor", Vec3::new(0.9, 0.9, 0.3).into()),
            ("wireframe", true.into()),
            ("double_sided", true.into()),
        ])?;
        let wire = resources.add_material(wire);

        let mut dots = Material::point(device)?;
        dots.set_property("baseColor", Vec3::new(0.3, 0.9, 1.0))?;
        let dots = resources.add_material(dots);

        let mut outline = Material::line(device)?;
        outline.set_property("line_type", LineType::Segmented)?;
        let outline = resources.add_material(outline);

        let floor = resources.add_geometry(device, geometry::plane(20.0, 20.0, 10, 10)?)?;
        let cube = resources.add_geometry(device, geometry::cuboid(1.0, 1.0, 1.0))?;
        let globe = resources.add_geometry(device, geometry::sphere(0.6, 24, 12)?)?;
        let tip = resources.add_geometry(device, geometry::pyramid(0.6, 1.2, 4)?)?;
        let ring = resources.add_geometry(device, geometry::polygon(32, 1.5)?)?;

        let mut place = |graph: &mut SceneGraph,
                         parent: NodeId,
                         g: GeometryId,
                         m: MaterialId,
                         name: &str,
                         at: Vec3|
         -> Result<NodeId> {
            let renderable = Mesh::new(device, &resources, g, m)?;
            let id = graph.insert(Node::mesh(renderable).with_name(name));
            graph.add(parent, id)?;
            graph.set_position(id, at.x, at.y, at.z)?;
            Ok(id)
        };

        let floor = place(&mut graph, scene, floor, wire, "floor", Vec3::new(0.0, -1.0, 0.0))?;
        graph.x_rotation(floor, -std::f32::consts::FRAC_PI_2, true)?;
        let spinner = place(
            &mut graph,
            scene,
            cube,
            surface,
            "spinner",
            Vec3::new(0.0, 0.0, -4.0),
        )?;
        place(&mut graph, spinner, globe, dots, "satellite", Vec3::new(2.0, 0.0, 0.0))?;
        place(&mut graph, scene, tip, surface, "marker", Vec3::new(-3.0, 0.0, -6.0))?;
        place(&mut graph, spinner, ring, outline, "orbit", Vec3::ZERO)?;

        let perspective = Perspective {
            aspect,
            ..Perspective::default()
        };
        let camera = graph.insert(Node::camera(Camera::new(perspective)).with_name("camera"));
        let controller = Controller::spawn(&mut graph, config)?;
        graph.add(scene, controller.body())?;
        controller.add(&mut graph, camera)?;
        graph.set_position(controller.body(), 0.0, 0.5, 3.0)?;

        tracing::info!(
            "scene ready: {} nodes, {} geometries, {} materials",
            graph.len(),
            resources.geometry_count(),
            resources.material_count()
        );

        Ok(Self {
            graph,
            resources,
            renderer,
            controller,
            keyboard: KeyboardState::new(),
            scene,
            camera,
            spinner,
            last_frame: Instant::now(),
        })
    }

    fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        let Some(name) = keys::key_name(code) else {
            return;
        };
        if pressed {
            self.keyboard.press(name);
        } else {
            self.keyboard.release(name);
        }
    }

    /// Keep the camera's aspect ratio in step with the window.
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.graph.set_viewport(self.camera, width, height)?;
        Ok(())
    }

    /// Advance the scene by the time since the previous frame and record
    /// the frame's draws.
    fn frame(&mut self, device: &mut WgpuDevice) -> Result<()> {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        self.controller.update(&mut self.graph, &self.keyboard, dt)?;
        self.keyboard.begin_frame();
        self.graph.y_rotation(self.spinner, 0.5 * dt, true)?;

        let stats = self.renderer.render(
            device,
            &mut self.graph,
            &self.resources,
            self.scene,
            self.camera,
        )?;
        tracing::trace!("{} draws", stats.draw_calls);
        Ok(())
    }

    fn release(mut self, device: &mut dyn Device) {
        if let Ok(nodes) = self.graph.destroy(self.scene) {
            for node in nodes {
                if let Some(renderable) = node.renderable {
                    Mesh::release(device, &renderable);
                }
            }
        }
        self.resources.release(device);
    }
}

struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: WgpuDevice,
}

struct App {
    controls: Option<PathBuf>,
    clear_color: Vec3,
    gpu: Option<Gpu>,
    viewer: Option<Viewer>,
}

impl App {
    fn new(cli: Cli) -> Self {
        Self {
            controls: cli.controls,
            clear_color: cli.clear_color,
            gpu: None,
            viewer: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("okki")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
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
        .context("no compatible GPU adapter")?;

        let required_features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("okki_device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut device = WgpuDevice::new(device, queue, surface_format, config.width, config.height);

        let controls = match &self.controls {
            Some(path) => ControllerConfig::load(path)
                .with_context(|| format!("loading controls from {}", path.display()))?,
            None => ControllerConfig::default(),
        };
        let aspect = config.width as f32 / config.height as f32;
        let viewer = Viewer::build(&mut device, controls, self.clear_color, aspect)?;

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        self.gpu = Some(Gpu {
            window,
            surface,
            config,
            device,
        });
        self.viewer = Some(viewer);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(gpu), Some(viewer)) = (&mut self.gpu, &mut self.viewer) else {
            return Ok(());
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(gpu.device.device(), &gpu.config);
                return Ok(());
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        match viewer.frame(&mut gpu.device) {
            Ok(()) => gpu.device.present(&view),
            // A failed frame draws nothing; the next one starts fresh.
            Err(e) => tracing::warn!("frame skipped: {e:#}"),
        }
        output.present();
        gpu.window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            tracing::error!("startup failed: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(gpu.device.device(), &gpu.config);
                    gpu.device.resize(gpu.config.width, gpu.config.height);
                    if let Some(viewer) = &mut self.viewer {
                        if let Err(e) = viewer.resize(gpu.config.width, gpu.config.height) {
                            tracing::error!("resize failed: {e:#}");
                        }
                    }
                }
            }
            WindowEvent::Focused(false) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.keyboard.release_all();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    event_loop.exit();
                    return;
                }
                if let Some(viewer) = &mut self.viewer {
                    viewer.handle_key(code, state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    tracing::error!("{e:#}");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(viewer), Some(gpu)) = (self.viewer.take(), &mut self.gpu) {
            viewer.release(&mut gpu.device);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("okki-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(cli);
    event_loop.run_app(&mut app)?;

    Ok(())
}
