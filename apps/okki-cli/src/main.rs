use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use okki_common::transform;
use okki_input::{ControllerConfig, KeyboardState, is_known_key};
use okki_render::{
    DrawCall, FrameStats, Material, Mesh, RecordingDevice, Renderer, Resources, geometry,
};
use okki_scene::{Camera, Controller, Node, NodeId, Perspective, SceneGraph};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "okki-cli", about = "Headless okki tool")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Render the demo scene headlessly and print every draw call
    Render {
        /// Number of frames to render
        #[arg(short, long, default_value = "1")]
        frames: u32,
        /// Seconds between frames
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Scale of the demo cube as x or x,y,z
        #[arg(long, value_parser = parse_scale)]
        scale: Option<ScaleArg>,
        /// Background color as r,g,b in [0, 1]
        #[arg(long, value_parser = parse_color, default_value = "0.1,0.1,0.15")]
        clear_color: Vec3,
        /// Keys held for every frame, e.g. --hold w --hold q
        #[arg(long)]
        hold: Vec<String>,
        /// Controller configuration (YAML)
        #[arg(long)]
        controls: Option<PathBuf>,
    },
    /// Validate a controller configuration and print its bindings
    Controls {
        /// Configuration file; the defaults are printed when omitted
        path: Option<PathBuf>,
    },
}

/// Scale as given on the command line; `y` and `z` follow the defaulting
/// rule of `transform::scale_parts`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScaleArg {
    x: f32,
    y: Option<f32>,
    z: Option<f32>,
}

fn parse_floats(s: &str) -> Result<Vec<f32>, String> {
    s.split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{p:?}: {e}")))
        .collect()
}

fn parse_color(s: &str) -> Result<Vec3, String> {
    match parse_floats(s)?[..] {
        [r, g, b] => Ok(Vec3::new(r, g, b)),
        ref parts => Err(format!("expected r,g,b, got {} components", parts.len())),
    }
}

fn parse_scale(s: &str) -> Result<ScaleArg, String> {
    match parse_floats(s)?[..] {
        [x] => Ok(ScaleArg {
            x,
            y: None,
            z: None,
        }),
        [x, y] => Ok(ScaleArg {
            x,
            y: Some(y),
            z: None,
        }),
        [x, y, z] => Ok(ScaleArg {
            x,
            y: Some(y),
            z: Some(z),
        }),
        ref parts => Err(format!("expected 1 to 3 components, got {}", parts.len())),
    }
}

/// A small scene on a recording device: a cube with a sphere child, a
/// point-cloud pyramid, and a controller carrying the camera.
struct Headless {
    device: RecordingDevice,
    graph: SceneGraph,
    resources: Resources,
    renderer: Renderer,
    controller: Controller,
    scene: NodeId,
    camera: NodeId,
    cube: NodeId,
}

impl Headless {
    fn build(config: ControllerConfig, clear_color: Vec3) -> Result<Self> {
        let mut device = RecordingDevice::new();
        let renderer = Renderer::new(&mut device, clear_color);
        let mut resources = Resources::new();
        let mut graph = SceneGraph::new();
        let scene = graph.insert(Node::group().with_name("scene"));

        let surface = resources.add_material(Material::surface(&mut device)?);
        let points = resources.add_material(Material::point(&mut device)?);
        let cube_geometry = resources.add_geometry(&mut device, geometry::cuboid(1.0, 1.0, 1.0))?;
        let sphere_geometry =
            resources.add_geometry(&mut device, geometry::sphere(0.5, 16, 8)?)?;
        let pyramid_geometry =
            resources.add_geometry(&mut device, geometry::pyramid(1.0, 1.0, 4)?)?;

        let cube = Mesh::new(&mut device, &resources, cube_geometry, surface)?;
        let cube = graph.insert(Node::mesh(cube).with_name("cube"));
        graph.add(scene, cube)?;
        graph.translate(cube, 0.0, 0.0, -5.0, true)?;

        let moon = Mesh::new(&mut device, &resources, sphere_geometry, surface)?;
        let moon = graph.insert(Node::mesh(moon).with_name("moon"));
        graph.add(cube, moon)?;
        graph.translate(moon, 2.0, 0.0, 0.0, true)?;

        let cloud = Mesh::new(&mut device, &resources, pyramid_geometry, points)?;
        let cloud = graph.insert(Node::mesh(cloud).with_name("cloud"));
        graph.add(scene, cloud)?;
        graph.set_position(cloud, -2.0, 0.0, -6.0)?;

        let camera = graph.insert(Node::camera(Camera::new(Perspective::default())));
        let controller = Controller::spawn(&mut graph, config)?;
        graph.add(scene, controller.body())?;
        controller.add(&mut graph, camera)?;

        Ok(Self {
            device,
            graph,
            resources,
            renderer,
            controller,
            scene,
            camera,
            cube,
        })
    }

    fn scale_cube(&mut self, scale: ScaleArg) -> Result<()> {
        self.graph
            .scale(self.cube, scale.x, scale.y, scale.z, true)
            .context("invalid --scale")?;
        Ok(())
    }

    /// Step the controller and render one frame, returning its draw calls.
    fn frame(&mut self, keys: &KeyboardState, dt: f32) -> Result<(FrameStats, Vec<DrawCall>)> {
        self.controller.update(&mut self.graph, keys, dt)?;
        self.device.clear_log();
        let stats = self.renderer.render(
            &mut self.device,
            &mut self.graph,
            &self.resources,
            self.scene,
            self.camera,
        )?;
        Ok((stats, self.device.draws().to_vec()))
    }
}

fn load_controls(path: Option<&PathBuf>) -> Result<ControllerConfig> {
    match path {
        Some(path) => ControllerConfig::load(path)
            .with_context(|| format!("loading controls from {}", path.display())),
        None => Ok(ControllerConfig::default()),
    }
}

fn describe(draw: &DrawCall) -> String {
    let position = draw
        .uniform("modelMatrix")
        .and_then(|u| u.as_mat4())
        .map(|m| transform::position_of(&m))
        .unwrap_or(Vec3::ZERO);
    format!(
        "{} {} {:?} x{} at ({:.3}, {:.3}, {:.3}) cull={} point_size={}",
        draw.program,
        draw.vertex_array,
        draw.mode,
        draw.count,
        position.x,
        position.y,
        position.z,
        draw.state.cull_back_faces,
        draw.state.point_size
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("okki-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", okki_common::crate_info());
            println!("scene: {}", okki_scene::crate_info());
            println!("input: {}", okki_input::crate_info());
            println!("render: {}", okki_render::crate_info());
        }
        Commands::Render {
            frames,
            dt,
            scale,
            clear_color,
            hold,
            controls,
        } => {
            let config = load_controls(controls.as_ref())?;
            let mut headless = Headless::build(config, clear_color)?;
            if let Some(scale) = scale {
                headless.scale_cube(scale)?;
            }

            let mut keys = KeyboardState::new();
            for key in &hold {
                if !is_known_key(key) {
                    anyhow::bail!("unknown key {key:?}");
                }
                keys.press(key);
            }

            for frame in 0..frames {
                let (stats, draws) = headless.frame(&keys, dt)?;
                keys.begin_frame();
                println!(
                    "frame {frame}: {} draws, {} hidden, {} stale",
                    stats.draw_calls, stats.hidden, stats.stale
                );
                for draw in &draws {
                    println!("  {}", describe(draw));
                }
            }
        }
        Commands::Controls { path } => {
            let config = load_controls(path.as_ref())?;
            println!(
                "move_speed: {}  turn_speed: {}  local: {}",
                config.move_speed, config.turn_speed, config.local
            );
            for action in okki_input::Action::ALL {
                let key = config.bindings.key(action).unwrap_or("-");
                println!("  {:<16} {key}", action.name());
            }
        }
    }

    Ok(())
}
