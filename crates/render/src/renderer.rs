use crate::device::Device;
use crate::error::RenderError;
use crate::geometry::GeometryError;
use crate::resources::Resources;
use crate::uniform::UniformValue;
use glam::Vec3;
use okki_scene::{NodeId, SceneGraph};

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub draw_calls: usize,
    /// Renderables skipped because they are hidden.
    pub hidden: usize,
    /// Renderables skipped because their material's program changed after
    /// their attributes were bound.
    pub stale: usize,
}

/// Per-frame scene traversal.
///
/// The renderer keeps no per-scene state: each frame re-derives every
/// matrix from the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderer {
    clear_color: Vec3,
}

impl Renderer {
    /// Set the clear color and enable depth testing and alpha blending.
    pub fn new(device: &mut dyn Device, clear_color: Vec3) -> Self {
        device.set_clear_color(clear_color.extend(1.0));
        device.enable_depth_test();
        device.enable_alpha_blending();
        Self { clear_color }
    }

    pub fn clear_color(&self) -> Vec3 {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, device: &mut dyn Device, color: Vec3) {
        self.clear_color = color;
        device.set_clear_color(color.extend(1.0));
    }

    /// Draw every visible renderable under `root` (pre-order, `root`
    /// included) as seen from `camera`.
    ///
    /// The camera's view is refreshed first; if that fails the frame is
    /// abandoned before any draw call.
    pub fn render(
        &self,
        device: &mut dyn Device,
        graph: &mut SceneGraph,
        resources: &Resources,
        root: NodeId,
        camera: NodeId,
    ) -> Result<FrameStats, RenderError> {
        let _span = tracing::info_span!("render_frame").entered();

        device.clear();
        graph.update_view(camera)?;
        let (view, projection) = {
            let cam = graph.camera(camera)?;
            (cam.view(), cam.projection())
        };

        let mut stats = FrameStats::default();
        for id in graph.descendants(root)? {
            let node = graph.get(id)?;
            let Some(renderable) = node.renderable else {
                continue;
            };
            if !renderable.visible {
                stats.hidden += 1;
                continue;
            }
            let material = resources.material(renderable.material)?;
            if material.program() != renderable.bound_program {
                tracing::warn!(
                    "skipping {} ({id}): bound to {} but {} now uses {}",
                    node.label(),
                    renderable.bound_program,
                    material.label(),
                    material.program()
                );
                stats.stale += 1;
                continue;
            }
            let geometry = resources.geometry(renderable.geometry)?;
            let count = geometry.vertex_count().ok_or_else(|| {
                RenderError::MissingResource(format!("{} has no vertex count", renderable.geometry))
            })?;

            device.use_program(material.program())?;
            device.bind_vertex_array(renderable.vertex_array)?;
            let m = material.matrices();
            device.upload_uniform(m.model, &UniformValue::Mat4(graph.global_transform(id)?))?;
            device.upload_uniform(m.view, &UniformValue::Mat4(view))?;
            device.upload_uniform(m.projection, &UniformValue::Mat4(projection))?;
            material.upload_uniforms(device)?;
            device.apply_render_state(&material.render_state());
            device.draw_arrays(material.draw_mode(), draw_count(count)?)?;
            stats.draw_calls += 1;
        }

        tracing::debug!(
            "frame: {} draws, {} hidden, {} stale",
            stats.draw_calls,
            stats.hidden,
            stats.stale
        );
        Ok(stats)
    }
}

fn draw_count(vertices: usize) -> Result<u32, GeometryError> {
    u32::try_from(vertices).map_err(|_| GeometryError::TooManyVertices(vertices))
}
