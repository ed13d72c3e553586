//! End-to-end frames against the recording device.

use glam::{Mat4, Vec3, Vec4};
use okki_common::{MaterialId, transform};
use okki_input::{ControllerConfig, KeyboardState};
use okki_render::headless::Command;
use okki_render::{
    DrawMode, Material, Mesh, RecordingDevice, RenderError, Renderer, Resources, UniformValue,
    geometry,
};
use okki_scene::{Camera, Controller, Node, NodeId, Perspective, SceneError, SceneGraph};

const EPSILON: f32 = 1e-5;

struct Fixture {
    device: RecordingDevice,
    resources: Resources,
    graph: SceneGraph,
    renderer: Renderer,
    scene: NodeId,
    camera: NodeId,
    surface: MaterialId,
}

impl Fixture {
    fn new() -> Self {
        let mut device = RecordingDevice::new();
        let renderer = Renderer::new(&mut device, Vec3::new(0.5, 0.5, 0.5));
        let mut resources = Resources::new();
        let material = Material::surface(&mut device).unwrap();
        let surface = resources.add_material(material);
        let mut graph = SceneGraph::new();
        let scene = graph.insert(Node::group().with_name("scene"));
        let camera = graph.insert(Node::camera(Camera::new(Perspective::default())));
        graph.add(scene, camera).unwrap();
        Self {
            device,
            resources,
            graph,
            renderer,
            scene,
            camera,
            surface,
        }
    }

    fn mesh(&mut self, parent: NodeId, material: MaterialId) -> NodeId {
        let g = self
            .resources
            .add_geometry(&mut self.device, geometry::cuboid(1.0, 1.0, 1.0))
            .unwrap();
        let renderable = Mesh::new(&mut self.device, &self.resources, g, material).unwrap();
        let id = self.graph.insert(Node::mesh(renderable));
        self.graph.add(parent, id).unwrap();
        id
    }

    fn frame(&mut self) -> Result<okki_render::FrameStats, RenderError> {
        self.device.clear_log();
        self.renderer.render(
            &mut self.device,
            &mut self.graph,
            &self.resources,
            self.scene,
            self.camera,
        )
    }
}

fn model(draw: &okki_render::DrawCall) -> Mat4 {
    draw.uniform("modelMatrix").and_then(|u| u.as_mat4()).unwrap()
}

fn approx_eq_mat4(a: Mat4, b: Mat4) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < EPSILON)
}

#[test]
fn identity_camera_and_translated_mesh() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let mesh = f.mesh(f.scene, surface);
    f.graph.translate(mesh, 0.0, 0.0, -5.0, true).unwrap();

    let stats = f.frame().unwrap();
    assert_eq!(stats.draw_calls, 1);

    let draw = &f.device.draws()[0];
    let m = model(draw);
    assert_eq!(transform::position_of(&m), Vec3::new(0.0, 0.0, -5.0));
    assert_eq!(m.x_axis, Vec4::X);
    assert_eq!(m.y_axis, Vec4::Y);
    assert_eq!(m.z_axis, Vec4::Z);
    assert_eq!(
        draw.uniform("viewMatrix"),
        Some(UniformValue::Mat4(Mat4::IDENTITY))
    );
    assert_eq!(
        draw.uniform("projectionMatrix"),
        Some(UniformValue::Mat4(Camera::new(Perspective::default()).projection()))
    );
    assert_eq!(draw.mode, DrawMode::Triangles);
    assert_eq!(draw.count, 36);
}

#[test]
fn frame_starts_with_clear_and_binds_before_drawing() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let mesh = f.mesh(f.scene, surface);
    f.frame().unwrap();

    let commands = f.device.commands();
    assert_eq!(commands[0], Command::Clear);
    let renderable = f.graph.get(mesh).unwrap().renderable.unwrap();
    let program = f.resources.material(surface).unwrap().program();
    assert_eq!(commands[1], Command::UseProgram(program));
    assert_eq!(commands[2], Command::BindVertexArray(renderable.vertex_array));
    assert!(matches!(commands.last(), Some(Command::Draw(0))));
}

#[test]
fn invisible_meshes_are_never_drawn() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let shown = f.mesh(f.scene, surface);
    let hidden = f.mesh(f.scene, surface);
    if let Some(r) = f.graph.get_mut(hidden).unwrap().renderable.as_mut() {
        r.visible = false;
    }

    let stats = f.frame().unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.hidden, 1);
    let shown_vao = f.graph.get(shown).unwrap().renderable.unwrap().vertex_array;
    assert!(f.device.draws().iter().all(|d| d.vertex_array == shown_vao));
}

#[test]
fn siblings_sharing_a_material() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let a = f.mesh(f.scene, surface);
    let b = f.mesh(f.scene, surface);
    f.graph.translate(a, -2.0, 0.0, -5.0, true).unwrap();
    f.graph.translate(b, 2.0, 0.0, -5.0, true).unwrap();
    f.graph.y_rotation(b, 0.7, true).unwrap();

    f.frame().unwrap();
    let draws = f.device.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].program, draws[1].program);
    assert_eq!(draws[0].state, draws[1].state);
    assert_eq!(model(&draws[0]), f.graph.global_transform(a).unwrap());
    assert_eq!(model(&draws[1]), f.graph.global_transform(b).unwrap());
    assert_ne!(model(&draws[0]), model(&draws[1]));
}

#[test]
fn nested_meshes_draw_in_pre_order_with_composed_transforms() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let parent = f.mesh(f.scene, surface);
    let child = f.mesh(parent, surface);
    let sibling = f.mesh(f.scene, surface);
    f.graph.translate(parent, 10.0, 0.0, 0.0, true).unwrap();
    f.graph.scale(parent, 2.0, None, None, true).unwrap();
    f.graph.translate(child, 5.0, 0.0, 0.0, true).unwrap();

    f.frame().unwrap();
    let order: Vec<_> = f.device.draws().iter().map(|d| d.vertex_array).collect();
    let vao = |id| f.graph.get(id).unwrap().renderable.unwrap().vertex_array;
    assert_eq!(order, vec![vao(parent), vao(child), vao(sibling)]);

    let child_origin = model(&f.device.draws()[1]).transform_point3(Vec3::ZERO);
    assert!((child_origin - Vec3::new(20.0, 0.0, 0.0)).length() < EPSILON);
}

#[test]
fn root_renderable_is_drawn() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let g = f
        .resources
        .add_geometry(&mut f.device, geometry::rectangle(1.0, 1.0))
        .unwrap();
    let renderable = Mesh::new(&mut f.device, &f.resources, g, surface).unwrap();
    let root = f.graph.insert(Node::mesh(renderable));
    f.scene = root;

    let stats = f.frame().unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(f.device.draws()[0].count, 6);
}

#[test]
fn degenerate_camera_aborts_frame_without_draws() {
    let mut f = Fixture::new();
    let surface = f.surface;
    f.mesh(f.scene, surface);
    f.graph.scale(f.camera, 0.0, None, None, true).unwrap();

    let err = f.frame().unwrap_err();
    assert!(matches!(
        err,
        RenderError::Scene(SceneError::DegenerateTransform { .. })
    ));
    assert!(f.device.draws().is_empty());

    // The next good frame draws normally.
    f.graph.set_local_transform(f.camera, Mat4::IDENTITY).unwrap();
    assert_eq!(f.frame().unwrap().draw_calls, 1);
}

#[test]
fn camera_view_follows_its_parents() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let mesh = f.mesh(f.scene, surface);
    let rig = f.graph.insert(Node::group());
    f.graph.add(f.scene, rig).unwrap();
    f.graph.add(rig, f.camera).unwrap();
    f.graph.translate(rig, 0.0, 1.0, 4.0, true).unwrap();

    f.frame().unwrap();
    let draw = &f.device.draws()[0];
    let view = draw.uniform("viewMatrix").and_then(|u| u.as_mat4()).unwrap();
    assert!(approx_eq_mat4(view, transform::translation(0.0, -1.0, -4.0)));
    let eye_space = view * f.graph.global_transform(mesh).unwrap();
    assert!(
        (eye_space.transform_point3(Vec3::ZERO) - Vec3::new(0.0, -1.0, -4.0)).length() < EPSILON
    );
}

#[test]
fn replaced_program_makes_binding_stale() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let mesh = f.mesh(f.scene, surface);

    let replacement = Material::surface(&mut f.device).unwrap();
    f.resources
        .replace_material(&mut f.device, surface, replacement)
        .unwrap();

    let stats = f.frame().unwrap();
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.stale, 1);

    // Rebinding against the new program fixes it.
    let old = f.graph.get(mesh).unwrap().renderable.unwrap();
    Mesh::release(&mut f.device, &old);
    let fresh = Mesh::new(&mut f.device, &f.resources, old.geometry, surface).unwrap();
    f.graph.get_mut(mesh).unwrap().renderable = Some(fresh);
    assert_eq!(f.frame().unwrap().draw_calls, 1);
}

#[test]
fn material_uniforms_and_draw_modes_reach_the_device() {
    let mut f = Fixture::new();
    let mut points = Material::point(&mut f.device).unwrap();
    points
        .set_property("baseColor", Vec3::new(1.0, 0.0, 0.0))
        .unwrap();
    let points = f.resources.add_material(points);
    f.mesh(f.scene, points);

    f.frame().unwrap();
    let draw = &f.device.draws()[0];
    assert_eq!(draw.mode, DrawMode::Points);
    assert_eq!(
        draw.uniform("baseColor"),
        Some(UniformValue::Vec3(Vec3::new(1.0, 0.0, 0.0)))
    );
    assert_eq!(
        draw.uniform("useVertexColors"),
        Some(UniformValue::Bool(false))
    );
    assert_eq!(draw.state.point_size, 4.0);
    assert!(draw.state.rounded_points);
}

#[test]
fn render_state_persists_across_materials() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let points = Material::point(&mut f.device).unwrap();
    let points = f.resources.add_material(points);
    f.mesh(f.scene, surface);
    f.mesh(f.scene, points);

    f.frame().unwrap();
    let draws = f.device.draws();
    assert!(draws[0].state.cull_back_faces);
    // The point material has no culling setting, so the surface's stays.
    assert!(draws[1].state.cull_back_faces);
    assert_eq!(draws[1].state.line_width, 2.0);
    assert!(draws[1].state.depth_test);
    assert!(draws[1].state.alpha_blending);
}

#[test]
fn controller_drives_the_camera() {
    let mut f = Fixture::new();
    let surface = f.surface;
    f.mesh(f.scene, surface);
    let controller = Controller::spawn(&mut f.graph, ControllerConfig::default()).unwrap();
    f.graph.add(f.scene, controller.body()).unwrap();
    controller.add(&mut f.graph, f.camera).unwrap();

    let mut keys = KeyboardState::new();
    keys.press("w");
    controller.update(&mut f.graph, &keys, 0.0).unwrap();
    f.frame().unwrap();
    let still = f.device.draws()[0].uniform("viewMatrix");
    assert_eq!(still, Some(UniformValue::Mat4(Mat4::IDENTITY)));

    controller.update(&mut f.graph, &keys, 2.0).unwrap();
    f.frame().unwrap();
    let view = f.device.draws()[0]
        .uniform("viewMatrix")
        .and_then(|u| u.as_mat4())
        .unwrap();
    assert!(approx_eq_mat4(view, transform::translation(0.0, 0.0, 2.0)));
}

#[test]
fn destroyed_subtree_releases_and_stops_drawing() {
    let mut f = Fixture::new();
    let surface = f.surface;
    let group = f.graph.insert(Node::group());
    f.graph.add(f.scene, group).unwrap();
    f.mesh(group, surface);
    f.mesh(group, surface);
    f.mesh(f.scene, surface);
    assert_eq!(f.frame().unwrap().draw_calls, 3);

    for node in f.graph.destroy(group).unwrap() {
        if let Some(r) = node.renderable {
            Mesh::release(&mut f.device, &r);
        }
    }
    assert_eq!(f.device.live_vertex_arrays(), 1);
    assert_eq!(f.frame().unwrap().draw_calls, 1);
}

#[test]
fn line_materials_pick_strip_or_segments() {
    let mut f = Fixture::new();
    let mut segmented = Material::line(&mut f.device).unwrap();
    segmented
        .set_property("line_type", okki_render::LineType::Segmented)
        .unwrap();
    let connected = Material::line(&mut f.device).unwrap();
    let segmented = f.resources.add_material(segmented);
    let connected = f.resources.add_material(connected);
    f.mesh(f.scene, connected);
    f.mesh(f.scene, segmented);

    f.frame().unwrap();
    let modes: Vec<_> = f.device.draws().iter().map(|d| d.mode).collect();
    assert_eq!(modes, vec![DrawMode::LineStrip, DrawMode::Lines]);
}

#[test]
fn loop_line_material_draws_a_closed_strip() {
    let mut f = Fixture::new();
    let mut closed = Material::line(&mut f.device).unwrap();
    closed
        .set_property("line_type", "loop".parse::<okki_render::LineType>().unwrap())
        .unwrap();
    let closed = f.resources.add_material(closed);
    let open = f.surface;
    f.mesh(f.scene, closed);
    f.mesh(f.scene, open);

    f.frame().unwrap();
    let draws = f.device.draws();
    assert_eq!(draws[0].mode, DrawMode::LineLoop);
    assert_eq!(draws[1].mode, DrawMode::Triangles);
    assert_eq!(draws[0].count, draws[1].count);
}
