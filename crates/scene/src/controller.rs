//! First-person controller rig.
//!
//! The rig is two nodes: a body that moves and turns, and a looker child
//! that only pitches, yaws and rolls on top of the body. Anything attached
//! to the controller (typically the camera) hangs under the looker, so
//! looking around never changes the direction the body walks in.

use crate::graph::{SceneError, SceneGraph};
use crate::node::{Node, NodeId};
use okki_input::{Action, ControllerConfig, Input};

/// Which rig node an action drives and the transform it applies.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Translate(f32, f32, f32),
    RotateX(f32),
    RotateY(f32),
    RotateZ(f32),
}

/// Transform step for `action` given this frame's move and turn amounts.
fn step(action: Action, ma: f32, ta: f32) -> Step {
    match action {
        Action::Forward => Step::Translate(0.0, 0.0, -ma),
        Action::Back => Step::Translate(0.0, 0.0, ma),
        Action::Left => Step::Translate(-ma, 0.0, 0.0),
        Action::Right => Step::Translate(ma, 0.0, 0.0),
        Action::Up => Step::Translate(0.0, ma, 0.0),
        Action::Down => Step::Translate(0.0, -ma, 0.0),
        Action::TurnUp | Action::LookUp => Step::RotateX(ta),
        Action::TurnDown | Action::LookDown => Step::RotateX(-ta),
        Action::TurnLeft | Action::LookLeft => Step::RotateY(ta),
        Action::TurnRight | Action::LookRight => Step::RotateY(-ta),
        Action::TurnTiltLeft | Action::LookTiltLeft => Step::RotateZ(ta),
        Action::TurnTiltRight | Action::LookTiltRight => Step::RotateZ(-ta),
    }
}

#[derive(Debug, Clone)]
pub struct Controller {
    body: NodeId,
    looker: NodeId,
    config: ControllerConfig,
}

impl Controller {
    /// Create the body and looker nodes in `graph`. The body is a new root;
    /// attach it wherever the rig should live.
    pub fn spawn(graph: &mut SceneGraph, config: ControllerConfig) -> Result<Self, SceneError> {
        let body = graph.insert(Node::group().with_name("controller"));
        let looker = graph.insert(Node::group().with_name("controller looker"));
        graph.add(body, looker)?;
        tracing::debug!(
            "spawned controller {body} (looker {looker}), {} actions mapped",
            config.bindings.mapped_count()
        );
        Ok(Self {
            body,
            looker,
            config,
        })
    }

    /// The node that translates and turns.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The node that carries look rotations and the rig's children.
    pub fn looker(&self) -> NodeId {
        self.looker
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Attach `child` to the rig (under the looker).
    pub fn add(&self, graph: &mut SceneGraph, child: NodeId) -> Result<(), SceneError> {
        graph.add(self.looker, child)
    }

    pub fn remove(&self, graph: &mut SceneGraph, child: NodeId) -> Result<(), SceneError> {
        graph.remove(self.looker, child)
    }

    /// Apply one frame of input. Held actions are applied in
    /// [`Action::ALL`] order, each scaled by `dt` seconds.
    pub fn update(
        &self,
        graph: &mut SceneGraph,
        input: &impl Input,
        dt: f32,
    ) -> Result<(), SceneError> {
        let ma = self.config.move_speed * dt;
        let ta = self.config.turn_speed * dt;
        let local = self.config.local;

        for action in Action::ALL {
            let Some(key) = self.config.bindings.key(action) else {
                continue;
            };
            if !input.is_held(key) {
                continue;
            }
            let target = if action.is_look() {
                self.looker
            } else {
                self.body
            };
            match step(action, ma, ta) {
                Step::Translate(x, y, z) => graph.translate(target, x, y, z, local)?,
                Step::RotateX(theta) => graph.x_rotation(target, theta, local)?,
                Step::RotateY(theta) => graph.y_rotation(target, theta, local)?,
                Step::RotateZ(theta) => graph.z_rotation(target, theta, local)?,
            }
            tracing::trace!("{action} -> {target}");
        }
        Ok(())
    }
}
