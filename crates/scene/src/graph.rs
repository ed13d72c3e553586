use crate::node::{Node, NodeId};
use glam::{Mat4, Vec3};
use okki_common::{TransformError, transform};

/// Errors from scene graph operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("{0} not found")]
    NodeNotFound(NodeId),
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("{0} has no camera")]
    NotACamera(NodeId),
    #[error("global transform is not invertible (determinant {determinant})")]
    DegenerateTransform { determinant: f32 },
    #[error(transparent)]
    Transform(#[from] TransformError),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena owning every node of a scene.
///
/// Parents own their children exclusively; the parent link is a plain id.
/// Destroying a node frees its whole subtree in one call.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take ownership of a detached node and return its id.
    ///
    /// Any tree links carried by `node` are discarded; attach it with
    /// [`SceneGraph::add`].
    pub fn insert(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(SceneError::NodeNotFound(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(SceneError::NodeNotFound(id))
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(&self.get(id)?.children)
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is detached from it first, so it
    /// is never listed under two parents.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.get(parent)?;
        let previous = self.get(child)?.parent;
        if self.is_ancestor_or_self(child, parent)? {
            return Err(SceneError::Cycle { parent, child });
        }
        if let Some(previous) = previous {
            tracing::debug!("re-parenting {child} from {previous} to {parent}");
            self.remove(previous, child)?;
        }
        self.get_mut(parent)?.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent`. The child stays alive as a root.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.get(child)?;
        let children = &mut self.get_mut(parent)?.children;
        let pos = children
            .iter()
            .position(|c| *c == child)
            .ok_or(SceneError::NotAChild { parent, child })?;
        children.remove(pos);
        self.get_mut(child)?.parent = None;
        Ok(())
    }

    /// Detach `id` from its parent and free it together with its subtree.
    ///
    /// Returns the removed nodes in pre-order so their device resources can
    /// be released by the caller.
    pub fn destroy(&mut self, id: NodeId) -> Result<Vec<Node>, SceneError> {
        if let Some(parent) = self.get(id)?.parent {
            self.remove(parent, id)?;
        }
        let ids = self.descendants(id)?;
        let mut removed = Vec::with_capacity(ids.len());
        for node_id in ids {
            let slot = &mut self.slots[node_id.index as usize];
            if let Some(mut node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(node_id.index);
                self.len -= 1;
                node.parent = None;
                node.children.clear();
                removed.push(node);
            }
        }
        tracing::debug!("destroyed {id} ({} nodes)", removed.len());
        Ok(removed)
    }

    /// `id` and every node below it, pre-order, children in list order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
        self.get(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.get(next)?.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Whether `ancestor` is `id` or lies on the chain from `id` to its root.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> Result<bool, SceneError> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return Ok(true);
            }
            cursor = self.get(current)?.parent;
        }
        Ok(false)
    }

    /// The root of the tree containing `id`.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId, SceneError> {
        let mut current = id;
        while let Some(parent) = self.get(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    pub fn local_transform(&self, id: NodeId) -> Result<Mat4, SceneError> {
        Ok(self.get(id)?.local_transform)
    }

    pub fn set_local_transform(&mut self, id: NodeId, m: Mat4) -> Result<(), SceneError> {
        self.get_mut(id)?.local_transform = m;
        Ok(())
    }

    /// Product of every local transform from the root down to `id`.
    ///
    /// Never cached: any ancestor may have changed since the last call.
    pub fn global_transform(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let node = self.get(id)?;
        match node.parent {
            Some(parent) => Ok(self.global_transform(parent)? * node.local_transform),
            None => Ok(node.local_transform),
        }
    }

    /// Compose `m` into the local transform of `id`.
    ///
    /// With `local`, `m` is expressed in the node's own frame and applied
    /// after the existing transform (`L * m`). Otherwise it is expressed in
    /// the parent's frame (`m * L`).
    pub fn apply_transformation(
        &mut self,
        id: NodeId,
        m: Mat4,
        local: bool,
    ) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.local_transform = if local {
            node.local_transform * m
        } else {
            m * node.local_transform
        };
        Ok(())
    }

    pub fn translate(
        &mut self,
        id: NodeId,
        x: f32,
        y: f32,
        z: f32,
        local: bool,
    ) -> Result<(), SceneError> {
        self.apply_transformation(id, transform::translation(x, y, z), local)
    }

    pub fn x_rotation(&mut self, id: NodeId, theta: f32, local: bool) -> Result<(), SceneError> {
        self.apply_transformation(id, transform::x_rotation(theta), local)
    }

    pub fn y_rotation(&mut self, id: NodeId, theta: f32, local: bool) -> Result<(), SceneError> {
        self.apply_transformation(id, transform::y_rotation(theta), local)
    }

    pub fn z_rotation(&mut self, id: NodeId, theta: f32, local: bool) -> Result<(), SceneError> {
        self.apply_transformation(id, transform::z_rotation(theta), local)
    }

    /// Scale with the library's defaulting rule: `y` and `z` fall back to
    /// `x` only when both are omitted.
    pub fn scale(
        &mut self,
        id: NodeId,
        x: f32,
        y: Option<f32>,
        z: Option<f32>,
        local: bool,
    ) -> Result<(), SceneError> {
        let m = transform::scale_parts(x, y, z)?;
        self.apply_transformation(id, m, local)
    }

    /// Translation column of the local transform.
    pub fn position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(transform::position_of(&self.get(id)?.local_transform))
    }

    /// Overwrite the translation column of the local transform only.
    pub fn set_position(&mut self, id: NodeId, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        transform::set_position_of(&mut node.local_transform, Vec3::new(x, y, z));
        Ok(())
    }
}
