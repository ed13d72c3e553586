use crate::camera::Camera;
use glam::Mat4;
use okki_common::{GeometryId, MaterialId, ProgramHandle, VertexArrayHandle};
use std::fmt;

/// Handle to a node in a [`SceneGraph`](crate::SceneGraph).
///
/// The generation guards against using an id after its node was destroyed
/// and the slot reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// Renderable capability: references shared geometry and material plus
/// the mesh's own vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable {
    pub geometry: GeometryId,
    pub material: MaterialId,
    /// Attribute bindings, made once against `bound_program`.
    pub vertex_array: VertexArrayHandle,
    /// Program the vertex array was bound against. If the material's
    /// program changes later the bindings no longer apply.
    pub bound_program: ProgramHandle,
    pub visible: bool,
}

/// A scene node: local transform, tree links and optional capabilities.
///
/// Plain groups carry no capability. The tree links are owned by the graph
/// and only change through [`SceneGraph`](crate::SceneGraph) operations.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub(crate) local_transform: Mat4,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub camera: Option<Camera>,
    pub renderable: Option<Renderable>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            local_transform: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
            camera: None,
            renderable: None,
        }
    }
}

impl Node {
    /// A plain node with an identity transform.
    pub fn group() -> Self {
        Self::default()
    }

    pub fn camera(camera: Camera) -> Self {
        Self {
            camera: Some(camera),
            ..Self::default()
        }
    }

    pub fn mesh(renderable: Renderable) -> Self {
        Self {
            renderable: Some(renderable),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, local_transform: Mat4) -> Self {
        self.local_transform = local_transform;
        self
    }

    pub fn local_transform(&self) -> Mat4 {
        self.local_transform
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Name for log output.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Perspective;

    #[test]
    fn group_is_bare() {
        let n = Node::group();
        assert_eq!(n.local_transform(), Mat4::IDENTITY);
        assert!(n.parent().is_none());
        assert!(n.children().is_empty());
        assert!(n.camera.is_none());
        assert!(n.renderable.is_none());
        assert_eq!(n.label(), "<unnamed>");
    }

    #[test]
    fn builders_attach_capabilities() {
        let cam = Node::camera(Camera::new(Perspective::default())).with_name("eye");
        assert!(cam.camera.is_some());
        assert_eq!(cam.label(), "eye");

        let mesh = Node::mesh(Renderable {
            geometry: GeometryId(0),
            material: MaterialId(0),
            vertex_array: VertexArrayHandle(0),
            bound_program: ProgramHandle(0),
            visible: true,
        });
        assert!(mesh.renderable.is_some());
        assert!(mesh.camera.is_none());
    }
}
