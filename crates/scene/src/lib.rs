//! Scene graph: a tree of nodes owning local affine transforms, with camera
//! and renderable capabilities, plus the two-node controller rig.
//!
//! # Invariants
//! - The node graph is a tree: one parent at most, never its own descendant.
//! - Global transforms are recomputed from the ancestor chain on every call.
//! - A camera's view is only as fresh as its last `update_view`.
//! - Nodes are owned by the graph; ids are generation-checked handles.

pub mod camera;
pub mod controller;
pub mod graph;
pub mod node;

pub use camera::{Camera, Perspective};
pub use controller::Controller;
pub use graph::{SceneError, SceneGraph};
pub use node::{Node, NodeId, Renderable};

pub fn crate_info() -> &'static str {
    "okki-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("scene"));
    }
}
