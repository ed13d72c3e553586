//! The graphics device interface.
//!
//! The device is stateful in the way classic immediate-mode APIs are: the
//! current program, the bound vertex array, per-program uniform values and
//! the fixed-function render state all persist until changed. The renderer
//! relies on this and only ever sets what a draw needs.

use crate::uniform::{UniformKind, UniformLocation, UniformValue};
use glam::Vec4;
use okki_common::{BufferHandle, ProgramHandle, VertexArrayHandle};
use std::fmt;

/// Errors reported by a device.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to compile program {label:?}: {message}")]
    Compile { label: String, message: String },
    #[error("failed to link program {label:?}: {message}")]
    Link { label: String, message: String },
    #[error("unknown {0}")]
    UnknownHandle(String),
    #[error("no {0} bound")]
    NotBound(&'static str),
    #[error("uniform {location:?} expects {expected}, got {found}")]
    UniformType {
        location: UniformLocation,
        expected: UniformKind,
        found: UniformKind,
    },
    #[error("drawing {count} vertices reads past the end of {buffer} ({available} vertices)")]
    ShortBuffer {
        buffer: BufferHandle,
        count: u32,
        available: usize,
    },
}

/// Element type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl AttributeKind {
    /// Scalars per vertex.
    pub fn components(self) -> usize {
        match self {
            AttributeKind::Int | AttributeKind::Float => 1,
            AttributeKind::Vec2 => 2,
            AttributeKind::Vec3 => 3,
            AttributeKind::Vec4 => 4,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Int => "int",
            AttributeKind::Float => "float",
            AttributeKind::Vec2 => "vec2",
            AttributeKind::Vec3 => "vec3",
            AttributeKind::Vec4 => "vec4",
        };
        f.write_str(name)
    }
}

/// Primitive assembly for `draw_arrays`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    /// A strip closed back to its first vertex.
    LineLoop,
    Triangles,
    TriangleStrip,
}

/// Slot of a vertex attribute inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeLocation(pub u32);

/// A vertex input declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub location: AttributeLocation,
    pub kind: AttributeKind,
}

/// A uniform declared by a program. Declaration order is the field order of
/// the program's uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub kind: UniformKind,
}

/// Shader sources plus the interface the program exposes by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
    pub attributes: Vec<AttributeDecl>,
    pub uniforms: Vec<UniformDecl>,
}

/// Entry point every vertex stage must define.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Entry point every fragment stage must define.
pub const FRAGMENT_ENTRY: &str = "fs_main";

impl ProgramSource {
    /// Source-level checks shared by every device.
    ///
    /// A stage without its entry point fails to compile. An interface name
    /// that appears in neither stage, or a duplicated name or attribute slot,
    /// fails to link.
    pub fn validate(&self) -> Result<(), DeviceError> {
        for (stage, source, entry) in [
            ("vertex", &self.vertex, VERTEX_ENTRY),
            ("fragment", &self.fragment, FRAGMENT_ENTRY),
        ] {
            if !source.contains(&format!("fn {entry}")) {
                return Err(DeviceError::Compile {
                    label: self.label.clone(),
                    message: format!("{stage} stage has no `{entry}` entry point"),
                });
            }
        }

        let link_error = |message: String| DeviceError::Link {
            label: self.label.clone(),
            message,
        };
        let names = self
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.uniforms.iter().map(|u| u.name.as_str()));
        let mut seen = std::collections::BTreeSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(link_error(format!("`{name}` declared twice")));
            }
            if !self.vertex.contains(name) && !self.fragment.contains(name) {
                return Err(link_error(format!("`{name}` is not used by any stage")));
            }
        }
        let mut slots = std::collections::BTreeSet::new();
        for attribute in &self.attributes {
            if !slots.insert(attribute.location) {
                return Err(link_error(format!(
                    "attribute slot {} assigned twice",
                    attribute.location.0
                )));
            }
        }
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Location of a uniform: its index in declaration order.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| UniformLocation(i as u32))
    }
}

/// Changes to fixed-function state. `None` leaves the device's current
/// value untouched, so state set by one material persists into later draws
/// until another material overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderState {
    pub point_size: Option<f32>,
    pub rounded_points: Option<bool>,
    pub line_width: Option<f32>,
    pub cull_back_faces: Option<bool>,
    pub wireframe: Option<bool>,
    pub front_face_clockwise: Option<bool>,
}

/// Fully resolved fixed-function state of a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    pub point_size: f32,
    pub rounded_points: bool,
    pub line_width: f32,
    pub cull_back_faces: bool,
    pub wireframe: bool,
    pub front_face_clockwise: bool,
    pub depth_test: bool,
    pub alpha_blending: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            point_size: 1.0,
            rounded_points: false,
            line_width: 1.0,
            cull_back_faces: false,
            wireframe: false,
            front_face_clockwise: false,
            depth_test: false,
            alpha_blending: false,
        }
    }
}

impl DeviceState {
    pub fn apply(&mut self, change: &RenderState) {
        if let Some(v) = change.point_size {
            self.point_size = v;
        }
        if let Some(v) = change.rounded_points {
            self.rounded_points = v;
        }
        if let Some(v) = change.line_width {
            self.line_width = v;
        }
        if let Some(v) = change.cull_back_faces {
            self.cull_back_faces = v;
        }
        if let Some(v) = change.wireframe {
            self.wireframe = v;
        }
        if let Some(v) = change.front_face_clockwise {
            self.front_face_clockwise = v;
        }
    }
}

/// A graphics device.
///
/// Handles are only meaningful to the device that issued them. Resources
/// are released explicitly with the `delete_*` calls.
pub trait Device {
    /// Upload a vertex attribute payload. `data.len()` is a multiple of
    /// `kind.components()`.
    fn create_buffer(&mut self, kind: AttributeKind, data: &[f32]) -> BufferHandle;
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_vertex_array(&mut self) -> VertexArrayHandle;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle, DeviceError>;
    fn delete_program(&mut self, program: ProgramHandle);

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<AttributeLocation>;
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Record in `vertex_array` that `location` reads from `buffer`.
    fn bind_attribute(
        &mut self,
        vertex_array: VertexArrayHandle,
        location: AttributeLocation,
        buffer: BufferHandle,
    ) -> Result<(), DeviceError>;

    fn set_clear_color(&mut self, color: Vec4);
    fn enable_depth_test(&mut self);
    /// Standard `src_alpha, 1 - src_alpha` blending.
    fn enable_alpha_blending(&mut self);

    /// Clear color and depth.
    fn clear(&mut self);

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError>;
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> Result<(), DeviceError>;

    /// Set a uniform of the current program. The value persists in that
    /// program until overwritten.
    fn upload_uniform(
        &mut self,
        location: UniformLocation,
        value: &UniformValue,
    ) -> Result<(), DeviceError>;

    fn apply_render_state(&mut self, state: &RenderState);

    /// Draw `count` vertices with the current program and vertex array.
    fn draw_arrays(&mut self, mode: DrawMode, count: u32) -> Result<(), DeviceError>;
}
