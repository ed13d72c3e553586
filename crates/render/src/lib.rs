//! Renderer: binds geometry and materials to scene nodes and draws a scene
//! through a stateful graphics device.
//!
//! # Invariants
//! - One synchronous pre-order traversal per frame; no sorting or culling.
//! - Every draw uploads fresh model, view and projection matrices.
//! - A mesh is only drawn with the program its attributes were bound to.
//! - Device resources are released explicitly, never on drop.

pub mod device;
mod error;
pub mod geometry;
pub mod headless;
pub mod material;
pub mod mesh;
mod renderer;
pub mod resources;
pub mod shaders;
pub mod uniform;

pub use device::{Device, DeviceError, DeviceState, DrawMode, ProgramSource, RenderState};
pub use error::RenderError;
pub use geometry::{Geometry, GeometryError};
pub use headless::{DrawCall, RecordingDevice};
pub use material::{LineType, Material, PropertyValue, RenderSettings};
pub use mesh::{BindPolicy, Mesh};
pub use renderer::{FrameStats, Renderer};
pub use resources::Resources;
pub use uniform::{UniformKind, UniformValue};

pub fn crate_info() -> &'static str {
    "okki-render v0.1.0"
}
