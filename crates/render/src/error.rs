use crate::device::DeviceError;
use crate::geometry::GeometryError;
use okki_scene::SceneError;

/// Errors from building or drawing a scene.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// A named attribute or uniform is absent from a program.
    #[error("{kind} {name:?} not found in program {program:?}")]
    ResourceLookup {
        kind: &'static str,
        name: String,
        program: String,
    },
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("missing resource: {0}")]
    MissingResource(String),
}
