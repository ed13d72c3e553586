//! Shared types for the okki engine: resource handles and the affine
//! transform library every other crate composes matrices with.
//!
//! # Invariants
//! - Matrices are 4x4 `f32`, indexed `(row, column)` in the usual math notation.
//! - Transform constructors are pure; nothing in this crate holds state.

pub mod transform;
pub mod types;

pub use transform::TransformError;
pub use types::{BufferHandle, GeometryId, MaterialId, ProgramHandle, VertexArrayHandle};

pub fn crate_info() -> &'static str {
    "okki-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
