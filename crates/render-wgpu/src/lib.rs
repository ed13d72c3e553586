//! wgpu backend for the okki graphics device.
//!
//! # Invariants
//! - Draws are recorded and only reach the GPU on `present`.
//! - Each draw reads the uniform values its program had when it was issued.
//! - Every pipeline has a depth attachment; disabling the depth test only
//!   relaxes the compare function.

mod gpu;
pub mod layout;

pub use gpu::{UNIFORM_SLOT_SIZE, WgpuDevice};
pub use layout::UniformLayout;

pub fn crate_info() -> &'static str {
    "okki-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
