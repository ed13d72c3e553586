//! Input: per-frame keyboard state, the controller's logical actions, and
//! the key bindings that connect the two.
//!
//! # Invariants
//! - Consumers query logical key names, never windowing-system key codes.
//! - An action without a binding is never triggered.
//! - "Went down" and "went up" hold for exactly one frame.

pub mod action;
pub mod bindings;
pub mod keyboard;

pub use action::Action;
pub use bindings::{BindingError, ControllerConfig, KeyBindings};
pub use keyboard::{Input, KeyboardState, is_known_key};

pub fn crate_info() -> &'static str {
    "okki-input v0.1.0"
}
