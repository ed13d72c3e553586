//! Key bindings and controller configuration.
//!
//! Configuration is plain YAML:
//!
//! ```yaml
//! move_speed: 2.0
//! turn_speed: 1.0
//! bindings:
//!   forward: w
//!   back: s
//!   look_up: up
//!   look_down: ~      # explicitly unmapped
//! ```
//!
//! Actions missing from `bindings` are unmapped. Omitting `bindings`
//! entirely keeps the default layout.

use crate::action::Action;
use crate::keyboard::is_known_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_3;
use std::path::Path;

/// Errors from binding and configuration handling.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown key {key:?} bound to {action}")]
    UnknownKey { action: Action, key: String },
}

/// Mapping from logical actions to key names. Unmapped actions are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Action, Option<String>>",
    into = "BTreeMap<Action, Option<String>>"
)]
pub struct KeyBindings {
    keys: BTreeMap<Action, String>,
}

impl KeyBindings {
    /// No action mapped.
    pub fn empty() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    /// WASD to move, R/F for up/down, Q/E to turn, T/G to look up/down.
    pub fn wasd() -> Self {
        let mut b = Self::empty();
        for (action, key) in [
            (Action::Forward, "w"),
            (Action::Back, "s"),
            (Action::Left, "a"),
            (Action::Right, "d"),
            (Action::Up, "r"),
            (Action::Down, "f"),
            (Action::TurnLeft, "q"),
            (Action::TurnRight, "e"),
            (Action::LookUp, "t"),
            (Action::LookDown, "g"),
        ] {
            b.keys.insert(action, key.to_owned());
        }
        b
    }

    /// Bind `action` to `key`, replacing any previous binding.
    pub fn bind(&mut self, action: Action, key: &str) -> Result<(), BindingError> {
        if !is_known_key(key) {
            return Err(BindingError::UnknownKey {
                action,
                key: key.to_owned(),
            });
        }
        self.keys.insert(action, key.to_owned());
        Ok(())
    }

    pub fn unbind(&mut self, action: Action) -> Option<String> {
        self.keys.remove(&action)
    }

    /// The key bound to `action`, if any.
    pub fn key(&self, action: Action) -> Option<&str> {
        self.keys.get(&action).map(String::as_str)
    }

    pub fn mapped_count(&self) -> usize {
        self.keys.len()
    }

    /// Mapped actions in application order.
    pub fn iter(&self) -> impl Iterator<Item = (Action, &str)> {
        self.keys.iter().map(|(a, k)| (*a, k.as_str()))
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::wasd()
    }
}

impl TryFrom<BTreeMap<Action, Option<String>>> for KeyBindings {
    type Error = BindingError;

    fn try_from(raw: BTreeMap<Action, Option<String>>) -> Result<Self, Self::Error> {
        let mut bindings = Self::empty();
        for (action, key) in raw {
            if let Some(key) = key {
                bindings.bind(action, &key)?;
            }
        }
        Ok(bindings)
    }
}

impl From<KeyBindings> for BTreeMap<Action, Option<String>> {
    fn from(bindings: KeyBindings) -> Self {
        Action::ALL
            .iter()
            .map(|a| (*a, bindings.keys.get(a).cloned()))
            .collect()
    }
}

/// Controller tuning and bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub turn_speed: f32,
    /// Apply deltas in the node's own frame (true) or the parent's (false).
    pub local: bool,
    pub bindings: KeyBindings,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            move_speed: 1.0,
            turn_speed: FRAC_PI_3,
            local: true,
            bindings: KeyBindings::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, BindingError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BindingError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(
            "loaded controller config from {}: {} actions mapped",
            path.display(),
            config.bindings.mapped_count()
        );
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, BindingError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
