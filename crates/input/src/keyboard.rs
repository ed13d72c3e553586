use std::collections::HashSet;

/// Key names understood by bindings and produced by the desktop front end.
const KEY_NAMES: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "space",
    "return", "escape", "tab", "backspace", "up", "down", "left", "right", "left shift",
    "right shift", "left ctrl", "right ctrl", "left alt", "right alt", "page up", "page down",
    "home", "end", "insert", "delete",
];

/// Whether `name` is part of the key vocabulary.
pub fn is_known_key(name: &str) -> bool {
    KEY_NAMES.contains(&name)
}

/// Read-only view of keyboard state for one frame.
pub trait Input {
    /// The key was pressed during this frame.
    fn went_down(&self, key: &str) -> bool;
    /// The key is currently held.
    fn is_held(&self, key: &str) -> bool;
    /// The key was released during this frame.
    fn went_up(&self, key: &str) -> bool;
}

/// Keyboard state accumulated from press/release events.
///
/// Call [`KeyboardState::begin_frame`] once per frame before feeding the
/// frame's events; it clears the one-frame "down" and "up" sets while
/// keeping held keys.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    down: HashSet<String>,
    held: HashSet<String>,
    up: HashSet<String>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.down.clear();
        self.up.clear();
    }

    /// Record a key press. Auto-repeat presses of a held key are ignored.
    pub fn press(&mut self, key: &str) {
        if self.held.insert(key.to_owned()) {
            self.down.insert(key.to_owned());
        }
    }

    /// Record a key release. Releasing a key that was never held is ignored.
    pub fn release(&mut self, key: &str) {
        if self.held.remove(key) {
            self.up.insert(key.to_owned());
        }
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        let held: Vec<String> = self.held.drain().collect();
        self.up.extend(held);
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

impl Input for KeyboardState {
    fn went_down(&self, key: &str) -> bool {
        self.down.contains(key)
    }

    fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    fn went_up(&self, key: &str) -> bool {
        self.up.contains(key)
    }
}
