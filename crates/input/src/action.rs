use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical controller action.
///
/// "Turn" actions rotate the controller body, "look" actions rotate the
/// looker node underneath it. The declaration order is the order in which
/// held actions are applied each frame; rotations do not commute, so it is
/// part of the controller's observable behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    TurnUp,
    TurnDown,
    LookUp,
    LookDown,
    TurnLeft,
    TurnRight,
    LookLeft,
    LookRight,
    TurnTiltLeft,
    TurnTiltRight,
    LookTiltLeft,
    LookTiltRight,
}

impl Action {
    /// Every action, in application order.
    pub const ALL: [Action; 18] = [
        Action::Forward,
        Action::Back,
        Action::Left,
        Action::Right,
        Action::Up,
        Action::Down,
        Action::TurnUp,
        Action::TurnDown,
        Action::LookUp,
        Action::LookDown,
        Action::TurnLeft,
        Action::TurnRight,
        Action::LookLeft,
        Action::LookRight,
        Action::TurnTiltLeft,
        Action::TurnTiltRight,
        Action::LookTiltLeft,
        Action::LookTiltRight,
    ];

    /// Snake-case name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::Back => "back",
            Action::Left => "left",
            Action::Right => "right",
            Action::Up => "up",
            Action::Down => "down",
            Action::TurnUp => "turn_up",
            Action::TurnDown => "turn_down",
            Action::LookUp => "look_up",
            Action::LookDown => "look_down",
            Action::TurnLeft => "turn_left",
            Action::TurnRight => "turn_right",
            Action::LookLeft => "look_left",
            Action::LookRight => "look_right",
            Action::TurnTiltLeft => "turn_tilt_left",
            Action::TurnTiltRight => "turn_tilt_right",
            Action::LookTiltLeft => "look_tilt_left",
            Action::LookTiltRight => "look_tilt_right",
        }
    }

    /// True for actions that rotate the looker rather than the body.
    pub fn is_look(self) -> bool {
        matches!(
            self,
            Action::LookUp
                | Action::LookDown
                | Action::LookLeft
                | Action::LookRight
                | Action::LookTiltLeft
                | Action::LookTiltRight
        )
    }

    /// True for the six translation actions.
    pub fn is_move(self) -> bool {
        matches!(
            self,
            Action::Forward
                | Action::Back
                | Action::Left
                | Action::Right
                | Action::Up
                | Action::Down
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
