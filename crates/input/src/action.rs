use glam::Vec2;

use crate::Key;

/// Identifier of an on-screen control, chosen by the demo that declares it.
pub type ControlId = &'static str;

/// Arrow-key steering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Steer {
    Left,
    Right,
    Up,
    Down,
}

impl Steer {
    /// `-1` for left/down, `+1` for right/up.
    pub fn sign(self) -> f32 {
        match self {
            Steer::Left | Steer::Down => -1.0,
            Steer::Right | Steer::Up => 1.0,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Steer::Left | Steer::Right)
    }
}

/// A high-level intent produced by the window layer or the on-screen
/// controls.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The hold key (Space) went down or up.
    Hold(bool),
    Steer(Steer),
    /// Any steering key was released.
    ReleaseSteer,
    /// Primary button pressed at a pixel position.
    PointerDown(Vec2),
    /// Pointer moved to a pixel position.
    PointerMove(Vec2),
    PointerUp,
    Resize { width: u32, height: u32 },
    /// A radio group changed.
    Select { control: ControlId, option: &'static str },
    Toggle { control: ControlId, on: bool },
    /// A button was clicked.
    Press(ControlId),
    /// The pointer entered a segment of a click wheel.
    Segment { control: ControlId, index: u8 },
    /// Unbound input.
    Noop,
}

/// Map a key transition onto an action.
pub fn bind_key(key: Key, pressed: bool) -> Action {
    let steer = |s| {
        if pressed {
            Action::Steer(s)
        } else {
            Action::ReleaseSteer
        }
    };
    match key {
        Key::Space => Action::Hold(pressed),
        Key::Left => steer(Steer::Left),
        Key::Right => steer(Steer::Right),
        Key::Up => steer(Steer::Up),
        Key::Down => steer(Steer::Down),
        Key::Escape | Key::Other => Action::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_maps_to_hold() {
        assert_eq!(bind_key(Key::Space, true), Action::Hold(true));
        assert_eq!(bind_key(Key::Space, false), Action::Hold(false));
    }

    #[test]
    fn arrows_steer_and_release() {
        assert_eq!(bind_key(Key::Left, true), Action::Steer(Steer::Left));
        assert_eq!(bind_key(Key::Up, false), Action::ReleaseSteer);
    }

    #[test]
    fn unbound_keys_are_noop() {
        assert_eq!(bind_key(Key::Other, true), Action::Noop);
        assert_eq!(bind_key(Key::Escape, false), Action::Noop);
    }

    #[test]
    fn steer_signs() {
        assert_eq!(Steer::Left.sign(), -1.0);
        assert_eq!(Steer::Up.sign(), 1.0);
        assert!(Steer::Right.is_horizontal());
        assert!(!Steer::Down.is_horizontal());
    }
}
