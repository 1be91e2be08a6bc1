use std::collections::BTreeSet;

use glam::Vec2;
use tracing::debug;

use crate::Action;

/// Keys the demos care about. The window layer maps its own key codes onto
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Space,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Other,
}

/// Snapshot of held keys, pointer and viewport, updated from actions.
#[derive(Debug, Clone, PartialEq)]
pub struct InputState {
    held: BTreeSet<Key>,
    pointer: Vec2,
    pointer_down: bool,
    viewport: (u32, u32),
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            held: BTreeSet::new(),
            pointer: Vec2::ZERO,
            pointer_down: false,
            viewport: (1, 1),
        }
    }
}

impl InputState {
    pub fn new(width: u32, height: u32) -> Self {
        let mut s = Self::default();
        s.set_viewport(width, height);
        s
    }

    pub fn key_down(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1 as f32
    }

    /// Pointer position in pixels, origin top-left.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn pointer_down(&self) -> bool {
        self.pointer_down
    }

    /// Pointer in normalized device coordinates: x right, y up, both
    /// `[-1, 1]`.
    pub fn pointer_ndc(&self) -> Vec2 {
        to_ndc(self.pointer, self.viewport)
    }

    /// Pointer in `[0, 1]` with y down, as a texture coordinate.
    pub fn pointer_unit(&self) -> Vec2 {
        let (w, h) = self.viewport;
        Vec2::new(self.pointer.x / w as f32, self.pointer.y / h as f32)
    }

    /// Fold a pointer or resize action into the state.
    pub fn apply(&mut self, action: &Action) {
        match *action {
            Action::PointerDown(p) => {
                self.pointer = p;
                self.pointer_down = true;
            }
            Action::PointerMove(p) => self.pointer = p,
            Action::PointerUp => self.pointer_down = false,
            Action::Resize { width, height } => {
                debug!(width, height, "viewport resized");
                self.set_viewport(width, height);
            }
            _ => {}
        }
    }
}

/// Pixel position (origin top-left) to NDC for a viewport of `(w, h)`.
pub fn to_ndc(pixel: Vec2, viewport: (u32, u32)) -> Vec2 {
    let (w, h) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
    Vec2::new(pixel.x / w * 2.0 - 1.0, -(pixel.y / h * 2.0 - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_corners() {
        let mut s = InputState::new(800, 600);
        s.apply(&Action::PointerMove(Vec2::ZERO));
        assert_eq!(s.pointer_ndc(), Vec2::new(-1.0, 1.0));
        s.apply(&Action::PointerMove(Vec2::new(800.0, 600.0)));
        assert_eq!(s.pointer_ndc(), Vec2::new(1.0, -1.0));
        s.apply(&Action::PointerMove(Vec2::new(400.0, 300.0)));
        assert_eq!(s.pointer_ndc(), Vec2::ZERO);
        assert_eq!(s.pointer_unit(), Vec2::splat(0.5));
    }

    #[test]
    fn held_keys() {
        let mut s = InputState::default();
        s.key_down(Key::Space);
        assert!(s.is_held(Key::Space));
        s.key_up(Key::Space);
        assert!(!s.is_held(Key::Space));
    }

    #[test]
    fn resize_never_zero() {
        let mut s = InputState::default();
        s.apply(&Action::Resize { width: 0, height: 0 });
        assert_eq!(s.viewport(), (1, 1));
        s.apply(&Action::Resize { width: 1280, height: 720 });
        assert!((s.aspect() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn pointer_down_and_up() {
        let mut s = InputState::default();
        s.apply(&Action::PointerDown(Vec2::new(3.0, 4.0)));
        assert!(s.pointer_down());
        assert_eq!(s.pointer(), Vec2::new(3.0, 4.0));
        s.apply(&Action::PointerUp);
        assert!(!s.pointer_down());
    }
}
