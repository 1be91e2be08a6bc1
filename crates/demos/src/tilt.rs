use framelab_tween::{Tween, TweenStatus};
use glam::{Mat4, Vec2, Vec3};

/// Pointer-driven tilt for the offscreen plane.
///
/// The pointer offset from the viewport center eases toward the pointer
/// while it stays inside the middle three quarters of the viewport and back
/// to zero outside it. The plane turns about the axis perpendicular to the
/// offset, by an angle proportional to the offset length.
#[derive(Debug, Clone)]
pub(crate) struct PointerTilt {
    offset: Vec2,
    tween: Option<Tween<Vec2>>,
    viewport: (u32, u32),
    inside_seconds: f32,
    outside_seconds: f32,
    /// Offset of `diagonal / spread` pixels tilts the plane one radian.
    spread: f32,
}

impl PointerTilt {
    pub fn new(viewport: (u32, u32), inside_seconds: f32, outside_seconds: f32, spread: f32) -> Self {
        Self {
            offset: Vec2::ZERO,
            tween: None,
            viewport: (viewport.0.max(1), viewport.1.max(1)),
            inside_seconds,
            outside_seconds,
            spread,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    /// Pixel offset from the center, y up.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn pointer_moved(&mut self, pixel: Vec2) {
        let (w, h) = (self.viewport.0 as f32, self.viewport.1 as f32);
        let inside = pixel.x >= w / 8.0 && pixel.x <= w / 8.0 * 7.0 && pixel.y >= h / 8.0 && pixel.y <= h / 8.0 * 7.0;
        let (target, seconds) = if inside {
            (Vec2::new(pixel.x - w / 2.0, h / 2.0 - pixel.y), self.inside_seconds)
        } else {
            (Vec2::ZERO, self.outside_seconds)
        };
        self.tween = Some(Tween::to(target, seconds));
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(tween) = &mut self.tween {
            if tween.advance(dt, &mut self.offset) == TweenStatus::Completed {
                self.tween = None;
            }
        }
    }

    pub fn model(&self) -> Mat4 {
        let length = self.offset.length();
        if length == 0.0 {
            return Mat4::IDENTITY;
        }
        let (w, h) = (self.viewport.0 as f32, self.viewport.1 as f32);
        let diagonal = (w * w + h * h).sqrt();
        let angle = length / (diagonal / self.spread);
        let axis = Vec3::new(self.offset.x, self.offset.y, 0.0).cross(Vec3::Z).normalize();
        Mat4::from_axis_angle(axis, -angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_pointer_leaves_the_plane_flat() {
        let mut tilt = PointerTilt::new((800, 600), 3.0, 1.0, 2.0);
        tilt.pointer_moved(Vec2::new(400.0, 300.0));
        tilt.advance(5.0);
        assert_eq!(tilt.offset(), Vec2::ZERO);
        assert_eq!(tilt.model(), Mat4::IDENTITY);
    }

    #[test]
    fn offset_eases_toward_the_pointer() {
        let mut tilt = PointerTilt::new((800, 600), 3.0, 1.0, 2.0);
        tilt.pointer_moved(Vec2::new(600.0, 300.0));
        tilt.advance(1.0);
        assert!(tilt.offset().x > 0.0 && tilt.offset().x < 200.0);
        tilt.advance(2.5);
        assert_eq!(tilt.offset(), Vec2::new(200.0, 0.0));
        // Offset along +x turns the plane about +y; the right edge tips
        // away from the viewer.
        let right = tilt.model().transform_point3(Vec3::X);
        let angle = 200.0 / (1000.0 / 2.0);
        assert!((right.z + f32::sin(angle)).abs() < 1e-5);
    }

    #[test]
    fn leaving_the_middle_returns_to_flat_faster() {
        let mut tilt = PointerTilt::new((800, 600), 3.0, 1.0, 2.0);
        tilt.pointer_moved(Vec2::new(600.0, 200.0));
        tilt.advance(3.5);
        tilt.pointer_moved(Vec2::new(5.0, 5.0));
        tilt.advance(1.1);
        assert_eq!(tilt.offset(), Vec2::ZERO);
    }
}
