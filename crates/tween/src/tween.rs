use glam::{Vec2, Vec3};

use crate::Ease;

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp(a: Self, b: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl Lerp for Vec3 {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

/// What one `advance` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenStatus {
    /// Still inside the start delay; the value was not touched.
    Waiting,
    /// The value moved toward the target.
    Running,
    /// The value landed on the target this frame.
    Completed,
    /// Finished earlier, paused or killed; the value was not touched.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Paused,
    Done,
}

/// Animates a value from wherever it is when the tween starts toward a
/// target.
///
/// The tween does not own the value: the caller passes it to
/// [`advance`](Tween::advance) every frame. The start value is captured on
/// the first frame after the delay elapses, so a value changed by someone
/// else during the delay is picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T: Lerp> {
    start: Option<T>,
    target: T,
    duration: f32,
    delay: f32,
    elapsed: f32,
    ease: Ease,
    phase: Phase,
}

impl<T: Lerp> Tween<T> {
    pub fn to(target: T, duration: f32) -> Self {
        Self {
            start: None,
            target,
            duration: duration.max(0.0),
            delay: 0.0,
            elapsed: 0.0,
            ease: Ease::default(),
            phase: Phase::Active,
        }
    }

    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = seconds.max(0.0);
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn target(&self) -> T {
        self.target
    }

    /// Linear progress in `[0, 1]`, ignoring the ease curve.
    pub fn progress(&self) -> f32 {
        if self.phase == Phase::Done {
            return 1.0;
        }
        if self.duration == 0.0 {
            return if self.elapsed >= self.delay { 1.0 } else { 0.0 };
        }
        ((self.elapsed - self.delay) / self.duration).clamp(0.0, 1.0)
    }

    /// Waiting or running, not paused.
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn pause(&mut self) {
        if self.phase == Phase::Active {
            self.phase = Phase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            self.phase = Phase::Active;
        }
    }

    /// Stop where it is. The value keeps whatever it was last set to and no
    /// completion is reported.
    pub fn kill(&mut self) {
        self.phase = Phase::Done;
    }

    /// Move time forward by `dt` seconds and write the eased value.
    pub fn advance(&mut self, dt: f32, value: &mut T) -> TweenStatus {
        if self.phase != Phase::Active {
            return TweenStatus::Idle;
        }
        self.elapsed += dt;
        if self.elapsed < self.delay {
            return TweenStatus::Waiting;
        }
        let start = *self.start.get_or_insert(*value);
        let t = self.progress();
        if t >= 1.0 {
            *value = self.target;
            self.phase = Phase::Done;
            return TweenStatus::Completed;
        }
        *value = T::lerp(start, self.target, self.ease.apply(t));
        TweenStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_target_and_completes_once() {
        let mut v = 0.0f32;
        let mut tw = Tween::to(10.0, 1.0).ease(Ease::Linear);
        assert_eq!(tw.advance(0.5, &mut v), TweenStatus::Running);
        assert!((v - 5.0).abs() < 1e-5);
        assert_eq!(tw.advance(0.6, &mut v), TweenStatus::Completed);
        assert_eq!(v, 10.0);
        assert_eq!(tw.advance(0.1, &mut v), TweenStatus::Idle);
        assert!(tw.is_finished());
    }

    #[test]
    fn delay_defers_start_capture() {
        let mut v = 0.0f32;
        let mut tw = Tween::to(1.0, 1.0).delay(0.5).ease(Ease::Linear);
        assert_eq!(tw.advance(0.25, &mut v), TweenStatus::Waiting);
        // Someone else moves the value during the delay.
        v = 0.5;
        assert_eq!(tw.advance(0.25, &mut v), TweenStatus::Running);
        assert_eq!(v, 0.5);
        tw.advance(0.5, &mut v);
        assert!((v - 0.75).abs() < 1e-5);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut v = Vec3::ZERO;
        let mut tw = Tween::to(Vec3::X, 1.0).ease(Ease::Linear);
        tw.advance(0.5, &mut v);
        tw.pause();
        assert!(!tw.is_active());
        assert_eq!(tw.advance(10.0, &mut v), TweenStatus::Idle);
        assert!((v.x - 0.5).abs() < 1e-5);
        tw.resume();
        assert_eq!(tw.advance(0.5, &mut v), TweenStatus::Completed);
        assert_eq!(v, Vec3::X);
    }

    #[test]
    fn kill_stops_without_completion() {
        let mut v = 0.0f32;
        let mut tw = Tween::to(1.0, 1.0);
        tw.advance(0.2, &mut v);
        let frozen = v;
        tw.kill();
        assert_eq!(tw.advance(1.0, &mut v), TweenStatus::Idle);
        assert_eq!(v, frozen);
    }

    #[test]
    fn zero_duration_snaps() {
        let mut v = Vec2::ZERO;
        let mut tw = Tween::to(Vec2::ONE, 0.0);
        assert_eq!(tw.advance(0.016, &mut v), TweenStatus::Completed);
        assert_eq!(v, Vec2::ONE);
    }

    #[test]
    fn eased_value_stays_between_endpoints() {
        let mut v = 2.0f32;
        let mut tw = Tween::to(-2.0, 5.0).ease(Ease::Power3Out);
        while tw.advance(0.1, &mut v) == TweenStatus::Running {
            assert!((-2.0..=2.0).contains(&v));
        }
        assert_eq!(v, -2.0);
    }
}
