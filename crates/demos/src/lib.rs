//! The eight framelab demos.
//!
//! Each demo owns its scene (or raw meshes, or pass graph), reacts to
//! [`Action`](framelab_input::Action)s, advances once per frame and exposes a
//! borrowed [`FrameView`](framelab_render::FrameView) for any renderer.
//!
//! # Invariants
//! - Demos are deterministic for a given seed and frame sequence; the only
//!   randomness comes from [`framelab_common::Rng`].
//! - Pass graphs returned by the offscreen demos always validate.
//! - Demos never touch the GPU.

pub mod config;
pub mod crossfade;
pub mod cube_shift;
mod demo;
pub mod fan;
pub mod flight;
pub mod gallery;
pub mod lights;
pub mod polygon;
pub mod slideshow;
mod tilt;

pub use config::{ConfigError, FramelabConfig};
pub use demo::{Demo, DemoId, UnknownDemo, create};

use framelab_common::Color;
use framelab_scene::{DirectionalLight, Environment};
use glam::Vec3;

/// White directional light from `(1, 1, 1)` plus white ambient, the lighting
/// every scene-graph demo starts from.
pub(crate) fn lit_environment(clear_color: Color, ambient: f32) -> Environment {
    Environment {
        clear_color,
        ambient: Color::WHITE,
        ambient_intensity: ambient,
        directional: Some(DirectionalLight::from_position(Vec3::ONE, Color::WHITE, 1.0)),
        fog: None,
    }
}

pub fn crate_info() -> &'static str {
    "framelab-demos v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("demos"));
    }

    #[test]
    fn lit_environment_points_light_down_the_diagonal() {
        let env = lit_environment(Color::BLACK, 0.3);
        let light = env.directional.unwrap();
        assert!((light.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(env.ambient_rgb(), [0.3, 0.3, 0.3]);
    }
}
