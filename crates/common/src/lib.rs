//! Shared types for the framelab demos: node ids, transforms, colors and a
//! seeded random source.

mod color;
mod rng;
mod types;

pub use color::{Color, hsl_to_rgb8};
pub use rng::Rng;
pub use types::{NodeId, TextureKey, Transform, look_rotation};
