//! Procedural mesh generation for the framelab demos.
//!
//! Every generator returns an indexed triangle list with counter-clockwise
//! front faces, unit normals, texture coordinates with `v = 0` at the top of
//! the image, and per-vertex colors (white unless the shape defines its own).
//!
//! # Invariants
//! - `positions`, `normals`, `uvs` and `colors` always have the same length.
//! - Every index is smaller than the vertex count.

mod mesh;
mod primitives;
mod shapes;

pub use mesh::{BoundingSphere, Mesh};
pub use primitives::{capsule, circle, cuboid, cylinder, lathe, plane, sphere};
pub use shapes::{star_polygon, torus};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        let m = super::cuboid(1.0, 1.0, 1.0);
        assert!(m.is_consistent());
    }
}
