//! Scene graph: a hierarchy of transform groups and meshes sharing geometry
//! and materials, plus the lighting environment and raycast picking.
//!
//! # Invariants
//! - Every node has at most one parent; the parent/child links never form a
//!   cycle.
//! - Iteration over nodes and draw batches is deterministic (BTreeMap order
//!   and child insertion order).
//! - Meshes and materials are registered once and shared by handle; many
//!   nodes may draw the same mesh.

pub mod graph;
pub mod material;
pub mod raycast;

pub use graph::{DrawBatch, MaterialHandle, MeshHandle, Node, NodeKind, Scene, SceneError};
pub use material::{DirectionalLight, Environment, Fog, Material};
pub use raycast::{Hit, Ray};
