use std::collections::BTreeMap;

use framelab_common::{NodeId, Transform, look_rotation};
use framelab_geometry::{BoundingSphere, Mesh};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Environment, Material};

/// Index of a registered mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// Index of a registered material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub u32);

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("cannot attach {child:?} under {parent:?}: it would become its own ancestor")]
    Cycle { child: NodeId, parent: NodeId },
    #[error("unknown mesh {0:?}")]
    UnknownMesh(MeshHandle),
    #[error("unknown material {0:?}")]
    UnknownMaterial(MaterialHandle),
}

/// What a node draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Transform only.
    Group,
    Mesh {
        mesh: MeshHandle,
        material: MaterialHandle,
    },
    /// Red/green/blue axis lines of the given length.
    Axes(f32),
}

/// One entry in the scene graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            kind,
            parent: None,
            children: Vec::new(),
            attached: true,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self::new(name, NodeKind::Mesh { mesh, material })
    }

    pub fn axes(name: impl Into<String>, length: f32) -> Self {
        Self::new(name, NodeKind::Axes(length))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Reachable from the scene root (not removed from its parent).
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Instances of one (mesh, material) pair, ready for an instanced draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub instances: Vec<Mat4>,
}

impl DrawBatch {
    /// Order instances farthest-first from `eye`, for alpha blending.
    pub fn sort_back_to_front(&mut self, eye: Vec3) {
        self.instances.sort_by(|a, b| {
            let da = a.w_axis.truncate().distance_squared(eye);
            let db = b.w_axis.truncate().distance_squared(eye);
            db.total_cmp(&da)
        });
    }
}

#[derive(Debug, Clone)]
struct MeshEntry {
    mesh: Mesh,
    bounds: BoundingSphere,
}

/// Owner of nodes, meshes and materials.
///
/// Nodes live in a BTreeMap keyed by id; drawing order follows the root list
/// and each node's child list, both in insertion order. A node removed from
/// its parent stays in the map (so it can be re-attached) but is not drawn.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    roots: Vec<NodeId>,
    meshes: Vec<MeshEntry>,
    materials: Vec<Material>,
    pub environment: Environment,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    // -- registries --------------------------------------------------------

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        let bounds = mesh.bounding_sphere();
        self.meshes.push(MeshEntry { mesh, bounds });
        MeshHandle(self.meshes.len() as u32 - 1)
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle.0 as usize).map(|e| &e.mesh)
    }

    pub fn mesh_bounds(&self, handle: MeshHandle) -> Option<BoundingSphere> {
        self.meshes.get(handle.0 as usize).map(|e| e.bounds)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshHandle, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(i, e)| (MeshHandle(i as u32), &e.mesh))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.push(material);
        MaterialHandle(self.materials.len() as u32 - 1)
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.0 as usize)
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle.0 as usize)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialHandle, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialHandle(i as u32), m))
    }

    // -- nodes -------------------------------------------------------------

    /// Insert `node` under `parent` (or at the root). Returns its id.
    pub fn add(&mut self, parent: Option<NodeId>, mut node: Node) -> Result<NodeId, SceneError> {
        if let NodeKind::Mesh { mesh, material } = node.kind {
            if self.mesh(mesh).is_none() {
                return Err(SceneError::UnknownMesh(mesh));
            }
            if self.material(material).is_none() {
                return Err(SceneError::UnknownMaterial(material));
            }
        }
        if let Some(p) = parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::UnknownNode(p));
            }
        }

        let id = NodeId::new();
        node.parent = parent;
        node.children.clear();
        node.attached = true;
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.nodes.insert(id, node);
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(&id).map(|n| &n.transform)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes.get_mut(&id).map(|n| &mut n.transform)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))?;
        node.visible = visible;
        Ok(())
    }

    /// Detach `id` from its parent. The node and its subtree are kept but no
    /// longer drawn until re-attached.
    pub fn remove_from_parent(&mut self, id: NodeId) -> Result<(), SceneError> {
        if !self.nodes.contains_key(&id) {
            return Err(SceneError::UnknownNode(id));
        }
        self.unlink(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attached = false;
        }
        debug!(node = %id.short(), "removed from parent");
        Ok(())
    }

    /// Move `child` under `parent` (or to the root), keeping its local
    /// transform.
    pub fn attach(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        if !self.nodes.contains_key(&child) {
            return Err(SceneError::UnknownNode(child));
        }
        if let Some(p) = parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::UnknownNode(p));
            }
            // Walk up from the new parent; meeting `child` means a cycle.
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == child {
                    return Err(SceneError::Cycle { child, parent: p });
                }
                cursor = self.nodes.get(&c).and_then(|n| n.parent);
            }
        }

        self.unlink(child);
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
            node.attached = true;
        }
        debug!(node = %child.short(), parent = ?parent.map(|p| p.short()), "attached");
        Ok(())
    }

    /// Move `child` under `parent` while keeping its world transform: the
    /// local transform is recomputed relative to the new parent.
    pub fn attach_keep_world(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let world = self.world_matrix(child).ok_or(SceneError::UnknownNode(child))?;
        let parent_world = match parent {
            Some(p) => self.world_matrix(p).ok_or(SceneError::UnknownNode(p))?,
            None => Mat4::IDENTITY,
        };
        self.attach(child, parent)?;
        let local = parent_world.inverse() * world;
        let (scale, rotation, position) = local.to_scale_rotation_translation();
        if let Some(t) = self.transform_mut(child) {
            *t = Transform {
                position,
                rotation,
                scale,
            };
        }
        Ok(())
    }

    /// Delete `id` and its whole subtree. Returns the number of nodes removed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if !self.nodes.contains_key(&id) {
            return 0;
        }
        self.unlink(id);
        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.remove(&n) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    fn unlink(&mut self, id: NodeId) {
        let parent = self.nodes.get(&id).and_then(|n| n.parent);
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    // -- spatial queries ---------------------------------------------------

    /// Local-to-world matrix, composed through every ancestor.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut m = node.transform.matrix();
        while let Some(p) = node.parent {
            node = self.nodes.get(&p)?;
            m = node.transform.matrix() * m;
        }
        Some(m)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.w_axis.truncate())
    }

    pub fn world_rotation(&self, id: NodeId) -> Option<Quat> {
        self.world_matrix(id)
            .map(|m| m.to_scale_rotation_translation().1)
    }

    /// Turn the node so its local +Z axis faces the world-space `target`,
    /// compensating for any rotation inherited from its parents.
    pub fn look_at(&mut self, id: NodeId, target: Vec3, up: Vec3) -> Result<(), SceneError> {
        let eye = self.world_position(id).ok_or(SceneError::UnknownNode(id))?;
        let parent_rotation = self
            .nodes
            .get(&id)
            .and_then(|n| n.parent)
            .and_then(|p| self.world_rotation(p))
            .unwrap_or(Quat::IDENTITY);
        let world = look_rotation(eye, target, up);
        if let Some(t) = self.transform_mut(id) {
            t.rotation = (parent_rotation.inverse() * world).normalize();
        }
        Ok(())
    }

    /// The node and all of its ancestors are visible and attached.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            match self.nodes.get(&c) {
                Some(n) if n.visible && n.attached => cursor = n.parent,
                _ => return false,
            }
        }
        true
    }

    /// Depth-first walk of every visible node with its world matrix.
    pub fn visible_nodes(&self) -> Vec<(NodeId, Mat4)> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|r| (*r, Mat4::IDENTITY))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            out.push((id, world));
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
        out
    }

    /// Visible mesh nodes grouped per (mesh, material), in handle order.
    pub fn visible_meshes(&self) -> Vec<DrawBatch> {
        let mut groups: BTreeMap<(MeshHandle, MaterialHandle), Vec<Mat4>> = BTreeMap::new();
        for (id, world) in self.visible_nodes() {
            if let Some(NodeKind::Mesh { mesh, material }) = self.nodes.get(&id).map(|n| n.kind) {
                groups.entry((mesh, material)).or_default().push(world);
            }
        }
        groups
            .into_iter()
            .map(|((mesh, material), instances)| DrawBatch {
                mesh,
                material,
                instances,
            })
            .collect()
    }

    /// Visible axes helpers as (world matrix, length).
    pub fn visible_axes(&self) -> Vec<(Mat4, f32)> {
        self.visible_nodes()
            .into_iter()
            .filter_map(|(id, world)| match self.nodes.get(&id).map(|n| n.kind) {
                Some(NodeKind::Axes(len)) => Some((world, len)),
                _ => None,
            })
            .collect()
    }

    /// Ids of every mesh node, attached or not, in id order.
    pub fn mesh_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Mesh { .. }))
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelab_common::Color;
    use framelab_geometry::cuboid;
    use std::f32::consts::FRAC_PI_2;

    fn scene_with_box() -> (Scene, MeshHandle, MaterialHandle) {
        let mut s = Scene::new();
        let mesh = s.add_mesh(cuboid(1.0, 1.0, 1.0));
        let mat = s.add_material(Material::phong(Color::from_hex(0x3399ff)));
        (s, mesh, mat)
    }

    #[test]
    fn add_under_unknown_parent_fails() {
        let (mut s, _, _) = scene_with_box();
        let err = s.add(Some(NodeId::new()), Node::group("g"));
        assert!(matches!(err, Err(SceneError::UnknownNode(_))));
    }

    #[test]
    fn add_rejects_unknown_handles() {
        let (mut s, mesh, _) = scene_with_box();
        let err = s.add(None, Node::mesh("m", mesh, MaterialHandle(9)));
        assert!(matches!(err, Err(SceneError::UnknownMaterial(_))));
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut s = Scene::new();
        let g = s
            .add(None, Node::group("g").with_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let c = s
            .add(Some(g), Node::group("c").with_position(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        assert_eq!(s.world_position(c).unwrap(), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn attach_under_descendant_is_cycle() {
        let mut s = Scene::new();
        let a = s.add(None, Node::group("a")).unwrap();
        let b = s.add(Some(a), Node::group("b")).unwrap();
        let c = s.add(Some(b), Node::group("c")).unwrap();
        assert!(matches!(s.attach(a, Some(c)), Err(SceneError::Cycle { .. })));
        assert!(matches!(s.attach(a, Some(a)), Err(SceneError::Cycle { .. })));
        // Tree untouched.
        assert_eq!(s.get(c).unwrap().parent(), Some(b));
        assert_eq!(s.roots(), &[a]);
    }

    #[test]
    fn attach_moves_between_parents() {
        let mut s = Scene::new();
        let a = s.add(None, Node::group("a")).unwrap();
        let b = s.add(None, Node::group("b")).unwrap();
        let c = s.add(Some(a), Node::group("c")).unwrap();
        s.attach(c, Some(b)).unwrap();
        assert!(s.get(a).unwrap().children().is_empty());
        assert_eq!(s.get(b).unwrap().children(), &[c]);
        s.attach(c, None).unwrap();
        assert_eq!(s.roots(), &[a, b, c]);
    }

    #[test]
    fn attach_keep_world_preserves_position() {
        let mut s = Scene::new();
        let g = s
            .add(
                None,
                Node::group("g").with_transform(Transform::default().with_euler(0.0, FRAC_PI_2, 0.0)),
            )
            .unwrap();
        let c = s
            .add(Some(g), Node::group("c").with_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let before = s.world_position(c).unwrap();
        s.attach_keep_world(c, None).unwrap();
        let after = s.world_position(c).unwrap();
        assert!((before - after).length() < 1e-5);
        assert!((after - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn removed_from_parent_is_not_drawn() {
        let (mut s, mesh, mat) = scene_with_box();
        let g = s.add(None, Node::group("g")).unwrap();
        let m = s.add(Some(g), Node::mesh("m", mesh, mat)).unwrap();
        assert_eq!(s.visible_meshes().len(), 1);
        s.remove_from_parent(m).unwrap();
        assert!(s.visible_meshes().is_empty());
        assert!(!s.is_visible(m));
        assert!(s.contains(m));
        s.attach(m, Some(g)).unwrap();
        assert!(s.is_visible(m));
    }

    #[test]
    fn hidden_parent_hides_subtree() {
        let (mut s, mesh, mat) = scene_with_box();
        let g = s.add(None, Node::group("g").hidden()).unwrap();
        let m = s.add(Some(g), Node::mesh("m", mesh, mat)).unwrap();
        assert!(!s.is_visible(m));
        assert!(s.visible_meshes().is_empty());
        s.set_visible(g, true).unwrap();
        assert!(s.is_visible(m));
    }

    #[test]
    fn instances_share_one_batch() {
        let (mut s, mesh, mat) = scene_with_box();
        let red = s.add_material(Material::phong(Color::RED));
        for i in 0..100 {
            let material = if i == 7 { red } else { mat };
            s.add(
                None,
                Node::mesh("box", mesh, material).with_position(Vec3::splat(i as f32)),
            )
            .unwrap();
        }
        let batches = s.visible_meshes();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].instances.len(), 99);
        assert_eq!(batches[1].instances.len(), 1);
        assert_eq!(batches[1].instances[0].w_axis.truncate(), Vec3::splat(7.0));
    }

    #[test]
    fn look_at_compensates_parent_rotation() {
        let mut s = Scene::new();
        let g = s
            .add(
                None,
                Node::group("g").with_transform(Transform::default().with_euler(0.0, 1.0, 0.0)),
            )
            .unwrap();
        let c = s.add(Some(g), Node::group("c")).unwrap();
        let target = Vec3::new(0.0, 0.0, 20.0);
        s.look_at(c, target, Vec3::Y).unwrap();
        let forward = s.world_rotation(c).unwrap() * Vec3::Z;
        assert!((forward - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut s = Scene::new();
        let a = s.add(None, Node::group("a")).unwrap();
        let b = s.add(Some(a), Node::group("b")).unwrap();
        s.add(Some(b), Node::group("c")).unwrap();
        assert_eq!(s.remove(a), 3);
        assert_eq!(s.node_count(), 0);
        assert!(s.roots().is_empty());
    }

    #[test]
    fn back_to_front_order() {
        let mut batch = DrawBatch {
            mesh: MeshHandle(0),
            material: MaterialHandle(0),
            instances: vec![
                Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)),
                Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
            ],
        };
        batch.sort_back_to_front(Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(batch.instances[0].w_axis.z, -5.0);
    }

    #[test]
    fn axes_are_listed() {
        let mut s = Scene::new();
        s.add(None, Node::axes("axes", 5.0)).unwrap();
        let axes = s.visible_axes();
        assert_eq!(axes.len(), 1);
        assert_eq!(axes[0].1, 5.0);
    }
}
