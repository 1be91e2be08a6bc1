use framelab_common::NodeId;
use glam::{Mat4, Vec3};

use crate::{NodeKind, Scene};

const EPSILON: f32 = 1e-7;

/// Half-line with a unit direction; `t` along it is a distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// One intersection, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore. With `cull_back`, triangles seen from behind (wound
    /// clockwise from the ray origin) are ignored.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3, cull_back: bool) -> Option<f32> {
        let e1 = b - a;
        let e2 = c - a;
        let p = self.direction.cross(e2);
        let det = e1.dot(p);
        if cull_back {
            if det < EPSILON {
                return None;
            }
        } else if det.abs() < EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = self.direction.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv;
        (t > EPSILON).then_some(t)
    }

    /// Whether the ray passes through the sphere anywhere ahead of its origin.
    pub fn hits_sphere(&self, center: Vec3, radius: f32) -> bool {
        let oc = center - self.origin;
        let tca = oc.dot(self.direction);
        let d2 = oc.length_squared() - tca * tca;
        if d2 > radius * radius {
            return false;
        }
        // Sphere entirely behind the origin.
        !(tca < 0.0 && oc.length_squared() > radius * radius)
    }
}

impl Scene {
    /// Intersect `ray` with the given mesh nodes, nearest hit first.
    ///
    /// Invisible or detached nodes and non-mesh nodes are skipped. Each node
    /// reports at most its nearest triangle. Single-sided materials only hit
    /// front faces.
    pub fn raycast(&self, ray: &Ray, candidates: &[NodeId]) -> Vec<Hit> {
        let mut hits: Vec<Hit> = candidates
            .iter()
            .filter(|id| self.is_visible(**id))
            .filter_map(|id| self.raycast_node(ray, *id))
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Intersect `ray` with every visible mesh node.
    pub fn raycast_all(&self, ray: &Ray) -> Vec<Hit> {
        self.raycast(ray, &self.mesh_nodes())
    }

    fn raycast_node(&self, ray: &Ray, id: NodeId) -> Option<Hit> {
        let NodeKind::Mesh { mesh, material } = self.get(id)?.kind else {
            return None;
        };
        let world = self.world_matrix(id)?;
        let bounds = self.mesh_bounds(mesh)?;
        let center = world.transform_point3(bounds.center);
        if !ray.hits_sphere(center, bounds.radius * max_scale(&world)) {
            return None;
        }

        let cull_back = !self.material(material)?.double_sided;
        let nearest = self
            .mesh(mesh)?
            .triangles()
            .filter_map(|[a, b, c]| {
                ray.intersect_triangle(
                    world.transform_point3(a),
                    world.transform_point3(b),
                    world.transform_point3(c),
                    cull_back,
                )
            })
            .min_by(|a, b| a.total_cmp(b))?;

        Some(Hit {
            node: id,
            distance: nearest,
            point: ray.at(nearest),
        })
    }
}

fn max_scale(m: &Mat4) -> f32 {
    m.x_axis
        .truncate()
        .length()
        .max(m.y_axis.truncate().length())
        .max(m.z_axis.truncate().length())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Node};
    use framelab_common::{Color, Transform};
    use framelab_geometry::{cuboid, plane};
    use std::f32::consts::PI;

    #[test]
    fn triangle_front_and_back() {
        let (a, b, c) = (
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let front = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert_eq!(front.intersect_triangle(a, b, c, true), Some(5.0));
        let back = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert_eq!(back.intersect_triangle(a, b, c, true), None);
        assert_eq!(back.intersect_triangle(a, b, c, false), Some(5.0));
    }

    #[test]
    fn triangle_miss_outside_edges() {
        let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = ray.intersect_triangle(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            false,
        );
        assert_eq!(hit, None);
    }

    #[test]
    fn sphere_behind_origin_is_missed() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(ray.hits_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
        assert!(!ray.hits_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
        assert!(!ray.hits_sphere(Vec3::new(5.0, 0.0, 10.0), 1.0));
        // Origin inside the sphere.
        assert!(ray.hits_sphere(Vec3::ZERO, 1.0));
    }

    #[test]
    fn hits_sorted_nearest_first() {
        let mut s = Scene::new();
        let mesh = s.add_mesh(cuboid(1.0, 1.0, 1.0));
        let mat = s.add_material(Material::phong(Color::WHITE));
        let far = s
            .add(None, Node::mesh("far", mesh, mat).with_position(Vec3::new(0.0, 0.0, -5.0)))
            .unwrap();
        let near = s.add(None, Node::mesh("near", mesh, mat)).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hits = s.raycast(&ray, &[far, near]);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert!((hits[0].distance - 9.5).abs() < 1e-5);
        assert!((hits[0].point - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);
        assert_eq!(hits[1].node, far);
    }

    #[test]
    fn invisible_and_unlisted_nodes_are_skipped() {
        let mut s = Scene::new();
        let mesh = s.add_mesh(cuboid(1.0, 1.0, 1.0));
        let mat = s.add_material(Material::basic(Color::WHITE));
        let hidden = s.add(None, Node::mesh("hidden", mesh, mat).hidden()).unwrap();
        let other = s
            .add(None, Node::mesh("other", mesh, mat).with_position(Vec3::new(0.0, 0.0, -3.0)))
            .unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(s.raycast(&ray, &[hidden]).is_empty());
        let all = s.raycast_all(&ray);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].node, other);
    }

    #[test]
    fn single_sided_plane_seen_from_behind() {
        let mut s = Scene::new();
        let mesh = s.add_mesh(plane(1.0, 1.0));
        let single = s.add_material(Material::basic(Color::WHITE));
        let double = s.add_material(Material::basic(Color::WHITE).with_double_side());
        let turned = Transform::default().with_euler(0.0, PI, 0.0);
        let a = s.add(None, Node::mesh("a", mesh, single).with_transform(turned)).unwrap();
        let b = s.add(None, Node::mesh("b", mesh, double).with_transform(turned)).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(s.raycast(&ray, &[a]).is_empty());
        assert_eq!(s.raycast(&ray, &[b]).len(), 1);
    }

    #[test]
    fn scaled_parent_scales_hit_distance() {
        let mut s = Scene::new();
        let mesh = s.add_mesh(cuboid(1.0, 1.0, 1.0));
        let mat = s.add_material(Material::basic(Color::WHITE));
        let g = s
            .add(None, Node::group("g").with_transform(Transform::default().with_uniform_scale(4.0)))
            .unwrap();
        let m = s.add(Some(g), Node::mesh("m", mesh, mat)).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hits = s.raycast(&ray, &[m]);
        assert!((hits[0].distance - 8.0).abs() < 1e-4);
    }
}
