use glam::Vec3;

/// CPU-side triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

/// Sphere enclosing every vertex of a mesh, in mesh-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Push one vertex with a white color and return its index.
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: [f32; 2]) -> u32 {
        self.push_colored(position, normal, uv, [1.0, 1.0, 1.0, 1.0])
    }

    pub fn push_colored(&mut self, position: Vec3, normal: Vec3, uv: [f32; 2], color: [f32; 4]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        self.uvs.push(uv);
        self.colors.push(color);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Attribute arrays line up and all indices are in range.
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.normals.len() == n
            && self.uvs.len() == n
            && self.colors.len() == n
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
    }

    /// Triangles as position triples, in index order.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                Vec3::from(self.positions[tri[0] as usize]),
                Vec3::from(self.positions[tri[1] as usize]),
                Vec3::from(self.positions[tri[2] as usize]),
            ]
        })
    }

    /// Center of the axis-aligned bounds plus the farthest vertex distance.
    ///
    /// An empty mesh yields a zero sphere at the origin.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        if self.positions.is_empty() {
            return BoundingSphere {
                center: Vec3::ZERO,
                radius: 0.0,
            };
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &self.positions {
            let p = Vec3::from(*p);
            min = min.min(p);
            max = max.max(p);
        }
        let center = (min + max) * 0.5;
        let radius = self
            .positions
            .iter()
            .map(|p| Vec3::from(*p).distance(center))
            .fold(0.0f32, f32::max);
        BoundingSphere { center, radius }
    }

    /// Replace every vertex color.
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.colors.iter_mut().for_each(|c| *c = color);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_bounds() {
        let m = Mesh::default();
        let b = m.bounding_sphere();
        assert_eq!(b.radius, 0.0);
        assert!(m.is_consistent());
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let mut m = Mesh::default();
        m.push_vertex(Vec3::new(-1.0, 0.0, 0.0), Vec3::Z, [0.0, 0.0]);
        m.push_vertex(Vec3::new(3.0, 0.0, 0.0), Vec3::Z, [1.0, 0.0]);
        m.push_vertex(Vec3::new(1.0, 2.0, 0.0), Vec3::Z, [0.0, 1.0]);
        m.push_triangle(0, 1, 2);
        let b = m.bounding_sphere();
        assert!((b.center - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
        for p in &m.positions {
            assert!(Vec3::from(*p).distance(b.center) <= b.radius + 1e-6);
        }
    }

    #[test]
    fn out_of_range_index_is_inconsistent() {
        let mut m = Mesh::default();
        m.push_vertex(Vec3::ZERO, Vec3::Z, [0.0, 0.0]);
        m.push_triangle(0, 0, 5);
        assert!(!m.is_consistent());
    }
}
