use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};

use crate::Mesh;

/// Axis-aligned box centered on the origin: 4 vertices per face so each face
/// carries its own normal and full `[0, 1]` texture coordinates.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Mesh {
    let half = Vec3::new(width, height, depth) * 0.5;
    // (normal, right, up) with right x up == normal.
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let corners = [
        (-1.0, -1.0, [0.0, 1.0]),
        (1.0, -1.0, [1.0, 1.0]),
        (1.0, 1.0, [1.0, 0.0]),
        (-1.0, 1.0, [0.0, 0.0]),
    ];

    let mut mesh = Mesh::default();
    for (normal, right, up) in faces {
        let base = mesh.vertex_count() as u32;
        for (su, sv, uv) in corners {
            let p = (normal + right * su + up * sv) * half;
            mesh.push_vertex(p, normal, uv);
        }
        mesh.push_triangle(base, base + 1, base + 2);
        mesh.push_triangle(base, base + 2, base + 3);
    }
    mesh
}

/// Rectangle in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> Mesh {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let mut mesh = Mesh::default();
    mesh.push_vertex(Vec3::new(-hw, hh, 0.0), Vec3::Z, [0.0, 0.0]);
    mesh.push_vertex(Vec3::new(hw, hh, 0.0), Vec3::Z, [1.0, 0.0]);
    mesh.push_vertex(Vec3::new(-hw, -hh, 0.0), Vec3::Z, [0.0, 1.0]);
    mesh.push_vertex(Vec3::new(hw, -hh, 0.0), Vec3::Z, [1.0, 1.0]);
    mesh.push_triangle(0, 2, 1);
    mesh.push_triangle(1, 2, 3);
    mesh
}

/// Flat disc in the XY plane facing +Z, built as a fan around the center.
pub fn circle(radius: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let mut mesh = Mesh::default();
    mesh.push_vertex(Vec3::ZERO, Vec3::Z, [0.5, 0.5]);
    for i in 0..=segments {
        let theta = i as f32 / segments as f32 * TAU;
        let (s, c) = theta.sin_cos();
        mesh.push_vertex(
            Vec3::new(c * radius, s * radius, 0.0),
            Vec3::Z,
            [(c + 1.0) * 0.5, 1.0 - (s + 1.0) * 0.5],
        );
    }
    for i in 1..=segments {
        mesh.push_triangle(0, i, i + 1);
    }
    mesh
}

/// UV sphere. Rows run from the north pole (`v = 0`) to the south pole.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut mesh = Mesh::default();

    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let (su, cu) = (u * TAU).sin_cos();
            let (sv, cv) = (v * PI).sin_cos();
            let n = Vec3::new(-cu * sv, cv, su * sv);
            mesh.push_vertex(n * radius, n.normalize_or_zero(), [u, v]);
        }
    }

    let row = ws + 1;
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                mesh.push_triangle(a, b, d);
            }
            if iy != hs - 1 {
                mesh.push_triangle(b, c, d);
            }
        }
    }
    mesh
}

/// Capped cylinder along Y centered on the origin.
///
/// A zero `radius_top` gives a cone (the top cap is skipped); three radial
/// segments give a triangular prism.
pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Mesh {
    let segments = radial_segments.max(3);
    let half = height * 0.5;
    let slope = if height != 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };
    let mut mesh = Mesh::default();

    // Side wall: top row then bottom row, seam duplicated for UVs.
    let row = segments + 1;
    for (r, y, v) in [(radius_top, half, 0.0), (radius_bottom, -half, 1.0)] {
        for x in 0..=segments {
            let u = x as f32 / segments as f32;
            let (s, c) = (u * TAU).sin_cos();
            let normal = Vec3::new(s, slope, c).normalize_or_zero();
            mesh.push_vertex(Vec3::new(r * s, y, r * c), normal, [u, v]);
        }
    }
    for x in 0..segments {
        let a = x;
        let b = row + x;
        let c = row + x + 1;
        let d = x + 1;
        mesh.push_triangle(a, b, d);
        mesh.push_triangle(b, c, d);
    }

    if radius_top > 0.0 {
        push_cap(&mut mesh, radius_top, half, segments, true);
    }
    if radius_bottom > 0.0 {
        push_cap(&mut mesh, radius_bottom, -half, segments, false);
    }
    mesh
}

fn push_cap(mesh: &mut Mesh, radius: f32, y: f32, segments: u32, top: bool) {
    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
    let center = mesh.push_vertex(Vec3::new(0.0, y, 0.0), normal, [0.5, 0.5]);
    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * TAU;
        let (s, c) = theta.sin_cos();
        mesh.push_vertex(
            Vec3::new(radius * s, y, radius * c),
            normal,
            [s * 0.5 + 0.5, c * 0.5 + 0.5],
        );
    }
    for x in 0..segments {
        let i = center + 1 + x;
        if top {
            mesh.push_triangle(center, i, i + 1);
        } else {
            mesh.push_triangle(center, i + 1, i);
        }
    }
}

/// Capsule along Y: a cylinder of `length` with hemispherical ends.
///
/// Total height is `length + 2 * radius`.
pub fn capsule(radius: f32, length: f32, cap_segments: u32, radial_segments: u32) -> Mesh {
    let caps = cap_segments.max(1);
    let half = length * 0.5;
    let mut profile = Vec::with_capacity(caps as usize * 2 + 2);
    for i in 0..=caps {
        let a = -FRAC_PI_2 + FRAC_PI_2 * i as f32 / caps as f32;
        profile.push(Vec2::new(radius * a.cos(), -half + radius * a.sin()));
    }
    for i in 0..=caps {
        let a = FRAC_PI_2 * i as f32 / caps as f32;
        profile.push(Vec2::new(radius * a.cos(), half + radius * a.sin()));
    }
    if length <= 0.0 {
        // Both arcs meet at the equator; drop the repeated point.
        profile.remove(caps as usize + 1);
    }
    lathe(&profile, radial_segments)
}

/// Revolve a profile in the XY plane (x = radius, y = height) around Y.
///
/// Normals come from the profile tangent, so a profile that climbs in `y`
/// faces outward.
pub fn lathe(points: &[Vec2], segments: u32) -> Mesh {
    let segments = segments.max(3);
    let mut mesh = Mesh::default();
    let count = points.len();
    if count < 2 {
        return mesh;
    }

    let profile_normals: Vec<Vec2> = (0..count)
        .map(|j| {
            let prev = points[j.saturating_sub(1)];
            let next = points[(j + 1).min(count - 1)];
            let t = next - prev;
            Vec2::new(t.y, -t.x).normalize_or_zero()
        })
        .collect();

    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let (s, c) = (u * TAU).sin_cos();
        for (j, p) in points.iter().enumerate() {
            let n = profile_normals[j];
            let v = j as f32 / (count - 1) as f32;
            mesh.push_vertex(
                Vec3::new(p.x * s, p.y, p.x * c),
                Vec3::new(n.x * s, n.y, n.x * c),
                [u, v],
            );
        }
    }

    let count = count as u32;
    for i in 0..segments {
        for j in 0..count - 1 {
            let base = j + i * count;
            let a = base;
            let b = base + count;
            let c = base + count + 1;
            let d = base + 1;
            mesh.push_triangle(a, b, d);
            mesh.push_triangle(c, d, b);
        }
    }
    mesh
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every non-degenerate triangle winds counter-clockwise when seen from
    /// the side its vertex normals point to.
    pub(crate) fn assert_outward_winding(mesh: &Mesh) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.positions[i as usize]));
            let face = (b - a).cross(c - a);
            if face.length() < 1e-7 {
                continue;
            }
            let n: Vec3 = tri
                .iter()
                .map(|&i| Vec3::from(mesh.normals[i as usize]))
                .sum();
            assert!(face.dot(n) > 0.0, "triangle {tri:?} winds inward");
        }
    }

    fn assert_unit_normals(mesh: &Mesh) {
        for n in &mesh.normals {
            let len = Vec3::from(*n).length();
            assert!((len - 1.0).abs() < 1e-4, "normal length {len}");
        }
    }

    #[test]
    fn cuboid_counts_and_extent() {
        let m = cuboid(2.0, 4.0, 6.0);
        assert_eq!(m.vertex_count(), 24);
        assert_eq!(m.indices.len(), 36);
        assert!(m.is_consistent());
        let max = m.positions.iter().fold(Vec3::ZERO, |acc, p| acc.max(Vec3::from(*p)));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
        assert_outward_winding(&m);
        assert_unit_normals(&m);
    }

    #[test]
    fn plane_faces_positive_z() {
        let m = plane(1.0, 1.5);
        assert_eq!(m.vertex_count(), 4);
        assert_eq!(m.triangle_count(), 2);
        assert_outward_winding(&m);
        // Top-left corner samples the top-left of the image.
        assert_eq!(m.positions[0], [-0.5, 0.75, 0.0]);
        assert_eq!(m.uvs[0], [0.0, 0.0]);
    }

    #[test]
    fn circle_fan() {
        let m = circle(2.5, 32);
        assert_eq!(m.vertex_count(), 34);
        assert_eq!(m.triangle_count(), 32);
        assert_outward_winding(&m);
        for p in &m.positions[1..] {
            assert!((Vec3::from(*p).length() - 2.5).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_vertices_on_radius() {
        let m = sphere(5.0, 18, 18);
        assert!(m.is_consistent());
        assert_eq!(m.vertex_count(), 19 * 19);
        // Pole rows contribute one triangle per segment, others two.
        assert_eq!(m.triangle_count(), (18 * 2 * 18 - 2 * 18) as usize);
        for p in &m.positions {
            assert!((Vec3::from(*p).length() - 5.0).abs() < 1e-4);
        }
        assert_outward_winding(&m);
        assert_unit_normals(&m);
    }

    #[test]
    fn cylinder_has_both_caps() {
        let m = cylinder(2.0, 2.0, 0.5, 20);
        assert!(m.is_consistent());
        // wall + two caps
        assert_eq!(m.triangle_count(), 20 * 2 + 20 * 2);
        assert_outward_winding(&m);
        assert_unit_normals(&m);
    }

    #[test]
    fn cone_skips_top_cap() {
        let m = cylinder(0.0, 0.4, 1.5, 15);
        assert_eq!(m.triangle_count(), 15 * 2 + 15);
        assert_outward_winding(&m);
    }

    #[test]
    fn prism_from_three_segments() {
        let m = cylinder(5.0, 5.0, 0.1, 3);
        assert_eq!(m.triangle_count(), 3 * 2 + 3 * 2);
        assert_outward_winding(&m);
    }

    #[test]
    fn capsule_height_includes_caps() {
        let m = capsule(2.5, 8.0, 5, 10);
        assert!(m.is_consistent());
        let (lo, hi) = m
            .positions
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
        assert!((lo + 6.5).abs() < 1e-5);
        assert!((hi - 6.5).abs() < 1e-5);
        assert_outward_winding(&m);
    }

    #[test]
    fn lathe_needs_two_points() {
        assert_eq!(lathe(&[Vec2::new(1.0, 0.0)], 12).vertex_count(), 0);
        let m = lathe(&[Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0)], 12);
        assert_eq!(m.vertex_count(), 13 * 2);
        assert_eq!(m.triangle_count(), 12 * 2);
        assert_outward_winding(&m);
    }
}
