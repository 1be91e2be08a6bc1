use std::f32::consts::TAU;

use framelab_common::Color;
use glam::Vec3;

use crate::Mesh;

/// Ring torus in the XZ plane.
///
/// `rows` steps around the tube cross-section, `columns` around the main
/// ring. The tube has radius `inner_radius` and sits `outer_radius` from the
/// center.
pub fn torus(rows: u32, columns: u32, inner_radius: f32, outer_radius: f32, color: Color) -> Mesh {
    let rows = rows.max(3);
    let columns = columns.max(3);
    let rgba = color.to_array();
    let mut mesh = Mesh::default();

    for i in 0..=rows {
        let (ry, rr) = (TAU / rows as f32 * i as f32).sin_cos();
        for ii in 0..=columns {
            let (ts, tc) = (TAU / columns as f32 * ii as f32).sin_cos();
            let ring = rr * inner_radius + outer_radius;
            let position = Vec3::new(ring * tc, ry * inner_radius, ring * ts);
            let normal = Vec3::new(rr * tc, ry, rr * ts);
            let s = ii as f32 / columns as f32;
            let mut t = i as f32 / rows as f32 + 0.5;
            if t > 1.0 {
                t -= 1.0;
            }
            mesh.push_colored(position, normal, [s, 1.0 - t], rgba);
        }
    }

    for i in 0..rows {
        for ii in 0..columns {
            let r = (columns + 1) * i + ii;
            mesh.push_triangle(r, r + columns + 1, r + 1);
            mesh.push_triangle(r + columns + 1, r + columns + 2, r + 1);
        }
    }
    mesh
}

/// Star polygon around the origin in the XY plane, radius 0.5.
///
/// The outline has `2 * polygon` points: even points sit on the outer
/// radius, odd points on `0.5 * cos(PI / polygon) * coefficient`. A
/// coefficient of 1 gives the regular polygon; smaller values pinch it into
/// a star. Each spoke triangle is (center, point i, point i + 1) with a white
/// center and the outline points hued by their angle. Vertices are not
/// shared, so the mesh can be streamed as a plain vertex list.
pub fn star_polygon(polygon: u32, coefficient: f32) -> Mesh {
    let polygon = polygon.max(3);
    let points = polygon * 2;
    let step_deg = 360.0 / points as f32;
    let step = step_deg.to_radians();
    let radius = 0.5;
    let inner = radius * step.cos() * coefficient;

    let outline = |idx: u32| -> Vec3 {
        let (s, c) = (step * idx as f32).sin_cos();
        let r = if idx % 2 == 0 { radius } else { inner };
        Vec3::new(r * c, r * s, 0.0)
    };
    let hue = |idx: u32| Color::from_hsl(step_deg * idx as f32, 100.0, 50.0).to_array();

    let mut mesh = Mesh::default();
    for idx in 0..points {
        let a = mesh.push_colored(Vec3::ZERO, Vec3::Z, [0.5, 0.5], Color::WHITE.to_array());
        let b = mesh.push_colored(outline(idx), Vec3::Z, [0.0, 0.0], hue(idx));
        let c = mesh.push_colored(outline(idx + 1), Vec3::Z, [0.0, 0.0], hue(idx + 1));
        mesh.push_triangle(a, b, c);
    }
    mesh
}
