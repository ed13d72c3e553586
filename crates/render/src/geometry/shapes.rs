//! Built-in primitives. All are unindexed triangle lists carrying
//! `vertexPosition`, `vertexColor` and `vertexUV`.

use super::{COLOR, Geometry, GeometryError, POSITION, UV};
use crate::device::AttributeKind;
use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Build a geometry from matching per-vertex arrays.
fn from_vertices(positions: &[Vec3], colors: &[Vec3], uvs: &[Vec2]) -> Geometry {
    debug_assert_eq!(positions.len(), colors.len());
    debug_assert_eq!(positions.len(), uvs.len());
    let mut g = Geometry::new();
    g.attributes.push((
        POSITION.to_owned(),
        attribute(AttributeKind::Vec3, positions.iter().flat_map(|p| p.to_array()), false),
    ));
    g.attributes.push((
        COLOR.to_owned(),
        attribute(AttributeKind::Vec3, colors.iter().flat_map(|c| c.to_array()), true),
    ));
    g.attributes.push((
        UV.to_owned(),
        attribute(AttributeKind::Vec2, uvs.iter().flat_map(|t| t.to_array()), true),
    ));
    g.vertex_count = Some(positions.len());
    g
}

fn attribute(kind: AttributeKind, data: impl Iterator<Item = f32>, optional: bool) -> super::Attribute {
    super::Attribute {
        kind,
        data: data.collect(),
        optional,
        buffer: None,
    }
}

/// Axis-aligned rectangle in the XY plane, centred on the origin.
pub fn rectangle(width: f32, height: f32) -> Geometry {
    let (w, h) = (width / 2.0, height / 2.0);
    let p = [
        Vec3::new(-w, -h, 0.0),
        Vec3::new(w, -h, 0.0),
        Vec3::new(-w, h, 0.0),
        Vec3::new(w, h, 0.0),
    ];
    let c = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    let t = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
    ];
    let order = [0, 1, 3, 0, 3, 2];
    from_vertices(
        &order.map(|i| p[i]),
        &order.map(|i| c[i]),
        &order.map(|i| t[i]),
    )
}

/// Regular polygon in the XY plane as a fan of `sides` triangles.
pub fn polygon(sides: u32, radius: f32) -> Result<Geometry, GeometryError> {
    if sides < 3 {
        return Err(GeometryError::Resolution(format!(
            "a polygon needs at least 3 sides, got {sides}"
        )));
    }
    let step = TAU / sides as f32;
    let rim = |s: u32| {
        let (sin, cos) = (s as f32 * step).sin_cos();
        (Vec3::new(radius * cos, radius * sin, 0.0), Vec2::new(cos * 0.5 + 0.5, sin * 0.5 + 0.5))
    };
    let mut positions = Vec::with_capacity(sides as usize * 3);
    let mut colors = Vec::with_capacity(sides as usize * 3);
    let mut uvs = Vec::with_capacity(sides as usize * 3);
    for s in 0..sides {
        let (p0, t0) = rim(s);
        let (p1, t1) = rim(s + 1);
        positions.extend([Vec3::ZERO, p0, p1]);
        colors.extend([Vec3::ONE, Vec3::splat(0.75), Vec3::splat(0.75)]);
        uvs.extend([Vec2::splat(0.5), t0, t1]);
    }
    Ok(from_vertices(&positions, &colors, &uvs))
}

/// Axis-aligned box centred on the origin, each face colored from its corners.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    let (w, h, d) = (width / 2.0, height / 2.0, depth / 2.0);
    let corner = |i: usize| {
        let x = if i & 1 == 0 { -w } else { w };
        let y = if i & 2 == 0 { -h } else { h };
        let z = if i & 4 == 0 { -d } else { d };
        Vec3::new(x, y, z)
    };
    let color = |i: usize| {
        Vec3::new(
            (i & 1) as f32,
            ((i >> 1) & 1) as f32,
            ((i >> 2) & 1) as f32,
        )
    };
    // +X, -X, +Y, -Y, +Z, -Z; each face counter-clockwise from outside.
    #[rustfmt::skip]
    let faces: [[usize; 4]; 6] = [
        [5, 1, 3, 7],
        [0, 4, 6, 2],
        [6, 7, 3, 2],
        [0, 1, 5, 4],
        [4, 5, 7, 6],
        [1, 0, 2, 3],
    ];
    let quad_uv = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    let order = [0, 1, 2, 0, 2, 3];
    let mut positions = Vec::with_capacity(36);
    let mut colors = Vec::with_capacity(36);
    let mut uvs = Vec::with_capacity(36);
    for face in faces {
        for i in order {
            positions.push(corner(face[i]));
            colors.push(color(face[i]));
            uvs.push(quad_uv[i]);
        }
    }
    from_vertices(&positions, &colors, &uvs)
}

/// Surface `f(u, v)` sampled on a `u_res` x `v_res` grid over
/// `[u_start, u_end] x [v_start, v_end]`, two triangles per cell.
pub fn parametric(
    (u_start, u_end, u_res): (f32, f32, u32),
    (v_start, v_end, v_res): (f32, f32, u32),
    f: impl Fn(f32, f32) -> Vec3,
) -> Result<Geometry, GeometryError> {
    if u_res == 0 || v_res == 0 {
        return Err(GeometryError::Resolution(format!(
            "parametric grid must be at least 1x1, got {u_res}x{v_res}"
        )));
    }
    const CYCLE: [Vec3; 6] = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    let grid = |x: u32, y: u32| Vec2::new(x as f32 / u_res as f32, y as f32 / v_res as f32);
    let cells = (u_res * v_res) as usize;
    let mut positions = Vec::with_capacity(cells * 6);
    let mut colors = Vec::with_capacity(cells * 6);
    let mut uvs = Vec::with_capacity(cells * 6);
    for x in 0..u_res {
        for y in 0..v_res {
            let a = grid(x, y);
            let b = grid(x + 1, y);
            let c = grid(x + 1, y + 1);
            let d = grid(x, y + 1);
            for t in [a, b, c, a, c, d] {
                let u = u_start + t.x * (u_end - u_start);
                let v = v_start + t.y * (v_end - v_start);
                positions.push(f(u, v));
                uvs.push(t);
            }
            colors.extend(CYCLE);
        }
    }
    Ok(from_vertices(&positions, &colors, &uvs))
}

/// Subdivided rectangle in the XY plane.
pub fn plane(
    width: f32,
    height: f32,
    width_segments: u32,
    height_segments: u32,
) -> Result<Geometry, GeometryError> {
    parametric(
        (-width / 2.0, width / 2.0, width_segments),
        (-height / 2.0, height / 2.0, height_segments),
        |u, v| Vec3::new(u, v, 0.0),
    )
}

/// Ellipsoid with the given semi-axes. `u` runs around the Y axis, `v` from
/// the south pole to the north pole.
pub fn ellipsoid(
    radii: Vec3,
    u_segments: u32,
    v_segments: u32,
) -> Result<Geometry, GeometryError> {
    parametric(
        (0.0, TAU, u_segments),
        (-FRAC_PI_2, FRAC_PI_2, v_segments),
        |u, v| {
            Vec3::new(
                radii.x * u.sin() * v.cos(),
                radii.y * v.sin(),
                radii.z * u.cos() * v.cos(),
            )
        },
    )
}

pub fn sphere(radius: f32, u_segments: u32, v_segments: u32) -> Result<Geometry, GeometryError> {
    ellipsoid(Vec3::splat(radius), u_segments, v_segments)
}

/// Open tube along Y, centred on the origin, whose elliptical cross-section
/// interpolates linearly from `bottom` radii to `top` radii (x, z).
pub fn cylindrical(
    top: Vec2,
    bottom: Vec2,
    height: f32,
    segments: u32,
) -> Result<Geometry, GeometryError> {
    parametric((0.0, TAU, segments), (0.0, 1.0, 1), |u, v| {
        let r = top * v + bottom * (1.0 - v);
        Vec3::new(r.x * u.sin(), height * (v - 0.5), r.y * u.cos())
    })
}

pub fn cylinder(radius: f32, height: f32, segments: u32) -> Result<Geometry, GeometryError> {
    cylindrical(Vec2::splat(radius), Vec2::splat(radius), height, segments)
}

/// A cylinder with few sides.
pub fn prism(radius: f32, height: f32, sides: u32) -> Result<Geometry, GeometryError> {
    cylinder(radius, height, sides)
}

pub fn cone(radius: f32, height: f32, segments: u32) -> Result<Geometry, GeometryError> {
    cylindrical(Vec2::ZERO, Vec2::splat(radius), height, segments)
}

/// A cone with few sides.
pub fn pyramid(radius: f32, height: f32, sides: u32) -> Result<Geometry, GeometryError> {
    cone(radius, height, sides)
}
