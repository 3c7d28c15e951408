//! Procedural primitive meshes for the menu items. Geometry sits in a unit
//! cube centred on the origin so an item's scale maps straight to world
//! units.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};
use kiosk_core::animation::Spotlight;
use kiosk_core::{ItemTransform, Primitive};

const DEFAULT_SPHERE_LAT_DIVS: u32 = 16;
const DEFAULT_SPHERE_LON_DIVS: u32 = 24;
const DEFAULT_CONE_SEGMENTS: u32 = 20;
const DEFAULT_CYLINDER_SEGMENTS: u32 = 24;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

pub struct MeshPrimitive {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

impl MeshPrimitive {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u16>) -> Self {
        Self { vertices, indices }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshUniforms {
    pub view_projection: [[f32; 4]; 4],
    /// xyz position, w unused.
    pub light_position: [f32; 4],
    /// xyz target, w is the cone cosine.
    pub light_target: [f32; 4],
}

pub fn primitive(kind: Primitive) -> MeshPrimitive {
    match kind {
        Primitive::Sphere => build_sphere(DEFAULT_SPHERE_LAT_DIVS, DEFAULT_SPHERE_LON_DIVS),
        Primitive::Cube => build_cube(),
        Primitive::Cone => build_cone(DEFAULT_CONE_SEGMENTS),
        Primitive::Cylinder => build_cylinder(DEFAULT_CYLINDER_SEGMENTS),
    }
}

/// Model matrix for an animated item; rotation is XYZ Euler radians.
pub fn item_model(transform: &ItemTransform) -> Mat4 {
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        transform.rotation.x,
        transform.rotation.y,
        transform.rotation.z,
    );
    Mat4::from_scale_rotation_translation(
        Vec3::splat(transform.scale.max(1e-4)),
        rotation,
        transform.position,
    )
}

pub fn mesh_uniforms(view_projection: Mat4, spotlight: &Spotlight, cone_cos: f32) -> MeshUniforms {
    MeshUniforms {
        view_projection: view_projection.to_cols_array_2d(),
        light_position: spotlight.position.extend(1.0).to_array(),
        light_target: spotlight.target.extend(cone_cos).to_array(),
    }
}

fn build_sphere(lat_divisions: u32, lon_divisions: u32) -> MeshPrimitive {
    let lat_steps = lat_divisions.max(3);
    let lon_steps = lon_divisions.max(6);
    let mut vertices = Vec::with_capacity(((lat_steps + 1) * (lon_steps + 1)) as usize);
    let mut indices = Vec::with_capacity((lat_steps * lon_steps * 6) as usize);

    for lat in 0..=lat_steps {
        let theta = lat as f32 / lat_steps as f32 * PI;
        for lon in 0..=lon_steps {
            let phi = lon as f32 / lon_steps as f32 * PI * 2.0;
            let normal = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            vertices.push(MeshVertex {
                position: (normal * 0.5).into(),
                normal: normal.normalize_or_zero().into(),
            });
        }
    }

    let ring = (lon_steps + 1) as usize;
    for lat in 0..lat_steps as usize {
        for lon in 0..lon_steps as usize {
            let current = (lat * ring + lon) as u16;
            let next = current + ring as u16;
            indices.extend_from_slice(&[current, current + 1, next, current + 1, next + 1, next]);
        }
    }

    MeshPrimitive::new(vertices, indices)
}

fn build_cube() -> MeshPrimitive {
    let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for normal in axes {
        // Two tangents spanning the face, ordered so the winding faces out.
        let up = if normal.y.abs() > 0.5 { Vec3::Z } else { Vec3::Y };
        let side = up.cross(normal);
        let base = vertices.len() as u16;
        for (s, u) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let corner = normal * 0.5 + side * s + up * u;
            vertices.push(MeshVertex {
                position: corner.into(),
                normal: normal.into(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    MeshPrimitive::new(vertices, indices)
}

fn push_cap(vertices: &mut Vec<MeshVertex>, indices: &mut Vec<u16>, ring: u32, y: f32) {
    let normal = if y > 0.0 { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = vertices.len() as u16;
    vertices.push(MeshVertex {
        position: [0.0, y, 0.0],
        normal,
    });
    for i in 0..ring {
        let angle = i as f32 / ring as f32 * PI * 2.0;
        vertices.push(MeshVertex {
            position: [angle.cos() * 0.5, y, angle.sin() * 0.5],
            normal,
        });
    }
    for i in 0..ring {
        let current = center + 1 + i as u16;
        let next = center + 1 + ((i + 1) % ring) as u16;
        if y > 0.0 {
            indices.extend_from_slice(&[center, next, current]);
        } else {
            indices.extend_from_slice(&[center, current, next]);
        }
    }
}

fn build_cone(segments: u32) -> MeshPrimitive {
    let ring = segments.max(3);
    let mut vertices = Vec::with_capacity((ring * 2 + 2) as usize);
    let mut indices = Vec::with_capacity((ring * 6) as usize);

    let apex = vertices.len() as u16;
    vertices.push(MeshVertex {
        position: [0.0, 0.5, 0.0],
        normal: [0.0, 1.0, 0.0],
    });
    for i in 0..ring {
        let angle = i as f32 / ring as f32 * PI * 2.0;
        let (x, z) = (angle.cos() * 0.5, angle.sin() * 0.5);
        vertices.push(MeshVertex {
            position: [x, -0.5, z],
            normal: Vec3::new(x, 0.35, z).normalize().into(),
        });
    }
    for i in 0..ring {
        let current = 1 + i as u16;
        let next = 1 + ((i + 1) % ring) as u16;
        indices.extend_from_slice(&[apex, next, current]);
    }
    push_cap(&mut vertices, &mut indices, ring, -0.5);

    MeshPrimitive::new(vertices, indices)
}

fn build_cylinder(segments: u32) -> MeshPrimitive {
    let ring = segments.max(3);
    let mut vertices = Vec::with_capacity((ring * 4 + 2) as usize);
    let mut indices = Vec::with_capacity((ring * 12) as usize);

    for i in 0..ring {
        let angle = i as f32 / ring as f32 * PI * 2.0;
        let normal = [angle.cos(), 0.0, angle.sin()];
        let (x, z) = (normal[0] * 0.5, normal[2] * 0.5);
        vertices.push(MeshVertex {
            position: [x, -0.5, z],
            normal,
        });
        vertices.push(MeshVertex {
            position: [x, 0.5, z],
            normal,
        });
    }
    for i in 0..ring {
        let bottom = (i * 2) as u16;
        let top = bottom + 1;
        let next_bottom = (((i + 1) % ring) * 2) as u16;
        let next_top = next_bottom + 1;
        indices.extend_from_slice(&[bottom, top, next_bottom, next_bottom, top, next_top]);
    }
    push_cap(&mut vertices, &mut indices, ring, 0.5);
    push_cap(&mut vertices, &mut indices, ring, -0.5);

    MeshPrimitive::new(vertices, indices)
}
