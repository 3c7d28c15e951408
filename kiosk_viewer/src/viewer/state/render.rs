use std::collections::BTreeMap;

use bytemuck::cast_slice;
use glam::{Mat4, Vec3};
use kiosk_core::Primitive;
use kiosk_core::ports::FrameSnapshot;
use wgpu::SurfaceError;

use super::super::mesh::{MeshInstance, item_model, mesh_uniforms};
use super::super::overlays::TextOverlay;
use super::ViewerState;

const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 1.4, 6.5);
const CAMERA_FOV_Y: f32 = 45.0;
const CAMERA_NEAR: f32 = 0.1;
const CAMERA_FAR: f32 = 100.0;
const SPOT_CONE_COS: f32 = 0.93;
const SELECTED_BOOST: f32 = 1.15;

pub(super) fn render(state: &mut ViewerState, frame: &FrameSnapshot) -> Result<(), SurfaceError> {
    let surface_frame = state.surface.get_current_texture()?;
    let view = surface_frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("kiosk-viewer-encoder"),
        });

    draw_items(state, frame, &view, &mut encoder);
    draw_panels(state, &view, &mut encoder);

    state.queue.submit(std::iter::once(encoder.finish()));
    surface_frame.present();
    Ok(())
}

/// Camera trails the spotlight focus so the selected item stays centred.
pub(super) fn view_projection(frame: &FrameSnapshot, aspect: f32) -> Mat4 {
    let focus = frame.spotlight.target;
    let eye = focus + CAMERA_OFFSET;
    let view = Mat4::look_at_rh(eye, focus, Vec3::Y);
    let projection = Mat4::perspective_rh(
        CAMERA_FOV_Y.to_radians(),
        aspect.max(0.01),
        CAMERA_NEAR,
        CAMERA_FAR,
    );
    projection * view
}

fn draw_items(
    state: &mut ViewerState,
    frame: &FrameSnapshot,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let groups = build_instance_groups(state, frame);
    let total: usize = groups.values().map(Vec::len).sum();
    ensure_instance_capacity(state, total);

    let mut combined = Vec::with_capacity(total);
    let mut ranges = Vec::with_capacity(groups.len());
    for (kind, instances) in &groups {
        let offset = combined.len() as u32;
        combined.extend_from_slice(instances);
        ranges.push((*kind, offset..combined.len() as u32));
    }

    let aspect = state.size.width.max(1) as f32 / state.size.height.max(1) as f32;
    let uniform = mesh_uniforms(view_projection(frame, aspect), &frame.spotlight, SPOT_CONE_COS);
    let mesh = &state.mesh;
    state
        .queue
        .write_buffer(&mesh.uniform_buffer, 0, cast_slice(&[uniform]));
    if !combined.is_empty() {
        state
            .queue
            .write_buffer(&mesh.instance_buffer, 0, cast_slice(&combined));
    }

    let mut mesh_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("mesh-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(state.background),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &mesh.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    if combined.is_empty() {
        return;
    }

    mesh_pass.set_pipeline(&mesh.pipeline);
    mesh_pass.set_bind_group(0, &mesh.bind_group, &[]);
    let instance_bytes = (combined.len() * std::mem::size_of::<MeshInstance>()) as u64;
    mesh_pass.set_vertex_buffer(1, mesh.instance_buffer.slice(0..instance_bytes));

    for (kind, range) in ranges {
        let Some(buffers) = mesh.primitives.get(&kind) else {
            continue;
        };
        mesh_pass.set_vertex_buffer(0, buffers.vertex.slice(..));
        mesh_pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint16);
        mesh_pass.draw_indexed(0..buffers.index_count, 0, range);
    }
}

/// Buckets items by primitive shape so each shape is one instanced draw.
/// Particles ride along as small cubes.
fn build_instance_groups(
    state: &ViewerState,
    frame: &FrameSnapshot,
) -> BTreeMap<Primitive, Vec<MeshInstance>> {
    let mut groups: BTreeMap<Primitive, Vec<MeshInstance>> = BTreeMap::new();
    for item in &frame.items {
        let Some(appearance) = state.appearances.get(&item.mesh) else {
            log::warn!("no appearance registered for mesh {:?}", item.mesh);
            continue;
        };
        let boost = if item.selected { SELECTED_BOOST } else { 1.0 };
        let [r, g, b] = appearance.color.map(|channel| (channel * boost).min(1.0));
        groups
            .entry(appearance.primitive)
            .or_default()
            .push(MeshInstance {
                model: item_model(&item.transform).to_cols_array_2d(),
                color: [r, g, b, 1.0],
            });
    }
    if !state.particle_instances.is_empty() {
        groups
            .entry(Primitive::Cube)
            .or_default()
            .extend_from_slice(&state.particle_instances);
    }
    groups
}

/// Grow the shared instance buffer if the current frame needs more slots.
fn ensure_instance_capacity(state: &mut ViewerState, required: usize) {
    let mesh = &mut state.mesh;
    if required <= mesh.instance_capacity {
        return;
    }
    let mut capacity = mesh.instance_capacity.max(1);
    while capacity < required {
        capacity *= 2;
    }
    let label = format!("mesh-instance-buffer({capacity})");
    mesh.instance_buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label.as_str()),
        size: (capacity * std::mem::size_of::<MeshInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    mesh.instance_capacity = capacity;
}

fn draw_panels(state: &mut ViewerState, view: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
    if let Some(overlays) = state.overlays.as_mut() {
        overlays.item.upload(&state.queue);
        overlays.status.upload(&state.queue);
        overlays.shopkeeper.upload(&state.queue);
    }

    let Some(overlays) = state.overlays.as_ref() else {
        return;
    };
    if state.item_panel_height >= 1.0 {
        draw_panel(state, view, &overlays.item, "item-panel-pass", encoder);
    }
    draw_panel(state, view, &overlays.status, "status-panel-pass", encoder);
    draw_panel(state, view, &overlays.shopkeeper, "shopkeeper-panel-pass", encoder);
}

fn draw_panel(
    state: &ViewerState,
    view: &wgpu::TextureView,
    overlay: &TextOverlay,
    label: &'static str,
    encoder: &mut wgpu::CommandEncoder,
) {
    if !overlay.is_visible() {
        return;
    }
    let mut overlay_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    overlay_pass.set_pipeline(&state.overlay_pipeline);
    overlay_pass.set_bind_group(0, overlay.bind_group(), &[]);
    overlay_pass.set_vertex_buffer(0, overlay.vertex_buffer().slice(..));
    overlay_pass.set_index_buffer(state.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    overlay_pass.draw_indexed(0..state.quad_index_count, 0, 0..1);
}
