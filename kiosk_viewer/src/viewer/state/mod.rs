//! Runtime state for the kiosk window. Owns the wgpu device and surface,
//! the item mesh pipeline and the text panels, and implements the core
//! `Renderer` port so the session can hand it a frame snapshot. Submodules
//! cover `init` for setup, `layout` for resize and panel placement, and
//! `render` for the draw passes.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use kiosk_core::ports::{FrameSnapshot, Renderer};
use kiosk_core::{Appearance, ItemRegistry, MeshHandle, Primitive};
use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

use super::mesh::MeshInstance;
use super::overlays::{GlyphCache, TextOverlay};
use super::panel::{PanelMetrics, PanelSurface};

mod init;
mod layout;
mod render;

struct PrimitiveBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

struct MeshResources {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    primitives: HashMap<Primitive, PrimitiveBuffers>,
}

/// The three text panels; absent when no font was supplied.
struct PanelOverlays {
    glyphs: GlyphCache,
    item: TextOverlay,
    status: TextOverlay,
    shopkeeper: TextOverlay,
}

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    overlay_pipeline: wgpu::RenderPipeline,
    quad_index_buffer: wgpu::Buffer,
    quad_index_count: u32,
    overlays: Option<PanelOverlays>,
    mesh: MeshResources,
    appearances: HashMap<MeshHandle, Appearance>,
    particle_instances: Vec<MeshInstance>,
    item_panel_height: f32,
    background: wgpu::Color,
    surface_error: Option<SurfaceError>,
}

impl ViewerState {
    pub async fn new(
        window: Arc<Window>,
        registry: &ItemRegistry,
        font_bytes: Option<Vec<u8>>,
    ) -> Result<Self> {
        init::new(window, registry, font_bytes).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn panel_metrics(&self) -> PanelMetrics {
        layout::panel_metrics(self)
    }

    /// Copies panel text and height from the overlay surface.
    pub fn sync_panel(&mut self, panel: &PanelSurface) {
        layout::sync_panel(self, panel);
    }

    pub fn set_particles(&mut self, instances: Vec<MeshInstance>) {
        self.particle_instances = instances;
    }

    /// The error from the last frame, if presenting failed in a way the
    /// caller has to act on.
    pub fn take_surface_error(&mut self) -> Option<SurfaceError> {
        self.surface_error.take()
    }
}

impl Renderer for ViewerState {
    fn render(&mut self, frame: &FrameSnapshot) {
        match render::render(self, frame) {
            Ok(()) => {}
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                let size = self.size;
                layout::resize(self, size);
            }
            Err(err) => self.surface_error = Some(err),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        layout::resize(self, PhysicalSize::new(width, height));
    }
}
