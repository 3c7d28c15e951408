use std::{borrow::Cow, collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use glam::Mat4;
use kiosk_core::animation::Spotlight;
use kiosk_core::{ItemRegistry, Primitive};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use super::super::mesh::{MeshInstance, MeshPrimitive, MeshUniforms, MeshVertex, mesh_uniforms, primitive};
use super::super::overlays::{FONT_SIZE_PX, GlyphCache, OverlayConfig, TextOverlay};
use super::super::shaders::{MESH_SHADER_SOURCE, OVERLAY_SHADER_SOURCE, QUAD_INDICES, QuadVertex};
use super::{MeshResources, PanelOverlays, PrimitiveBuffers, ViewerState};

/// Bundles the wgpu objects tied to the kiosk window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

struct OverlayResources {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    quad_index_buffer: wgpu::Buffer,
    quad_index_count: u32,
}

pub(super) const MESH_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(super) const PANEL_PADDING: u32 = 10;
const ITEM_PANEL_ROWS: u32 = 8;
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.045,
    g: 0.04,
    b: 0.06,
    a: 1.0,
};
const PRIMITIVES: [Primitive; 4] = [
    Primitive::Sphere,
    Primitive::Cube,
    Primitive::Cone,
    Primitive::Cylinder,
];

/// Brings up wgpu, builds the item and panel pipelines and uploads one
/// vertex/index pair per primitive shape.
pub(super) async fn new(
    window: Arc<Window>,
    registry: &ItemRegistry,
    font_bytes: Option<Vec<u8>>,
) -> Result<ViewerState> {
    let size = window.inner_size();
    let gpu = bootstrap_wgpu(window.clone()).await?;

    let overlay = create_overlay_resources(&gpu.device, gpu.surface_format);
    let overlays = match font_bytes {
        Some(bytes) => build_panels(&gpu.device, &gpu.queue, &overlay.bind_group_layout, size, &bytes),
        None => None,
    };
    let mesh = create_mesh_resources(&gpu.device, size, gpu.surface_format);

    let appearances: HashMap<_, _> = registry
        .iter()
        .map(|mesh| (mesh.handle, mesh.appearance))
        .collect();
    println!(
        "[kiosk_viewer] {} item meshes across {} primitive shapes",
        appearances.len(),
        mesh.primitives.len()
    );

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: gpu.surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: gpu.present_mode,
        alpha_mode: gpu.alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    };
    gpu.surface.configure(&gpu.device, &config);

    Ok(ViewerState {
        window,
        surface: gpu.surface,
        device: gpu.device,
        queue: gpu.queue,
        config,
        size,
        overlay_pipeline: overlay.pipeline,
        quad_index_buffer: overlay.quad_index_buffer,
        quad_index_count: overlay.quad_index_count,
        overlays,
        mesh,
        appearances,
        particle_instances: Vec::new(),
        item_panel_height: 0.0,
        background: BACKGROUND,
        surface_error: None,
    })
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("kiosk-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .context("surface reports no texture formats")?;
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

fn create_overlay_resources(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
) -> OverlayResources {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("panel-bind-group-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("panel-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(OVERLAY_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("panel-pipeline-layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let quad_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("panel-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[quad_vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("panel-quad-index-buffer"),
        contents: cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    OverlayResources {
        pipeline,
        bind_group_layout,
        quad_index_buffer,
        quad_index_count: QUAD_INDICES.len() as u32,
    }
}

/// Builds the item, status and shopkeeper panels. A font that fails to
/// parse disables the panels rather than the window.
fn build_panels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bind_group_layout: &wgpu::BindGroupLayout,
    size: PhysicalSize<u32>,
    font_bytes: &[u8],
) -> Option<PanelOverlays> {
    let glyphs = match GlyphCache::from_bytes(font_bytes, FONT_SIZE_PX) {
        Ok(glyphs) => glyphs,
        Err(err) => {
            eprintln!("[kiosk_viewer] {err:#}; panel text disabled");
            return None;
        }
    };
    let row = glyphs.line_height();
    let configs = [
        OverlayConfig {
            width: 420,
            height: PANEL_PADDING * 2 + row * ITEM_PANEL_ROWS,
            padding_x: 14,
            padding_y: PANEL_PADDING,
            label: "item-panel",
            fg: [255, 248, 232, 255],
            bg: [20, 16, 28, 200],
        },
        OverlayConfig {
            width: 260,
            height: PANEL_PADDING * 2 + row,
            padding_x: 10,
            padding_y: PANEL_PADDING,
            label: "status-panel",
            fg: [180, 255, 190, 255],
            bg: [0, 0, 0, 120],
        },
        OverlayConfig {
            width: 420,
            height: PANEL_PADDING * 2 + row * 3,
            padding_x: 12,
            padding_y: PANEL_PADDING,
            label: "shopkeeper-panel",
            fg: [40, 30, 20, 255],
            bg: [255, 244, 214, 230],
        },
    ];
    let mut built = Vec::with_capacity(configs.len());
    for config in configs {
        match TextOverlay::new(device, queue, bind_group_layout, size, config) {
            Ok(overlay) => built.push(overlay),
            Err(err) => {
                eprintln!("[kiosk_viewer] panel setup failed: {err:#}");
                return None;
            }
        }
    }
    let shopkeeper = built.pop()?;
    let status = built.pop()?;
    let item = built.pop()?;
    Some(PanelOverlays {
        glyphs,
        item,
        status,
        shopkeeper,
    })
}

fn create_mesh_resources(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
    surface_format: wgpu::TextureFormat,
) -> MeshResources {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("mesh-uniform-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<MeshUniforms>() as u64),
            },
            count: None,
        }],
    });

    let dark = Spotlight {
        position: glam::Vec3::Y,
        target: glam::Vec3::ZERO,
    };
    let initial_uniform = mesh_uniforms(Mat4::IDENTITY, &dark, 1.0);
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh-uniform-buffer"),
        contents: cast_slice(&[initial_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("mesh-uniform-bind-group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mesh-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("mesh-pipeline-layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };

    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4
        ],
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mesh-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &mesh_shader,
            entry_point: "mesh_vs_main",
            buffers: &[vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &mesh_shader,
            entry_point: "mesh_fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: Some(wgpu::Face::Back),
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: MESH_DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let primitives = PRIMITIVES
        .into_iter()
        .map(|kind| {
            let label = format!("mesh-{kind:?}").to_lowercase();
            (kind, upload_primitive(device, &label, primitive(kind)))
        })
        .collect();

    let initial_capacity = 64usize;
    let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("mesh-instance-buffer"),
        size: (initial_capacity * std::mem::size_of::<MeshInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let (depth_texture, depth_view) = create_mesh_depth_texture(device, size);

    MeshResources {
        pipeline,
        bind_group,
        uniform_buffer,
        _depth_texture: depth_texture,
        depth_view,
        instance_buffer,
        instance_capacity: initial_capacity,
        primitives,
    }
}

fn upload_primitive(device: &wgpu::Device, label: &str, primitive: MeshPrimitive) -> PrimitiveBuffers {
    let vertex_label = format!("{label}-vertex-buffer");
    let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&vertex_label),
        contents: cast_slice(&primitive.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_label = format!("{label}-index-buffer");
    let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&index_label),
        contents: cast_slice(&primitive.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    PrimitiveBuffers {
        vertex,
        index,
        index_count: primitive.indices.len() as u32,
    }
}

pub(super) fn create_mesh_depth_texture(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("mesh-depth-texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: MESH_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
