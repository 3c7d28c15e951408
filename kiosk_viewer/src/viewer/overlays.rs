use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use bytemuck::cast_slice;
use fontdue::{Font, FontSettings};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::shaders::QuadVertex;
use crate::texture::write_rgba_texture;
use crate::ui_layout::ViewportRect;

pub const FONT_SIZE_PX: f32 = 20.0;

pub(super) struct OverlayConfig {
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub label: &'static str,
    pub fg: [u8; 4],
    pub bg: [u8; 4],
}

/// Rasterised glyphs for the panel font, shared by every overlay.
pub struct GlyphCache {
    font: Font,
    size: f32,
    layout: GlyphLayout,
    glyphs: HashMap<char, GlyphBitmap>,
}

impl GlyphCache {
    pub fn from_bytes(bytes: &[u8], size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|err| anyhow!("parsing overlay font: {err}"))?;
        let layout = GlyphLayout::from_font(&font, size);
        Ok(Self {
            font,
            size,
            layout,
            glyphs: HashMap::new(),
        })
    }

    pub fn line_height(&self) -> u32 {
        self.layout.line_height
    }

    pub fn cell_advance(&self) -> u32 {
        self.layout.cell_advance
    }

    fn glyph(&mut self, ch: char) -> GlyphBitmap {
        self.load(ch)
            .or_else(|| self.load('?'))
            .unwrap_or_else(GlyphBitmap::empty)
    }

    fn load(&mut self, ch: char) -> Option<GlyphBitmap> {
        if let Some(glyph) = self.glyphs.get(&ch) {
            return Some(glyph.clone());
        }
        let glyph_index = self.font.lookup_glyph_index(ch);
        if glyph_index == 0 && ch != '?' && ch != ' ' {
            return None;
        }
        let (metrics, bitmap) = self.font.rasterize_indexed(glyph_index, self.size);
        let glyph = GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            alpha: Arc::from(bitmap.into_boxed_slice()),
        };
        self.glyphs.insert(ch, glyph.clone());
        Some(glyph)
    }
}

pub(super) struct TextOverlay {
    texture: wgpu::Texture,
    _view: wgpu::TextureView,
    _sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padding_x: u32,
    padding_y: u32,
    fg: [u8; 4],
    bg: [u8; 4],
    pixels: Vec<u8>,
    lines: Vec<String>,
    dirty: bool,
    visible: bool,
    label: &'static str,
}

impl TextOverlay {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: &wgpu::BindGroupLayout,
        window_size: PhysicalSize<u32>,
        config: OverlayConfig,
    ) -> Result<Self> {
        let texture_label = format!("{}-texture", config.label);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(texture_label.as_str()),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler_label = format!("{}-sampler", config.label);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(sampler_label.as_str()),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_label = format!("{}-bind-group", config.label);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(bind_group_label.as_str()),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let mut pixels = vec![0u8; (config.width * config.height * 4) as usize];
        fill_background(&mut pixels, config.bg);
        write_rgba_texture(queue, &texture, config.width, config.height, &pixels)?;

        let initial_rect = ViewportRect {
            x: 0.0,
            y: 0.0,
            width: config.width as f32,
            height: config.height as f32,
        };
        let vertices = Self::vertex_positions(initial_rect, window_size, config.height);
        let vertex_label = format!("{}-vertices", config.label);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(vertex_label.as_str()),
            contents: cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            texture,
            _view: texture_view,
            _sampler: sampler,
            bind_group,
            vertex_buffer,
            width: config.width,
            height: config.height,
            padding_x: config.padding_x,
            padding_y: config.padding_y,
            fg: config.fg,
            bg: config.bg,
            pixels,
            lines: Vec::new(),
            dirty: false,
            visible: false,
            label: config.label,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Places the panel; a rect shorter than the texture clips the bottom
    /// rows instead of squashing them.
    pub fn update_layout(
        &mut self,
        queue: &wgpu::Queue,
        window_size: PhysicalSize<u32>,
        rect: ViewportRect,
    ) {
        let vertices = Self::vertex_positions(rect, window_size, self.height);
        queue.write_buffer(&self.vertex_buffer, 0, cast_slice(&vertices));
    }

    pub fn set_lines(&mut self, lines: &[String], glyphs: &mut GlyphCache) {
        if self.lines == lines {
            return;
        }
        self.lines = lines.to_vec();
        fill_background(&mut self.pixels, self.bg);

        let usable_width = self.width.saturating_sub(self.padding_x * 2);
        let usable_height = self.height.saturating_sub(self.padding_y * 2);
        let glyph_width = glyphs.cell_advance().max(1);
        let glyph_height = glyphs.line_height().max(1);
        let max_cols = (usable_width / glyph_width) as usize;
        let max_rows = (usable_height / glyph_height) as usize;

        let display_lines = wrap_lines(lines, max_cols, max_rows);
        for (row_idx, line) in display_lines.iter().enumerate() {
            let line_top = self.padding_y + row_idx as u32 * glyph_height;
            for (col_idx, ch) in line.chars().enumerate() {
                let glyph = glyphs.glyph(ch);
                let cell_x = self.padding_x + col_idx as u32 * glyph_width;
                self.blit_glyph(cell_x, line_top, &glyph, &glyphs.layout);
            }
        }

        self.dirty = true;
        self.visible = !lines.is_empty();
    }

    fn blit_glyph(&mut self, cell_x: u32, line_top: u32, glyph: &GlyphBitmap, layout: &GlyphLayout) {
        if glyph.width == 0 || glyph.height == 0 {
            return;
        }
        let start_x = cell_x as i32 + layout.left_bearing + glyph.xmin;
        let baseline = line_top as i32 + layout.ascent;
        let start_y = baseline - (glyph.ymin + glyph.height as i32);

        for gy in 0..glyph.height {
            let dest_y = start_y + gy as i32;
            if dest_y < 0 || dest_y >= self.height as i32 {
                continue;
            }
            let row = gy as usize * glyph.width as usize;
            for gx in 0..glyph.width {
                let coverage = glyph.alpha[row + gx as usize];
                let dest_x = start_x + gx as i32;
                if coverage == 0 || dest_x < 0 || dest_x >= self.width as i32 {
                    continue;
                }
                let idx = ((dest_y as u32 * self.width + dest_x as u32) * 4) as usize;
                let alpha = ((coverage as u16 * self.fg[3] as u16) / u8::MAX as u16) as u8;
                let alpha = alpha.max(self.pixels[idx + 3]);
                self.pixels[idx..idx + 4].copy_from_slice(&[self.fg[0], self.fg[1], self.fg[2], alpha]);
            }
        }
    }

    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        if let Err(err) = write_rgba_texture(queue, &self.texture, self.width, self.height, &self.pixels) {
            eprintln!(
                "[kiosk_viewer] warning: {} upload failed ({}x{}): {err}",
                self.label, self.width, self.height
            );
            return;
        }
        self.dirty = false;
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn vertex_positions(
        rect: ViewportRect,
        window: PhysicalSize<u32>,
        texture_height: u32,
    ) -> [QuadVertex; 4] {
        let width = window.width.max(1) as f32;
        let height = window.height.max(1) as f32;

        let left = (rect.x / width) * 2.0 - 1.0;
        let right = ((rect.x + rect.width) / width) * 2.0 - 1.0;
        let top = 1.0 - (rect.y / height) * 2.0;
        let bottom = 1.0 - ((rect.y + rect.height) / height) * 2.0;
        let v_bottom = (rect.height / texture_height.max(1) as f32).clamp(0.0, 1.0);

        [
            QuadVertex {
                position: [left, top],
                uv: [0.0, 0.0],
            },
            QuadVertex {
                position: [right, top],
                uv: [1.0, 0.0],
            },
            QuadVertex {
                position: [left, bottom],
                uv: [0.0, v_bottom],
            },
            QuadVertex {
                position: [right, bottom],
                uv: [1.0, v_bottom],
            },
        ]
    }
}

fn fill_background(buffer: &mut [u8], color: [u8; 4]) {
    for chunk in buffer.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

/// Hard-wraps `lines` to `max_cols`, honouring embedded newlines, and
/// keeps at most `max_rows` rows.
pub(super) fn wrap_lines(lines: &[String], max_cols: usize, max_rows: usize) -> Vec<String> {
    if max_cols == 0 || max_rows == 0 {
        return Vec::new();
    }
    let mut result = Vec::new();
    for segment in lines.iter().flat_map(|line| line.split('\n')) {
        if result.len() >= max_rows {
            break;
        }
        wrap_segment(&mut result, segment, max_cols, max_rows);
    }
    result
}

fn wrap_segment(out: &mut Vec<String>, segment: &str, max_cols: usize, max_rows: usize) {
    if segment.is_empty() {
        out.push(String::new());
        return;
    }
    let mut buffer = String::new();
    let mut count = 0;
    for ch in segment.chars().filter(|ch| *ch != '\r') {
        buffer.push(ch);
        count += 1;
        if count == max_cols {
            if out.len() >= max_rows {
                return;
            }
            out.push(mem::take(&mut buffer));
            count = 0;
        }
    }
    if count > 0 && out.len() < max_rows {
        out.push(buffer);
    }
}

#[derive(Clone)]
struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    alpha: Arc<[u8]>,
}

impl GlyphBitmap {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            xmin: 0,
            ymin: 0,
            alpha: Arc::<[u8]>::from([]),
        }
    }
}

/// Monospace cell derived from the printable ASCII range so every row has
/// the same pitch.
struct GlyphLayout {
    line_height: u32,
    cell_advance: u32,
    ascent: i32,
    left_bearing: i32,
}

impl GlyphLayout {
    fn from_font(font: &Font, size: f32) -> Self {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        let mut max_advance = 0.0f32;

        for ch in (32u8..=126).map(char::from).chain(['$', '?']) {
            let metrics = font.metrics_indexed(font.lookup_glyph_index(ch), size);
            max_advance = max_advance.max(metrics.advance_width);
            if metrics.width == 0 && metrics.height == 0 {
                continue;
            }
            let xmax = metrics.xmin + metrics.width as i32;
            let ymax = metrics.ymin + metrics.height as i32;
            bounds = Some(match bounds {
                None => (metrics.xmin, xmax, metrics.ymin, ymax),
                Some((min_x, max_x, min_y, max_y)) => (
                    min_x.min(metrics.xmin),
                    max_x.max(xmax),
                    min_y.min(metrics.ymin),
                    max_y.max(ymax),
                ),
            });
        }

        let Some((min_xmin, max_xmax, min_ymin, max_ymax)) = bounds else {
            return Self {
                line_height: 1,
                cell_advance: 1,
                ascent: 0,
                left_bearing: 0,
            };
        };

        let left_bearing = -min_xmin.min(0);
        let cell_width = (left_bearing + max_xmax).max(1) as u32;
        let advance = max_advance.max(cell_width as f32).ceil() as u32;
        Self {
            line_height: (max_ymax - min_ymin).max(1) as u32,
            cell_advance: advance.max(1),
            ascent: max_ymax,
            left_bearing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn wrap_splits_long_lines_and_newlines() {
        let wrapped = wrap_lines(&lines(&["abcdefg", "x\ny"]), 3, 10);
        assert_eq!(wrapped, lines(&["abc", "def", "g", "x", "y"]));
    }

    #[test]
    fn wrap_respects_row_budget() {
        let wrapped = wrap_lines(&lines(&["abcdefghij", "tail"]), 4, 2);
        assert_eq!(wrapped, lines(&["abcd", "efgh"]));
    }

    #[test]
    fn wrap_keeps_blank_rows_and_counts_characters() {
        let wrapped = wrap_lines(&lines(&["", "¡Olé!"]), 5, 4);
        assert_eq!(wrapped, lines(&["", "¡Olé!"]));
        assert!(wrap_lines(&lines(&["abc"]), 0, 4).is_empty());
    }

    #[test]
    fn vertex_rect_clips_uvs_to_visible_height() {
        let rect = ViewportRect {
            x: 100.0,
            y: 50.0,
            width: 200.0,
            height: 60.0,
        };
        let vertices = TextOverlay::vertex_positions(rect, PhysicalSize::new(400, 200), 120);
        let close = |a: [f32; 2], b: [f32; 2]| (a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5;
        assert!(close(vertices[0].position, [-0.5, 0.5]));
        assert!(close(vertices[3].position, [0.5, -0.1]));
        assert!(close(vertices[2].uv, [0.0, 0.5]));
        assert!(close(vertices[1].uv, [1.0, 0.0]));
    }

    #[test]
    fn glyph_cache_rejects_garbage_font() {
        assert!(GlyphCache::from_bytes(b"not a font", FONT_SIZE_PX).is_err());
    }
}
