use winit::dpi::PhysicalSize;

use super::super::panel::{PanelMetrics, PanelSurface};
use super::ViewerState;
use super::init::{PANEL_PADDING, create_mesh_depth_texture};
use crate::ui_layout::{PanelKind, PanelSize, panel_rect};

pub(super) fn resize(state: &mut ViewerState, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    let (texture, view) = create_mesh_depth_texture(&state.device, new_size);
    state.mesh._depth_texture = texture;
    state.mesh.depth_view = view;
    apply_panel_layouts(state);
}

/// Row pitch the panel surface should measure with.
pub(super) fn panel_metrics(state: &ViewerState) -> PanelMetrics {
    state
        .overlays
        .as_ref()
        .map(|overlays| PanelMetrics::new(overlays.glyphs.line_height() as f32, PANEL_PADDING as f32))
        .unwrap_or_default()
}

pub(super) fn sync_panel(state: &mut ViewerState, panel: &PanelSurface) {
    state.item_panel_height = panel.height();
    let Some(overlays) = state.overlays.as_mut() else {
        return;
    };
    overlays.item.set_lines(panel.item_lines(), &mut overlays.glyphs);
    overlays.status.set_lines(&panel.status_lines(), &mut overlays.glyphs);
    overlays
        .shopkeeper
        .set_lines(&panel.shopkeeper_lines(), &mut overlays.glyphs);
    apply_panel_layouts(state);
}

pub(super) fn apply_panel_layouts(state: &mut ViewerState) {
    let size = state.size;
    let item_height = state.item_panel_height;
    let Some(overlays) = state.overlays.as_mut() else {
        return;
    };
    for (kind, overlay) in [
        (PanelKind::Item, &mut overlays.item),
        (PanelKind::Status, &mut overlays.status),
        (PanelKind::Shopkeeper, &mut overlays.shopkeeper),
    ] {
        let panel = PanelSize {
            width: overlay.width() as f32,
            height: overlay.height() as f32,
        };
        let rect = panel_rect(kind, size, panel, item_height);
        overlay.update_layout(&state.queue, size, rect);
    }
}
