//! Screen placement for the text panels. The item panel hangs at the bottom
//! centre and grows upward with its animated height; the wallet status sits
//! top-left and the shopkeeper bubble top-right.

use winit::dpi::PhysicalSize;

pub const PANEL_MARGIN: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Item,
    Status,
    Shopkeeper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSize {
    pub width: f32,
    pub height: f32,
}

/// Rect for `kind` given the panel's full size and, for the item panel, the
/// height currently shown. Panels never extend past the window.
pub fn panel_rect(
    kind: PanelKind,
    window: PhysicalSize<u32>,
    size: PanelSize,
    shown_height: f32,
) -> ViewportRect {
    let window_w = window.width.max(1) as f32;
    let window_h = window.height.max(1) as f32;
    let width = size.width.min((window_w - PANEL_MARGIN * 2.0).max(1.0));
    let full_height = size.height.min((window_h - PANEL_MARGIN * 2.0).max(1.0));

    match kind {
        PanelKind::Item => {
            let height = shown_height.clamp(0.0, full_height);
            ViewportRect {
                x: ((window_w - width) * 0.5).max(0.0),
                y: (window_h - PANEL_MARGIN - height).max(0.0),
                width,
                height,
            }
        }
        PanelKind::Status => ViewportRect {
            x: PANEL_MARGIN.min(window_w - width).max(0.0),
            y: PANEL_MARGIN.min(window_h - full_height).max(0.0),
            width,
            height: full_height,
        },
        PanelKind::Shopkeeper => ViewportRect {
            x: (window_w - PANEL_MARGIN - width).max(0.0),
            y: PANEL_MARGIN.min(window_h - full_height).max(0.0),
            width,
            height: full_height,
        },
    }
}
