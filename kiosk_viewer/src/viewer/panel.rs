//! Window-side implementation of the item panel. Turns reveal views into
//! text rows, animates the panel height toward the locked height and tells
//! the session once the expand has landed.

use kiosk_core::animation::smooth_toward;
use kiosk_core::overlay::{OverlayContent, OverlayRevealState, OverlayView};
use kiosk_core::ports::OverlaySurface;

const HEIGHT_RATE: f32 = 14.0;
const SETTLE_EPSILON: f32 = 0.5;

/// Pixel pitch of the panel text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelMetrics {
    pub row_height: f32,
    pub padding: f32,
}

impl PanelMetrics {
    pub fn new(row_height: f32, padding: f32) -> Self {
        Self {
            row_height: row_height.max(1.0),
            padding: padding.max(0.0),
        }
    }

    fn height_for_rows(&self, rows: usize) -> f32 {
        self.padding * 2.0 + self.row_height * rows as f32
    }
}

impl Default for PanelMetrics {
    fn default() -> Self {
        Self::new(24.0, 10.0)
    }
}

#[derive(Debug)]
pub struct PanelSurface {
    metrics: PanelMetrics,
    item_key: String,
    view: OverlayView,
    height: f32,
    expand_reported: bool,
    expand_finished: bool,
    item_lines: Vec<String>,
    balance: Option<f64>,
    shopkeeper: Option<String>,
}

impl PanelSurface {
    pub fn new(metrics: PanelMetrics) -> Self {
        Self {
            metrics,
            item_key: String::new(),
            view: OverlayView::default(),
            height: 0.0,
            expand_reported: false,
            expand_finished: false,
            item_lines: Vec::new(),
            balance: None,
            shopkeeper: None,
        }
    }

    /// Animated height in pixels.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn item_lines(&self) -> &[String] {
        &self.item_lines
    }

    pub fn status_lines(&self) -> Vec<String> {
        self.balance
            .map(|balance| vec![format!("Wallet ${balance:.2}")])
            .unwrap_or_default()
    }

    pub fn shopkeeper_lines(&self) -> Vec<String> {
        self.shopkeeper
            .as_ref()
            .filter(|text| !text.is_empty())
            .map(|text| vec![text.clone()])
            .unwrap_or_default()
    }

    fn target_height(&self) -> f32 {
        match self.view.phase {
            OverlayRevealState::Idle
            | OverlayRevealState::Collapsing
            | OverlayRevealState::Collapsed => 0.0,
            _ => self
                .view
                .locked_height
                .unwrap_or_else(|| self.metrics.height_for_rows(self.item_lines.len())),
        }
    }

    /// Steps the height animation by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let target = self.target_height();
        self.height = smooth_toward(self.height, target, HEIGHT_RATE, dt.max(0.0));
        if (self.height - target).abs() < SETTLE_EPSILON {
            self.height = target;
            if self.view.phase == OverlayRevealState::Expanding && !self.expand_reported {
                self.expand_reported = true;
                self.expand_finished = true;
            }
        }
    }

    fn rebuild_lines(&mut self) {
        self.item_lines.clear();
        let Some(content) = self.view.content.as_ref() else {
            return;
        };
        if self.view.name_visible {
            self.item_lines.push(content.details.display_name.clone());
        }
        for field in &self.view.revealed {
            self.item_lines.push(content.field_text(*field));
        }
    }
}

impl OverlaySurface for PanelSurface {
    fn render(&mut self, item_key: &str, view: &OverlayView) {
        let entering_expand = view.phase == OverlayRevealState::Expanding
            && self.view.phase != OverlayRevealState::Expanding;
        if entering_expand {
            self.expand_reported = false;
            self.expand_finished = false;
        }
        if self.item_key != item_key {
            log::debug!("panel now showing `{item_key}`");
            self.item_key = item_key.to_string();
        }
        self.view = view.clone();
        self.rebuild_lines();
    }

    fn measure_revealed_height(&mut self, content: &OverlayContent) -> f32 {
        // Name row plus every meta row.
        self.metrics.height_for_rows(1 + content.reveal_order().len())
    }

    fn poll_transition_end(&mut self) -> bool {
        std::mem::take(&mut self.expand_finished)
    }

    fn show_balance(&mut self, balance: f64) {
        self.balance = Some(balance);
    }

    fn show_shopkeeper(&mut self, text: Option<&str>) {
        self.shopkeeper = text.map(str::to_string);
    }
}
