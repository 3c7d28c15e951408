//! Multi-stage reveal of the floating item panel.
//!
//! A selection change collapses the panel, holds it shut briefly, expands
//! it to the height the fully revealed content will need, fades the name
//! in and then staggers in the meta rows. Collapse, hold, fade and stagger
//! run on cooperative timers; the expand step waits for the surface to
//! report that its transition actually finished. Re-triggering at any point
//! drops every pending timer and starts over, so at most one sequence is
//! ever live.

use serde::Serialize;

use crate::catalog::ItemDetails;
use crate::config::RevealTiming;
use crate::ports::OverlaySurface;
use crate::timers::TimerQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OverlayRevealState {
    Idle,
    Collapsing,
    Collapsed,
    Expanding,
    NameVisible,
    MetaRevealing,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetaField {
    Price,
    Calories,
    /// Index into `ItemDetails::extras`.
    Extra(usize),
    Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayContent {
    pub item_key: String,
    pub details: ItemDetails,
    pub quantity: u32,
}

impl OverlayContent {
    /// Price, calories, any extras in menu order, then the quantity stepper.
    pub fn reveal_order(&self) -> Vec<MetaField> {
        let mut order = vec![MetaField::Price, MetaField::Calories];
        order.extend((0..self.details.extras.len()).map(MetaField::Extra));
        order.push(MetaField::Quantity);
        order
    }

    pub fn field_text(&self, field: MetaField) -> String {
        match field {
            MetaField::Price => format!("${:.2}", self.details.price),
            MetaField::Calories => format!("{} cal", self.details.calories),
            MetaField::Extra(index) => self
                .details
                .extras
                .get(index)
                .map(|extra| format!("{}: {}", extra.label, extra.value))
                .unwrap_or_default(),
            MetaField::Quantity => format!("Qty {}", self.quantity),
        }
    }
}

/// Everything the surface needs to draw the panel right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayView {
    pub phase: OverlayRevealState,
    pub content: Option<OverlayContent>,
    pub name_visible: bool,
    pub revealed: Vec<MetaField>,
    /// Height the panel is pinned to while rows stagger in.
    pub locked_height: Option<f32>,
}

impl Default for OverlayView {
    fn default() -> Self {
        Self {
            phase: OverlayRevealState::Idle,
            content: None,
            name_visible: false,
            revealed: Vec::new(),
            locked_height: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealStep {
    CollapseDone,
    HoldDone,
    NameFadeDone,
    Reveal(usize),
}

const MAX_CHAINED_STEPS: usize = 32;

#[derive(Debug, Clone)]
pub struct OverlayRevealController {
    timing: RevealTiming,
    timers: TimerQueue<RevealStep>,
    view: OverlayView,
    pending: Option<OverlayContent>,
    is_expanding: bool,
}

impl OverlayRevealController {
    pub fn new(timing: RevealTiming) -> Self {
        Self {
            timing,
            timers: TimerQueue::new(),
            view: OverlayView::default(),
            pending: None,
            is_expanding: false,
        }
    }

    pub fn state(&self) -> OverlayRevealState {
        self.view.phase
    }

    pub fn view(&self) -> &OverlayView {
        &self.view
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Starts a fresh sequence for `content`, abandoning whatever was in
    /// flight. Returns the phases entered.
    pub fn trigger(
        &mut self,
        content: OverlayContent,
        surface: &mut dyn OverlaySurface,
    ) -> Vec<OverlayRevealState> {
        self.timers.clear();
        self.is_expanding = false;
        log::debug!("overlay reveal restarting for `{}`", content.item_key);
        self.pending = Some(content);
        self.view.name_visible = false;
        self.view.revealed.clear();
        self.view.locked_height = None;
        self.timers.schedule(self.timing.collapse, RevealStep::CollapseDone);
        let entered = vec![self.enter(OverlayRevealState::Collapsing)];
        self.publish(surface);
        entered
    }

    /// Runs timers forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32, surface: &mut dyn OverlaySurface) -> Vec<OverlayRevealState> {
        let mut entered = Vec::new();
        let mut fired = self.timers.advance(dt);
        let mut rounds = 0;
        while !fired.is_empty() && rounds < MAX_CHAINED_STEPS {
            for step in fired {
                entered.extend(self.apply(step, surface));
            }
            // Zero-length phases complete within the same frame.
            fired = self.timers.advance(0.0);
            rounds += 1;
        }
        if !entered.is_empty() {
            self.publish(surface);
        }
        entered
    }

    /// Called by the surface when its expand transition finishes. Only the
    /// first report per cycle counts.
    pub fn expand_transition_ended(
        &mut self,
        surface: &mut dyn OverlaySurface,
    ) -> Vec<OverlayRevealState> {
        if !self.is_expanding || self.view.phase != OverlayRevealState::Expanding {
            log::debug!("ignoring stray expand completion in {:?}", self.view.phase);
            return Vec::new();
        }
        self.is_expanding = false;
        self.view.name_visible = true;
        self.timers
            .schedule(self.timing.name_fade, RevealStep::NameFadeDone);
        let entered = vec![self.enter(OverlayRevealState::NameVisible)];
        self.publish(surface);
        entered
    }

    /// Refreshes the quantity shown for the current item without restarting
    /// the sequence.
    pub fn update_quantity(&mut self, item_key: &str, quantity: u32, surface: &mut dyn OverlaySurface) {
        let mut touched = false;
        for content in [self.pending.as_mut(), self.view.content.as_mut()]
            .into_iter()
            .flatten()
        {
            if content.item_key == item_key {
                content.quantity = quantity;
                touched = true;
            }
        }
        if touched {
            self.publish(surface);
        }
    }

    pub fn reset(&mut self) {
        self.timers.clear();
        self.view = OverlayView::default();
        self.pending = None;
        self.is_expanding = false;
    }

    fn apply(&mut self, step: RevealStep, surface: &mut dyn OverlaySurface) -> Vec<OverlayRevealState> {
        match step {
            RevealStep::CollapseDone => {
                self.view.content = None;
                self.timers.schedule(self.timing.hold, RevealStep::HoldDone);
                vec![self.enter(OverlayRevealState::Collapsed)]
            }
            RevealStep::HoldDone => {
                let Some(content) = self.pending.take() else {
                    return Vec::new();
                };
                let height = surface.measure_revealed_height(&content);
                self.view.locked_height = height.is_finite().then_some(height.max(0.0));
                self.view.content = Some(content);
                self.is_expanding = true;
                vec![self.enter(OverlayRevealState::Expanding)]
            }
            RevealStep::NameFadeDone => {
                let order = self.reveal_order();
                if order.is_empty() {
                    return vec![self.enter(OverlayRevealState::Settled)];
                }
                self.view.revealed.push(order[0]);
                for index in 1..order.len() {
                    self.timers
                        .schedule(self.timing.meta_stagger * index as f32, RevealStep::Reveal(index));
                }
                let mut entered = vec![self.enter(OverlayRevealState::MetaRevealing)];
                if order.len() == 1 {
                    entered.push(self.enter(OverlayRevealState::Settled));
                }
                entered
            }
            RevealStep::Reveal(index) => {
                let order = self.reveal_order();
                if let Some(field) = order.get(index) {
                    if !self.view.revealed.contains(field) {
                        self.view.revealed.push(*field);
                    }
                }
                if index + 1 >= order.len() {
                    vec![self.enter(OverlayRevealState::Settled)]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn reveal_order(&self) -> Vec<MetaField> {
        self.view
            .content
            .as_ref()
            .map(OverlayContent::reveal_order)
            .unwrap_or_default()
    }

    fn enter(&mut self, phase: OverlayRevealState) -> OverlayRevealState {
        log::debug!("overlay {:?} -> {:?}", self.view.phase, phase);
        self.view.phase = phase;
        phase
    }

    fn publish(&self, surface: &mut dyn OverlaySurface) {
        // The incoming item names the panel as soon as a sequence starts,
        // while the outgoing content is still drawn collapsing.
        let key = self
            .pending
            .as_ref()
            .or(self.view.content.as_ref())
            .map(|content| content.item_key.as_str())
            .unwrap_or("");
        surface.render(key, &self.view);
    }
}
