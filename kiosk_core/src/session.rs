//! One kiosk session: the object that owns selection, animation, the
//! overlay sequence, quantities and the wallet, and routes intents between
//! them. Collaborators are borrowed per call through [`Ports`].

use std::collections::BTreeMap;

use crate::animation::AnimationDriver;
use crate::catalog::{arrange_items, Item, ItemRegistry, MenuCatalog};
use crate::commerce::{QuantityAction, QuantityChange, QuantityState, Wallet};
use crate::config::KioskConfig;
use crate::error::Result;
use crate::events::{EventBus, SessionEvent, SubscriptionId};
use crate::input::{InputUnifier, Intent, KeyOutcome, KeyPress};
use crate::overlay::{OverlayContent, OverlayRevealController, OverlayRevealState};
use crate::ports::{
    AudioError, FrameItem, FrameSnapshot, PlayOptions, Ports, Renderer, SoundCue, SoundHandle,
};
use crate::selection::{Direction, SelectionModel};
use crate::shopkeeper::{ShopkeeperDirector, ShopkeeperUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MusicState {
    Stopped,
    Playing,
    Blocked,
}

#[derive(Debug)]
pub struct Session {
    config: KioskConfig,
    catalog: MenuCatalog,
    registry: ItemRegistry,
    items: Vec<Item>,
    selection: SelectionModel,
    animation: AnimationDriver,
    overlay: OverlayRevealController,
    input: InputUnifier,
    quantities: QuantityState,
    wallet: Wallet,
    shopkeeper: ShopkeeperDirector,
    events: EventBus,
    sounds: BTreeMap<SoundCue, SoundHandle>,
    music: MusicState,
    lifecycle: Lifecycle,
}

impl Session {
    /// Lays the registry out in the menu's curated order. Fails when the
    /// registry is empty.
    pub fn new(config: KioskConfig, catalog: MenuCatalog, registry: ItemRegistry) -> Result<Self> {
        let items = arrange_items(&registry, catalog.curated_order())?;
        let selection = SelectionModel::new(items.len())?;
        let animation = AnimationDriver::new(
            items.len(),
            selection.selected_index(),
            config.animation.clone(),
        );
        Ok(Self {
            overlay: OverlayRevealController::new(config.reveal.clone()),
            input: InputUnifier::new(config.input.clone()),
            quantities: QuantityState::new(&config.commerce),
            wallet: Wallet::new(config.commerce.initial_balance),
            shopkeeper: ShopkeeperDirector::new(config.shopkeeper.clone()),
            events: EventBus::new(),
            sounds: BTreeMap::new(),
            music: MusicState::Stopped,
            lifecycle: Lifecycle::Created,
            config,
            catalog,
            registry,
            items,
            selection,
            animation,
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MenuCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selected_item(&self) -> &Item {
        &self.items[self.selection.selected_index()]
    }

    pub fn animation(&self) -> &AnimationDriver {
        &self.animation
    }

    pub fn overlay(&self) -> &OverlayRevealController {
        &self.overlay
    }

    pub fn quantities(&self) -> &QuantityState {
        &self.quantities
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn shopkeeper(&self) -> &ShopkeeperDirector {
        &self.shopkeeper
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Loads the sound cues, starts the music and reveals the first item.
    /// Calling it twice has no further effect.
    pub fn init(&mut self, ports: &mut Ports<'_>) {
        if self.lifecycle != Lifecycle::Created {
            log::debug!("session init ignored in {:?}", self.lifecycle);
            return;
        }
        for cue in SoundCue::ALL {
            match ports.audio.load_sound(cue) {
                Ok(handle) => {
                    self.sounds.insert(cue, handle);
                }
                Err(err) => log::warn!("sound {:?} unavailable: {err}", cue),
            }
        }
        self.lifecycle = Lifecycle::Running;
        log::info!(
            "session started with {} items, balance {:.2}",
            self.items.len(),
            self.wallet.balance()
        );
        self.start_music(ports);
        ports.overlay.show_balance(self.wallet.balance());
        let index = self.selection.selected_index();
        let key = self.items[index].key.clone();
        self.events
            .publish(&SessionEvent::SelectionChanged { index, key });
        self.reveal_selected(ports);
    }

    /// Drops timers and listeners. The session ignores input afterwards.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.overlay.reset();
        self.shopkeeper.reset();
        self.lifecycle = Lifecycle::Disposed;
        self.events.publish(&SessionEvent::Disposed);
        self.events.clear();
        log::info!("session disposed");
    }

    pub fn handle_intent(&mut self, intent: Intent, ports: &mut Ports<'_>) {
        match intent {
            Intent::Navigate(direction) => {
                self.navigate(direction, ports);
            }
            Intent::Activate => self.activate(ports),
        }
    }

    /// Moves the selection one step. Returns `false` at either end of the
    /// row, after playing the rejection cue.
    pub fn navigate(&mut self, direction: Direction, ports: &mut Ports<'_>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.retry_music(ports);
        if !self.selection.advance(direction) {
            self.play(SoundCue::Reject, ports);
            self.events
                .publish(&SessionEvent::NavigationRejected { direction });
            return false;
        }
        let index = self.selection.selected_index();
        self.animation.retarget(index);
        self.play(SoundCue::Navigate, ports);
        let key = self.items[index].key.clone();
        self.events
            .publish(&SessionEvent::SelectionChanged { index, key });
        self.reveal_selected(ports);
        true
    }

    /// Activate finishes a shopkeeper line that is still typing; otherwise it
    /// adds one of the selected item.
    pub fn activate(&mut self, ports: &mut Ports<'_>) {
        if !self.is_running() {
            return;
        }
        if let Some(update) = self.shopkeeper.skip() {
            self.retry_music(ports);
            self.apply_shopkeeper(update, ports);
            return;
        }
        self.quantity_action(QuantityAction::Increment, ports);
    }

    /// Steps the selected item's quantity. Increments charge the unit price
    /// and celebrate; decrements refund it. Clamped steps only report the
    /// block.
    pub fn quantity_action(&mut self, action: QuantityAction, ports: &mut Ports<'_>) -> QuantityChange {
        let key = self.selected_item().key.clone();
        if !self.is_running() {
            return QuantityChange {
                quantity: self.quantities.quantity(&key),
                blocked: true,
            };
        }
        self.retry_music(ports);
        let change = self.quantities.adjust(&key, action);
        if change.blocked {
            self.play(SoundCue::Reject, ports);
            self.events
                .publish(&SessionEvent::QuantityBlocked { key, action });
            return change;
        }

        let price = self.catalog.details_by_key(&key).price;
        match action {
            QuantityAction::Increment => {
                self.wallet.charge(price);
                self.animation.push_purchase_impulse();
                let origin = self
                    .animation
                    .transform(self.selection.selected_index())
                    .map(|transform| transform.position)
                    .unwrap_or_default();
                ports.particles.spawn_burst(origin);
                self.play(SoundCue::Purchase, ports);
            }
            QuantityAction::Decrement => {
                self.wallet.refund(price);
                self.play(SoundCue::Refund, ports);
            }
        }
        log::debug!(
            "{key} x{} ({action:?}), balance {:.2}",
            change.quantity,
            self.wallet.balance()
        );
        self.overlay
            .update_quantity(&key, change.quantity, &mut *ports.overlay);
        ports.overlay.show_balance(self.wallet.balance());
        self.events.publish(&SessionEvent::QuantityChanged {
            key: key.clone(),
            quantity: change.quantity,
            balance: self.wallet.balance(),
        });
        if action == QuantityAction::Increment {
            self.events
                .publish(&SessionEvent::PurchaseConfirmed { key });
        }
        change
    }

    pub fn key(&mut self, key: KeyPress, ports: &mut Ports<'_>) -> KeyOutcome {
        if !self.is_running() {
            return KeyOutcome::default();
        }
        let outcome = self.input.handle_key(key);
        if let Some(intent) = outcome.intent {
            self.handle_intent(intent, ports);
        }
        outcome
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, t_ms: f64) {
        self.input.pointer_down(x, y, t_ms);
    }

    /// Unclassified drags turn the selected item.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if let Some(drag) = self.input.pointer_move(x, y) {
            self.animation.nudge_selected_rotation(drag.dx);
        }
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, t_ms: f64, ports: &mut Ports<'_>) {
        if let Some(intent) = self.input.pointer_up(x, y, t_ms) {
            self.handle_intent(intent, ports);
        }
    }

    pub fn click(&mut self, ports: &mut Ports<'_>) {
        if let Some(intent) = self.input.click() {
            self.handle_intent(intent, ports);
        }
    }

    pub fn touch_start(&mut self, id: u64, x: f32, y: f32, t_ms: f64) {
        self.input.touch_start(id, x, y, t_ms);
    }

    pub fn touch_move(&mut self, id: u64, x: f32, y: f32) {
        if let Some(drag) = self.input.touch_move(id, x, y) {
            self.animation.nudge_selected_rotation(drag.dx);
        }
    }

    pub fn touch_end(&mut self, id: u64, x: f32, y: f32, t_ms: f64, ports: &mut Ports<'_>) {
        if let Some(intent) = self.input.touch_end(id, x, y, t_ms) {
            self.handle_intent(intent, ports);
        }
    }

    pub fn touch_cancel(&mut self, id: u64) {
        self.input.touch_cancel(id);
    }

    /// Per-frame update: gamepad poll, animation, reveal timers, expand
    /// completion from the surface, and the shopkeeper.
    pub fn tick(&mut self, dt: f32, ports: &mut Ports<'_>) {
        if !self.is_running() {
            return;
        }
        let pads = ports.gamepads.poll();
        for intent in self.input.poll_gamepads(&pads) {
            self.handle_intent(intent, ports);
        }

        self.animation.tick(dt);

        let phases = self.overlay.advance(dt, &mut *ports.overlay);
        self.publish_phases(phases);
        if ports.overlay.poll_transition_end() {
            self.overlay_transition_end(ports);
        }

        for update in self.shopkeeper.advance(dt) {
            self.apply_shopkeeper(update, ports);
        }
    }

    /// The surface's expand transition finished.
    pub fn overlay_transition_end(&mut self, ports: &mut Ports<'_>) {
        let phases = self.overlay.expand_transition_ended(&mut *ports.overlay);
        self.publish_phases(phases);
    }

    pub fn frame_snapshot(&self) -> FrameSnapshot {
        let selected = self.selection.selected_index();
        let items = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                Some(FrameItem {
                    mesh: item.display_mesh,
                    transform: self.animation.transform(index)?,
                    selected: index == selected,
                })
            })
            .collect();
        FrameSnapshot {
            items,
            spotlight: self.animation.spotlight(),
            clock: self.animation.clock(),
        }
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.render(&self.frame_snapshot());
    }

    fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    fn reveal_selected(&mut self, ports: &mut Ports<'_>) {
        let key = self.selected_item().key.clone();
        let content = OverlayContent {
            details: self.catalog.details_by_key(&key),
            quantity: self.quantities.quantity(&key),
            item_key: key,
        };
        let phases = self.overlay.trigger(content, &mut *ports.overlay);
        self.publish_phases(phases);
    }

    fn publish_phases(&mut self, phases: Vec<OverlayRevealState>) {
        for phase in phases {
            self.events
                .publish(&SessionEvent::OverlayPhaseChanged { phase });
        }
    }

    fn apply_shopkeeper(&mut self, update: ShopkeeperUpdate, ports: &mut Ports<'_>) {
        match update {
            ShopkeeperUpdate::Line { text, complete } => {
                ports.overlay.show_shopkeeper(Some(&text));
                self.events
                    .publish(&SessionEvent::ShopkeeperLine { text, complete });
            }
            ShopkeeperUpdate::Hidden => {
                ports.overlay.show_shopkeeper(None);
                self.events.publish(&SessionEvent::ShopkeeperHidden);
            }
        }
    }

    fn start_music(&mut self, ports: &mut Ports<'_>) {
        self.music = if self.play(SoundCue::Music, ports) {
            MusicState::Playing
        } else if self.music == MusicState::Blocked {
            MusicState::Blocked
        } else {
            MusicState::Stopped
        };
    }

    fn retry_music(&mut self, ports: &mut Ports<'_>) {
        if self.music == MusicState::Blocked {
            log::debug!("retrying background music after user input");
            self.start_music(ports);
        }
    }

    /// Returns whether playback started. A blocked music cue is remembered so
    /// the next user intent can try again.
    fn play(&mut self, cue: SoundCue, ports: &mut Ports<'_>) -> bool {
        let Some(handle) = self.sounds.get(&cue).copied() else {
            log::debug!("{}", AudioError::UnknownSound(cue));
            return false;
        };
        let mix = &self.config.audio;
        let options = match cue {
            SoundCue::Navigate => PlayOptions {
                volume: mix.navigate_volume,
                playback_rate: mix.navigate_rate,
                looped: false,
            },
            SoundCue::Reject => PlayOptions {
                volume: mix.reject_volume,
                playback_rate: mix.reject_rate,
                looped: false,
            },
            SoundCue::Purchase => PlayOptions {
                volume: mix.purchase_volume,
                ..PlayOptions::default()
            },
            SoundCue::Refund => PlayOptions {
                volume: mix.refund_volume,
                ..PlayOptions::default()
            },
            SoundCue::Music => PlayOptions {
                volume: mix.music_volume,
                looped: true,
                ..PlayOptions::default()
            },
        };
        match ports.audio.play(handle, options) {
            Ok(()) => true,
            Err(AudioError::Blocked) => {
                log::info!("{:?} blocked by the audio device, continuing silently", cue);
                if cue == SoundCue::Music {
                    self.music = MusicState::Blocked;
                }
                false
            }
            Err(err) => {
                log::warn!("{:?} failed: {err}", cue);
                false
            }
        }
    }
}
