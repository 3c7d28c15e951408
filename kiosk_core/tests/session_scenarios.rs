use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use glam::Vec3;
use kiosk_core::commerce::QuantityAction;
use kiosk_core::input::{GamepadButtons, GamepadSnapshot, KeyPress};
use kiosk_core::ports::{
    AssetProvider, AudioError, AudioPort, GamepadSource, HeadlessOverlay, MenuAssets,
    ParticlePort, PlayOptions, Ports, SoundCue, SoundHandle,
};
use kiosk_core::{Direction, KioskConfig, OverlayRevealState, Session, SessionEvent};

const FRAME: f32 = 1.0 / 60.0;

#[derive(Default)]
struct RecordingAudio {
    loaded: Vec<SoundCue>,
    played: Vec<SoundCue>,
    block_music: usize,
}

impl AudioPort for RecordingAudio {
    fn load_sound(&mut self, cue: SoundCue) -> Result<SoundHandle, AudioError> {
        self.loaded.push(cue);
        Ok(SoundHandle(self.loaded.len() as u32 - 1))
    }

    fn play(&mut self, handle: SoundHandle, _options: PlayOptions) -> Result<(), AudioError> {
        let cue = self.loaded[handle.0 as usize];
        if cue == SoundCue::Music && self.block_music > 0 {
            self.block_music -= 1;
            return Err(AudioError::Blocked);
        }
        self.played.push(cue);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingParticles {
    bursts: Vec<Vec3>,
}

impl ParticlePort for RecordingParticles {
    fn spawn_burst(&mut self, origin: Vec3) {
        self.bursts.push(origin);
    }
}

#[derive(Default)]
struct HeldGamepad {
    current: Option<GamepadSnapshot>,
}

impl GamepadSource for HeldGamepad {
    fn poll(&mut self) -> Vec<Option<GamepadSnapshot>> {
        vec![self.current]
    }
}

#[derive(Default)]
struct Rig {
    audio: RecordingAudio,
    particles: RecordingParticles,
    overlay: HeadlessOverlay,
    gamepads: HeldGamepad,
}

impl Rig {
    fn ports(&mut self) -> Ports<'_> {
        Ports {
            audio: &mut self.audio,
            particles: &mut self.particles,
            overlay: &mut self.overlay,
            gamepads: &mut self.gamepads,
        }
    }
}

struct Harness {
    session: Session,
    rig: Rig,
    events: Rc<RefCell<Vec<SessionEvent>>>,
}

impl Harness {
    fn with_config(config: KioskConfig) -> Result<Self> {
        let mut assets = MenuAssets::new();
        let registry = assets
            .load_model(None, &mut |_| {})
            .context("loading builtin menu")?;
        let mut session = Session::new(config, assets.into_catalog(), registry)
            .context("building session")?;
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        let mut rig = Rig::default();
        session.init(&mut rig.ports());
        Ok(Self {
            session,
            rig,
            events,
        })
    }

    fn new() -> Result<Self> {
        Self::with_config(KioskConfig::default())
    }

    fn navigate(&mut self, direction: Direction) -> bool {
        self.session.navigate(direction, &mut self.rig.ports())
    }

    fn quantity(&mut self, action: QuantityAction) -> u32 {
        self.session
            .quantity_action(action, &mut self.rig.ports())
            .quantity
    }

    fn run(&mut self, seconds: f32) {
        let frames = (seconds / FRAME).round() as usize;
        for _ in 0..frames {
            self.session.tick(FRAME, &mut self.rig.ports());
        }
    }

    fn count(&self, predicate: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    fn selection_changes(&self) -> usize {
        self.count(|event| matches!(event, SessionEvent::SelectionChanged { .. }))
    }
}

#[test]
fn nine_items_walk_to_the_end_and_stop() -> Result<()> {
    let mut harness = Harness::new()?;
    assert_eq!(harness.session.items().len(), 9);
    assert_eq!(harness.session.selection().selected_index(), 0);

    for _ in 0..3 {
        assert!(harness.navigate(Direction::Next));
    }
    assert_eq!(harness.session.selection().selected_index(), 3);
    for _ in 0..6 {
        assert!(harness.navigate(Direction::Next));
    }
    assert_eq!(harness.session.selection().selected_index(), 8);

    assert!(!harness.navigate(Direction::Next));
    assert_eq!(harness.session.selection().selected_index(), 8);
    assert_eq!(harness.rig.audio.played.last(), Some(&SoundCue::Reject));
    assert_eq!(
        harness.count(|event| matches!(
            event,
            SessionEvent::NavigationRejected {
                direction: Direction::Next
            }
        )),
        1
    );
    Ok(())
}

#[test]
fn previous_at_first_item_is_rejected() -> Result<()> {
    let mut harness = Harness::new()?;
    assert!(!harness.navigate(Direction::Previous));
    assert_eq!(harness.session.selection().selected_index(), 0);
    assert_eq!(harness.selection_changes(), 1);
    Ok(())
}

#[test]
fn burger_quantity_moves_the_wallet() -> Result<()> {
    let mut harness = Harness::new()?;
    let price = harness.session.catalog().details_by_key("burger").price;
    let start = harness.session.wallet().balance();
    assert_eq!(harness.session.selected_item().key, "burger");
    assert_eq!(harness.session.quantities().quantity("burger"), 1);

    for _ in 0..3 {
        harness.quantity(QuantityAction::Increment);
    }
    assert_eq!(harness.session.quantities().quantity("burger"), 4);
    let after_buying = harness.session.wallet().balance();
    assert!((start - after_buying - 3.0 * price).abs() < 1e-9);

    assert_eq!(harness.quantity(QuantityAction::Decrement), 3);
    assert!((harness.session.wallet().balance() - (after_buying + price)).abs() < 1e-9);

    assert_eq!(harness.rig.particles.bursts.len(), 3);
    assert_eq!(
        harness.count(|event| matches!(event, SessionEvent::PurchaseConfirmed { key } if key == "burger")),
        3
    );
    assert_eq!(harness.rig.audio.played.last(), Some(&SoundCue::Refund));
    assert_eq!(harness.rig.overlay.balance(), Some(harness.session.wallet().balance()));
    Ok(())
}

#[test]
fn quantity_clamps_report_blocked() -> Result<()> {
    let mut harness = Harness::new()?;
    let blocked = harness
        .session
        .quantity_action(QuantityAction::Decrement, &mut harness.rig.ports());
    assert!(blocked.blocked);
    assert_eq!(blocked.quantity, 1);

    for _ in 0..8 {
        harness.quantity(QuantityAction::Increment);
    }
    let balance = harness.session.wallet().balance();
    let blocked = harness
        .session
        .quantity_action(QuantityAction::Increment, &mut harness.rig.ports());
    assert!(blocked.blocked);
    assert_eq!(blocked.quantity, 9);
    assert_eq!(harness.session.wallet().balance(), balance);
    assert_eq!(
        harness.count(|event| matches!(event, SessionEvent::QuantityBlocked { .. })),
        2
    );
    assert_eq!(harness.rig.particles.bursts.len(), 8);
    Ok(())
}

#[test]
fn wallet_never_goes_negative() -> Result<()> {
    let mut config = KioskConfig::default();
    config.commerce.initial_balance = 10.0;
    let mut harness = Harness::with_config(config)?;
    harness.quantity(QuantityAction::Increment);
    harness.quantity(QuantityAction::Increment);
    assert_eq!(harness.session.wallet().balance(), 0.0);
    harness.quantity(QuantityAction::Decrement);
    harness.quantity(QuantityAction::Decrement);
    assert_eq!(harness.session.wallet().balance(), 10.0);
    Ok(())
}

#[test]
fn rapid_navigation_settles_once_on_the_last_item() -> Result<()> {
    let mut harness = Harness::new()?;
    for _ in 0..3 {
        harness.navigate(Direction::Next);
    }
    harness.run(2.0);

    let overlay = harness.session.overlay();
    assert_eq!(overlay.state(), OverlayRevealState::Settled);
    let shown = overlay.view().content.as_ref().context("overlay content")?;
    assert_eq!(shown.item_key, "pizza");
    assert_eq!(overlay.view().revealed, shown.reveal_order());
    assert_eq!(
        harness.count(|event| matches!(
            event,
            SessionEvent::OverlayPhaseChanged {
                phase: OverlayRevealState::Settled
            }
        )),
        1
    );
    assert_eq!(harness.rig.overlay.last_key(), Some("pizza"));
    Ok(())
}

#[test]
fn held_stick_navigates_once() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.rig.gamepads.current = Some(GamepadSnapshot {
        buttons: GamepadButtons::default(),
        stick_x: 0.8,
    });
    harness.run(0.5);
    assert_eq!(harness.session.selection().selected_index(), 1);

    harness.rig.gamepads.current = Some(GamepadSnapshot::default());
    harness.run(0.1);
    harness.rig.gamepads.current = Some(GamepadSnapshot {
        buttons: GamepadButtons::default(),
        stick_x: 0.8,
    });
    harness.run(0.1);
    assert_eq!(harness.session.selection().selected_index(), 2);
    Ok(())
}

#[test]
fn gamepad_confirm_buys_once_per_press() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.rig.gamepads.current = Some(GamepadSnapshot {
        buttons: GamepadButtons {
            confirm: true,
            ..GamepadButtons::default()
        },
        stick_x: 0.0,
    });
    harness.run(0.3);
    assert_eq!(harness.session.quantities().quantity("burger"), 2);
    Ok(())
}

#[test]
fn swipe_navigates_without_buying() -> Result<()> {
    let mut harness = Harness::new()?;
    let session = &mut harness.session;
    session.pointer_down(300.0, 200.0, 0.0);
    session.pointer_move(270.0, 201.0);
    session.pointer_up(240.0, 200.0, 120.0, &mut harness.rig.ports());
    session.click(&mut harness.rig.ports());

    assert_eq!(session.selection().selected_index(), 1);
    assert_eq!(session.quantities().quantity("fries"), 1);
    assert!(harness.rig.particles.bursts.is_empty());
    Ok(())
}

#[test]
fn tiny_drag_is_a_click() -> Result<()> {
    let mut harness = Harness::new()?;
    let session = &mut harness.session;
    session.pointer_down(100.0, 100.0, 0.0);
    session.pointer_move(103.0, 100.0);
    session.pointer_up(103.0, 100.0, 80.0, &mut harness.rig.ports());
    session.click(&mut harness.rig.ports());

    assert_eq!(session.selection().selected_index(), 0);
    assert_eq!(session.quantities().quantity("burger"), 2);
    Ok(())
}

#[test]
fn touch_swipe_and_tap() -> Result<()> {
    let mut harness = Harness::new()?;
    let session = &mut harness.session;
    session.touch_start(7, 200.0, 300.0, 0.0);
    session.touch_move(7, 150.0, 300.0);
    session.touch_end(7, 120.0, 302.0, 100.0, &mut harness.rig.ports());
    assert_eq!(session.selection().selected_index(), 1);

    session.touch_start(8, 50.0, 50.0, 500.0);
    session.touch_end(8, 52.0, 51.0, 600.0, &mut harness.rig.ports());
    assert_eq!(session.quantities().quantity("fries"), 2);
    Ok(())
}

#[test]
fn keyboard_routes_through_the_session() -> Result<()> {
    let mut harness = Harness::new()?;
    let outcome = harness
        .session
        .key(KeyPress::Character('d'), &mut harness.rig.ports());
    assert!(outcome.prevent_default);
    harness.session.key(KeyPress::Enter, &mut harness.rig.ports());
    let ignored = harness
        .session
        .key(KeyPress::Character('q'), &mut harness.rig.ports());
    assert!(!ignored.prevent_default);

    assert_eq!(harness.session.selection().selected_index(), 1);
    assert_eq!(harness.session.quantities().quantity("fries"), 2);
    Ok(())
}

#[test]
fn blocked_music_retries_on_next_intent() -> Result<()> {
    let mut assets = MenuAssets::new();
    let registry = assets.load_model(None, &mut |_| {})?;
    let mut session = Session::new(KioskConfig::default(), assets.into_catalog(), registry)?;
    let mut rig = Rig::default();
    rig.audio.block_music = 1;
    session.init(&mut rig.ports());
    assert!(!rig.audio.played.contains(&SoundCue::Music));

    session.tick(FRAME, &mut rig.ports());
    assert!(!rig.audio.played.contains(&SoundCue::Music));

    session.navigate(Direction::Next, &mut rig.ports());
    assert_eq!(rig.audio.played, vec![SoundCue::Music, SoundCue::Navigate]);

    session.navigate(Direction::Next, &mut rig.ports());
    let music_plays = rig
        .audio
        .played
        .iter()
        .filter(|cue| **cue == SoundCue::Music)
        .count();
    assert_eq!(music_plays, 1);
    Ok(())
}

#[test]
fn purchase_makes_the_item_jump() -> Result<()> {
    let mut harness = Harness::new()?;
    let resting = harness
        .session
        .animation()
        .transform(0)
        .context("burger transform")?
        .position
        .y;
    harness.quantity(QuantityAction::Increment);
    harness.run(0.12);
    let state = harness.session.animation().item_state(0).context("burger state")?;
    assert!(state.vertical_offset > resting + 0.1);
    harness.run(0.6);
    let state = harness.session.animation().item_state(0).context("burger state")?;
    assert!(state.active_jump_impulses.is_empty());
    assert!(state.active_spin_impulses.is_empty());
    Ok(())
}

#[test]
fn shopkeeper_speaks_and_activate_skips() -> Result<()> {
    let mut config = KioskConfig::default();
    config.shopkeeper.first_delay = 0.5;
    config.shopkeeper.lines = vec!["Welcome! Everything is fresh today.".to_string()];
    let mut harness = Harness::with_config(config)?;
    harness.run(0.6);
    assert!(harness.session.shopkeeper().is_typing());
    assert!(harness.rig.overlay.shopkeeper().is_some());

    harness.session.activate(&mut harness.rig.ports());
    assert_eq!(harness.session.quantities().quantity("burger"), 1);
    assert_eq!(
        harness.rig.overlay.shopkeeper(),
        Some("Welcome! Everything is fresh today.")
    );

    harness.run(4.0);
    assert!(harness.rig.overlay.shopkeeper().is_none());
    assert_eq!(
        harness.count(|event| matches!(event, SessionEvent::ShopkeeperHidden)),
        1
    );
    Ok(())
}

#[test]
fn sessions_do_not_share_state() -> Result<()> {
    let mut first = Harness::new()?;
    let second = Harness::new()?;
    first.navigate(Direction::Next);
    first.quantity(QuantityAction::Increment);
    assert_eq!(second.session.selection().selected_index(), 0);
    assert_eq!(second.session.quantities().quantity("fries"), 1);
    assert_eq!(second.session.wallet().balance(), second.session.wallet().initial());
    Ok(())
}

#[test]
fn dispose_announces_and_goes_quiet() -> Result<()> {
    let mut harness = Harness::new()?;
    harness.session.dispose();
    assert_eq!(
        harness.events.borrow().last(),
        Some(&SessionEvent::Disposed)
    );
    let before = harness.events.borrow().len();
    harness.navigate(Direction::Next);
    harness.run(0.5);
    assert_eq!(harness.events.borrow().len(), before);
    Ok(())
}
