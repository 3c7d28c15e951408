//! Folds keyboard, polled gamepads, mouse drags and touch gestures into the
//! three intents the carousel understands.
//!
//! Every handler returns the intent it produced (if any) and also hands it
//! to the listeners registered through `on_navigate_previous`,
//! `on_navigate_next` and `on_activate`. Pointer and touch handlers take
//! timestamps in milliseconds from any monotonic origin.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::InputTuning;
use crate::selection::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Intent {
    Navigate(Direction),
    Activate,
}

/// Host-neutral key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    ArrowLeft,
    ArrowRight,
    Enter,
    Space,
    Character(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    pub intent: Option<Intent>,
    /// The host should swallow the key so the page does not scroll.
    pub prevent_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadButtons {
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub shoulder_left: bool,
    pub shoulder_right: bool,
    pub confirm: bool,
}

impl GamepadButtons {
    fn left(&self) -> bool {
        self.dpad_left || self.shoulder_left
    }

    fn right(&self) -> bool {
        self.dpad_right || self.shoulder_right
    }
}

/// One poll of a connected pad.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadSnapshot {
    pub buttons: GamepadButtons,
    /// Left stick X axis in `[-1, 1]`.
    pub stick_x: f32,
}

/// Incremental pointer motion delivered while a drag has not been
/// classified as a swipe. Hosts may use it to turn the selected item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDrag {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    start: (f32, f32),
    start_ms: f64,
    last: (f32, f32),
    horizontal: bool,
    moved: bool,
}

impl Gesture {
    fn new(x: f32, y: f32, t_ms: f64) -> Self {
        Self {
            start: (x, y),
            start_ms: t_ms,
            last: (x, y),
            horizontal: false,
            moved: false,
        }
    }

    fn track(&mut self, x: f32, y: f32, tuning: &InputTuning) -> Option<PointerDrag> {
        let dx = x - self.start.0;
        let dy = y - self.start.1;
        if !self.horizontal && dx.abs() > tuning.drag_classify_px && dx.abs() > dy.abs() {
            self.horizontal = true;
        }
        if dx.abs().max(dy.abs()) > tuning.tap_max_distance_px {
            self.moved = true;
        }
        let step = PointerDrag {
            dx: x - self.last.0,
            dy: y - self.last.1,
        };
        self.last = (x, y);
        if self.horizontal { None } else { Some(step) }
    }

    /// Swipe direction if the release clears distance, speed and dominance.
    fn swipe(&self, x: f32, y: f32, t_ms: f64, min_distance: f32, min_speed: f32) -> Option<Direction> {
        let dx = x - self.start.0;
        let dy = y - self.start.1;
        let elapsed = (t_ms - self.start_ms).max(1.0) as f32;
        let speed = dx.abs() / elapsed;
        if dx.abs() >= min_distance && speed >= min_speed && dx.abs() > dy.abs() {
            // Dragging content left brings the next item in.
            Direction::from_sign(-dx)
        } else {
            None
        }
    }

    fn displacement(&self, x: f32, y: f32) -> f32 {
        (x - self.start.0).abs().max((y - self.start.1).abs())
    }
}

#[derive(Debug, Default)]
struct GamepadTracker {
    index: Option<usize>,
    previous: GamepadButtons,
    /// Direction the stick last fired in, until it returns to the dead-zone.
    stick_latched: Option<Direction>,
}

type Listener = Box<dyn FnMut()>;

#[derive(Default)]
struct Listeners {
    previous: Vec<Listener>,
    next: Vec<Listener>,
    activate: Vec<Listener>,
}

pub struct InputUnifier {
    tuning: InputTuning,
    listeners: Listeners,
    gamepad: GamepadTracker,
    mouse: Option<Gesture>,
    swipe_triggered: bool,
    drag_suppressed: bool,
    touches: BTreeSet<u64>,
    touch: Option<(u64, Gesture)>,
    multi_touch: bool,
}

impl std::fmt::Debug for InputUnifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputUnifier")
            .field("tuning", &self.tuning)
            .field("gamepad", &self.gamepad)
            .field("mouse", &self.mouse)
            .field("touches", &self.touches)
            .field("multi_touch", &self.multi_touch)
            .finish_non_exhaustive()
    }
}

impl InputUnifier {
    pub fn new(tuning: InputTuning) -> Self {
        Self {
            tuning,
            listeners: Listeners::default(),
            gamepad: GamepadTracker::default(),
            mouse: None,
            swipe_triggered: false,
            drag_suppressed: false,
            touches: BTreeSet::new(),
            touch: None,
            multi_touch: false,
        }
    }

    pub fn tuning(&self) -> &InputTuning {
        &self.tuning
    }

    pub fn on_navigate_previous(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.previous.push(Box::new(listener));
    }

    pub fn on_navigate_next(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.next.push(Box::new(listener));
    }

    pub fn on_activate(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.activate.push(Box::new(listener));
    }

    fn emit(&mut self, intent: Intent) -> Intent {
        let listeners = match intent {
            Intent::Navigate(Direction::Previous) => &mut self.listeners.previous,
            Intent::Navigate(Direction::Next) => &mut self.listeners.next,
            Intent::Activate => &mut self.listeners.activate,
        };
        for listener in listeners.iter_mut() {
            listener();
        }
        intent
    }

    pub fn handle_key(&mut self, key: KeyPress) -> KeyOutcome {
        let intent = match key {
            KeyPress::ArrowLeft | KeyPress::Character('a') | KeyPress::Character('A') => {
                Intent::Navigate(Direction::Previous)
            }
            KeyPress::ArrowRight | KeyPress::Character('d') | KeyPress::Character('D') => {
                Intent::Navigate(Direction::Next)
            }
            KeyPress::Enter => Intent::Activate,
            _ => return KeyOutcome::default(),
        };
        KeyOutcome {
            intent: Some(self.emit(intent)),
            prevent_default: true,
        }
    }

    /// Reads the pad slots once. The first connected slot is cached; when it
    /// disappears the cache is dropped and the next poll looks again.
    pub fn poll_gamepads(&mut self, pads: &[Option<GamepadSnapshot>]) -> Vec<Intent> {
        if let Some(index) = self.gamepad.index {
            if pads.get(index).copied().flatten().is_none() {
                log::debug!("gamepad {index} disconnected");
                self.gamepad = GamepadTracker::default();
            }
        }
        if self.gamepad.index.is_none() {
            self.gamepad.index = pads.iter().position(Option::is_some);
            if let Some(index) = self.gamepad.index {
                log::debug!("gamepad {index} connected");
            }
        }
        let Some(snapshot) = self
            .gamepad
            .index
            .and_then(|index| pads.get(index).copied().flatten())
        else {
            return Vec::new();
        };

        let mut fired = Vec::new();
        let previous = self.gamepad.previous;
        let buttons = snapshot.buttons;
        if buttons.left() && !previous.left() {
            fired.push(Intent::Navigate(Direction::Previous));
        }
        if buttons.right() && !previous.right() {
            fired.push(Intent::Navigate(Direction::Next));
        }
        if buttons.confirm && !previous.confirm {
            fired.push(Intent::Activate);
        }
        self.gamepad.previous = buttons;

        let stick = if snapshot.stick_x.is_finite() {
            snapshot.stick_x
        } else {
            0.0
        };
        let deflected = if stick.abs() >= self.tuning.stick_threshold {
            Direction::from_sign(stick)
        } else {
            None
        };
        if deflected.is_some() && deflected != self.gamepad.stick_latched {
            fired.extend(deflected.map(Intent::Navigate));
        }
        self.gamepad.stick_latched = deflected;

        fired.into_iter().map(|intent| self.emit(intent)).collect()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, t_ms: f64) {
        self.mouse = Some(Gesture::new(x, y, t_ms));
        self.swipe_triggered = false;
        self.drag_suppressed = false;
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<PointerDrag> {
        let tuning = &self.tuning;
        self.mouse.as_mut()?.track(x, y, tuning)
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, t_ms: f64) -> Option<Intent> {
        let mut gesture = self.mouse.take()?;
        gesture.track(x, y, &self.tuning);
        let swipe = gesture.swipe(
            x,
            y,
            t_ms,
            self.tuning.min_swipe_distance_px,
            self.tuning.mouse_min_swipe_speed,
        );
        match swipe {
            Some(direction) => {
                self.swipe_triggered = true;
                Some(self.emit(Intent::Navigate(direction)))
            }
            None => {
                self.drag_suppressed = gesture.moved;
                None
            }
        }
    }

    /// The click that follows a release. Swallowed after a swipe or a drag.
    pub fn click(&mut self) -> Option<Intent> {
        let suppressed = self.swipe_triggered || self.drag_suppressed || self.mouse.is_some();
        self.swipe_triggered = false;
        self.drag_suppressed = false;
        if suppressed {
            None
        } else {
            Some(self.emit(Intent::Activate))
        }
    }

    pub fn touch_start(&mut self, id: u64, x: f32, y: f32, t_ms: f64) {
        self.touches.insert(id);
        if self.touches.len() > 1 {
            self.multi_touch = true;
            self.touch = None;
            return;
        }
        if !self.multi_touch {
            self.touch = Some((id, Gesture::new(x, y, t_ms)));
        }
    }

    pub fn touch_move(&mut self, id: u64, x: f32, y: f32) -> Option<PointerDrag> {
        if self.multi_touch {
            return None;
        }
        let tuning = &self.tuning;
        match self.touch.as_mut() {
            Some((active, gesture)) if *active == id => gesture.track(x, y, tuning),
            _ => None,
        }
    }

    pub fn touch_end(&mut self, id: u64, x: f32, y: f32, t_ms: f64) -> Option<Intent> {
        self.touches.remove(&id);
        if self.multi_touch {
            if self.touches.is_empty() {
                self.multi_touch = false;
            }
            return None;
        }
        let (active, mut gesture) = self.touch.take()?;
        if active != id {
            self.touch = Some((active, gesture));
            return None;
        }
        gesture.track(x, y, &self.tuning);
        if let Some(direction) = gesture.swipe(
            x,
            y,
            t_ms,
            self.tuning.min_swipe_distance_px,
            self.tuning.touch_min_swipe_speed,
        ) {
            return Some(self.emit(Intent::Navigate(direction)));
        }
        let duration = t_ms - gesture.start_ms;
        if !gesture.moved
            && gesture.displacement(x, y) <= self.tuning.tap_max_distance_px
            && duration < self.tuning.tap_max_duration_ms
        {
            return Some(self.emit(Intent::Activate));
        }
        None
    }

    pub fn touch_cancel(&mut self, id: u64) {
        self.touches.remove(&id);
        if matches!(self.touch, Some((active, _)) if active == id) {
            self.touch = None;
        }
        if self.touches.is_empty() {
            self.multi_touch = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn unifier() -> InputUnifier {
        InputUnifier::new(InputTuning::default())
    }

    fn stick(x: f32) -> [Option<GamepadSnapshot>; 1] {
        [Some(GamepadSnapshot {
            buttons: GamepadButtons::default(),
            stick_x: x,
        })]
    }

    fn buttons(buttons: GamepadButtons) -> [Option<GamepadSnapshot>; 1] {
        [Some(GamepadSnapshot {
            buttons,
            stick_x: 0.0,
        })]
    }

    #[test]
    fn arrows_and_letters_navigate() {
        let mut input = unifier();
        for (key, expected) in [
            (KeyPress::ArrowLeft, Direction::Previous),
            (KeyPress::Character('a'), Direction::Previous),
            (KeyPress::Character('A'), Direction::Previous),
            (KeyPress::ArrowRight, Direction::Next),
            (KeyPress::Character('d'), Direction::Next),
            (KeyPress::Character('D'), Direction::Next),
        ] {
            let outcome = input.handle_key(key);
            assert_eq!(outcome.intent, Some(Intent::Navigate(expected)));
            assert!(outcome.prevent_default);
        }
        let ignored = input.handle_key(KeyPress::Character('x'));
        assert_eq!(ignored, KeyOutcome::default());
    }

    #[test]
    fn held_stick_fires_once() {
        let mut input = unifier();
        let mut fired = Vec::new();
        // 500ms at 60 polls per second.
        for _ in 0..30 {
            fired.extend(input.poll_gamepads(&stick(0.8)));
        }
        assert_eq!(fired, vec![Intent::Navigate(Direction::Next)]);
    }

    #[test]
    fn stick_rearms_inside_dead_zone() {
        let mut input = unifier();
        let mut fired = Vec::new();
        for x in [0.8, 0.4, 0.8] {
            fired.extend(input.poll_gamepads(&stick(x)));
        }
        assert_eq!(
            fired,
            vec![
                Intent::Navigate(Direction::Next),
                Intent::Navigate(Direction::Next)
            ]
        );

        fired.clear();
        for x in [-0.6, -0.55, -0.7, -0.5] {
            fired.extend(input.poll_gamepads(&stick(x)));
        }
        assert_eq!(fired, vec![Intent::Navigate(Direction::Previous)]);
    }

    #[test]
    fn stick_reversal_fires_without_centering() {
        let mut input = unifier();
        let mut fired = Vec::new();
        for x in [0.8, -0.8, -0.9] {
            fired.extend(input.poll_gamepads(&stick(x)));
        }
        assert_eq!(
            fired,
            vec![
                Intent::Navigate(Direction::Next),
                Intent::Navigate(Direction::Previous)
            ]
        );
    }

    #[test]
    fn nan_axis_reads_as_centered() {
        let mut input = unifier();
        assert!(input.poll_gamepads(&stick(f32::NAN)).is_empty());
    }

    #[test]
    fn buttons_are_edge_triggered() {
        let mut input = unifier();
        let held = GamepadButtons {
            dpad_right: true,
            ..GamepadButtons::default()
        };
        assert_eq!(
            input.poll_gamepads(&buttons(held)),
            vec![Intent::Navigate(Direction::Next)]
        );
        assert!(input.poll_gamepads(&buttons(held)).is_empty());
        let both = GamepadButtons {
            dpad_right: true,
            shoulder_right: true,
            ..GamepadButtons::default()
        };
        assert!(input.poll_gamepads(&buttons(both)).is_empty());
        input.poll_gamepads(&buttons(GamepadButtons::default()));
        let shoulder = GamepadButtons {
            shoulder_left: true,
            confirm: true,
            ..GamepadButtons::default()
        };
        assert_eq!(
            input.poll_gamepads(&buttons(shoulder)),
            vec![Intent::Navigate(Direction::Previous), Intent::Activate]
        );
    }

    #[test]
    fn disconnect_clears_cached_pad_and_reconnect_resumes() {
        let mut input = unifier();
        assert_eq!(input.poll_gamepads(&stick(0.9)).len(), 1);
        assert!(input.poll_gamepads(&[None]).is_empty());
        assert!(input.poll_gamepads(&[]).is_empty());
        let moved = [
            None,
            Some(GamepadSnapshot {
                buttons: GamepadButtons::default(),
                stick_x: 0.9,
            }),
        ];
        assert_eq!(
            input.poll_gamepads(&moved),
            vec![Intent::Navigate(Direction::Next)]
        );
    }

    #[test]
    fn fast_drag_navigates_without_click() {
        let mut input = unifier();
        input.pointer_down(300.0, 200.0, 1_000.0);
        let early = input.pointer_move(296.0, 200.0);
        assert!(early.is_some(), "unclassified drag reports motion");
        assert!(input.pointer_move(270.0, 201.0).is_none());
        let release = input.pointer_up(240.0, 202.0, 1_120.0);
        assert_eq!(release, Some(Intent::Navigate(Direction::Next)));
        assert_eq!(input.click(), None);
    }

    #[test]
    fn small_drag_is_a_click() {
        let mut input = unifier();
        input.pointer_down(300.0, 200.0, 0.0);
        input.pointer_move(302.0, 200.0);
        assert_eq!(input.pointer_up(303.0, 200.0, 90.0), None);
        assert_eq!(input.click(), Some(Intent::Activate));
    }

    #[test]
    fn slow_or_vertical_drags_do_not_navigate_or_click() {
        let mut input = unifier();
        input.pointer_down(0.0, 0.0, 0.0);
        assert_eq!(input.pointer_up(80.0, 0.0, 2_000.0), None);
        assert_eq!(input.click(), None);

        input.pointer_down(0.0, 0.0, 0.0);
        assert!(input.pointer_move(20.0, 90.0).is_some());
        assert_eq!(input.pointer_up(60.0, 120.0, 100.0), None);
        assert_eq!(input.click(), None);
    }

    #[test]
    fn touch_tap_and_swipe() {
        let mut input = unifier();
        input.touch_start(1, 100.0, 100.0, 0.0);
        assert_eq!(
            input.touch_end(1, 104.0, 101.0, 120.0),
            Some(Intent::Activate)
        );

        input.touch_start(2, 100.0, 100.0, 500.0);
        input.touch_move(2, 130.0, 104.0);
        assert_eq!(
            input.touch_end(2, 170.0, 105.0, 600.0),
            Some(Intent::Navigate(Direction::Previous))
        );

        input.touch_start(3, 100.0, 100.0, 1_000.0);
        assert_eq!(input.touch_end(3, 101.0, 100.0, 1_400.0), None, "long press");
    }

    #[test]
    fn touch_wander_and_return_is_not_a_tap() {
        let mut input = unifier();
        input.touch_start(1, 100.0, 100.0, 0.0);
        input.touch_move(1, 140.0, 100.0);
        assert_eq!(input.touch_end(1, 101.0, 100.0, 200.0), None);
    }

    #[test]
    fn touch_speed_floor_is_stricter_than_mouse() {
        let mut input = unifier();
        // 60px over 220ms: ~0.27 px/ms clears the mouse floor only.
        input.pointer_down(0.0, 0.0, 0.0);
        assert!(input.pointer_up(-60.0, 0.0, 220.0).is_some());
        input.touch_start(9, 0.0, 0.0, 0.0);
        assert_eq!(input.touch_end(9, -60.0, 0.0, 220.0), None);
    }

    #[test]
    fn multi_touch_is_ignored_until_all_fingers_lift() {
        let mut input = unifier();
        input.touch_start(1, 0.0, 0.0, 0.0);
        input.touch_start(2, 50.0, 0.0, 10.0);
        assert!(input.touch_move(1, -80.0, 0.0).is_none());
        assert_eq!(input.touch_end(1, -80.0, 0.0, 60.0), None);
        assert_eq!(input.touch_end(2, 50.0, 0.0, 70.0), None);
        input.touch_start(3, 0.0, 0.0, 100.0);
        assert_eq!(input.touch_end(3, 0.0, 0.0, 150.0), Some(Intent::Activate));
    }

    #[test]
    fn listeners_receive_intents() {
        let mut input = unifier();
        let next = Rc::new(Cell::new(0));
        let activate = Rc::new(Cell::new(0));
        {
            let next = next.clone();
            input.on_navigate_next(move || next.set(next.get() + 1));
        }
        {
            let activate = activate.clone();
            input.on_activate(move || activate.set(activate.get() + 1));
        }
        input.handle_key(KeyPress::ArrowRight);
        input.handle_key(KeyPress::ArrowLeft);
        input.handle_key(KeyPress::Enter);
        assert_eq!(next.get(), 1);
        assert_eq!(activate.get(), 1);
    }
}
