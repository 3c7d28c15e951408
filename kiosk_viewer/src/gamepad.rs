//! Pad polling for the window. With the `gamepad` feature connected pads are
//! read through gilrs once per frame; without it the window has no pads and
//! the keyboard, mouse and touch paths carry navigation alone.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, Gilrs};
use kiosk_core::input::{GamepadButtons, GamepadSnapshot};
use kiosk_core::ports::{GamepadSource, NoGamepad};

/// Pad controls the kiosk reads, independent of the backend's naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadControl {
    DPadLeft,
    DPadRight,
    ShoulderLeft,
    ShoulderRight,
    Confirm,
}

/// Folds one pad's readings into the snapshot the session polls.
pub fn snapshot(pressed: impl Fn(PadControl) -> bool, stick_x: f32) -> GamepadSnapshot {
    GamepadSnapshot {
        buttons: GamepadButtons {
            dpad_left: pressed(PadControl::DPadLeft),
            dpad_right: pressed(PadControl::DPadRight),
            shoulder_left: pressed(PadControl::ShoulderLeft),
            shoulder_right: pressed(PadControl::ShoulderRight),
            confirm: pressed(PadControl::Confirm),
        },
        stick_x: if stick_x.is_finite() { stick_x.clamp(-1.0, 1.0) } else { 0.0 },
    }
}

#[cfg(feature = "gamepad")]
fn button(control: PadControl) -> Button {
    match control {
        PadControl::DPadLeft => Button::DPadLeft,
        PadControl::DPadRight => Button::DPadRight,
        PadControl::ShoulderLeft => Button::LeftTrigger,
        PadControl::ShoulderRight => Button::RightTrigger,
        PadControl::Confirm => Button::South,
    }
}

/// Connected pads in gilrs slot order.
#[cfg(feature = "gamepad")]
pub struct GilrsGamepads {
    gilrs: Gilrs,
}

#[cfg(feature = "gamepad")]
impl GamepadSource for GilrsGamepads {
    fn poll(&mut self) -> Vec<Option<GamepadSnapshot>> {
        // Button state only updates as queued events are drained.
        while self.gilrs.next_event().is_some() {}
        let mut slots: Vec<Option<GamepadSnapshot>> = Vec::new();
        for (id, pad) in self.gilrs.gamepads() {
            let slot = usize::from(id);
            if slots.len() <= slot {
                slots.resize(slot + 1, None);
            }
            slots[slot] = Some(snapshot(
                |control| pad.is_pressed(button(control)),
                pad.value(Axis::LeftStickX),
            ));
        }
        slots
    }
}

/// Picks the gamepad backend for the window.
pub fn init_gamepads() -> Box<dyn GamepadSource> {
    #[cfg(feature = "gamepad")]
    {
        match Gilrs::new() {
            Ok(gilrs) => {
                println!("[kiosk_viewer] gamepads via gilrs");
                return Box::new(GilrsGamepads { gilrs });
            }
            Err(err) => log::warn!("[gamepad] backend unavailable: {err}"),
        }
    }
    println!("[kiosk_viewer] gamepad polling disabled");
    Box::new(NoGamepad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoulders_and_dpad_fill_their_own_slots() {
        let pad = snapshot(
            |control| matches!(control, PadControl::ShoulderLeft | PadControl::Confirm),
            -0.7,
        );
        assert!(pad.buttons.shoulder_left);
        assert!(pad.buttons.confirm);
        assert!(!pad.buttons.dpad_left);
        assert!(!pad.buttons.dpad_right);
        assert!(!pad.buttons.shoulder_right);
        assert_eq!(pad.stick_x, -0.7);
    }

    #[test]
    fn stick_readings_are_sanitized() {
        assert_eq!(snapshot(|_| false, f32::NAN).stick_x, 0.0);
        assert_eq!(snapshot(|_| false, 1.8).stick_x, 1.0);
    }

    #[cfg(not(feature = "gamepad"))]
    #[test]
    fn without_the_feature_no_pads_are_reported() {
        let mut pads = init_gamepads();
        assert!(pads.poll().is_empty());
    }
}
