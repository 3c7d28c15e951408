//! Tuned constants for every component, overridable from a JSON file.
//! Each group deserializes with `#[serde(default)]` so a preset only has to
//! name the values it changes.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::{KioskError, Result};

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct KioskConfig {
    pub input: InputTuning,
    pub animation: AnimationTuning,
    pub reveal: RevealTiming,
    pub commerce: CommerceConfig,
    pub shopkeeper: ShopkeeperConfig,
    pub audio: AudioMix,
}

impl KioskConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| KioskError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data, &path.display().to_string())
    }

    pub fn from_json(data: &str, what: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|source| KioskError::ConfigParse {
            what: what.to_string(),
            source,
        })
    }
}

/// Gesture and gamepad thresholds. Mouse and touch keep separate speed
/// floors; touch screens report slightly faster flicks for the same intent.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputTuning {
    /// Horizontal travel (px) before a drag is classified as a swipe.
    pub drag_classify_px: f32,
    /// Minimum horizontal travel (px) for a release to count as a swipe.
    pub min_swipe_distance_px: f32,
    /// Minimum mouse swipe speed in px/ms.
    pub mouse_min_swipe_speed: f32,
    /// Minimum touch swipe speed in px/ms.
    pub touch_min_swipe_speed: f32,
    /// Travel (px) under which a press/release still counts as a tap.
    pub tap_max_distance_px: f32,
    pub tap_max_duration_ms: f64,
    /// Stick deflection that fires a navigation. The stick re-arms once it
    /// falls back under it.
    pub stick_threshold: f32,
}

impl Default for InputTuning {
    fn default() -> Self {
        Self {
            drag_classify_px: 10.0,
            min_swipe_distance_px: 50.0,
            mouse_min_swipe_speed: 0.25,
            touch_min_swipe_speed: 0.3,
            tap_max_distance_px: 10.0,
            tap_max_duration_ms: 300.0,
            stick_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationTuning {
    pub selected_scale: f32,
    pub unselected_scale: f32,
    pub selected_rotation_speed: f32,
    pub unselected_rotation_speed: f32,
    /// Radians per second at a rotation-speed multiplier of 1.
    pub base_rotation_speed: f32,
    pub scroll_rate: f32,
    pub scale_rate: f32,
    pub spotlight_rate: f32,
    pub item_spacing: f32,
    pub base_height: f32,
    pub float_amplitude: f32,
    pub selected_float_speed: f32,
    pub unselected_float_speed: f32,
    pub float_phase_step: f32,
    pub spin_duration: f32,
    /// Total extra rotation (radians) one spin impulse adds.
    pub spin_angle: f32,
    pub jump_duration: f32,
    pub jump_height: f32,
    /// Spotlight offset above/in front of the selected item.
    pub spotlight_offset: [f32; 3],
    /// Radians of manual rotation per dragged pixel.
    pub drag_rotation_per_px: f32,
    /// Upper bound on a single frame delta, in seconds.
    pub max_dt: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            selected_scale: 1.5,
            unselected_scale: 1.0,
            selected_rotation_speed: 3.0,
            unselected_rotation_speed: 0.5,
            base_rotation_speed: 0.6,
            scroll_rate: 12.0,
            scale_rate: 10.0,
            spotlight_rate: 6.0,
            item_spacing: 2.2,
            base_height: 0.0,
            float_amplitude: 0.08,
            selected_float_speed: 2.4,
            unselected_float_speed: 1.2,
            float_phase_step: 0.9,
            spin_duration: 0.5,
            spin_angle: std::f32::consts::TAU,
            jump_duration: 0.25,
            jump_height: 0.45,
            spotlight_offset: [0.0, 3.0, 2.5],
            drag_rotation_per_px: 0.01,
            max_dt: 0.1,
        }
    }
}

/// Durations (seconds) of the overlay reveal sequence.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RevealTiming {
    pub collapse: f32,
    pub hold: f32,
    pub name_fade: f32,
    pub meta_stagger: f32,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            collapse: 0.2,
            hold: 0.08,
            name_fade: 0.25,
            meta_stagger: 0.09,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommerceConfig {
    pub initial_balance: f64,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100.0,
            min_quantity: 1,
            max_quantity: 9,
        }
    }
}

/// Greeting script used when a preset does not bring its own lines.
const DEFAULT_SHOPKEEPER_LINES: [&str; 3] = [
    "Welcome! Use the arrows or swipe to browse the menu.",
    "Press Enter or tap an item to add it to your order.",
    "Changed your mind? The minus key takes one back.",
];

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShopkeeperConfig {
    pub enabled: bool,
    pub first_delay: f32,
    pub interval: f32,
    pub chars_per_second: f32,
    pub hold: f32,
    pub lines: Vec<String>,
}

impl Default for ShopkeeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            first_delay: 6.0,
            interval: 25.0,
            chars_per_second: 32.0,
            hold: 3.5,
            lines: DEFAULT_SHOPKEEPER_LINES
                .iter()
                .map(|line| line.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioMix {
    pub navigate_volume: f32,
    pub reject_volume: f32,
    pub purchase_volume: f32,
    pub refund_volume: f32,
    pub music_volume: f32,
    /// Playback rate for the navigation blip; rejection plays lower.
    pub navigate_rate: f32,
    pub reject_rate: f32,
}

impl Default for AudioMix {
    fn default() -> Self {
        Self {
            navigate_volume: 0.5,
            reject_volume: 0.6,
            purchase_volume: 0.8,
            refund_volume: 0.5,
            music_volume: 0.3,
            navigate_rate: 1.0,
            reject_rate: 0.7,
        }
    }
}
