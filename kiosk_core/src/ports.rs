//! Collaborators the session talks to but does not own: audio, particles,
//! the overlay panel, the renderer, model loading and gamepad polling.
//! Hosts implement these; the null versions here let the core run without
//! a window, a speaker or a pad.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::Serialize;
use thiserror::Error;

use crate::animation::{ItemTransform, Spotlight};
use crate::catalog::{ItemRegistry, MenuCatalog, MeshHandle};
use crate::error::{KioskError, Result};
use crate::input::GamepadSnapshot;
use crate::overlay::{OverlayContent, OverlayRevealState, OverlayView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SoundCue {
    Navigate,
    Reject,
    Purchase,
    Refund,
    Music,
}

impl SoundCue {
    pub const ALL: [SoundCue; 5] = [
        SoundCue::Navigate,
        SoundCue::Reject,
        SoundCue::Purchase,
        SoundCue::Refund,
        SoundCue::Music,
    ];

    /// File stem hosts look for when loading the cue from disk.
    pub fn file_stem(self) -> &'static str {
        match self {
            SoundCue::Navigate => "navigate",
            SoundCue::Reject => "reject",
            SoundCue::Purchase => "purchase",
            SoundCue::Refund => "refund",
            SoundCue::Music => "music",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub volume: f32,
    pub playback_rate: f32,
    pub looped: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            playback_rate: 1.0,
            looped: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio playback blocked until the next user gesture")]
    Blocked,
    #[error("no sound loaded for {0:?}")]
    UnknownSound(SoundCue),
    #[error("audio backend error: {0}")]
    Backend(String),
}

pub trait AudioPort {
    fn load_sound(&mut self, cue: SoundCue) -> std::result::Result<SoundHandle, AudioError>;

    /// Fire and forget. `Blocked` means the platform refused playback for
    /// now and the caller may retry after user input.
    fn play(&mut self, handle: SoundHandle, options: PlayOptions) -> std::result::Result<(), AudioError>;
}

pub trait ParticlePort {
    fn spawn_burst(&mut self, origin: Vec3);
}

/// The floating item panel.
pub trait OverlaySurface {
    fn render(&mut self, item_key: &str, view: &OverlayView);

    /// Height the panel needs with every row of `content` visible.
    fn measure_revealed_height(&mut self, content: &OverlayContent) -> f32;

    /// Returns `true` once when the expand transition has finished.
    fn poll_transition_end(&mut self) -> bool {
        false
    }

    fn show_balance(&mut self, _balance: f64) {}

    /// `None` hides the shopkeeper bubble.
    fn show_shopkeeper(&mut self, _text: Option<&str>) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameItem {
    pub mesh: MeshHandle,
    pub transform: ItemTransform,
    pub selected: bool,
}

/// What the renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub items: Vec<FrameItem>,
    pub spotlight: Spotlight,
    pub clock: f64,
}

pub trait Renderer {
    fn render(&mut self, frame: &FrameSnapshot);
    fn resize(&mut self, width: u32, height: u32);
}

pub trait AssetProvider {
    /// Loads the item models. `on_progress` receives values in `[0, 1]`.
    /// Every mesh in the returned registry has a usable appearance.
    fn load_model(
        &mut self,
        path: Option<&Path>,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<ItemRegistry>;
}

pub trait GamepadSource {
    /// One entry per slot; `None` for disconnected slots.
    fn poll(&mut self) -> Vec<Option<GamepadSnapshot>>;
}

/// Borrowed collaborators handed to the session for one call.
pub struct Ports<'a> {
    pub audio: &'a mut dyn AudioPort,
    pub particles: &'a mut dyn ParticlePort,
    pub overlay: &'a mut dyn OverlaySurface,
    pub gamepads: &'a mut dyn GamepadSource,
}

/// Builds item meshes from a menu file, or from the built-in menu when no
/// path is given. Keeps the parsed menu so callers can read item details.
#[derive(Debug, Clone, Default)]
pub struct MenuAssets {
    catalog: MenuCatalog,
}

impl MenuAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &MenuCatalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> MenuCatalog {
        self.catalog
    }
}

impl AssetProvider for MenuAssets {
    fn load_model(
        &mut self,
        path: Option<&Path>,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<ItemRegistry> {
        if let Some(path) = path {
            let what = path.display().to_string();
            let data = fs::read_to_string(path).map_err(|err| KioskError::AssetLoad {
                what: what.clone(),
                reason: err.to_string(),
            })?;
            self.catalog = MenuCatalog::from_json(&data, &what).map_err(|err| KioskError::AssetLoad {
                what: what.clone(),
                reason: err.to_string(),
            })?;
        }
        on_progress(0.0);
        let total = self.catalog.appearances().len().max(1) as f32;
        let mut registry = ItemRegistry::new();
        for (loaded, (key, appearance)) in self.catalog.appearances().iter().enumerate() {
            registry.insert(key, Some(*appearance))?;
            on_progress((loaded + 1) as f32 / total);
        }
        if registry.is_empty() {
            return Err(KioskError::EmptyCatalog);
        }
        on_progress(1.0);
        Ok(registry)
    }
}

/// Audio port for hosts without sound. Every cue loads; playback only logs.
#[derive(Debug, Default)]
pub struct SilentAudio {
    loaded: Vec<SoundCue>,
}

impl AudioPort for SilentAudio {
    fn load_sound(&mut self, cue: SoundCue) -> std::result::Result<SoundHandle, AudioError> {
        self.loaded.push(cue);
        Ok(SoundHandle(self.loaded.len() as u32 - 1))
    }

    fn play(&mut self, handle: SoundHandle, options: PlayOptions) -> std::result::Result<(), AudioError> {
        let cue = self
            .loaded
            .get(handle.0 as usize)
            .copied()
            .ok_or(AudioError::Backend(format!("unknown handle {}", handle.0)))?;
        log::debug!("(silent) play {:?} at volume {:.2}", cue, options.volume);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NoParticles;

impl ParticlePort for NoParticles {
    fn spawn_burst(&mut self, origin: Vec3) {
        log::debug!("(no particles) burst at {origin}");
    }
}

#[derive(Debug, Default)]
pub struct NoGamepad;

impl GamepadSource for NoGamepad {
    fn poll(&mut self) -> Vec<Option<GamepadSnapshot>> {
        Vec::new()
    }
}

const HEADLESS_ROW_HEIGHT: f32 = 18.0;
const HEADLESS_TITLE_HEIGHT: f32 = 28.0;

/// Overlay that keeps the latest view in memory and finishes every expand
/// instantly.
#[derive(Debug, Default)]
pub struct HeadlessOverlay {
    last: Option<(String, OverlayView)>,
    expand_pending: bool,
    balance: Option<f64>,
    shopkeeper: Option<String>,
}

impl HeadlessOverlay {
    pub fn last_view(&self) -> Option<&OverlayView> {
        self.last.as_ref().map(|(_, view)| view)
    }

    pub fn last_key(&self) -> Option<&str> {
        self.last.as_ref().map(|(key, _)| key.as_str())
    }

    pub fn balance(&self) -> Option<f64> {
        self.balance
    }

    pub fn shopkeeper(&self) -> Option<&str> {
        self.shopkeeper.as_deref()
    }
}

impl OverlaySurface for HeadlessOverlay {
    fn render(&mut self, item_key: &str, view: &OverlayView) {
        let expanding = view.phase == OverlayRevealState::Expanding;
        let was_expanding = self
            .last
            .as_ref()
            .is_some_and(|(_, last)| last.phase == OverlayRevealState::Expanding);
        if expanding && !was_expanding {
            self.expand_pending = true;
        }
        self.last = Some((item_key.to_string(), view.clone()));
    }

    fn measure_revealed_height(&mut self, content: &OverlayContent) -> f32 {
        HEADLESS_TITLE_HEIGHT + HEADLESS_ROW_HEIGHT * content.reveal_order().len() as f32
    }

    fn poll_transition_end(&mut self) -> bool {
        std::mem::take(&mut self.expand_pending)
    }

    fn show_balance(&mut self, balance: f64) {
        self.balance = Some(balance);
    }

    fn show_shopkeeper(&mut self, text: Option<&str>) {
        self.shopkeeper = text.map(str::to_string);
    }
}

/// Owns one of each null collaborator.
#[derive(Debug, Default)]
pub struct NullPorts {
    pub audio: SilentAudio,
    pub particles: NoParticles,
    pub overlay: HeadlessOverlay,
    pub gamepads: NoGamepad,
}

impl NullPorts {
    pub fn ports(&mut self) -> Ports<'_> {
        Ports {
            audio: &mut self.audio,
            particles: &mut self.particles,
            overlay: &mut self.overlay,
            gamepads: &mut self.gamepads,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builtin_menu_loads_every_item_with_progress() {
        let mut assets = MenuAssets::new();
        let mut progress = Vec::new();
        let registry = assets
            .load_model(None, &mut |value| progress.push(value))
            .expect("builtin menu");
        assert_eq!(registry.len(), 9);
        assert_eq!(progress.first().copied(), Some(0.0));
        assert_eq!(progress.last().copied(), Some(1.0));
        assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn menu_file_replaces_builtin_items() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{ "items": [
                {{ "key": "soup", "display_name": "Soup", "price": 4.0, "calories": 200,
                   "appearance": {{ "primitive": "cylinder", "color": [0.9, 0.6, 0.2] }} }}
            ] }}"#
        )
        .expect("write menu");
        let mut assets = MenuAssets::new();
        let registry = assets
            .load_model(Some(file.path()), &mut |_| {})
            .expect("menu file");
        assert_eq!(registry.len(), 1);
        assert!(registry.get("soup").is_some());
        assert_eq!(assets.catalog().details_by_key("soup").price, 4.0);
    }

    #[test]
    fn unreadable_menu_is_an_asset_failure() {
        let mut assets = MenuAssets::new();
        let err = assets
            .load_model(Some(Path::new("/definitely/not/here.json")), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, KioskError::AssetLoad { .. }));
        assert!(err.to_string().starts_with("unable to open"));
    }

    #[test]
    fn headless_overlay_reports_expand_once() {
        let mut overlay = HeadlessOverlay::default();
        let mut view = OverlayView {
            phase: OverlayRevealState::Expanding,
            ..OverlayView::default()
        };
        overlay.render("burger", &view);
        overlay.render("burger", &view);
        assert!(overlay.poll_transition_end());
        assert!(!overlay.poll_transition_end());
        view.phase = OverlayRevealState::NameVisible;
        overlay.render("burger", &view);
        assert!(!overlay.poll_transition_end());
    }

    #[test]
    fn silent_audio_rejects_unknown_handles() {
        let mut audio = SilentAudio::default();
        let handle = audio.load_sound(SoundCue::Navigate).expect("load");
        assert!(audio.play(handle, PlayOptions::default()).is_ok());
        assert!(matches!(
            audio.play(SoundHandle(42), PlayOptions::default()),
            Err(AudioError::Backend(_))
        ));
    }
}
