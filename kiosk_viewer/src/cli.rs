use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_core::KioskConfig;

#[derive(Parser, Debug)]
#[command(about = "Food kiosk carousel: wgpu window, rodio cues, scripted headless mode", version)]
pub struct Args {
    /// Tuning preset JSON (input thresholds, animation rates, reveal timing, wallet, shopkeeper)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Menu JSON with item keys, prices, calories and appearances; built-in menu when omitted
    #[arg(long)]
    pub menu: Option<PathBuf>,

    /// TTF/OTF font used for the item panel; without one the panel text is logged instead
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Directory holding navigate/reject/purchase/refund/music .ogg or .wav files
    #[arg(long)]
    pub audio_dir: Option<PathBuf>,

    /// Skip creating a winit window/event loop and run the scripted session instead
    #[arg(long)]
    pub headless: bool,

    /// Seconds of simulated time for the headless script
    #[arg(long, default_value_t = 4.0)]
    pub headless_seconds: f32,

    /// When set, write the headless session events as a JSON array
    #[arg(long)]
    pub event_log: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

pub fn load_config(path: Option<&Path>) -> Result<KioskConfig> {
    let Some(path) = path else {
        return Ok(KioskConfig::default());
    };
    let config = KioskConfig::load(path)
        .with_context(|| format!("loading kiosk config {}", path.display()))?;
    println!("[kiosk_viewer] config loaded from {}", path.display());
    Ok(config)
}

/// Reads the overlay font. A missing or unreadable font is not fatal; the
/// panel falls back to logging its lines.
pub fn load_font_bytes(path: Option<&Path>) -> Option<Vec<u8>> {
    let path = path?;
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            eprintln!(
                "[kiosk_viewer] overlay font {} unavailable ({err}); panel text disabled",
                path.display()
            );
            None
        }
    }
}
