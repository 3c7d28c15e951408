//! Sound cues for the windowed viewer. With the `audio` feature the cues are
//! decoded from `--audio-dir` and played through rodio; without it every cue
//! is logged so the console still shows what would have played.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use kiosk_core::ports::{AudioError, AudioPort, PlayOptions, SoundCue, SoundHandle};
#[cfg(feature = "audio")]
use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};

const EXTENSIONS: [&str; 2] = ["ogg", "wav"];

/// Locates `<dir>/<stem>.ogg` or `<dir>/<stem>.wav` for a cue.
pub fn cue_path(dir: &Path, cue: SoundCue) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{ext}", cue.file_stem())))
        .find(|path| path.is_file())
}

struct LoadedClip {
    cue: SoundCue,
    bytes: Arc<[u8]>,
}

fn read_clip(dir: Option<&Path>, cue: SoundCue) -> std::result::Result<LoadedClip, AudioError> {
    let Some(dir) = dir else {
        return Ok(LoadedClip {
            cue,
            bytes: Arc::from(Vec::new().into_boxed_slice()),
        });
    };
    let path = cue_path(dir, cue).ok_or(AudioError::UnknownSound(cue))?;
    let bytes = fs::read(&path)
        .map_err(|err| AudioError::Backend(format!("reading {}: {err}", path.display())))?;
    Ok(LoadedClip {
        cue,
        bytes: Arc::from(bytes.into_boxed_slice()),
    })
}

/// Logs cues instead of playing them.
pub struct LoggingAudio {
    dir: Option<PathBuf>,
    clips: Vec<LoadedClip>,
}

impl LoggingAudio {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            clips: Vec::new(),
        }
    }
}

impl AudioPort for LoggingAudio {
    fn load_sound(&mut self, cue: SoundCue) -> std::result::Result<SoundHandle, AudioError> {
        let clip = read_clip(self.dir.as_deref(), cue)?;
        self.clips.push(clip);
        Ok(SoundHandle(self.clips.len() as u32 - 1))
    }

    fn play(&mut self, handle: SoundHandle, options: PlayOptions) -> std::result::Result<(), AudioError> {
        let clip = self
            .clips
            .get(handle.0 as usize)
            .ok_or_else(|| AudioError::Backend(format!("unknown handle {}", handle.0)))?;
        log::info!(
            "[audio] {:?} volume={:.2} rate={:.2}{} ({} bytes)",
            clip.cue,
            options.volume,
            options.playback_rate,
            if options.looped { " looped" } else { "" },
            clip.bytes.len()
        );
        Ok(())
    }
}

/// Plays decoded clips through the default output device. The device is
/// opened on first use; while it cannot be opened playback reports
/// `Blocked` so the session retries after the next input.
#[cfg(feature = "audio")]
pub struct RodioAudio {
    dir: Option<PathBuf>,
    clips: Vec<LoadedClip>,
    output: Option<(OutputStream, OutputStreamHandle)>,
}

#[cfg(feature = "audio")]
impl RodioAudio {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            clips: Vec::new(),
            output: None,
        }
    }

    fn output(&mut self) -> std::result::Result<&OutputStreamHandle, AudioError> {
        if self.output.is_none() {
            match OutputStream::try_default() {
                Ok(pair) => self.output = Some(pair),
                Err(err) => {
                    log::warn!("[audio] output device unavailable: {err}");
                    return Err(AudioError::Blocked);
                }
            }
        }
        self.output
            .as_ref()
            .map(|(_, handle)| handle)
            .ok_or(AudioError::Blocked)
    }
}

#[cfg(feature = "audio")]
impl AudioPort for RodioAudio {
    fn load_sound(&mut self, cue: SoundCue) -> std::result::Result<SoundHandle, AudioError> {
        if self.dir.is_none() {
            return Err(AudioError::UnknownSound(cue));
        }
        let clip = read_clip(self.dir.as_deref(), cue)?;
        self.clips.push(clip);
        Ok(SoundHandle(self.clips.len() as u32 - 1))
    }

    fn play(&mut self, handle: SoundHandle, options: PlayOptions) -> std::result::Result<(), AudioError> {
        let bytes = self
            .clips
            .get(handle.0 as usize)
            .map(|clip| Arc::clone(&clip.bytes))
            .ok_or_else(|| AudioError::Backend(format!("unknown handle {}", handle.0)))?;
        let decoder = Decoder::new(std::io::Cursor::new(bytes))
            .map_err(|err| AudioError::Backend(err.to_string()))?;
        let source = decoder
            .speed(options.playback_rate.max(0.05))
            .amplify(options.volume.clamp(0.0, 1.0));
        let output = self.output()?;
        let played = if options.looped {
            output.play_raw(source.repeat_infinite().convert_samples())
        } else {
            output.play_raw(source.convert_samples())
        };
        played.map_err(|err| AudioError::Backend(err.to_string()))
    }
}

/// Picks the audio backend for the window.
pub fn init_audio(dir: Option<&Path>) -> Result<Box<dyn AudioPort>> {
    let dir = dir.map(Path::to_path_buf);
    if let Some(dir) = dir.as_ref() {
        anyhow::ensure!(dir.is_dir(), "audio dir {} is not a directory", dir.display());
    }
    #[cfg(feature = "audio")]
    {
        if dir.is_some() {
            println!("[kiosk_viewer] audio cues via rodio");
            return Ok(Box::new(RodioAudio::new(dir)));
        }
    }
    println!("[kiosk_viewer] audio cues logged only");
    Ok(Box::new(LoggingAudio::new(dir)))
}
