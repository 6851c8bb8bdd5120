//! # flite-say
//!
//! A Rust library for speech synthesis with the CMU Flite engine.
//!
//! ## Features
//!
//! - **Voice Registry**: Thread-safe registry of named voices, built-in or
//!   loaded from `.flitevox` files
//! - **Synthesizer**: Binds a voice plus prosody features and turns text
//!   into a PCM [`Waveform`]
//! - **WAV Streaming**: Encode a waveform eagerly into a buffer, or read it
//!   lazily as a WAV byte stream produced on a background thread
//! - **Playback**: Speak through the default audio device (`playback` feature)
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! flite-say = { version = "2026.10", features = ["playback"] }
//! ```
//!
//! ```ignore
//! use flite_say::{add_voice, RodioOutput, Synthesizer};
//! use std::path::Path;
//!
//! add_voice("awb", Path::new("/usr/share/flite/cmu_us_awb.flitevox"))?;
//!
//! let mut synth = Synthesizer::new()?;
//! synth.set_voice("awb")?;
//! synth.set_float_feature("duration_stretch", 1.1);
//! synth.say("Hello, world!", &RodioOutput::new())?;
//!
//! let wave = synth.synthesize("Saved for later.")?;
//! wave.write_wav(Path::new("output.wav"))?;
//! # Ok::<(), flite_say::Error>(())
//! ```

pub mod discovery;
pub mod engines;
pub mod error;
pub mod playback;
pub mod registry;
pub mod stream;
pub mod synthesizer;
pub mod waveform;

#[cfg(test)]
mod testing;

use std::path::Path;
use std::sync::Arc;

pub use error::{Error, Result};
pub use playback::AudioOutput;
#[cfg(feature = "playback")]
pub use playback::RodioOutput;
pub use registry::{Voice, VoiceRegistry, DEFAULT_VOICE_NAME};
pub use stream::WaveStream;
pub use synthesizer::{Synthesizer, VoiceSettings};
pub use waveform::Waveform;

use registry::{Features, VoiceHandle};

/// Raw output of a synthesis engine.
///
/// Contains interleaved signed 16-bit samples. The synthesizer copies it
/// into a [`Waveform`].
#[derive(Debug)]
pub struct SynthesisResult {
    /// Interleaved samples
    pub samples: Vec<i16>,
    /// Sample rate in Hz (16000 for most flite voices)
    pub sample_rate: u32,
    pub channels: u16,
}

/// Common interface for speech synthesis engines.
///
/// Voice data lives inside the engine and is referred to by [`VoiceHandle`].
/// Engines are shared between threads, so every method takes `&self`.
pub trait SynthesisEngine: Send + Sync {
    /// Load the voice built into the engine.
    fn load_default_voice(&self) -> Result<VoiceHandle>;

    /// Load a voice from a file.
    fn load_voice(&self, path: &Path) -> Result<VoiceHandle>;

    /// Free the engine resources behind `handle`.
    ///
    /// Never called for the default voice.
    fn release_voice(&self, _handle: &VoiceHandle) {}

    /// Synthesize `text` with `voice` and the given feature overrides.
    ///
    /// Returns `Ok(None)` when the engine produced no waveform.
    fn synthesize(
        &self,
        text: &str,
        voice: &VoiceHandle,
        features: &Features,
    ) -> Result<Option<SynthesisResult>>;
}

/// Register a voice file with the process-wide registry.
///
/// Prefer absolute paths. The built-in `slt` voice is always available.
pub fn add_voice(name: &str, path: &Path) -> Result<Arc<Voice>> {
    VoiceRegistry::global().add_voice(name, path)
}
