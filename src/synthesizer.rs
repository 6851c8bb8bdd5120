use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::playback::AudioOutput;
use crate::registry::{FeatureValue, Voice, VoiceRegistry, DEFAULT_VOICE_NAME};
use crate::stream::WaveStream;
use crate::waveform::Waveform;

pub const DEFAULT_STREAM_NAME: &str = "Flite Voice Synthesizer";

/// Pause after playback drains before [`Synthesizer::say`] returns.
pub const DEFAULT_POST_FINISH_DELAY: Duration = Duration::from_millis(150);

/// Mean of the pitch (F0) target in Hz.
pub const FEATURE_TARGET_MEAN: &str = "int_f0_target_mean";
/// Standard deviation of the pitch target.
pub const FEATURE_TARGET_STDDEV: &str = "int_f0_target_stddev";
/// Multiplier on phone durations; above 1.0 speaks slower.
pub const FEATURE_DURATION_STRETCH: &str = "duration_stretch";

/// Prosody settings applied to a synthesizer's voice.
///
/// Can be loaded from JSON, where every field is optional:
///
/// ```json
/// { "target_mean": 120, "duration_stretch": 1.2, "post_finish_delay_ms": 300 }
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct VoiceSettings {
    /// Pitch target mean (default 160).
    pub target_mean: i64,
    /// Pitch target standard deviation (default 25).
    pub target_stddev: i64,
    /// Speech duration multiplier (default 1.0).
    pub duration_stretch: f64,
    /// Delay after playback finishes (default 150 ms).
    #[serde(rename = "post_finish_delay_ms", with = "millis")]
    pub post_finish_delay: Duration,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            target_mean: 160,
            target_stddev: 25,
            duration_stretch: 1.0,
            post_finish_delay: DEFAULT_POST_FINISH_DELAY,
        }
    }
}

impl VoiceSettings {
    pub fn builder() -> VoiceSettingsBuilder {
        VoiceSettingsBuilder::default()
    }

    /// Load settings from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Turns text into speech with one bound voice.
///
/// A synthesizer is meant for sequential use. Feature setters write to the
/// bound [`Voice`], which is shared: other synthesizers bound to the same
/// voice observe the change.
pub struct Synthesizer {
    registry: Arc<VoiceRegistry>,
    voice: Arc<Voice>,
    stream_name: String,
    post_finish_delay: Duration,
}

impl Synthesizer {
    /// Create a synthesizer on the process-wide registry, bound to the
    /// default voice.
    pub fn new() -> Result<Self> {
        Self::with_registry(VoiceRegistry::global())
    }

    /// Create a synthesizer bound to the default voice of `registry`.
    ///
    /// Fails with [`Error::Init`] when the registry has no default voice.
    pub fn with_registry(registry: Arc<VoiceRegistry>) -> Result<Self> {
        let voice = registry
            .get_voice(DEFAULT_VOICE_NAME)
            .map_err(|_| Error::Init(DEFAULT_VOICE_NAME.to_string()))?;

        Ok(Self {
            registry,
            voice,
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            post_finish_delay: Duration::ZERO,
        })
    }

    pub fn voice(&self) -> &Arc<Voice> {
        &self.voice
    }

    pub fn voice_name(&self) -> &str {
        self.voice.name()
    }

    /// Bind the voice registered as `name`. On failure the current voice
    /// stays bound.
    pub fn set_voice(&mut self, name: &str) -> Result<()> {
        self.voice = self.registry.get_voice(name)?;
        Ok(())
    }

    pub fn set_int_feature(&self, name: &str, value: i64) {
        self.voice.set_feature(name, FeatureValue::Int(value));
    }

    pub fn set_float_feature(&self, name: &str, value: f64) {
        self.voice.set_feature(name, FeatureValue::Float(value));
    }

    pub fn set_string_feature(&self, name: &str, value: &str) {
        self.voice
            .set_feature(name, FeatureValue::String(value.to_string()));
    }

    /// Write the prosody features to the bound voice and take over the
    /// post-finish delay.
    pub fn apply_settings(&mut self, settings: &VoiceSettings) {
        self.set_int_feature(FEATURE_TARGET_MEAN, settings.target_mean);
        self.set_int_feature(FEATURE_TARGET_STDDEV, settings.target_stddev);
        self.set_float_feature(FEATURE_DURATION_STRETCH, settings.duration_stretch);
        self.post_finish_delay = settings.post_finish_delay;
    }

    pub fn post_finish_delay(&self) -> Duration {
        self.post_finish_delay
    }

    pub fn set_post_finish_delay(&mut self, delay: Duration) {
        self.post_finish_delay = delay;
    }

    /// Display name handed to the [`AudioOutput`] by [`say`](Self::say).
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn set_stream_name(&mut self, name: impl Into<String>) {
        self.stream_name = name.into();
    }

    /// Synthesize `text` with the bound voice and its current features.
    pub fn synthesize(&self, text: &str) -> Result<Waveform> {
        let features = self.voice.features();
        log::debug!("voice '{}': {features:?}", self.voice.name());

        let result = self
            .registry
            .engine()
            .synthesize(text, self.voice.handle(), &features)?
            .ok_or_else(|| self.synthesis_error("engine produced no waveform".to_string()))?;

        let sample_rate = u16::try_from(result.sample_rate).map_err(|_| {
            self.synthesis_error(format!("unsupported sample rate {}", result.sample_rate))
        })?;

        let wave = Waveform::new(sample_rate, result.channels, result.samples);
        log::debug!(
            "Synthesized {:.2?} of audio at {}Hz",
            wave.duration(),
            wave.sample_rate()
        );
        Ok(wave)
    }

    /// Synthesize `text` and return it as a WAV byte stream.
    pub fn stream(&self, text: &str) -> Result<WaveStream> {
        self.synthesize(text).map(WaveStream::new)
    }

    /// Synthesize `text` and play it on `output`.
    ///
    /// Blocks until playback has finished and the post-finish delay has
    /// passed. Cannot be cancelled once started.
    pub fn say(&self, text: &str, output: &dyn AudioOutput) -> Result<()> {
        let stream = self.stream(text)?;

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        output.play(
            &self.stream_name,
            stream,
            Box::new(move || {
                let _ = done_tx.send(());
            }),
        )?;

        done_rx.recv().map_err(|_| {
            Error::Playback("output stopped without finishing playback".to_string())
        })?;

        if !self.post_finish_delay.is_zero() {
            thread::sleep(self.post_finish_delay);
        }
        Ok(())
    }

    fn synthesis_error(&self, reason: String) -> Error {
        Error::Synthesis {
            voice: self.voice.name().to_string(),
            reason,
        }
    }
}
