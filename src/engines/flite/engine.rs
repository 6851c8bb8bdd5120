use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::registry::{Features, VoiceHandle, DEFAULT_VOICE_NAME};
use crate::{SynthesisEngine, SynthesisResult};

use super::command::{parse_voice_list, run_flite, synthesis_args};

/// Leading bytes of every clustergen voice file.
const FLITEVOX_MAGIC: &[u8] = b"CMU_FLITE_CG_VOXDATA";

/// Flite text-to-speech engine.
///
/// # Quick Start
///
/// ```rust,no_run
/// use flite_say::{engines::flite::FliteEngine, SynthesisEngine};
/// use flite_say::registry::Features;
///
/// // Uses flite from PATH
/// let engine = FliteEngine::new();
/// let slt = engine.load_default_voice()?;
/// let result = engine.synthesize("Hello, world!", &slt, &Features::new())?;
/// # Ok::<(), flite_say::Error>(())
/// ```
///
/// # Bundled flite
///
/// ```rust,no_run
/// use flite_say::engines::flite::FliteEngine;
/// use std::path::PathBuf;
///
/// let engine = FliteEngine::with_binary(PathBuf::from("/app/resources/flite/bin/flite"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FliteEngine {
    bin_path: Option<PathBuf>,
}

impl FliteEngine {
    /// Create an engine that runs `flite` from PATH.
    pub fn new() -> Self {
        Self { bin_path: None }
    }

    /// Create an engine that runs the flite executable at `bin_path`.
    pub fn with_binary(bin_path: PathBuf) -> Self {
        Self {
            bin_path: Some(bin_path),
        }
    }

    fn program(&self) -> &OsStr {
        self.bin_path
            .as_deref()
            .map(Path::as_os_str)
            .unwrap_or_else(|| OsStr::new("flite"))
    }

    /// Names of the voices compiled into the executable.
    pub fn builtin_voices(&self) -> Result<Vec<String>> {
        let output = run_flite(self.program(), ["-lv"])?;
        // Some builds print the list on stderr.
        let listing = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        Ok(parse_voice_list(&String::from_utf8_lossy(listing)))
    }
}

impl SynthesisEngine for FliteEngine {
    fn load_default_voice(&self) -> Result<VoiceHandle> {
        let voices = self.builtin_voices()?;
        log::debug!("flite built-in voices: {voices:?}");

        if voices.iter().any(|v| v == DEFAULT_VOICE_NAME) {
            Ok(VoiceHandle::new(DEFAULT_VOICE_NAME))
        } else {
            Err(Error::Init(DEFAULT_VOICE_NAME.to_string()))
        }
    }

    fn load_voice(&self, path: &Path) -> Result<VoiceHandle> {
        let load_error = |reason: String| Error::Load {
            path: path.to_path_buf(),
            reason,
        };

        let absolute = std::fs::canonicalize(path).map_err(|e| load_error(e.to_string()))?;
        if !absolute.is_file() {
            return Err(load_error("not a regular file".to_string()));
        }

        let mut magic = [0u8; FLITEVOX_MAGIC.len()];
        File::open(&absolute)
            .and_then(|mut f| f.read_exact(&mut magic))
            .map_err(|e| load_error(e.to_string()))?;
        if magic != FLITEVOX_MAGIC {
            return Err(load_error("not a flitevox voice file".to_string()));
        }

        Ok(VoiceHandle::new(format!("file://{}", absolute.display())))
    }

    fn release_voice(&self, handle: &VoiceHandle) {
        // Each flite process loads its voice afresh; nothing stays resident.
        log::debug!("Released {}", handle.locator());
    }

    fn synthesize(
        &self,
        text: &str,
        voice: &VoiceHandle,
        features: &Features,
    ) -> Result<Option<SynthesisResult>> {
        let wav_file = tempfile::Builder::new()
            .prefix("flite-")
            .suffix(".wav")
            .tempfile()?;

        let args = synthesis_args(voice.locator(), features, text, wav_file.path());
        let output = run_flite(self.program(), &args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "flite exited with code {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
            return Ok(None);
        }

        let reader = match hound::WavReader::open(wav_file.path()) {
            Ok(reader) => reader,
            Err(e) => {
                log::warn!("flite produced no readable waveform: {e}");
                return Ok(None);
            }
        };

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            log::warn!(
                "flite produced {} bit {:?} audio, expected 16 bit PCM",
                spec.bits_per_sample,
                spec.sample_format
            );
            return Ok(None);
        }

        let samples = match reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>() {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("flite waveform is truncated: {e}");
                return Ok(None);
            }
        };

        Ok(Some(SynthesisResult {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::FliteEngine;
    use crate::error::Error;
    use crate::registry::{FeatureValue, Features};
    use crate::testing::voice_file;
    use crate::SynthesisEngine;
    use std::process::Command;

    fn flite_available() -> bool {
        Command::new("flite").arg("--version").output().is_ok()
    }

    #[test]
    fn loads_voice_file_as_absolute_locator() {
        let dir = tempfile::tempdir().unwrap();
        let path = voice_file(dir.path(), "awb");

        let handle = FliteEngine::new().load_voice(&path).unwrap();
        let expected = std::fs::canonicalize(&path).unwrap();
        assert_eq!(handle.locator(), format!("file://{}", expected.display()));
    }

    #[test]
    fn missing_voice_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FliteEngine::new()
            .load_voice(&dir.path().join("nope.flitevox"))
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn corrupt_voice_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.flitevox");
        std::fs::write(&path, b"definitely not a voice").unwrap();

        let err = FliteEngine::new().load_voice(&path).unwrap_err();
        assert!(matches!(err, Error::Load { ref reason, .. } if reason.contains("flitevox")));
    }

    #[test]
    fn directory_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FliteEngine::new().load_voice(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn missing_binary_is_reported() {
        let engine = FliteEngine::with_binary("/nonexistent/bin/flite".into());
        assert!(matches!(
            engine.load_default_voice(),
            Err(Error::EngineNotFound)
        ));
    }

    #[test]
    fn synthesizes_hello_world_with_default_voice() {
        // Skip when flite is unavailable in the execution environment.
        if !flite_available() {
            return;
        }

        let engine = FliteEngine::new();
        let slt = engine.load_default_voice().expect("flite should ship slt");

        let mut features = Features::new();
        features.set("duration_stretch", FeatureValue::Float(1.0));
        let result = engine
            .synthesize("Hello World", &slt, &features)
            .expect("flite should run")
            .expect("flite should produce audio");

        assert!(!result.samples.is_empty());
        assert!(result.sample_rate > 0);
        assert_eq!(result.channels, 1);
    }
}
