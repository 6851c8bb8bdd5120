//! In-process engine used by unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::registry::{FeatureValue, Features, VoiceHandle};
use crate::{SynthesisEngine, SynthesisResult};

pub const FAKE_SAMPLE_RATE: u32 = 8000;

/// Produces 100 samples per character of text, scaled by the
/// `duration_stretch` feature. Empty text yields no waveform.
pub struct FakeEngine {
    has_default: bool,
    fail_synthesis: AtomicBool,
    default_loads: AtomicUsize,
    voice_loads: AtomicUsize,
    released: Mutex<Vec<String>>,
    seen: Mutex<Vec<(String, Features)>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            has_default: true,
            fail_synthesis: AtomicBool::new(false),
            default_loads: AtomicUsize::new(0),
            voice_loads: AtomicUsize::new(0),
            released: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn without_default_voice() -> Self {
        Self {
            has_default: false,
            ..Self::new()
        }
    }

    pub fn fail_synthesis(&self, fail: bool) {
        self.fail_synthesis.store(fail, Ordering::SeqCst);
    }

    pub fn default_loads(&self) -> usize {
        self.default_loads.load(Ordering::SeqCst)
    }

    pub fn voice_loads(&self) -> usize {
        self.voice_loads.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().clone()
    }

    /// Voice locator and features of the most recent synthesis call.
    pub fn last_call(&self) -> Option<(String, Features)> {
        self.seen.lock().last().cloned()
    }
}

impl SynthesisEngine for FakeEngine {
    fn load_default_voice(&self) -> Result<VoiceHandle> {
        self.default_loads.fetch_add(1, Ordering::SeqCst);
        if self.has_default {
            Ok(VoiceHandle::new("slt"))
        } else {
            Err(Error::EngineNotFound)
        }
    }

    fn load_voice(&self, path: &Path) -> Result<VoiceHandle> {
        self.voice_loads.fetch_add(1, Ordering::SeqCst);
        if !path.is_file() {
            return Err(Error::Load {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }
        Ok(VoiceHandle::new(format!("file://{}", path.display())))
    }

    fn release_voice(&self, handle: &VoiceHandle) {
        self.released.lock().push(handle.locator().to_string());
    }

    fn synthesize(
        &self,
        text: &str,
        voice: &VoiceHandle,
        features: &Features,
    ) -> Result<Option<SynthesisResult>> {
        self.seen
            .lock()
            .push((voice.locator().to_string(), features.clone()));

        if text.is_empty() || self.fail_synthesis.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let stretch = match features.get("duration_stretch") {
            Some(FeatureValue::Float(f)) => *f,
            _ => 1.0,
        };
        let len = (text.chars().count() as f64 * 100.0 * stretch) as usize;
        let samples = (0..len).map(|i| (i as i16).wrapping_mul(31)).collect();

        Ok(Some(SynthesisResult {
            samples,
            sample_rate: FAKE_SAMPLE_RATE,
            channels: 1,
        }))
    }
}

/// Create an empty `<name>.flitevox` file in `dir`.
pub fn voice_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(format!("{name}.flitevox"));
    std::fs::write(&path, b"CMU_FLITE_CG_VOXDATA-v2.0").unwrap();
    path
}
