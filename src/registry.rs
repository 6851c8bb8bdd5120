//! Named voices and their lifecycle.
//!
//! A [`VoiceRegistry`] owns every voice loaded through it. The built-in
//! default voice is the exception: it is linked into the engine, so the
//! registry marks it [`Ownership::Static`] and never releases it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::engines::flite::FliteEngine;
use crate::error::{Error, Result};
use crate::SynthesisEngine;

/// Name under which the built-in voice is registered.
pub const DEFAULT_VOICE_NAME: &str = "slt";

/// Value of a named acoustic feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    String(String),
}

/// Runtime feature overrides of a voice, keyed by engine feature name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    values: BTreeMap<String, FeatureValue>,
}

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: FeatureValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over features in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Opaque reference to voice data held by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceHandle {
    locator: String,
}

impl VoiceHandle {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
        }
    }

    /// Engine-specific identifier of the voice data, e.g. `slt` or
    /// `file:///usr/share/voices/awb.flitevox`.
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

/// Who is responsible for releasing a voice's engine resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Built into the engine. Lives as long as the process and is never released.
    Static,
    /// Loaded by a registry, which releases it.
    Registry,
}

/// A loaded voice.
///
/// Voices are shared through `Arc`. The feature table lives on the voice, so
/// every [`Synthesizer`](crate::Synthesizer) bound to the same voice sees
/// feature changes made through any of them.
#[derive(Debug)]
pub struct Voice {
    name: String,
    handle: VoiceHandle,
    source_path: Option<PathBuf>,
    ownership: Ownership,
    features: Mutex<Features>,
}

impl Voice {
    fn new(
        name: &str,
        handle: VoiceHandle,
        source_path: Option<PathBuf>,
        ownership: Ownership,
    ) -> Self {
        Self {
            name: name.to_string(),
            handle,
            source_path,
            ownership,
            features: Mutex::new(Features::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &VoiceHandle {
        &self.handle
    }

    /// File the voice was loaded from. `None` for the built-in voice.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn set_feature(&self, name: &str, value: FeatureValue) {
        self.features.lock().set(name, value);
    }

    /// Snapshot of the current feature overrides.
    pub fn features(&self) -> Features {
        self.features.lock().clone()
    }
}

/// Thread-safe map from voice name to loaded [`Voice`].
///
/// Adding a voice excludes every other registry operation; lookups run
/// concurrently with each other.
pub struct VoiceRegistry {
    engine: Arc<dyn SynthesisEngine>,
    voices: RwLock<HashMap<String, Arc<Voice>>>,
    init: Once,
}

impl VoiceRegistry {
    /// Create an empty registry. The default voice is loaded by
    /// [`initialize`](Self::initialize), which every other operation calls.
    pub fn new(engine: Arc<dyn SynthesisEngine>) -> Self {
        Self {
            engine,
            voices: RwLock::new(HashMap::new()),
            init: Once::new(),
        }
    }

    /// The process-wide registry backed by the `flite` executable on `PATH`.
    pub fn global() -> Arc<VoiceRegistry> {
        static GLOBAL: OnceLock<Arc<VoiceRegistry>> = OnceLock::new();

        let registry =
            GLOBAL.get_or_init(|| Arc::new(VoiceRegistry::new(Arc::new(FliteEngine::new()))));
        registry.initialize();
        Arc::clone(registry)
    }

    pub fn engine(&self) -> &Arc<dyn SynthesisEngine> {
        &self.engine
    }

    /// Load the built-in default voice.
    ///
    /// Idempotent: the engine is asked exactly once per registry, however
    /// many threads call this at the same time. Separate registries sharing
    /// one engine each ask it once; [`global`](Self::global) is the single
    /// process-wide registry. If the engine has no default voice the
    /// registry stays without one and [`Synthesizer`](crate::Synthesizer)
    /// creation fails later with [`Error::Init`].
    pub fn initialize(&self) {
        self.init.call_once(|| match self.engine.load_default_voice() {
            Ok(handle) => {
                let voice = Voice::new(DEFAULT_VOICE_NAME, handle, None, Ownership::Static);
                self.voices
                    .write()
                    .insert(DEFAULT_VOICE_NAME.to_string(), Arc::new(voice));
                log::info!("Registered default voice '{DEFAULT_VOICE_NAME}'");
            }
            Err(e) => log::error!("Failed to load default voice '{DEFAULT_VOICE_NAME}': {e}"),
        });
    }

    /// Load the voice file at `path` and register it as `name`.
    ///
    /// Fails with [`Error::DuplicateVoice`] without touching the registry if
    /// `name` is taken. [`DEFAULT_VOICE_NAME`] is always taken, even when the
    /// built-in voice failed to load. The write lock is held across the engine load so that
    /// of several concurrent adds with the same name exactly one succeeds.
    pub fn add_voice(&self, name: &str, path: &Path) -> Result<Arc<Voice>> {
        self.initialize();

        if name == DEFAULT_VOICE_NAME {
            return Err(Error::DuplicateVoice(name.to_string()));
        }
        let mut voices = self.voices.write();
        if voices.contains_key(name) {
            return Err(Error::DuplicateVoice(name.to_string()));
        }

        let handle = self.engine.load_voice(path)?;
        let voice = Arc::new(Voice::new(
            name,
            handle,
            Some(path.to_path_buf()),
            Ownership::Registry,
        ));
        voices.insert(name.to_string(), Arc::clone(&voice));

        log::debug!("Added voice '{name}' from {}", path.display());
        Ok(voice)
    }

    pub fn get_voice(&self, name: &str) -> Result<Arc<Voice>> {
        self.initialize();

        self.voices
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::VoiceNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.initialize();
        self.voices.read().contains_key(name)
    }

    /// All registered voice names in sorted order.
    pub fn voice_names(&self) -> Vec<String> {
        self.initialize();

        let mut names: Vec<String> = self.voices.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Release every registry-owned voice and drop it from the registry.
    ///
    /// The statically owned default voice is kept. Synthesizers still bound
    /// to a released voice must not synthesize with it afterwards.
    pub fn release(&self) {
        let mut voices = self.voices.write();
        voices.retain(|name, voice| {
            if voice.ownership() == Ownership::Static {
                return true;
            }
            self.engine.release_voice(voice.handle());
            log::debug!("Released voice '{name}'");
            false
        });
    }
}
