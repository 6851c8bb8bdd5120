//! CMU Flite speech synthesis engine.
//!
//! The engine runs the `flite` executable once per synthesis request and
//! decodes the WAV file it writes. Voices are either built into the
//! executable (the default `slt` voice) or loaded from `.flitevox` files.
//!
//! # System Requirements
//!
//! **flite** must be installed on your system:
//! - **Linux**: `sudo apt-get install flite`
//! - **macOS**: `brew install flite`
//!
//! # Voice Files
//!
//! Clustergen voices are distributed as `.flitevox` files, e.g.
//! `cmu_us_awb.flitevox`. They are passed to flite as `file://` locators, so
//! the engine resolves every voice path to an absolute path when it is
//! loaded.
//!
//! # Features
//!
//! Feature overrides are forwarded as `--seti`, `--setf` and `--sets`
//! options. Useful ones:
//!
//! | Feature | Type | Effect |
//! |---|---|---|
//! | `int_f0_target_mean` | int | Pitch mean in Hz |
//! | `int_f0_target_stddev` | int | Pitch variation |
//! | `duration_stretch` | float | Speaking rate; above 1.0 is slower |
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flite_say::{engines::flite::FliteEngine, Synthesizer, VoiceRegistry};
//!
//! let registry = Arc::new(VoiceRegistry::new(Arc::new(FliteEngine::new())));
//! let synth = Synthesizer::with_registry(registry)?;
//! synth.set_float_feature("duration_stretch", 1.2);
//!
//! let wave = synth.synthesize("Hello, world!")?;
//! println!("{:.2?} at {}Hz", wave.duration(), wave.sample_rate());
//! # Ok::<(), flite_say::Error>(())
//! ```

pub mod command;
pub mod engine;

pub use engine::FliteEngine;
