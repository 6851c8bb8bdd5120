//! Speech synthesis engines.
//!
//! This module contains implementations of [`SynthesisEngine`](crate::SynthesisEngine).
//!
//! # Available Engines
//!
//! - `flite` - CMU Flite, driven through the `flite` executable

pub mod flite;
