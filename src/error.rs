use std::path::PathBuf;

/// Errors produced by the voice registry, the synthesizer and the engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No such voice '{0}'")]
    VoiceNotFound(String),
    #[error("Voice '{0}' is already registered")]
    DuplicateVoice(String),
    #[error("Voice file {path} could not be loaded: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("Default voice '{0}' is unavailable. The flite installation looks broken.")]
    Init(String),
    #[error("Speech synthesis failed with voice '{voice}': {reason}")]
    Synthesis { voice: String, reason: String },
    #[error("Failed to write audio: {0}")]
    Write(#[source] std::io::Error),
    #[error("Invalid voice settings: {0}")]
    Config(String),
    #[error("Audio playback failed: {0}")]
    Playback(String),
    #[error(
        "flite not found. Install: Linux: `sudo apt-get install flite`, \
         macOS: `brew install flite`"
    )]
    EngineNotFound,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
