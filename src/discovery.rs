//! Finding `.flitevox` voice files on disk.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::registry::VoiceRegistry;

pub const VOICE_FILE_EXTENSION: &str = "flitevox";

/// A voice file and the name it will be registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceFile {
    /// File stem, e.g. `cmu_us_awb` for `cmu_us_awb.flitevox`.
    pub name: String,
    pub path: PathBuf,
}

/// List the voice files directly inside `dir`, sorted by name.
///
/// With `only` set, just the voice of that name is returned (if present).
pub fn discover_voices(dir: &Path, only: Option<&str>) -> Result<Vec<VoiceFile>> {
    let mut found = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(VOICE_FILE_EXTENSION) {
            continue;
        }

        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            log::debug!("Skipping voice file with non UTF-8 name: {}", path.display());
            continue;
        };
        if only.is_some_and(|wanted| wanted != name) {
            continue;
        }

        found.push(VoiceFile {
            name: name.to_string(),
            path,
        });
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

/// Add every voice in `files` to `registry`.
///
/// A voice that fails to load is logged and skipped. Returns how many were
/// added.
pub fn register_voices(registry: &VoiceRegistry, files: &[VoiceFile]) -> usize {
    let mut added = 0;
    for file in files {
        match registry.add_voice(&file.name, &file.path) {
            Ok(_) => {
                log::debug!("added voice {} ({})", file.name, file.path.display());
                added += 1;
            }
            Err(e) => log::warn!("failed to add voice {}: {e}", file.path.display()),
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::{discover_voices, register_voices};
    use crate::registry::{VoiceRegistry, DEFAULT_VOICE_NAME};
    use crate::testing::{voice_file, FakeEngine};
    use std::sync::Arc;

    #[test]
    fn finds_flitevox_files_only() {
        let dir = tempfile::tempdir().unwrap();
        voice_file(dir.path(), "rms");
        voice_file(dir.path(), "awb");
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested.flitevox")).unwrap();

        let found = discover_voices(dir.path(), None).unwrap();
        let names: Vec<&str> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["awb", "rms"]);
        assert_eq!(found[0].path, dir.path().join("awb.flitevox"));
    }

    #[test]
    fn filter_keeps_the_requested_voice() {
        let dir = tempfile::tempdir().unwrap();
        voice_file(dir.path(), "rms");
        voice_file(dir.path(), "awb");

        let found = discover_voices(dir.path(), Some("rms")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "rms");

        assert!(discover_voices(dir.path(), Some("kal")).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_voices(&dir.path().join("gone"), None).is_err());
    }

    #[test]
    fn bad_voices_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        voice_file(dir.path(), "awb");
        let mut files = discover_voices(dir.path(), None).unwrap();
        files.push(super::VoiceFile {
            name: "ghost".to_string(),
            path: dir.path().join("ghost.flitevox"),
        });
        files.push(super::VoiceFile {
            name: DEFAULT_VOICE_NAME.to_string(),
            path: dir.path().join("awb.flitevox"),
        });

        let registry = VoiceRegistry::new(Arc::new(FakeEngine::new()));
        assert_eq!(register_voices(&registry, &files), 1);
        assert_eq!(registry.voice_names(), vec!["awb", DEFAULT_VOICE_NAME]);
    }
}
