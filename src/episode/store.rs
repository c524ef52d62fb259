//! File-backed episode persistence.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ArbiterResult, EpisodeError};

use super::file_lock::FileLock;
use super::{from_json, to_json_pretty, Episode};

/// Saves and loads one episode file.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written document. Both operations hold an
/// exclusive sidecar lock for their duration.
#[derive(Debug, Clone)]
pub struct EpisodeStore {
    path: PathBuf,
}

impl EpisodeStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists `episode`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// `Locked` if another writer holds the file, `Io` on filesystem
    /// failure, `Serialization` if encoding fails.
    pub fn save(&self, episode: &Episode) -> ArbiterResult<()> {
        let _lock = self.lock()?;
        let json = to_json_pretty(episode)?;

        let mut tmp_name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        let written = fs::write(&tmp, json)
            .map_err(|e| io_error(&tmp, &e))
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, &e)));
        if let Err(e) = written {
            if tmp.is_file() {
                let _ = fs::remove_file(&tmp);
            }
            tracing::warn!(path = %self.path.display(), error = %e, "episode save failed");
            return Err(e.into());
        }

        tracing::info!(path = %self.path.display(), steps = episode.len(), "episode saved");
        Ok(())
    }

    /// Loads the episode.
    ///
    /// # Errors
    ///
    /// `Locked`, `Io`, `Serialization` for malformed JSON, or
    /// `SchemaMismatch` for a structurally inconsistent step.
    pub fn load(&self) -> ArbiterResult<Episode> {
        let _lock = self.lock()?;
        let json = fs::read_to_string(&self.path).map_err(|e| io_error(&self.path, &e))?;
        let episode = from_json(&json)?;
        tracing::info!(path = %self.path.display(), steps = episode.len(), "episode loaded");
        Ok(episode)
    }

    fn lock(&self) -> Result<FileLock, EpisodeError> {
        let lock = FileLock::acquire(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::WouldBlock {
                EpisodeError::Locked {
                    path: self.path.display().to_string(),
                }
            } else {
                io_error(&FileLock::lock_path(&self.path), &e)
            }
        })?;
        tracing::debug!(lock = %lock.path().display(), "episode lock acquired");
        Ok(lock)
    }
}

fn io_error(path: &Path, e: &std::io::Error) -> EpisodeError {
    EpisodeError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::episode::fixtures::step;
    use crate::error::ArbiterError;

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = EpisodeStore::new(dir.path().join("episode.json"));
        let episode = Episode::from(vec![step(), step()]);
        store.save(&episode).unwrap();
        assert_eq!(store.load().unwrap(), episode);
        assert!(!dir.path().join("episode.json.tmp").exists());
    }

    #[test]
    fn save_replaces_previous_content() {
        let dir = tempdir().unwrap();
        let store = EpisodeStore::new(dir.path().join("episode.json"));
        store.save(&Episode::from(vec![step(), step()])).unwrap();
        store.save(&Episode::from(vec![step()])).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = EpisodeStore::new(dir.path().join("absent.json"));
        assert!(matches!(
            store.load().unwrap_err(),
            ArbiterError::Episode(EpisodeError::Io { .. })
        ));
    }

    #[test]
    fn concurrent_writer_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episode.json");
        let store = EpisodeStore::new(&path);
        let _held = FileLock::acquire(&path).unwrap();
        assert!(matches!(
            store.save(&Episode::new()).unwrap_err(),
            ArbiterError::Episode(EpisodeError::Locked { .. })
        ));
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episode.json");
        // a non-empty directory at the target makes the rename fail
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), "x").unwrap();

        let err = EpisodeStore::new(&path).save(&Episode::from(vec![step()])).unwrap_err();
        assert!(matches!(err, ArbiterError::Episode(EpisodeError::Io { .. })));
        assert!(!dir.path().join("episode.json.tmp").exists());
        assert!(path.join("occupant").exists());
    }

    #[test]
    fn corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episode.json");
        fs::write(&path, "not json").unwrap();
        assert!(EpisodeStore::new(&path).load().unwrap_err().is_serialization());
    }
}
