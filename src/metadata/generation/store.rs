//! Persistence of generated artifacts.
//!
//! The artifact store is a resource shared between threads and, for [`FileArtifactStore`],
//! between processes. Writes must never expose a partially written artifact:
//!
//! - Content is written to a temporary file in the target directory, synced, and renamed over
//!   the final path, so readers see either the old or the new artifact.
//! - Writers of the same artifact serialize on an advisory lock file, so concurrent writers in
//!   separate processes do not interleave their renames with a half-synced file.
//! - Readers take no lock.
//!
//! [`MemoryArtifactStore`] keeps artifacts in a concurrent map and counts writes, which makes it
//! suitable for short-lived processes and for observing generation side effects.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;
use fs2::FileExt;
use sha1::{Digest, Sha1};
use tempfile::NamedTempFile;

use crate::{metadata::generation::Artifact, Result};

/// Storage backend for generated artifacts, keyed by canonical class name.
pub trait ArtifactStore: Send + Sync {
    /// Loads the stored artifact of `class`.
    ///
    /// Returns `Ok(None)` if nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the backend fails for reasons other than absence.
    fn load(&self, class: &str) -> Result<Option<Artifact>>;

    /// Stores `artifact`, replacing any previous artifact of the same class atomically.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] or [`crate::Error::Serialization`] on failure.
    fn save(&self, artifact: &Artifact) -> Result<()>;
}

/// Artifact store backed by a directory, safe across processes.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileArtifactStore { dir: dir.into() }
    }

    /// Root directory of the store
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path of the artifact of `class`.
    ///
    /// Class names are hashed, so namespace separators never reach the filesystem.
    #[must_use]
    pub fn artifact_path(&self, class: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem(class)))
    }

    fn lock_path(&self, class: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", Self::file_stem(class)))
    }

    fn file_stem(class: &str) -> String {
        hex::encode(Sha1::digest(class.as_bytes()))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn load(&self, class: &str) -> Result<Option<Artifact>> {
        let path = self.artifact_path(class);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        match Artifact::from_bytes(&data) {
            Ok(artifact) => Ok(Some(artifact)),
            Err(error) => {
                log::warn!(
                    "ignoring unreadable artifact {} for {}: {}",
                    path.display(),
                    class,
                    error
                );
                Ok(None)
            }
        }
    }

    fn save(&self, artifact: &Artifact) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path(&artifact.class_name))?;
        lock.lock_exclusive()?;

        let result = (|| -> Result<()> {
            let mut temp = NamedTempFile::new_in(&self.dir)?;
            temp.write_all(&artifact.to_bytes()?)?;
            temp.as_file().sync_all()?;
            temp.persist(self.artifact_path(&artifact.class_name))
                .map_err(|error| error.error)?;
            Ok(())
        })();

        FileExt::unlock(&lock)?;
        result
    }
}

/// Artifact store held in memory.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: DashMap<String, Artifact>,
    writes: AtomicUsize,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful [`ArtifactStore::save`] calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, class: &str) -> Result<Option<Artifact>> {
        Ok(self.artifacts.get(class).map(|entry| entry.value().clone()))
    }

    fn save(&self, artifact: &Artifact) -> Result<()> {
        self.artifacts
            .insert(artifact.class_name.clone(), artifact.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        generation::GenerationRequest,
        mapping::{MappingFacts, MetadataKind},
    };

    fn artifact(class: &str) -> Artifact {
        let facts = MappingFacts::entity("users").id("id");
        let request = GenerationRequest::new(class, MetadataKind::Entity, None, &facts).unwrap();
        Artifact::generate(&request)
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("artifacts"));

        assert!(store.load("App\\User").unwrap().is_none());

        let artifact = artifact("App\\User");
        store.save(&artifact).unwrap();
        assert_eq!(store.load("App\\User").unwrap(), Some(artifact));

        let file_name = store.artifact_path("App\\User");
        let file_name = file_name.file_name().unwrap().to_string_lossy();
        assert!(!file_name.contains('\\'));
        assert!(file_name.ends_with(".json"));
    }

    #[test]
    fn test_file_store_ignores_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        fs::write(store.artifact_path("App\\User"), b"{ truncated").unwrap();
        assert!(store.load("App\\User").unwrap().is_none());

        store.save(&artifact("App\\User")).unwrap();
        assert!(store.load("App\\User").unwrap().is_some());
    }

    #[test]
    fn test_file_store_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        store.save(&artifact("App\\User")).unwrap();
        store.save(&artifact("App\\User")).unwrap();

        let mut extensions: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| {
                entry
                    .unwrap()
                    .path()
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_string())
                    .unwrap_or_default()
            })
            .collect();
        extensions.sort();
        assert_eq!(extensions, vec!["json".to_string(), "lock".to_string()]);
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryArtifactStore::new();
        assert!(store.is_empty());

        store.save(&artifact("App\\User")).unwrap();
        store.save(&artifact("App\\User")).unwrap();

        assert_eq!(store.writes(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.load("App\\Group").unwrap().is_none());
    }
}
