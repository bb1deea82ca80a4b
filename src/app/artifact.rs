// DocScan - app/artifact.rs
//
// Persistence of the single "current" scanned document.
//
// Design principles:
// - One fixed slot, no history: every successful save replaces the previous
//   artifact.
// - Saves are atomic (copy→temp, fsync, rename→slot) so a failed or
//   interrupted save never truncates the previous good artifact.
// - Saves are serialised by a mutex held for the whole copy+rename, so two
//   in-flight saves cannot interleave writes into the slot or the temp file.

use crate::core::model::{ArtifactLocation, DocumentRef};
use crate::util::constants::ARTIFACT_TEMP_SUFFIX;
use crate::util::error::PersistenceError;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Storage for the one persisted scan artifact.
///
/// Implementations must be safe to call from the controller's background
/// save thread while readers call `exists`/`locate` concurrently.
pub trait ArtifactStore: Send + Sync {
    /// Copy the bytes behind `source` into the slot, replacing any previous
    /// artifact. Blocking.
    fn save(&self, source: &DocumentRef) -> Result<ArtifactLocation, PersistenceError>;

    /// True iff an artifact is currently persisted.
    fn exists(&self) -> bool;

    /// Location of the persisted artifact, if any.
    fn locate(&self) -> Option<ArtifactLocation>;
}

// =============================================================================
// File-backed slot
// =============================================================================

/// `ArtifactStore` backed by one file on the local filesystem.
#[derive(Debug)]
pub struct FileArtifactStore {
    slot: PathBuf,
    write_lock: Mutex<()>,
}

impl FileArtifactStore {
    /// Store whose slot is `dir/file_name`. The directory is created on the
    /// first save.
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            slot: dir.join(file_name),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the slot file (which may not exist yet).
    pub fn slot_path(&self) -> &Path {
        &self.slot
    }

    /// Sibling path the in-progress copy is written to.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .slot
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(ARTIFACT_TEMP_SUFFIX);
        self.slot.with_file_name(name)
    }

    fn copy_to_temp(&self, source: &Path, tmp: &Path) -> Result<u64, PersistenceError> {
        let input = File::open(source).map_err(|e| PersistenceError::SourceUnreadable {
            path: source.to_path_buf(),
            source: e,
        })?;

        if let Some(parent) = tmp.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::DestinationUnwritable {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let output = File::create(tmp).map_err(|e| PersistenceError::DestinationUnwritable {
            path: tmp.to_path_buf(),
            source: e,
        })?;

        let copy_err = |e: io::Error| PersistenceError::Copy {
            from: source.to_path_buf(),
            to: tmp.to_path_buf(),
            source: e,
        };

        let mut reader = BufReader::new(input);
        let mut writer = BufWriter::new(output);
        let bytes = io::copy(&mut reader, &mut writer).map_err(copy_err)?;
        writer.flush().map_err(copy_err)?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| PersistenceError::DestinationUnwritable {
                path: tmp.to_path_buf(),
                source: e,
            })?;
        Ok(bytes)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save(&self, source: &DocumentRef) -> Result<ArtifactLocation, PersistenceError> {
        // The guard protects the slot, not data in the mutex; a poisoned
        // lock only means an earlier save panicked, which the temp/rename
        // scheme already tolerates.
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let tmp = self.temp_path();
        let bytes = match self.copy_to_temp(source.path(), &tmp) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Clean up the partial copy; ignore any secondary error.
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        fs::rename(&tmp, &self.slot).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            PersistenceError::Finalise {
                path: self.slot.clone(),
                source: e,
            }
        })?;

        tracing::debug!(
            source = %source,
            slot = %self.slot.display(),
            bytes,
            "Artifact saved"
        );

        Ok(location_of(&self.slot).unwrap_or_else(|| ArtifactLocation {
            path: self.slot.clone(),
            size_bytes: bytes,
            saved_at: Utc::now(),
        }))
    }

    fn exists(&self) -> bool {
        self.slot.is_file()
    }

    fn locate(&self) -> Option<ArtifactLocation> {
        location_of(&self.slot)
    }
}

/// Describe the file at `path`, or `None` if it is not a readable file.
fn location_of(path: &Path) -> Option<ArtifactLocation> {
    let meta = fs::metadata(path).ok().filter(|m| m.is_file())?;
    let saved_at = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Some(ArtifactLocation {
        path: path.to_path_buf(),
        size_bytes: meta.len(),
        saved_at,
    })
}

// =============================================================================
// Unit tests
// =============================================================================
