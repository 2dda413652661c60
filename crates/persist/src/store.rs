//! File-backed snapshot archive.
//!
//! Layout inside the archive directory:
//! ```text
//! archive.meta.json                         - schema version
//! {actor}-{uuid}.snapshot.cbor.zst          - one file per packed snapshot
//! ```

use crate::snapshot::{CodecError, Snapshot};
use packspace_common::{ActorId, SnapshotId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ARCHIVE_SCHEMA_VERSION: u32 = 1;
const META_FILE: &str = "archive.meta.json";
const SNAPSHOT_SUFFIX: &str = ".snapshot.cbor.zst";

/// Errors from archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("schema version mismatch: archive has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchiveMeta {
    schema_version: u32,
}

/// Directory of encoded snapshots, one file per snapshot id.
#[derive(Debug, Clone)]
pub struct SnapshotArchive {
    root: PathBuf,
}

impl SnapshotArchive {
    /// Open or create an archive at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let meta_path = root.join(META_FILE);
        if meta_path.exists() {
            let meta: ArchiveMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != ARCHIVE_SCHEMA_VERSION {
                return Err(ArchiveError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: ARCHIVE_SCHEMA_VERSION,
                });
            }
        } else {
            let meta = ArchiveMeta {
                schema_version: ARCHIVE_SCHEMA_VERSION,
            };
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(actor: &ActorId, id: SnapshotId) -> String {
        format!("{}-{}{}", actor.file_key(), id, SNAPSHOT_SUFFIX)
    }

    pub fn path_for(&self, actor: &ActorId, id: SnapshotId) -> PathBuf {
        self.root.join(Self::file_name(actor, id))
    }

    /// Write already-encoded snapshot bytes.
    pub fn save(&self, actor: &ActorId, id: SnapshotId, bytes: &[u8]) -> Result<PathBuf, ArchiveError> {
        let path = self.path_for(actor, id);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot archived");
        Ok(path)
    }

    /// Read the raw bytes of an archived snapshot.
    pub fn load(&self, actor: &ActorId, id: SnapshotId) -> Result<Vec<u8>, ArchiveError> {
        Ok(std::fs::read(self.path_for(actor, id))?)
    }

    pub fn load_snapshot(&self, actor: &ActorId, id: SnapshotId) -> Result<Snapshot, ArchiveError> {
        let bytes = self.load(actor, id)?;
        Ok(Snapshot::decode(&bytes)?)
    }

    /// Remove an archived snapshot. Returns `false` if it did not exist.
    pub fn delete(&self, actor: &ActorId, id: SnapshotId) -> Result<bool, ArchiveError> {
        match std::fs::remove_file(self.path_for(actor, id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids of every snapshot on disk for `actor`, sorted.
    pub fn list(&self, actor: &ActorId) -> Result<Vec<SnapshotId>, ArchiveError> {
        let prefix = format!("{}-", actor.file_key());
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let id = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(SNAPSHOT_SUFFIX))
                .and_then(|uuid| uuid.parse::<SnapshotId>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
