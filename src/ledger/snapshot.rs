//! On-disk vote snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PersistenceError;

/// Suffix of the scratch file written before the snapshot is replaced.
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Serialized form of the ledger.
///
/// Map keys are written as strings, e.g. `{"votes": {"5": 2}, "user_votes": {"1001": 2}}`.
/// Both fields may be missing on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Vote count per sample number.
    #[serde(default)]
    pub votes: BTreeMap<u32, u32>,

    /// Number of votes cast per user id.
    #[serde(default)]
    pub user_votes: BTreeMap<u64, u32>,
}

impl Snapshot {
    /// Reads a snapshot from disk.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, PersistenceError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::Read(e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(PersistenceError::Parse)
    }

    /// Writes the whole snapshot, replacing the previous file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(PersistenceError::Serialize)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(PersistenceError::Write)?;
        }

        let tmp = temp_path(path);
        std::fs::write(&tmp, json).map_err(PersistenceError::Write)?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            PersistenceError::Write(e)
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_FILE_SUFFIX);
    PathBuf::from(name)
}
