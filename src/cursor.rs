//! Durable storage for the mention cursor.
//!
//! The cursor ("since id") is the id of the newest mention handed to the
//! processor. It lives in a small JSON record on disk; the record may carry
//! other fields, which are kept as they are whenever the cursor is written.
//!
//! Writes go to a temporary file in the same directory, are synced, and then
//! renamed over the record, after which the directory is synced as well. A
//! crash leaves either the old or the new record in place and never a
//! truncated one.

use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Name of the cursor field inside the state record.
pub const SINCE_ID_FIELD: &str = "since_id";

/// Persistence for the poller's watermark.
pub trait CursorStore {
    /// Returns the stored cursor, or `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<u64>, StorageError>;

    /// Stores `cursor`. The stored value never decreases: saving a value lower
    /// than the current one leaves the current one in place.
    fn save(&mut self, cursor: u64) -> Result<(), StorageError>;
}

/// Cursor store backed by a JSON file.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole record. A missing file is an empty record.
    fn read_record(&self) -> Result<Map<String, Value>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("State file {} does not exist yet", self.path.display());
                return Ok(Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            warn!("State file {} is empty", self.path.display());
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents)? {
            Value::Object(record) => Ok(record),
            other => Err(StorageError::Format(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                other
            ))),
        }
    }

    fn write_record(&self, record: &Map<String, Value>) -> Result<(), StorageError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        let temp_path = self.path.with_file_name(format!(".{}.tmp", file_name));

        let bytes = serde_json::to_vec_pretty(record)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        sync_parent_dir(&self.path)?;
        Ok(())
    }
}

/// Makes the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

fn since_id_of(record: &Map<String, Value>) -> Result<Option<u64>, StorageError> {
    match record.get(SINCE_ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
            StorageError::Format(format!("{} is not an unsigned integer: {}", SINCE_ID_FIELD, n))
        }),
        Some(Value::String(s)) => s.parse().map(Some).map_err(|_| {
            StorageError::Format(format!("{} is not an unsigned integer: '{}'", SINCE_ID_FIELD, s))
        }),
        Some(other) => Err(StorageError::Format(format!(
            "{} has unexpected type: {}",
            SINCE_ID_FIELD, other
        ))),
    }
}

impl CursorStore for StateFile {
    fn load(&self) -> Result<Option<u64>, StorageError> {
        let cursor = since_id_of(&self.read_record()?)?;
        match cursor {
            Some(id) => info!("Loaded cursor {} from {}", id, self.path.display()),
            None => info!("No cursor stored in {}", self.path.display()),
        }
        Ok(cursor)
    }

    fn save(&mut self, cursor: u64) -> Result<(), StorageError> {
        // Re-read so fields written by someone else since startup survive.
        let mut record = self.read_record()?;
        if let Some(stored) = since_id_of(&record).ok().flatten() {
            if stored >= cursor {
                debug!(
                    "Stored cursor {} is not behind {}, leaving it",
                    stored, cursor
                );
                return Ok(());
            }
        }

        record.insert(SINCE_ID_FIELD.to_string(), Value::from(cursor));
        self.write_record(&record)?;
        debug!("Saved cursor {} to {}", cursor, self.path.display());
        Ok(())
    }
}

/// Cursor store that keeps the value in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryCursorStore {
    cursor: Option<u64>,
}

impl MemoryCursorStore {
    pub fn new(cursor: Option<u64>) -> Self {
        MemoryCursorStore { cursor }
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.cursor)
    }

    fn save(&mut self, cursor: u64) -> Result<(), StorageError> {
        self.cursor = Some(self.cursor.map_or(cursor, |c| c.max(cursor)));
        Ok(())
    }
}
