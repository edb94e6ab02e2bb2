// build-sleuth-cache/src/store.rs
// ============================================================================
// Module: JSON Map Store
// Description: Named persistent key-value maps backed by JSON files.
// Purpose: Persist resolver lookups across runs with atomic writes.
// Dependencies: build-sleuth-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each named map lives in one `<name>.json` file under the cache directory,
//! loaded fully at open and rewritten atomically on flush. Values are opaque
//! to the store; empty collections are stored as-is so negative cache entries
//! round-trip. Flushes go through a temporary file plus rename so a crashed
//! run never leaves a truncated map behind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use build_sleuth_core::interfaces::CacheError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Extension of persisted map files.
const MAP_FILE_EXTENSION: &str = "json";
/// Suffix of the temporary file used for atomic rewrites.
const TEMP_FILE_SUFFIX: &str = ".tmp";
/// Maximum map file size accepted at load time.
const MAX_MAP_FILE_BYTES: u64 = 256 * 1024 * 1024;

// ============================================================================
// SECTION: JSON Map Store
// ============================================================================

/// One named persistent map of string keys to JSON-serializable values.
#[derive(Debug)]
pub struct JsonMapStore<V> {
    /// Path of the backing file.
    path: PathBuf,
    /// In-memory contents plus a dirty marker.
    state: Mutex<StoreState<V>>,
}

/// Mutable store contents.
#[derive(Debug)]
struct StoreState<V> {
    /// Map entries.
    entries: BTreeMap<String, V>,
    /// True when entries diverge from the backing file.
    dirty: bool,
}

impl<V> JsonMapStore<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Opens the named map under the cache directory, loading existing data.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the file cannot be read or parsed.
    pub fn open(directory: &Path, name: &str) -> Result<Self, CacheError> {
        let path = directory.join(format!("{name}.{MAP_FILE_EXTENSION}"));
        let entries = if path.exists() {
            let metadata = fs::metadata(&path).map_err(io_error)?;
            if metadata.len() > MAX_MAP_FILE_BYTES {
                return Err(CacheError::Io(format!(
                    "cache file {} exceeds {} bytes",
                    path.display(),
                    MAX_MAP_FILE_BYTES
                )));
            }

            let text = fs::read_to_string(&path).map_err(io_error)?;
            let entries: BTreeMap<String, V> =
                serde_json::from_str(&text).map_err(serialization_error)?;

            debug!(path = %path.display(), entries = entries.len(), "loaded cache map");

            entries
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            state: Mutex::new(StoreState {
                entries,
                dirty: false,
            }),
        })
    }

    /// Reads a value by key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the store lock is poisoned.
    pub fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let state = self.lock()?;
        Ok(state.entries.get(key).cloned())
    }

    /// Writes a value, returning the previous entry for the key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the store lock is poisoned.
    pub fn put(&self, key: &str, value: V) -> Result<Option<V>, CacheError> {
        let mut state = self.lock()?;
        state.dirty = true;
        Ok(state.entries.insert(key.to_string(), value))
    }

    /// Persists the map when it has unflushed writes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when serialization or the file write fails.
    pub fn flush(&self) -> Result<(), CacheError> {
        let mut state = self.lock()?;

        if !state.dirty {
            return Ok(());
        }

        let json =
            serde_json::to_string_pretty(&state.entries).map_err(serialization_error)?;

        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, json).map_err(io_error)?;
        fs::rename(&temp_path, &self.path).map_err(io_error)?;

        debug!(path = %self.path.display(), entries = state.entries.len(), "flushed cache map");

        state.dirty = false;
        Ok(())
    }

    /// Locks the store state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState<V>>, CacheError> {
        self.state
            .lock()
            .map_err(|_| CacheError::Io(format!("cache lock poisoned for {}", self.path.display())))
    }
}

impl<V> Drop for JsonMapStore<V> {
    fn drop(&mut self) {
        let dirty = self.state.lock().map(|state| state.dirty).unwrap_or(false);
        if dirty {
            warn!(
                path = %self.path.display(),
                "cache map dropped with unflushed writes"
            );
        }
    }
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Maps an I/O failure into a cache error.
fn io_error(error: std::io::Error) -> CacheError {
    CacheError::Io(error.to_string())
}

/// Maps a JSON failure into a cache error.
fn serialization_error(error: serde_json::Error) -> CacheError {
    CacheError::Serialization(error.to_string())
}
