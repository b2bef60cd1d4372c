//! Incremental rebuild cache.
//!
//! [`FileCache`] is the in-memory gate consulted before reflection: a file
//! whose content hash matches the cached descriptor is not reflected again and
//! the cached `Arc<FileDescriptor>` is reused as is. [`CacheStore`] persists
//! the gate between runs:
//!
//! ```text
//! <cache_dir>/
//!   manifest.json          schema version, timestamp, set → path → entry key
//!   files/<entry key>.json one serialized FileDescriptor per file
//! ```
//!
//! Entry keys are `sha256(set key + path)`. Entries no set references are
//! removed when the manifest is saved.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::descriptor::FileDescriptor;
use crate::hash::ContentHash;

// ============================================================================
// Constants
// ============================================================================

/// Schema version of `manifest.json`.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";

const FILES_DIR: &str = "files";

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the persisted cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory exists but is not a directory.
    #[error("cache path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The manifest cannot be read.
    #[error("cache manifest is corrupt: {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// ============================================================================
// Gate
// ============================================================================

/// Outcome of consulting the gate for one file.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Same hash as the cached copy: reuse it.
    Unchanged(Arc<FileDescriptor>),
    /// New, modified or forced: reflect it.
    Changed,
}

impl GateDecision {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, GateDecision::Unchanged(_))
    }
}

/// Previously reflected files of one API set, keyed by path.
///
/// Holds descriptors as produced by the reflector, before any compiler pass
/// touched them.
#[derive(Debug, Clone, Default)]
pub struct FileCache {
    entries: BTreeMap<String, Arc<FileDescriptor>>,
    dirty: BTreeSet<String>,
}

impl FileCache {
    pub fn new() -> Self {
        FileCache::default()
    }

    /// Decide whether `path` with content `hash` must be reflected.
    pub fn gate(&self, path: &str, hash: &ContentHash, force: bool) -> GateDecision {
        if force {
            return GateDecision::Changed;
        }
        match self.entries.get(path) {
            Some(cached) if &cached.hash == hash => GateDecision::Unchanged(Arc::clone(cached)),
            _ => GateDecision::Changed,
        }
    }

    /// Store a freshly reflected file.
    pub fn insert(&mut self, file: Arc<FileDescriptor>) {
        self.dirty.insert(file.path.clone());
        self.entries.insert(file.path.clone(), file);
    }

    pub fn get(&self, path: &str) -> Option<&Arc<FileDescriptor>> {
        self.entries.get(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<Arc<FileDescriptor>> {
        self.dirty.remove(path);
        self.entries.remove(path)
    }

    /// Drop entries for files that no longer exist.
    pub fn retain_paths(&mut self, present: &BTreeSet<String>) -> Vec<String> {
        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|path| !present.contains(*path))
            .cloned()
            .collect();
        for path in &stale {
            self.remove(path);
        }
        stale
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<FileDescriptor>)> {
        self.entries.iter().map(|(path, file)| (path.as_str(), file))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_dirty(&self, path: &str) -> bool {
        self.dirty.contains(path)
    }

    fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    fn insert_clean(&mut self, file: FileDescriptor) {
        self.entries.insert(file.path.clone(), Arc::new(file));
    }
}

// ============================================================================
// Persisted store
// ============================================================================

/// Persisted cache metadata (`manifest.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub schema_version: u32,
    /// Last write, ISO 8601.
    pub written_at: String,
    /// Set key → file path → entry key.
    #[serde(default)]
    pub sets: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for CacheManifest {
    fn default() -> Self {
        CacheManifest {
            schema_version: CACHE_SCHEMA_VERSION,
            written_at: format_timestamp(SystemTime::now()),
            sets: BTreeMap::new(),
        }
    }
}

impl CacheManifest {
    /// Number of cached files across all sets.
    pub fn file_count(&self) -> usize {
        self.sets.values().map(BTreeMap::len).sum()
    }
}

/// What [`CacheStore::save`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub written: usize,
    pub kept: usize,
    pub collected: usize,
}

/// On-disk cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(FILES_DIR).join(format!("{}.json", key))
    }

    /// Read the manifest; `None` when no cache was written yet.
    pub fn manifest(&self) -> CacheResult<Option<CacheManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let manifest: CacheManifest =
            serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(Some(manifest))
    }

    /// Load the cached files of one set.
    ///
    /// A missing cache, an outdated schema or an unreadable entry yields an
    /// emptier cache, never an error: those files are simply reflected again.
    pub fn load(&self, set_key: &str) -> CacheResult<FileCache> {
        let mut cache = FileCache::new();
        let manifest = match self.manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return Ok(cache),
            Err(CacheError::Corrupt { path, reason }) => {
                warn!(path = %path.display(), %reason, "ignoring corrupt cache manifest");
                return Ok(cache);
            }
            Err(e) => return Err(e),
        };
        if manifest.schema_version != CACHE_SCHEMA_VERSION {
            warn!(
                found = manifest.schema_version,
                expected = CACHE_SCHEMA_VERSION,
                "ignoring cache with unsupported schema version"
            );
            return Ok(cache);
        }
        let Some(entries) = manifest.sets.get(set_key) else {
            return Ok(cache);
        };
        for (path, key) in entries {
            match self.read_entry(key) {
                Ok(file) if &file.path == path => cache.insert_clean(file),
                Ok(file) => {
                    warn!(expected = %path, found = %file.path, "cache entry path mismatch")
                }
                Err(e) => warn!(file = %path, error = %e, "unreadable cache entry"),
            }
        }
        debug!(set = set_key, files = cache.len(), "loaded cache");
        Ok(cache)
    }

    fn read_entry(&self, key: &str) -> CacheResult<FileDescriptor> {
        let content = fs::read_to_string(self.entry_path(key))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist one set and garbage-collect unreferenced entries.
    pub fn save(&self, set_key: &str, cache: &mut FileCache) -> CacheResult<SaveStats> {
        self.ensure_dirs()?;
        let mut manifest = match self.manifest() {
            Ok(Some(manifest)) if manifest.schema_version == CACHE_SCHEMA_VERSION => manifest,
            _ => CacheManifest::default(),
        };

        let mut stats = SaveStats::default();
        let mut entries = BTreeMap::new();
        for (path, file) in cache.iter() {
            let key = entry_key(set_key, path);
            let target = self.entry_path(&key);
            if cache.is_dirty(path) || !target.exists() {
                let json = serde_json::to_vec(file.as_ref())?;
                atomic_write(&target, &json)?;
                stats.written += 1;
            } else {
                stats.kept += 1;
            }
            entries.insert(path.to_string(), key);
        }
        cache.mark_clean();

        manifest.sets.insert(set_key.to_string(), entries);
        manifest.written_at = format_timestamp(SystemTime::now());
        atomic_write(
            &self.manifest_path(),
            serde_json::to_string_pretty(&manifest)?.as_bytes(),
        )?;

        stats.collected = self.collect_garbage(&manifest)?;
        debug!(
            set = set_key,
            written = stats.written,
            kept = stats.kept,
            collected = stats.collected,
            "saved cache"
        );
        Ok(stats)
    }

    /// Remove the whole cache directory. Returns the number of entries removed.
    pub fn clear(&self) -> CacheResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        if !self.dir.is_dir() {
            return Err(CacheError::NotADirectory {
                path: self.dir.clone(),
            });
        }
        let removed = self.entry_files()?.len();
        fs::remove_dir_all(&self.dir)?;
        Ok(removed)
    }

    fn ensure_dirs(&self) -> CacheResult<()> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(CacheError::NotADirectory {
                path: self.dir.clone(),
            });
        }
        fs::create_dir_all(self.dir.join(FILES_DIR))?;
        Ok(())
    }

    fn entry_files(&self) -> CacheResult<Vec<PathBuf>> {
        let dir = self.dir.join(FILES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        out.sort();
        Ok(out)
    }

    fn collect_garbage(&self, manifest: &CacheManifest) -> CacheResult<usize> {
        let live: BTreeSet<&str> = manifest
            .sets
            .values()
            .flat_map(|entries| entries.values().map(String::as_str))
            .collect();
        let mut removed = 0;
        for path in self.entry_files()? {
            let key = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !live.contains(key.as_str()) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Entry key of one file of one set.
pub fn entry_key(set_key: &str, path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(set_key.as_bytes());
    hasher.update(path.as_bytes());
    hex::encode(hasher.finalize())
}

/// Write content to a file atomically using temp + rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::UNIX_EPOCH;

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Format a timestamp for JSON output (ISO 8601).
fn format_timestamp(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Tests
// ============================================================================
