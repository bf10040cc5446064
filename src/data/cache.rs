use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::derive::enrich;
use super::loader::load_file;
use super::model::EnrichedTable;
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Source fingerprint
// ---------------------------------------------------------------------------

/// Identity of a data file: a cheap metadata signature plus a BLAKE3 digest
/// of its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
    /// Hex BLAKE3 digest of the file contents.
    pub digest: String,
}

impl SourceFingerprint {
    /// Read and hash the file at `path`.
    pub fn compute(path: &Path) -> Result<Self, DataError> {
        let (len, modified) = signature(path)?;
        Ok(SourceFingerprint {
            path: path.to_path_buf(),
            len,
            modified,
            digest: digest_file(path)?,
        })
    }

    fn signature_matches(&self, len: u64, modified: Option<SystemTime>) -> bool {
        // Without an mtime the signature proves nothing; fall back to hashing.
        self.modified.is_some() && self.len == len && self.modified == modified
    }
}

fn signature(path: &Path) -> Result<(u64, Option<SystemTime>), DataError> {
    let meta = std::fs::metadata(path).map_err(|e| DataError::io(path, e))?;
    Ok((meta.len(), meta.modified().ok()))
}

fn digest_file(path: &Path) -> Result<String, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    hasher
        .update_reader(file)
        .map_err(|e| DataError::io(path, e))?;
    Ok(hasher.finalize().to_hex().to_string())
}

// ---------------------------------------------------------------------------
// EnrichmentCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: SourceFingerprint,
    table: Arc<EnrichedTable>,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoised load + enrich, keyed by source path and invalidated when the
/// file's content changes.
///
/// Tables are handed out as `Arc` so any number of sessions can read them;
/// nothing ever writes to a cached table.
#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: HashMap<PathBuf, CacheEntry>,
    stats: CacheStats,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the enriched table for `path`, loading and deriving it only if
    /// the file is new to the cache or its content changed.
    ///
    /// An unchanged (len, mtime) signature is trusted without re-hashing.  A
    /// changed signature with identical bytes still counts as a hit.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<EnrichedTable>, DataError> {
        let (len, modified) = signature(path)?;

        if let Some(entry) = self.entries.get_mut(path) {
            if entry.fingerprint.signature_matches(len, modified) {
                self.stats.hits += 1;
                log::debug!("Cache hit for {} (signature)", path.display());
                return Ok(Arc::clone(&entry.table));
            }
            let digest = digest_file(path)?;
            if digest == entry.fingerprint.digest {
                entry.fingerprint.len = len;
                entry.fingerprint.modified = modified;
                self.stats.hits += 1;
                log::debug!("Cache hit for {} (content unchanged)", path.display());
                return Ok(Arc::clone(&entry.table));
            }
            log::info!("{} changed on disk, reloading", path.display());
        }

        self.stats.misses += 1;
        let fingerprint = SourceFingerprint::compute(path)?;
        let table = Arc::new(enrich(&load_file(path)?)?);
        log::debug!(
            "Cached {} enriched records for {} ({})",
            table.len(),
            path.display(),
            &fingerprint.digest[..12]
        );
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                fingerprint,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Fingerprint of the cached entry for `path`, if any.
    pub fn fingerprint(&self, path: &Path) -> Option<&SourceFingerprint> {
        self.entries.get(path).map(|e| &e.fingerprint)
    }

    /// Drop the entry for `path`; the next lookup reloads it.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
