//! File-backed cache store
//!
//! Persists the payload and its fetch timestamp as a single JSON record,
//! written through a temp file and renamed into place so readers never see
//! a payload paired with another write's timestamp.

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::{within_window, CacheStore};

/// File name of the cache record inside the cache directory
const RECORD_FILE: &str = "weather.json";

/// Errors that can occur while persisting the cache record
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache directory or file could not be accessed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Cache record could not be encoded or decoded
    #[error("Cache record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk layout of the cache record
///
/// The timestamp stays a string so that a damaged timestamp only costs
/// freshness, not the payload.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    /// ISO-8601 UTC instant of the fetch
    fetched_at: String,
    /// Payload bytes exactly as handed to `write`
    payload: Vec<u8>,
}

/// Cache store keeping one record in an XDG-compliant cache directory
///
/// Uses `~/.cache/skywatch/weather.json` on Linux, or the platform equivalent.
#[derive(Debug, Clone)]
pub struct FileCache {
    /// Directory where the record is stored
    cache_dir: PathBuf,
}

impl FileCache {
    /// Creates a FileCache in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "skywatch")?;
        Some(Self {
            cache_dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a FileCache with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache record
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn record_path(&self) -> PathBuf {
        self.cache_dir.join(RECORD_FILE)
    }

    /// Loads the raw record, `Ok(None)` when nothing has been written yet
    fn load_record(&self) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let record = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    /// Loads the record, treating unreadable storage as an empty cache
    fn load_or_none(&self) -> Option<CacheRecord> {
        match self.load_record() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %self.record_path().display(), error = %e, "ignoring unreadable cache");
                None
            }
        }
    }
}

impl CacheStore for FileCache {
    fn read(&self) -> Option<Vec<u8>> {
        self.load_or_none().map(|record| record.payload)
    }

    fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.load_or_none()
            .and_then(|record| parse_timestamp(&record.fetched_at))
    }

    fn write(&mut self, payload: &[u8]) -> Result<DateTime<Utc>, CacheError> {
        fs::create_dir_all(&self.cache_dir)?;

        let now = Utc::now();
        let fetched_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = CacheRecord {
            fetched_at: fetched_at.clone(),
            payload: payload.to_vec(),
        };
        let json = serde_json::to_string(&record)?;

        let path = self.record_path();
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(path = %path.display(), bytes = payload.len(), "cache record written");

        // Return the stored, millisecond-truncated value so later reads agree.
        Ok(parse_timestamp(&fetched_at).unwrap_or(now))
    }

    fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let Some(record) = self.load_or_none() else {
            return false;
        };
        match parse_timestamp(&record.fetched_at) {
            Some(fetched_at) => within_window(fetched_at, max_age, now),
            None => false,
        }
    }
}

/// Parses an ISO-8601 timestamp, returning `None` for anything malformed
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
