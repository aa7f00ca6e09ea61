//! Persistent cache of research reports keyed by topic.
//!
//! The store is a single pretty-printed JSON document mapping each topic to a
//! [`ResearchRecord`]:
//!
//! ```json
//! {
//!   "Nvidia earnings": {
//!     "perplexity_result": "..."
//!   }
//! }
//! ```
//!
//! Reads are lossy by contract: a missing or unparseable document is treated
//! as an empty store and never reported as an error, and an entry that is not
//! a valid record is skipped on its own. Writes are read-modify-write of the
//! whole document and carry skipped entries through unchanged. There is no locking, so two
//! processes saving at once can lose an update (last writer wins).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default location of the store, relative to the working directory.
pub const DEFAULT_STORE_FILE: &str = "research_results.json";

/// Errors that can occur when saving to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred while writing the document.
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized.
    #[error("Failed to serialize research store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One cached research report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRecord {
    /// The generated research report body.
    #[serde(rename = "perplexity_result")]
    pub result: String,
}

impl ResearchRecord {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// Handle to the JSON document backing the research cache.
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    /// Create a store backed by `path`. The file is not touched until used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record.
    ///
    /// Returns an empty map when the file is missing, unreadable, or not a JSON
    /// object. Entries that are not valid records are skipped individually, so
    /// one bad entry never hides the rest.
    pub fn load_all(&self) -> BTreeMap<String, ResearchRecord> {
        self.load_raw()
            .into_iter()
            .filter_map(|(topic, value)| match serde_json::from_value(value) {
                Ok(record) => Some((topic, record)),
                Err(e) => {
                    warn!(path = %self.path.display(), topic = %topic, error = %e, "Skipping unreadable research entry");
                    None
                }
            })
            .collect()
    }

    /// The document as raw JSON entries, unreadable ones included.
    fn load_raw(&self) -> Map<String, Value> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Research store not found, starting empty");
            return Map::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Research store unreadable, treating as empty");
                return Map::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(Value::Object(entries)) => entries,
            Ok(_) => {
                warn!(path = %self.path.display(), "Research store is corrupt (not a JSON object), treating as empty");
                Map::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Research store is corrupt, treating as empty");
                Map::new()
            }
        }
    }

    /// Look up a single record.
    ///
    /// Falls back to the trimmed topic, the form research saves under.
    pub fn get(&self, topic: &str) -> Option<ResearchRecord> {
        let mut records = self.load_all();
        records
            .remove(topic)
            .or_else(|| records.remove(topic.trim()))
    }

    /// Topics with a stored report, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.load_all().into_keys().collect()
    }

    /// Insert or overwrite the record for `topic` and rewrite the whole document.
    ///
    /// Entries that could not be read as records are written back untouched.
    pub fn upsert(&self, topic: &str, result: &str) -> Result<(), StoreError> {
        let mut records = self.load_raw();
        let replaced = records
            .insert(
                topic.to_string(),
                serde_json::to_value(ResearchRecord::new(result))?,
            )
            .is_some();
        self.write_all(&records)?;

        info!(topic = %topic, replaced, total = records.len(), "Research result saved");
        Ok(())
    }

    /// Replace the document with `records`.
    ///
    /// Written to a sibling temp file and renamed over the target so readers
    /// never observe a half-written document.
    fn write_all(&self, records: &Map<String, Value>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush().map_err(io_err)?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(io_err(e));
        }
        Ok(())
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_FILE)
    }
}
