//! Provenance index
//!
//! An append-only ledger at `.runforge/index.json` linking each run to the
//! dataset fingerprint it trained on and to its artifacts. Oldest entries
//! come first. Entries are never removed, reordered or edited.
//!
//! Writes go through a temp sibling and a rename, so the index is never
//! observed half-written. A file that is not a JSON object with a `runs`
//! list is moved aside to `index.json.corrupt.<unix-ms>` and an empty index
//! takes its place. Rows and top-level fields this version does not
//! understand are carried through untouched.
//!
//! There is no locking: two processes training against one workspace at
//! the same time may lose an entry.

use crate::artifacts::canonical::{temp_path_for, to_canonical_pretty};
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current index document version
pub const INDEX_SCHEMA_VERSION: &str = "0.2.2.1";

/// Name of the workspace directory holding the index
pub const RUNFORGE_DIR_NAME: &str = ".runforge";

const INDEX_FILE_NAME: &str = "index.json";

/// One well-formed ledger row.
///
/// Fields this version does not know are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub run_id: String,
    pub created_at: String,
    pub dataset_fingerprint_sha256: String,
    pub label_column: String,
    /// Path to `run.json`, relative to the `.runforge` directory
    pub run_dir: String,
    /// Path to `model.pkl`, relative to the `.runforge` directory
    pub model_pkl: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A stored row: a [`RunEntry`], or anything else found in `runs`, kept
/// verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunRecord {
    Entry(RunEntry),
    Unrecognized(Value),
}

impl RunRecord {
    pub fn entry(&self) -> Option<&RunEntry> {
        match self {
            RunRecord::Entry(entry) => Some(entry),
            RunRecord::Unrecognized(_) => None,
        }
    }
}

/// The persisted index document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceIndex {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub runs: Vec<RunRecord>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_schema_version() -> String {
    INDEX_SCHEMA_VERSION.to_string()
}

impl Default for ProvenanceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceIndex {
    pub fn new() -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION.to_string(),
            runs: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, entry: RunEntry) {
        self.runs.push(RunRecord::Entry(entry));
    }

    /// Well-formed rows in ledger order. Unrecognized rows stay in the
    /// file but are not queryable.
    pub fn entries(&self) -> impl Iterator<Item = &RunEntry> {
        self.runs.iter().filter_map(RunRecord::entry)
    }

    pub fn latest(&self) -> Option<&RunEntry> {
        self.entries().last()
    }

    pub fn by_id(&self, run_id: &str) -> Option<&RunEntry> {
        self.entries().find(|run| run.run_id == run_id)
    }

    /// All runs on a dataset, in ledger order
    pub fn by_fingerprint(&self, fingerprint: &str) -> Vec<&RunEntry> {
        self.entries()
            .filter(|run| run.dataset_fingerprint_sha256 == fingerprint)
            .collect()
    }
}

/// A fully written temp file waiting to replace the index.
///
/// Dropping it without [`StagedIndex::commit`] leaves the live index
/// untouched, which is what a crash between the two steps looks like.
#[derive(Debug)]
pub struct StagedIndex {
    temp_path: PathBuf,
    index_path: PathBuf,
}

impl StagedIndex {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically replace the live index with the staged document
    pub fn commit(self) -> Result<()> {
        if let Err(err) = fs::rename(&self.temp_path, &self.index_path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(err.into());
        }
        Ok(())
    }
}

/// Reads and writes the index inside one `.runforge` directory
#[derive(Debug, Clone)]
pub struct ProvenanceStore {
    dir: PathBuf,
}

impl ProvenanceStore {
    pub fn new(runforge_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: runforge_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    /// Load the index.
    ///
    /// A missing file yields an empty index and nothing is written. A
    /// corrupt file is backed up and replaced by an empty index in memory;
    /// this path never fails.
    pub fn load(&self) -> Result<ProvenanceIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(ProvenanceIndex::new());
        }

        let bytes = fs::read(&path)?;
        match parse_index(&bytes) {
            Some(index) => Ok(index),
            None => {
                self.quarantine(&path);
                Ok(ProvenanceIndex::new())
            }
        }
    }

    fn quarantine(&self, path: &Path) {
        let backup = backup_path_for(path);
        match fs::rename(path, &backup) {
            Ok(()) => warn!(
                backup = %backup.display(),
                "Corrupt provenance index backed up, starting fresh"
            ),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Corrupt provenance index could not be backed up, starting fresh"
            ),
        }
    }

    /// Write the full document to the temp sibling without touching the
    /// live index.
    pub fn stage(&self, index: &ProvenanceIndex) -> Result<StagedIndex> {
        fs::create_dir_all(&self.dir)?;
        let index_path = self.index_path();
        let temp_path = temp_path_for(&index_path);
        fs::write(&temp_path, to_canonical_pretty(index)?)?;
        Ok(StagedIndex {
            temp_path,
            index_path,
        })
    }

    /// Stage then commit
    pub fn save(&self, index: &ProvenanceIndex) -> Result<()> {
        self.stage(index)?.commit()
    }

    /// Load, push `entry` at the end, save
    pub fn append(&self, entry: RunEntry) -> Result<()> {
        let mut index = self.load()?;
        debug!(run_id = %entry.run_id, existing = index.runs.len(), "Appending run to provenance index");
        index.push(entry);
        self.save(&index)
    }

    pub fn latest(&self) -> Result<Option<RunEntry>> {
        Ok(self.load()?.latest().cloned())
    }

    pub fn by_id(&self, run_id: &str) -> Result<Option<RunEntry>> {
        Ok(self.load()?.by_id(run_id).cloned())
    }

    pub fn by_fingerprint(&self, fingerprint: &str) -> Result<Vec<RunEntry>> {
        Ok(self
            .load()?
            .by_fingerprint(fingerprint)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Every run, oldest first
    pub fn list(&self) -> Result<Vec<RunEntry>> {
        Ok(self.load()?.entries().cloned().collect())
    }
}

/// First unused `index.json.corrupt.<unix-ms>[.<n>]` next to `path`
fn backup_path_for(path: &Path) -> PathBuf {
    let stem = format!("{}.corrupt.{}", INDEX_FILE_NAME, Utc::now().timestamp_millis());
    let mut candidate = path.with_file_name(&stem);
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{}.{}", stem, n));
        n += 1;
    }
    candidate
}

/// `None` when the bytes are not a JSON object with a `runs` list
fn parse_index(bytes: &[u8]) -> Option<ProvenanceIndex> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    if !value.as_object()?.contains_key("runs") {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Find the `.runforge` directory for an output path.
///
/// If `start` is inside a `.runforge` directory, that directory is used.
/// Otherwise each ancestor is checked for a `.runforge` child.
pub fn find_runforge_dir(start: &Path) -> Option<PathBuf> {
    let current = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    if let Some(inside) = current
        .ancestors()
        .find(|p| p.file_name().map_or(false, |n| n == RUNFORGE_DIR_NAME))
    {
        return Some(inside.to_path_buf());
    }

    current
        .ancestors()
        .skip(1)
        .map(|p| p.join(RUNFORGE_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// `path` relative to `base`, with forward slashes
pub fn relative_slash_path(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
