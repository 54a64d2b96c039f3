//! Time-partitioned append-only record log.
//!
//! # Responsibility
//! - Map record timestamps to fixed 10-day blocks and their backing files.
//! - Append record versions and replay whole blocks into views.
//!
//! # Invariants
//! - Block files are only ever appended to; no line is rewritten.
//! - A record version is always appended to the block of its own timestamp.
//! - A malformed line never fails a block load; it becomes a `LineWarning`.
//!
//! # See also
//! - `crate::view::record_set` for the merge semantics applied on replay.

use crate::model::record::{DeserializationError, Record};
use crate::view::record_set::RecordSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod block;
mod block_store;

pub use block_store::BlockStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer error.
#[derive(Debug)]
pub enum StoreError {
    /// Storage root exists but is not a directory.
    PathConflict(PathBuf),
    /// Filesystem failure on the given path.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Record could not be turned into a line.
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathConflict(path) => {
                write!(f, "storage path `{}` exists and is not a directory", path.display())
            }
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Serialize(err) => write!(f, "failed to serialize record: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PathConflict(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Destination for stored record versions.
pub trait RecordSink {
    /// Appends the record's current state under its own block.
    fn append(&self, record: &Record) -> StoreResult<()>;
}

/// One skipped line from a block file.
#[derive(Debug)]
pub struct LineWarning {
    pub path: PathBuf,
    /// 1-based line number inside the block file.
    pub line_number: usize,
    pub error: DeserializationError,
}

impl Display for LineWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: skipped line: {}",
            self.path.display(),
            self.line_number,
            self.error
        )
    }
}

/// Result of replaying one or more blocks.
#[derive(Debug, Default)]
pub struct BlockLoad {
    pub records: RecordSet,
    pub warnings: Vec<LineWarning>,
}

impl BlockLoad {
    /// Folds a later block into this one; its versions win on conflict.
    pub fn absorb(&mut self, later: BlockLoad) {
        self.records.combine(later.records);
        self.warnings.extend(later.warnings);
    }
}
