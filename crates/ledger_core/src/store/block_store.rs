//! File-backed block store.
//!
//! # Responsibility
//! - Own the storage directory and the per-block `financial_*.jsonl` files.
//! - Append one line per stored record version.
//! - Replay blocks into views for range and aggregate queries.
//!
//! # Invariants
//! - Each append opens, writes one whole line with a single `write_all`,
//!   and closes. No handle outlives a call.
//! - No application-level locking: concurrent writers to one block rely on
//!   the filesystem's single-append atomicity only.
//! - Within one file, the later line for an id wins.

use super::block::{block_file_name, block_number, block_range, parse_block_file_name};
use super::{BlockLoad, LineWarning, RecordSink, StoreError, StoreResult};
use crate::model::id::{IdGenerator, RecordId};
use crate::model::record::Record;
use crate::view::record_set::RecordSet;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Append-only, 10-day partitioned record log rooted at one directory.
#[derive(Debug)]
pub struct BlockStore {
    root: PathBuf,
    // Mints ids for legacy lines stored without one.
    ids: RefCell<IdGenerator>,
}

impl BlockStore {
    /// Opens a store, creating `root` when missing.
    ///
    /// # Errors
    /// - `PathConflict` when `root` exists and is not a directory.
    /// - `Io` when the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_ids(root, IdGenerator::from_entropy())
    }

    /// Opens a store with an explicit id generator.
    pub fn open_with_ids(root: impl AsRef<Path>, ids: IdGenerator) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        ensure_directory(&root)?;
        info!(
            "event=store_open module=store status=ok root={}",
            root.display()
        );
        Ok(Self {
            root,
            ids: RefCell::new(ids),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `block`.
    pub fn block_path(&self, block: i64) -> PathBuf {
        self.root.join(block_file_name(block))
    }

    /// Mints a fresh record id from the store's generator.
    pub fn generate_id(&self, timestamp: DateTime<Utc>) -> RecordId {
        self.ids.borrow_mut().generate(timestamp)
    }

    /// Runs `f` with mutable access to the store's id generator.
    pub fn with_ids<T>(&self, f: impl FnOnce(&mut IdGenerator) -> T) -> T {
        f(&mut *self.ids.borrow_mut())
    }

    /// Appends the record's current state to the block of its timestamp.
    ///
    /// # Errors
    /// - `Serialize` when the record cannot be encoded.
    /// - `Io` on open or write failure. Never retried.
    pub fn append(&self, record: &Record) -> StoreResult<()> {
        let block = block_number(record.timestamp());
        let path = self.block_path(block);
        let mut line = record.to_line()?;
        line.push('\n');

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        match result {
            Ok(()) => {
                debug!(
                    "event=record_append module=store status=ok block={} id={} deleted={}",
                    block,
                    record.id(),
                    record.is_deleted()
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=record_append module=store status=error block={} id={} error={}",
                    block,
                    record.id(),
                    source
                );
                Err(StoreError::Io { path, source })
            }
        }
    }

    /// Replays one block file into a fresh view.
    ///
    /// A missing file yields an empty load. Undecodable lines are skipped,
    /// logged at `warn`, and returned as warnings.
    pub fn load_block(&self, block: i64) -> StoreResult<BlockLoad> {
        let path = self.block_path(block);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BlockLoad::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut reader = BufReader::new(file);
        let mut load = BlockLoad::default();
        let mut buffer = Vec::new();
        let mut line_number = 0;
        let mut ids = self.ids.borrow_mut();

        loop {
            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            line_number += 1;

            let line = buffer.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match Record::from_serialized_bytes(line, &mut *ids) {
                Ok(record) => load.records.replace(record),
                Err(error) => {
                    warn!(
                        "event=line_skipped module=store status=skip block={} line={} error={}",
                        block, line_number, error
                    );
                    load.warnings.push(LineWarning {
                        path: path.clone(),
                        line_number,
                        error,
                    });
                }
            }
        }

        debug!(
            "event=block_load module=store status=ok block={} lines={} live={} skipped={}",
            block,
            line_number,
            load.records.len(),
            load.warnings.len()
        );
        Ok(load)
    }

    /// Materializes the live records dated within `[start, end]`.
    ///
    /// Blocks are combined in ascending order, then trimmed to the exact
    /// bounds (inclusive on both ends).
    pub fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<BlockLoad> {
        let started_at = Instant::now();
        let mut merged = BlockLoad::default();
        for block in block_range(start, end) {
            merged.absorb(self.load_block(block)?);
        }
        merged.records.filter_by_date(start, end);

        info!(
            "event=query_range module=store status=ok blocks={} live={} skipped={} duration_ms={}",
            block_range(start, end).count(),
            merged.records.len(),
            merged.warnings.len(),
            started_at.elapsed().as_millis()
        );
        Ok(merged)
    }

    /// Block numbers that have a file in the storage directory, ascending.
    pub fn list_blocks(&self) -> StoreResult<Vec<i64>> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.root.clone(),
            source,
        };

        let mut blocks = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            if let Some(block) = entry.file_name().to_str().and_then(parse_block_file_name) {
                blocks.push(block);
            }
        }
        blocks.sort_unstable();
        Ok(blocks)
    }

    /// Loads every block file independently, in ascending block order.
    ///
    /// Each block gets its own view; nothing is combined across files.
    pub fn scan_all_blocks(&self, mut visit: impl FnMut(i64, BlockLoad)) -> StoreResult<()> {
        for block in self.list_blocks()? {
            visit(block, self.load_block(block)?);
        }
        Ok(())
    }

    /// Unions one aggregate over every block, each loaded independently.
    ///
    /// Edits never move a record out of its block, so per-file views agree
    /// with a fully combined one.
    pub fn aggregate_all<F>(&self, extract: F) -> StoreResult<BTreeSet<String>>
    where
        F: Fn(&RecordSet) -> &BTreeSet<String>,
    {
        let mut union = BTreeSet::new();
        self.scan_all_blocks(|_, load| {
            union.extend(extract(&load.records).iter().cloned());
        })?;
        Ok(union)
    }

    /// Combines every block in ascending order into one view.
    pub fn load_all(&self) -> StoreResult<BlockLoad> {
        let mut merged = BlockLoad::default();
        self.scan_all_blocks(|_, load| merged.absorb(load))?;
        Ok(merged)
    }
}

impl RecordSink for BlockStore {
    fn append(&self, record: &Record) -> StoreResult<()> {
        BlockStore::append(self, record)
    }
}

fn ensure_directory(root: &Path) -> StoreResult<()> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => {
            error!(
                "event=store_open module=store status=error error_code=path_conflict root={}",
                root.display()
            );
            Err(StoreError::PathConflict(root.to_path_buf()))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(root).map_err(|source| StoreError::Io {
                path: root.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(StoreError::Io {
            path: root.to_path_buf(),
            source,
        }),
    }
}
