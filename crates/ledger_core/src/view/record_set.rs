//! Materialized id -> record view with memoized aggregates.
//!
//! # Responsibility
//! - Hold the latest live version of each record seen during one query.
//! - Apply latest-write-wins and tombstone removal while replaying lines.
//! - Memoize distinct categories, tags and payment methods.
//!
//! # Invariants
//! - Tombstoned records are never present in `entries`.
//! - Every mutation bumps `generation` and drops all memoized aggregates.
//! - A view is built per query and never persisted.

use crate::model::id::RecordId;
use crate::model::record::Record;
use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RecordSetResult<T> = Result<T, RecordSetError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSetError {
    /// Strict insert hit an id that is already present.
    DuplicateId(RecordId),
}

impl Display for RecordSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "record id `{id}` is already in the set"),
        }
    }
}

impl Error for RecordSetError {}

/// Memo slots, reset wholesale on invalidation.
#[derive(Debug, Default)]
struct AggregateMemo {
    categories: OnceCell<BTreeSet<String>>,
    tags: OnceCell<BTreeSet<String>>,
    payment_methods: OnceCell<BTreeSet<String>>,
}

impl AggregateMemo {
    fn is_empty(&self) -> bool {
        self.categories.get().is_none()
            && self.tags.get().is_none()
            && self.payment_methods.get().is_none()
    }
}

/// Transient materialized view over replayed record versions.
#[derive(Debug, Default)]
pub struct RecordSet {
    entries: BTreeMap<RecordId, Record>,
    generation: u64,
    memo: AggregateMemo,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies one record version.
    ///
    /// A tombstone removes its id (no-op when absent); a live version
    /// overwrites or inserts.
    ///
    /// # Errors
    /// - `DuplicateId` when `allow_replace` is false and the id is present.
    ///   The existing entry is left untouched.
    pub fn insert(&mut self, record: Record, allow_replace: bool) -> RecordSetResult<()> {
        if !allow_replace && self.entries.contains_key(record.id()) {
            return Err(RecordSetError::DuplicateId(record.id().clone()));
        }
        self.apply(record);
        Ok(())
    }

    /// Merges `other` into this view, letting its versions win.
    ///
    /// Callers combine per-block views in ascending block order.
    pub fn combine(&mut self, other: RecordSet) {
        for record in other.entries.into_values() {
            self.apply(record);
        }
        self.invalidate();
    }

    /// Keeps only records with `start <= timestamp <= end`.
    pub fn filter_by_date(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.entries.retain(|_, record| {
            let timestamp = record.timestamp();
            start <= timestamp && timestamp <= end
        });
        self.invalidate();
    }

    /// Live records in non-decreasing timestamp order.
    ///
    /// Ties keep id order. The returned iterator is `Clone`, so a consumer
    /// can restart it without re-sorting.
    pub fn sorted_by_date(&self) -> std::vec::IntoIter<&Record> {
        let mut records: Vec<&Record> = self.entries.values().collect();
        records.sort_by_key(|record| record.timestamp());
        records.into_iter()
    }

    /// Live records in id order.
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.entries.values()
    }

    pub fn find_by_id(&self, id: &RecordId) -> Option<&Record> {
        self.entries.get(id)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.entries.into_values().collect()
    }

    pub fn distinct_categories(&self) -> &BTreeSet<String> {
        self.memo
            .categories
            .get_or_init(|| self.fold(|record| vec![record.category().to_string()]))
    }

    pub fn distinct_tags(&self) -> &BTreeSet<String> {
        self.memo
            .tags
            .get_or_init(|| self.fold(|record| record.tags().iter().cloned().collect()))
    }

    pub fn distinct_payment_methods(&self) -> &BTreeSet<String> {
        self.memo
            .payment_methods
            .get_or_init(|| self.fold(|record| vec![record.payment_method().to_string()]))
    }

    /// Mutation counter; advances on every insert, combine or filter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether any aggregate is currently memoized.
    pub fn has_cached_aggregates(&self) -> bool {
        !self.memo.is_empty()
    }

    /// Applies one version with replace-on-conflict semantics; cannot fail.
    pub(crate) fn replace(&mut self, record: Record) {
        self.apply(record);
    }

    fn apply(&mut self, record: Record) {
        if record.is_deleted() {
            self.entries.remove(record.id());
        } else {
            self.entries.insert(record.id().clone(), record);
        }
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.memo = AggregateMemo::default();
    }

    fn fold<F>(&self, extract: F) -> BTreeSet<String>
    where
        F: Fn(&Record) -> Vec<String>,
    {
        self.entries.values().flat_map(extract).collect()
    }
}
