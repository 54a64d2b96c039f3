//! Ledger facade.
//!
//! # Responsibility
//! - Single entry point for input/report layers: create, store, query.
//! - Hide block arithmetic and replay details behind range/aggregate calls.
//!
//! # Invariants
//! - Every read builds a fresh view; nothing is cached across calls.
//! - Writes go straight to the block store; there is no autosave.

use crate::config::LedgerConfig;
use crate::model::id::RecordId;
use crate::model::record::{Record, RecordFields, RecordValidationError};
use crate::store::{BlockStore, RecordSink, StoreResult};
use crate::view::record_set::RecordSet;
use chrono::{DateTime, Utc};
use log::warn;
use std::collections::BTreeSet;

/// Personal ledger over a partitioned block store.
#[derive(Debug)]
pub struct Ledger {
    store: BlockStore,
    default_currency: String,
}

impl Ledger {
    /// Opens the ledger described by `config`.
    ///
    /// # Errors
    /// - `PathConflict` when the storage dir exists as a non-directory.
    pub fn open(config: &LedgerConfig) -> StoreResult<Self> {
        let store = BlockStore::open(&config.storage_dir)?;
        Ok(Self {
            store,
            default_currency: config.default_currency.clone(),
        })
    }

    /// Wraps an already opened store.
    pub fn with_store(store: BlockStore, default_currency: impl Into<String>) -> Self {
        Self {
            store,
            default_currency: default_currency.into(),
        }
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Builds a new, not yet stored record from input fields.
    ///
    /// Fills the configured default currency when `fields.currency` is absent.
    pub fn make_record(&self, mut fields: RecordFields) -> Result<Record, RecordValidationError> {
        if fields.currency.is_none() {
            fields.currency = Some(self.default_currency.clone());
        }
        self.store.with_ids(|ids| Record::create(fields, ids))
    }

    /// Live records dated within `[start, end]`, both inclusive.
    ///
    /// Undecodable lines are skipped and logged at `warn`.
    pub fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<RecordSet> {
        let load = self.store.query_range(start, end)?;
        for warning in &load.warnings {
            warn!(
                "event=query_range module=ledger status=skip warning={}",
                warning
            );
        }
        Ok(load.records)
    }

    /// Latest live version of `id` across the whole ledger.
    pub fn find_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        let load = self.store.load_all()?;
        Ok(load.records.find_by_id(id).cloned())
    }

    pub fn all_categories(&self) -> StoreResult<BTreeSet<String>> {
        self.store.aggregate_all(RecordSet::distinct_categories)
    }

    pub fn all_tags(&self) -> StoreResult<BTreeSet<String>> {
        self.store.aggregate_all(RecordSet::distinct_tags)
    }

    pub fn all_payment_methods(&self) -> StoreResult<BTreeSet<String>> {
        self.store.aggregate_all(RecordSet::distinct_payment_methods)
    }
}

impl RecordSink for Ledger {
    fn append(&self, record: &Record) -> StoreResult<()> {
        self.store.append(record)
    }
}
