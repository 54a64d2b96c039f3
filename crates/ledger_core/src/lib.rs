//! Core storage and materialization logic for a personal ledger.
//!
//! Records are appended to 10-day block files and materialized into
//! point-in-time views with latest-write-wins and tombstone deletes.

pub mod config;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod view;

pub use config::{ConfigError, ConfigResult, LedgerConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::id::{encode_base36, IdGenerator, InvalidRecordId, RecordId, ID_SCALE};
pub use model::record::{
    DeserializationError, Record, RecordFields, RecordValidationError, DEFAULT_CURRENCY,
};
pub use service::ledger::Ledger;
pub use store::block::{block_number, block_range, epoch};
pub use store::{BlockLoad, BlockStore, LineWarning, RecordSink, StoreError, StoreResult};
pub use view::record_set::{RecordSet, RecordSetError, RecordSetResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
