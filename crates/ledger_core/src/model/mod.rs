//! Ledger domain model.
//!
//! # Responsibility
//! - Define the record entity, its identifiers and its line format.
//!
//! # Invariants
//! - Every logical record keeps one `RecordId` across all stored versions.
//! - Deletion is a tombstone version, never an erasure of older lines.

pub mod id;
pub mod record;
