//! Ledger use-case facade.
//!
//! # Responsibility
//! - Compose the block store into the API consumed by input and report layers.

pub mod ledger;
