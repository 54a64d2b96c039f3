//! Read-side materialized views.
//!
//! # Responsibility
//! - Turn replayed record versions into a consistent point-in-time view.

pub mod record_set;
