//! Compact record identifiers.
//!
//! # Responsibility
//! - Derive a short base-36 key from a creation timestamp and a random suffix.
//! - Keep the randomness source injectable so collisions are reproducible.
//!
//! # Invariants
//! - Encoded value is `unix_seconds * ID_SCALE + suffix`, `suffix` in `[0, ID_SCALE)`.
//! - Value zero encodes as `"0"`, never as an empty string.
//! - Negative values (instants before 1970) carry a leading `-`.
//! - Ids are best-effort: two ids minted within the same second collide when
//!   their suffixes coincide. Callers must not assume global uniqueness.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Multiplier applied to unix seconds before adding the random suffix.
pub const ID_SCALE: i64 = 10_000;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier of one logical ledger record.
///
/// Assigned once at creation and carried unchanged by every stored version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Parses an identifier read from storage or typed by a user.
    ///
    /// # Errors
    /// - Returns an error when the value is blank or contains whitespace.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidRecordId> {
        let value = value.into();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(InvalidRecordId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

/// Rejected identifier text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecordId(pub String);

impl Display for InvalidRecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid record id `{}`", self.0)
    }
}

impl Error for InvalidRecordId {}

/// Mints record identifiers from timestamps.
#[derive(Debug)]
pub struct IdGenerator<R: RngCore = StdRng> {
    rng: R,
}

impl IdGenerator<StdRng> {
    /// Generator seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator; equal seeds mint equal id sequences.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> IdGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Mints an identifier for a record created at `timestamp`.
    pub fn generate(&mut self, timestamp: DateTime<Utc>) -> RecordId {
        let suffix = self.rng.gen_range(0..ID_SCALE);
        RecordId(encode_base36(id_value(timestamp, suffix)))
    }
}

/// Numeric value behind an identifier before base-36 encoding.
pub fn id_value(timestamp: DateTime<Utc>, suffix: i64) -> i128 {
    i128::from(timestamp.timestamp()) * i128::from(ID_SCALE) + i128::from(suffix)
}

/// Encodes `value` with digits `0-9a-z`, most significant digit first.
pub fn encode_base36(value: i128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut remaining = value.unsigned_abs();
    let mut digits = Vec::new();
    while remaining > 0 {
        digits.push(char::from(BASE36_DIGITS[(remaining % 36) as usize]));
        remaining /= 36;
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}
