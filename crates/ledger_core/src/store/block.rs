//! Block arithmetic and block file naming.
//!
//! Block `n` covers `[epoch + 10n days, epoch + 10(n+1) days)`. Instants
//! before the epoch fall into negative blocks.

use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;

/// 1984-12-21T00:00:00Z as unix seconds.
pub const EPOCH_UNIX_SECONDS: i64 = 472_435_200;
/// Width of one block: 10 days.
pub const BLOCK_SPAN_SECONDS: i64 = 10 * 24 * 60 * 60;

const BLOCK_FILE_PREFIX: &str = "financial_";
const BLOCK_FILE_SUFFIX: &str = ".jsonl";

static BLOCK_FILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^financial_(-?\d+)\.jsonl$").expect("block file pattern is a valid regex")
});

/// Reference instant of block 0.
pub fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(EPOCH_UNIX_SECONDS)
}

/// Block containing `timestamp`.
pub fn block_number(timestamp: DateTime<Utc>) -> i64 {
    // `timestamp()` floors sub-second parts, so floor division stays exact.
    (timestamp.timestamp() - EPOCH_UNIX_SECONDS).div_euclid(BLOCK_SPAN_SECONDS)
}

/// Inclusive block numbers covering `[start, end]`; empty when `start > end`.
pub fn block_range(start: DateTime<Utc>, end: DateTime<Utc>) -> RangeInclusive<i64> {
    if start > end {
        return RangeInclusive::new(1, 0);
    }
    block_number(start)..=block_number(end)
}

/// First instant of block `block`, or `None` past the representable range.
pub fn block_start(block: i64) -> Option<DateTime<Utc>> {
    let offset = block.checked_mul(BLOCK_SPAN_SECONDS)?;
    epoch().checked_add_signed(TimeDelta::try_seconds(offset)?)
}

pub fn block_file_name(block: i64) -> String {
    format!("{BLOCK_FILE_PREFIX}{block:08}{BLOCK_FILE_SUFFIX}")
}

/// Block number encoded in a block file name, if the name is one.
///
/// Only canonical names round-trip: `financial_14250.jsonl` is not the file
/// block 14250 is read from, so it is not reported as a block.
pub fn parse_block_file_name(name: &str) -> Option<i64> {
    BLOCK_FILE_PATTERN
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .filter(|block| block_file_name(*block) == name)
}
