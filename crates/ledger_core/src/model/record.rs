//! Ledger record domain model.
//!
//! # Responsibility
//! - Define the canonical financial record and its line serialization.
//! - Provide typed, validating mutators and tombstone helpers.
//!
//! # Invariants
//! - `id` is assigned once and survives every edit of the same record.
//! - `timestamp` is always stored in UTC.
//! - Text fields and tags are trimmed and never blank after creation.
//! - Mutators never persist; callers invoke `store` explicitly.
//!
//! # See also
//! - `crate::store::block_store` for where stored lines land.

use super::id::{IdGenerator, RecordId};
use crate::store::{RecordSink, StoreResult};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Currency applied when neither caller nor stored line provides one.
pub const DEFAULT_CURRENCY: &str = "NTD";

/// Validation failure for record construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    MissingField(&'static str),
    BlankField(&'static str),
    BlankTag,
    InvalidAmount(String),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "required field `{name}` is missing"),
            Self::BlankField(name) => write!(f, "field `{name}` cannot be blank"),
            Self::BlankTag => write!(f, "tags cannot be blank"),
            Self::InvalidAmount(text) => write!(f, "`{text}` is not a valid amount"),
        }
    }
}

impl Error for RecordValidationError {}

/// Failure to decode one stored line.
#[derive(Debug)]
pub struct DeserializationError {
    source: serde_json::Error,
}

impl DeserializationError {
    /// Column reported by the JSON decoder, 1-based.
    pub fn column(&self) -> usize {
        self.source.column()
    }
}

impl Display for DeserializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed record line: {}", self.source)
    }
}

impl Error for DeserializationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Caller-supplied fields for a brand new record.
///
/// Mirrors what an input layer collects; every member is optional so that
/// absence can be reported as a validation error instead of a type error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields {
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub amount: Option<Decimal>,
    /// Falls back to [`DEFAULT_CURRENCY`] when absent.
    pub currency: Option<String>,
    pub payment_method: Option<String>,
}

/// One version of a ledger record.
///
/// Serialized keys follow the stored line format:
/// `date, summary, type, tags, amount, currency, payment, id, deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(rename = "date", serialize_with = "serialize_timestamp")]
    timestamp: DateTime<Utc>,
    summary: String,
    #[serde(rename = "type")]
    category: String,
    tags: BTreeSet<String>,
    #[serde(serialize_with = "serialize_amount")]
    amount: Decimal,
    currency: String,
    #[serde(rename = "payment")]
    payment_method: String,
    id: RecordId,
    deleted: bool,
}

/// Wire shape accepted on read; `id`/`deleted` may be absent in old lines.
#[derive(Deserialize)]
struct StoredLine {
    #[serde(deserialize_with = "deserialize_timestamp")]
    date: DateTime<Utc>,
    summary: String,
    #[serde(rename = "type")]
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(deserialize_with = "deserialize_amount")]
    amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
    payment: String,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    deleted: Option<bool>,
}

impl Record {
    /// Creates a new live record with a freshly minted id.
    ///
    /// # Errors
    /// - `MissingField` when timestamp, summary, category, amount or payment
    ///   method is absent.
    /// - `BlankField` / `BlankTag` when a text value is empty after trimming.
    pub fn create<R: RngCore>(
        fields: RecordFields,
        ids: &mut IdGenerator<R>,
    ) -> Result<Self, RecordValidationError> {
        let timestamp = fields
            .timestamp
            .ok_or(RecordValidationError::MissingField("timestamp"))?
            .with_timezone(&Utc);
        let summary = required_text(fields.summary, "summary")?;
        let category = required_text(fields.category, "category")?;
        let amount = fields
            .amount
            .ok_or(RecordValidationError::MissingField("amount"))?;
        let payment_method = required_text(fields.payment_method, "payment_method")?;
        let currency = match fields.currency {
            Some(currency) => normalize_text(currency, "currency")?,
            None => DEFAULT_CURRENCY.to_string(),
        };
        let tags = normalize_tags(fields.tags)?;

        Ok(Self {
            id: ids.generate(timestamp),
            timestamp,
            summary,
            category,
            tags,
            amount,
            currency,
            payment_method,
            deleted: false,
        })
    }

    /// Rebuilds a record from one stored line.
    ///
    /// A missing `id` is minted from the line's timestamp and a missing
    /// `deleted` flag reads as `false`.
    pub fn from_serialized<R: RngCore>(
        line: &str,
        ids: &mut IdGenerator<R>,
    ) -> Result<Self, DeserializationError> {
        Self::from_serialized_bytes(line.as_bytes(), ids)
    }

    /// Byte-level variant of [`Record::from_serialized`].
    ///
    /// Invalid UTF-8 is reported as a decode error, not an I/O error.
    pub fn from_serialized_bytes<R: RngCore>(
        line: &[u8],
        ids: &mut IdGenerator<R>,
    ) -> Result<Self, DeserializationError> {
        let stored: StoredLine =
            serde_json::from_slice(line).map_err(|source| DeserializationError { source })?;

        let timestamp = stored.date;
        let id = match stored.id {
            Some(id) => id,
            None => ids.generate(timestamp),
        };

        Ok(Self {
            timestamp,
            summary: stored.summary,
            category: stored.category,
            tags: stored
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            amount: stored.amount,
            currency: stored
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            payment_method: stored.payment,
            id,
            deleted: stored.deleted.unwrap_or(false),
        })
    }

    /// Canonical single-line JSON form, without a trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Replaces the amount. Always succeeds; the type is checked statically.
    pub fn set_amount(&mut self, amount: Decimal) -> Decimal {
        self.amount = amount;
        self.amount
    }

    /// Parses and replaces the amount from user text such as `"-12.50"`.
    ///
    /// The record is unchanged on error.
    pub fn set_amount_text(&mut self, text: &str) -> Result<Decimal, RecordValidationError> {
        let amount = Decimal::from_str(text.trim())
            .map_err(|_| RecordValidationError::InvalidAmount(text.to_string()))?;
        Ok(self.set_amount(amount))
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) -> Result<&str, RecordValidationError> {
        self.summary = normalize_text(summary.into(), "summary")?;
        Ok(&self.summary)
    }

    pub fn set_category(
        &mut self,
        category: impl Into<String>,
    ) -> Result<&str, RecordValidationError> {
        self.category = normalize_text(category.into(), "category")?;
        Ok(&self.category)
    }

    pub fn set_payment_method(
        &mut self,
        payment_method: impl Into<String>,
    ) -> Result<&str, RecordValidationError> {
        self.payment_method = normalize_text(payment_method.into(), "payment_method")?;
        Ok(&self.payment_method)
    }

    /// Replaces the whole tag set. Any blank tag rejects the full update.
    pub fn set_tags<I, S>(&mut self, tags: I) -> Result<&BTreeSet<String>, RecordValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags)?;
        Ok(&self.tags)
    }

    /// Adds one tag. Returns `Ok(false)` when it was already present.
    pub fn add_tag(&mut self, tag: &str) -> Result<bool, RecordValidationError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(RecordValidationError::BlankTag);
        }
        Ok(self.tags.insert(tag.to_string()))
    }

    /// Removes one tag. Returns whether it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag.trim())
    }

    /// Marks this record as a tombstone. Nothing is written until `store`.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    /// Clears the tombstone flag.
    pub fn restore(&mut self) {
        self.deleted = false;
    }

    /// Appends the current state of this record to `sink`.
    pub fn store<S: RecordSink + ?Sized>(&self, sink: &S) -> StoreResult<()> {
        sink.append(self)
    }
}

fn required_text(
    value: Option<String>,
    name: &'static str,
) -> Result<String, RecordValidationError> {
    let value = value.ok_or(RecordValidationError::MissingField(name))?;
    normalize_text(value, name)
}

fn normalize_text(value: String, name: &'static str) -> Result<String, RecordValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordValidationError::BlankField(name));
    }
    if trimmed.len() == value.len() {
        return Ok(value);
    }
    Ok(trimmed.to_string())
}

fn normalize_tags<I, S>(tags: I) -> Result<BTreeSet<String>, RecordValidationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut normalized = BTreeSet::new();
    for tag in tags {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(RecordValidationError::BlankTag);
        }
        normalized.insert(trimmed.to_string());
    }
    Ok(normalized)
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| serde::de::Error::custom(format!("invalid date `{text}`: {err}")))
}

// Amounts travel as exact JSON numerals, never through f64.
fn serialize_amount<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let number = Number::from_str(&amount.to_string()).map_err(serde::ser::Error::custom)?;
    number.serialize(serializer)
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let number = Number::deserialize(deserializer)?;
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|err| serde::de::Error::custom(format!("invalid amount `{text}`: {err}")))
}
