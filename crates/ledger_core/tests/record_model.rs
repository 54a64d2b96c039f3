use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use ledger_core::{
    BlockStore, IdGenerator, Record, RecordFields, RecordId, RecordValidationError,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;

fn taipei(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
}

fn lunch_fields() -> RecordFields {
    RecordFields {
        timestamp: Some(taipei(2024, 3, 4, 12, 30)),
        summary: Some("Lunch".to_string()),
        category: Some("food".to_string()),
        tags: vec!["work".to_string(), " team ".to_string(), "work".to_string()],
        amount: Some(Decimal::new(-12050, 2)),
        currency: None,
        payment_method: Some("cash".to_string()),
    }
}

fn lunch() -> Record {
    Record::create(lunch_fields(), &mut IdGenerator::seeded(1)).unwrap()
}

#[test]
fn create_normalizes_fields_and_sets_defaults() {
    let record = lunch();

    assert_eq!(
        record.timestamp(),
        Utc.with_ymd_and_hms(2024, 3, 4, 4, 30, 0).unwrap()
    );
    assert_eq!(record.summary(), "Lunch");
    assert_eq!(record.category(), "food");
    assert_eq!(
        record.tags(),
        &BTreeSet::from(["team".to_string(), "work".to_string()])
    );
    assert_eq!(record.amount(), Decimal::new(-12050, 2));
    assert_eq!(record.currency(), "NTD");
    assert_eq!(record.payment_method(), "cash");
    assert!(!record.is_deleted());
    assert!(!record.id().as_str().is_empty());
}

#[test]
fn create_reports_missing_required_fields() {
    let cases: [(&str, fn(&mut RecordFields)); 5] = [
        ("timestamp", |f| f.timestamp = None),
        ("summary", |f| f.summary = None),
        ("category", |f| f.category = None),
        ("amount", |f| f.amount = None),
        ("payment_method", |f| f.payment_method = None),
    ];

    for (name, strip) in cases {
        let mut fields = lunch_fields();
        strip(&mut fields);
        let err = Record::create(fields, &mut IdGenerator::seeded(1)).unwrap_err();
        assert_eq!(err, RecordValidationError::MissingField(name));
    }
}

#[test]
fn create_rejects_blank_text_and_tags() {
    let mut fields = lunch_fields();
    fields.category = Some("   ".to_string());
    let err = Record::create(fields, &mut IdGenerator::seeded(1)).unwrap_err();
    assert_eq!(err, RecordValidationError::BlankField("category"));

    let mut fields = lunch_fields();
    fields.tags = vec!["ok".to_string(), " ".to_string()];
    let err = Record::create(fields, &mut IdGenerator::seeded(1)).unwrap_err();
    assert_eq!(err, RecordValidationError::BlankTag);
}

#[test]
fn line_uses_stored_key_names_and_utc_offset() {
    let record = lunch();
    let json: serde_json::Value = serde_json::from_str(&record.to_line().unwrap()).unwrap();

    assert_eq!(json["date"], "2024-03-04T04:30:00+00:00");
    assert_eq!(json["summary"], "Lunch");
    assert_eq!(json["type"], "food");
    assert_eq!(json["tags"], serde_json::json!(["team", "work"]));
    assert_eq!(json["amount"].to_string(), "-120.50");
    assert_eq!(json["currency"], "NTD");
    assert_eq!(json["payment"], "cash");
    assert_eq!(json["id"], record.id().as_str());
    assert_eq!(json["deleted"], false);
}

#[test]
fn serialized_line_reads_back_field_equal() {
    let mut record = lunch();
    record.delete();

    let line = record.to_line().unwrap();
    let decoded = Record::from_serialized(&line, &mut IdGenerator::seeded(99)).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn amounts_beyond_f64_precision_survive_a_round_trip() {
    let amounts = [
        Decimal::from_str("1234567890123.4567").unwrap(),
        Decimal::from_str("9007199254740993").unwrap(),
        Decimal::MAX,
        Decimal::MIN,
        Decimal::from_str("0.0000000000000000000000000001").unwrap(),
    ];

    for amount in amounts {
        let mut fields = lunch_fields();
        fields.amount = Some(amount);
        let record = Record::create(fields, &mut IdGenerator::seeded(3)).unwrap();

        let line = record.to_line().unwrap();
        let decoded = Record::from_serialized(&line, &mut IdGenerator::seeded(4)).unwrap();
        assert_eq!(decoded.amount(), amount, "line: {line}");
        assert_eq!(decoded, record);
    }
}

#[test]
fn amount_is_written_as_exact_numeral() {
    let mut record = lunch();
    record.set_amount(Decimal::from_str("9007199254740993").unwrap());

    let line = record.to_line().unwrap();
    assert!(line.contains(r#""amount":9007199254740993,"#), "line: {line}");
}

#[test]
fn legacy_amount_forms_are_accepted() {
    let cases = [("120.0", Decimal::from(120)), ("-7", Decimal::from(-7)), ("1.5e2", Decimal::from(150))];

    for (numeral, expected) in cases {
        let line = format!(
            r#"{{"date": "2021-03-04T12:30:00+00:00", "summary": "x", "type": "t", "tags": [], "amount": {numeral}, "payment": "cash"}}"#
        );
        let record = Record::from_serialized(&line, &mut IdGenerator::seeded(5)).unwrap();
        assert_eq!(record.amount(), expected);
    }
}

#[test]
fn legacy_line_without_id_or_deleted_gets_defaults() {
    let line = r#"{"date": "2021-03-04T20:30:00+08:00", "summary": "lunch", "type": "food", "tags": ["work"], "amount": 120.0, "currency": "NTD", "payment": "cash"}"#;

    let record = Record::from_serialized(line, &mut IdGenerator::seeded(5)).unwrap();
    assert_eq!(
        record.timestamp(),
        Utc.with_ymd_and_hms(2021, 3, 4, 12, 30, 0).unwrap()
    );
    assert_eq!(record.amount(), Decimal::from(120));
    assert!(!record.is_deleted());
    assert!(!record.id().as_str().is_empty());
}

#[test]
fn stored_id_and_tombstone_are_kept() {
    let line = r#"{"date": "2021-03-04T12:30:00+00:00", "summary": "lunch", "type": "food", "tags": [], "amount": 5, "currency": "USD", "payment": "card", "id": "abc123", "deleted": true}"#;

    let record = Record::from_serialized(line, &mut IdGenerator::seeded(5)).unwrap();
    assert_eq!(record.id(), &RecordId::parse("abc123").unwrap());
    assert!(record.is_deleted());
    assert_eq!(record.currency(), "USD");
}

#[test]
fn malformed_lines_fail_to_deserialize() {
    let mut ids = IdGenerator::seeded(5);
    let bad_lines = [
        "",
        "{",
        "not json",
        r#"{"date": "yesterday", "summary": "x", "type": "t", "tags": [], "amount": 1, "payment": "cash"}"#,
        r#"{"date": "2021-03-04T12:30:00+00:00", "summary": "x", "type": "t", "tags": [], "amount": "1", "payment": "cash"}"#,
        r#"{"date": "2021-03-04T12:30:00+00:00", "summary": "x", "type": "t", "tags": [], "amount": 1}"#,
        r#"{"date": "2021-03-04T12:30:00+00:00", "summary": "x", "type": "t", "tags": [], "amount": 1, "payment": "cash", "id": ""}"#,
    ];

    for line in bad_lines {
        assert!(
            Record::from_serialized(line, &mut ids).is_err(),
            "line should be rejected: {line}"
        );
    }
}

#[test]
fn text_setters_reject_blank_values_without_changing_state() {
    let mut record = lunch();

    assert_eq!(
        record.set_summary("  "),
        Err(RecordValidationError::BlankField("summary"))
    );
    assert_eq!(record.summary(), "Lunch");

    assert_eq!(record.set_category(" groceries ").unwrap(), "groceries");
    assert_eq!(record.set_payment_method("card").unwrap(), "card");
    assert_eq!(record.payment_method(), "card");
}

#[test]
fn tag_mutators_validate_and_report_changes() {
    let mut record = lunch();

    assert_eq!(
        record.set_tags(["a", ""]).unwrap_err(),
        RecordValidationError::BlankTag
    );
    assert_eq!(record.tags().len(), 2);

    record.set_tags(["x", "y"]).unwrap();
    assert!(record.add_tag(" z ").unwrap());
    assert!(!record.add_tag("x").unwrap());
    assert_eq!(record.add_tag(" "), Err(RecordValidationError::BlankTag));
    assert!(record.remove_tag("y"));
    assert!(!record.remove_tag("missing"));
    assert_eq!(
        record.tags(),
        &BTreeSet::from(["x".to_string(), "z".to_string()])
    );
}

#[test]
fn amount_setters_parse_text_and_keep_value_on_error() {
    let mut record = lunch();

    assert!(matches!(
        record.set_amount_text("12.5x"),
        Err(RecordValidationError::InvalidAmount(_))
    ));
    assert_eq!(record.amount(), Decimal::new(-12050, 2));

    assert_eq!(record.set_amount_text(" -3.25 ").unwrap(), Decimal::new(-325, 2));
    assert_eq!(record.set_amount(Decimal::from(7)), Decimal::from(7));
}

#[test]
fn delete_and_edits_only_persist_on_explicit_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path()).unwrap();
    let mut record = lunch();
    let path = store.block_path(ledger_core::block_number(record.timestamp()));

    record.set_summary("Dinner").unwrap();
    record.delete();
    assert!(!path.exists());

    record.store(&store).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 1);

    record.restore();
    assert!(!record.is_deleted());
}
