use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use ledger_core::{encode_base36, IdGenerator, ID_SCALE};
use rand::rngs::mock::StepRng;
use std::collections::HashSet;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn decode(id: &str) -> i128 {
    i128::from_str_radix(id, 36).unwrap()
}

#[test]
fn id_encodes_creation_second_and_bounded_suffix() {
    let mut ids = IdGenerator::seeded(11);
    let created = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 15).unwrap();

    for _ in 0..100 {
        let value = decode(ids.generate(created).as_str());
        assert_eq!(value.div_euclid(i128::from(ID_SCALE)), i128::from(created.timestamp()));
        assert!((0..i128::from(ID_SCALE)).contains(&value.rem_euclid(i128::from(ID_SCALE))));
    }
}

#[test]
fn equal_seeds_mint_colliding_ids_within_one_second() {
    let created = at(1_700_000_000);
    let mut first = IdGenerator::seeded(42);
    let mut second = IdGenerator::seeded(42);

    assert_eq!(first.generate(created), second.generate(created));
}

#[test]
fn constant_randomness_collides_in_same_second_only() {
    let mut ids = IdGenerator::with_rng(StepRng::new(0, 0));
    let created = at(1_700_000_000);

    let a = ids.generate(created);
    let b = ids.generate(created);
    assert_eq!(a, b);
    assert_eq!(a.as_str(), encode_base36(1_700_000_000_i128 * 10_000));

    let next_second = ids.generate(created + TimeDelta::seconds(1));
    assert_ne!(a, next_second);
}

#[test]
fn same_second_ids_collide_once_suffix_space_is_exhausted() {
    let mut ids = IdGenerator::seeded(3);
    let created = at(1_600_000_000);

    let minted: HashSet<String> = (0..2 * ID_SCALE)
        .map(|_| ids.generate(created).as_str().to_string())
        .collect();

    assert!(minted.len() <= ID_SCALE as usize);
    assert!(minted.len() > 1);
}

#[test]
fn sub_second_parts_do_not_change_the_prefix() {
    let mut ids = IdGenerator::with_rng(StepRng::new(0, 0));
    let whole = at(1_650_000_000);
    let fractional = whole + TimeDelta::milliseconds(999);

    assert_eq!(ids.generate(whole), ids.generate(fractional));
}

#[test]
fn zero_value_encodes_as_zero_digit() {
    let mut ids = IdGenerator::with_rng(StepRng::new(0, 0));
    let id = ids.generate(DateTime::UNIX_EPOCH);
    assert_eq!(id.as_str(), "0");
}

#[test]
fn pre_1970_instants_encode_negative_values() {
    let mut ids = IdGenerator::with_rng(StepRng::new(0, 0));
    let id = ids.generate(at(-1));

    assert!(id.as_str().starts_with('-'));
    assert_eq!(decode(id.as_str()), -i128::from(ID_SCALE));
}
