#![allow(dead_code)]

use compact_serde::time::TICKS_PER_HOUR;
use compact_serde::{
    CompactCodec, CompiledCodec, DateTime, DateTimeKind, DateTimeOffset, Decimal, Record,
    ReflectiveCodec, record,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, LinkedList, VecDeque};
use std::fmt::Debug;
use uuid::Uuid;

/// Ticks of 2024-03-01T12:00:00.
pub const TICKS: i64 = 638_448_624_000_000_000;

record! {
    version = "1.0.0";

    /// A record with a member of every wire category.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Entity {
        pub id: Uuid,
        pub name: String,
        pub short_name: String,
        pub description: Option<String>,
        pub label: char,
        pub age: u8,
        pub index: i32,
        pub is_visible: bool,
        pub price: Decimal,
        pub weight: f32,
        pub rating: f64,
        pub short_index: i16,
        pub long_index: i64,
        pub unsigned_index: u32,
        pub unsigned_short: u16,
        pub unsigned_long: u64,
        pub created_at: DateTime,
        pub created_at_utc: DateTime,
        pub last_accessed: DateTime,
        pub changed_at: DateTimeOffset,
        pub changed_at_utc: DateTimeOffset,
        pub references: Option<Vec<i32>>,
        pub weeks: VecDeque<i16>,
        pub bit_map: Vec<bool>,
        pub children_ids: Vec<Uuid>,
        pub schedule: Vec<DateTime>,
        pub moments: Vec<DateTimeOffset>,
        pub tags: Option<LinkedList<String>>,
        pub prices_history: Vec<Decimal>,
        pub alternative_id: Option<Uuid>,
        pub scores: BTreeSet<u64>,
        pub nicknames: Vec<Option<String>>,
        pub payload: Vec<u8>,
        pub checksum: Option<u32>,
    }
}

pub fn datetime(ticks: i64, kind: DateTimeKind) -> DateTime {
    DateTime::new(ticks, kind).unwrap()
}

pub fn offset(utc_ticks: i64, hours: i64) -> DateTimeOffset {
    DateTimeOffset::new(utc_ticks, hours * TICKS_PER_HOUR).unwrap()
}

pub fn decimal(literal: &str) -> Decimal {
    literal.parse().unwrap()
}

/// A fully populated entity with fixed values.
pub fn sample() -> Entity {
    Entity {
        id: Uuid::from_u128(0x0123_4567_89AB_CDEF_0123_4567_89AB_CDEF),
        name: "Name with ümlauts and 漢字".to_string(),
        short_name: "short".to_string(),
        description: Some("a description".to_string()),
        label: 'Z',
        age: 42,
        index: -123_456,
        is_visible: true,
        price: decimal("-1234.5678"),
        weight: 72.5,
        rating: 4.875,
        short_index: -32_000,
        long_index: i64::MIN + 1,
        unsigned_index: u32::MAX,
        unsigned_short: 65_000,
        unsigned_long: u64::MAX - 7,
        created_at: datetime(TICKS, DateTimeKind::Local),
        created_at_utc: datetime(TICKS + 1, DateTimeKind::Utc),
        last_accessed: DateTime::MIN,
        changed_at: offset(TICKS, 2),
        changed_at_utc: offset(TICKS, 0),
        references: None,
        weeks: [1, 2, 3, 52].into_iter().collect(),
        bit_map: vec![true, false, true, true],
        children_ids: vec![Uuid::from_u128(1), Uuid::from_u128(u128::MAX)],
        schedule: vec![
            datetime(TICKS, DateTimeKind::Unspecified),
            datetime(TICKS * 2, DateTimeKind::Utc),
        ],
        moments: vec![offset(TICKS, -5), offset(TICKS + 10, 14)],
        tags: Some(["red", "green", ""].into_iter().map(String::from).collect()),
        prices_history: vec![decimal("0"), decimal("19.99"), decimal("-0.0000001")],
        alternative_id: Some(Uuid::from_u128(7)),
        scores: [3, 1, 4, 1, 5].into_iter().collect(),
        nicknames: vec![Some("ace".to_string()), None, Some(String::new())],
        payload: vec![0, 1, 0xFE, 0xFF],
        checksum: None,
    }
}

/// A sample with a random identity, as produced by independent callers.
pub fn random() -> Entity {
    Entity {
        id: Uuid::new_v4(),
        alternative_id: Some(Uuid::new_v4()),
        ..sample()
    }
}

pub fn compiled_bytes<T: Record>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    CompiledCodec::<T>::new().unwrap().serialize(value, &mut buf).unwrap();
    buf
}

pub fn reflective_bytes<T: Record + Serialize + DeserializeOwned>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    ReflectiveCodec::<T>::new().unwrap().serialize(value, &mut buf).unwrap();
    buf
}

/// Encode with both engines, check they agree, decode with both and check
/// the value survives. Returns the shared bytes.
pub fn both<T>(value: &T) -> Vec<u8>
where
    T: Record + Serialize + DeserializeOwned + PartialEq + Debug,
{
    let compiled = compiled_bytes(value);
    let reflective = reflective_bytes(value);
    assert_eq!(compiled, reflective, "engines disagree");

    let mut input = &compiled[..];
    let decoded = CompiledCodec::<T>::new().unwrap().deserialize(&mut input).unwrap();
    assert_eq!(&decoded, value, "compiled round trip");
    assert!(input.is_empty(), "compiled engine left {} bytes", input.len());

    let mut input = &compiled[..];
    let decoded = ReflectiveCodec::<T>::new().unwrap().deserialize(&mut input).unwrap();
    assert_eq!(&decoded, value, "reflective round trip");
    assert!(input.is_empty(), "reflective engine left {} bytes", input.len());

    compiled
}
