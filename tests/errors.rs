mod common;

use common::{Entity, TICKS, compiled_bytes, sample};
use compact_serde::time::{MAX_OFFSET_TICKS, MAX_TICKS, TICKS_PER_HOUR, TICKS_PER_MINUTE, TICKS_PER_SECOND};
use compact_serde::{
    CompactCodec, CompiledCodec, Config, Error, ReflectiveCodec, UnsupportedType, record,
    to_bytes, to_writer,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

fn decode_both<T>(bytes: &[u8], config: Config) -> (Error, Error)
where
    T: compact_serde::Record + Serialize + serde::de::DeserializeOwned + std::fmt::Debug,
{
    let compiled = CompiledCodec::<T>::with_config(config.clone())
        .unwrap()
        .deserialize(&mut &bytes[..])
        .unwrap_err();
    let reflective = ReflectiveCodec::<T>::with_config(config)
        .unwrap()
        .deserialize(&mut &bytes[..])
        .unwrap_err();
    (compiled, reflective)
}

#[test]
fn test_every_truncation_point_fails() {
    let bytes = compiled_bytes(&sample());
    for cut in 0..bytes.len() {
        let (compiled, reflective) = decode_both::<Entity>(&bytes[..cut], Config::default());
        assert!(
            matches!(compiled, Error::TruncatedStream { .. }),
            "compiled at {}: {:?}",
            cut,
            compiled
        );
        assert!(
            matches!(reflective, Error::TruncatedStream { .. }),
            "reflective at {}: {:?}",
            cut,
            reflective
        );
    }
}

record! {
    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Named {
        name: String,
    }
}

#[test]
fn test_negative_length_is_malformed() {
    let (compiled, reflective) = decode_both::<Named>(&(-2i32).to_le_bytes(), Config::default());
    for err in [compiled, reflective] {
        assert!(matches!(err, Error::MalformedLength { found: -2, .. }), "{:?}", err);
    }
}

#[test]
fn test_null_in_non_nullable_string() {
    let (compiled, reflective) = decode_both::<Named>(&[0xFF; 4], Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(
                err,
                Error::MalformedLength {
                    context: "string length",
                    found: -1
                }
            ),
            "{:?}",
            err
        );
    }
}

#[test]
fn test_length_bound() {
    let bytes = [5, 0, 0, 0, b'h', b'e', b'l', b'l', b'o'];
    let (compiled, reflective) =
        decode_both::<Named>(&bytes, Config::default().with_max_length(4));
    for err in [compiled, reflective] {
        assert!(
            matches!(err, Error::LengthExceeded { found: 5, max: 4, .. }),
            "{:?}",
            err
        );
    }
    let (_, decoded): (String, Named) = compact_serde::from_bytes(
        &[vec![1, 0, 0, 0, b'v'], bytes.to_vec()].concat(),
    )
    .unwrap();
    assert_eq!(decoded.name, "hello");
}

#[test]
fn test_invalid_utf8() {
    let (compiled, reflective) = decode_both::<Named>(&[2, 0, 0, 0, 0xC3, 0x28], Config::default());
    for err in [compiled, reflective] {
        assert!(matches!(err, Error::InvalidUtf8(_)), "{:?}", err);
    }
}

record! {
    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Checked {
        flag: bool,
        maybe: Option<u16>,
        at: compact_serde::DateTime,
        amount: compact_serde::Decimal,
    }
}

fn checked_bytes() -> Vec<u8> {
    compiled_bytes(&Checked::default())
}

#[test]
fn test_invalid_bool() {
    let mut bytes = checked_bytes();
    bytes[0] = 2;
    let (compiled, reflective) = decode_both::<Checked>(&bytes, Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(err, Error::InvalidValue { context: "bool", found: 2 }),
            "{:?}",
            err
        );
    }
}

#[test]
fn test_non_canonical_optional_flag() {
    let mut bytes = checked_bytes();
    bytes[1] = 7;
    let (compiled, reflective) = decode_both::<Checked>(&bytes, Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(
                err,
                Error::MalformedLength {
                    context: "optional flag",
                    found: 7
                }
            ),
            "{:?}",
            err
        );
    }
}

#[test]
fn test_invalid_datetime_kind() {
    let mut bytes = checked_bytes();
    // flag, optional flag (null), then the kind byte
    bytes[2] = 3;
    let (compiled, reflective) = decode_both::<Checked>(&bytes, Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(err, Error::InvalidValue { context: "DateTime kind", found: 3 }),
            "{:?}",
            err
        );
    }
}

#[test]
fn test_invalid_decimal_flags() {
    let mut bytes = checked_bytes();
    let flags = bytes.len() - 4;
    // reserved low bits set
    bytes[flags] = 1;
    let (compiled, reflective) = decode_both::<Checked>(&bytes, Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(err, Error::InvalidValue { context: "decimal flags", .. }),
            "{:?}",
            err
        );
    }
}

record! {
    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Moments {
        at: compact_serde::DateTime,
        moment: compact_serde::DateTimeOffset,
    }
}

// kind byte, ticks, then offset ticks and UTC ticks
fn moments_bytes(ticks: i64, offset_ticks: i64, utc_ticks: i64) -> Vec<u8> {
    let mut bytes = compiled_bytes(&Moments::default());
    bytes[1..9].copy_from_slice(&ticks.to_le_bytes());
    bytes[9..17].copy_from_slice(&offset_ticks.to_le_bytes());
    bytes[17..25].copy_from_slice(&utc_ticks.to_le_bytes());
    bytes
}

fn assert_invalid_moments(bytes: &[u8], expected: &'static str, value: i64) {
    let (compiled, reflective) = decode_both::<Moments>(bytes, Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(err, Error::InvalidValue { context, found } if context == expected && found == value),
            "{}: {:?}",
            expected,
            err
        );
    }
}

#[test]
fn test_datetime_ticks_out_of_range() {
    assert_eq!(compiled_bytes(&Moments::default()).len(), 25);
    assert_invalid_moments(&moments_bytes(-1, 0, 0), "DateTime ticks", -1);
    assert_invalid_moments(&moments_bytes(MAX_TICKS + 1, 0, 0), "DateTime ticks", MAX_TICKS + 1);
}

#[test]
fn test_most_negative_offset_is_an_error() {
    assert_invalid_moments(&moments_bytes(0, i64::MIN, 0), "DateTimeOffset offset", i64::MIN);
    assert_invalid_moments(&moments_bytes(0, i64::MAX, 0), "DateTimeOffset offset", i64::MAX);
}

#[test]
fn test_datetime_offset_rules_on_read() {
    let beyond = MAX_OFFSET_TICKS + TICKS_PER_MINUTE;
    assert_invalid_moments(&moments_bytes(0, beyond, TICKS), "DateTimeOffset offset", beyond);
    assert_invalid_moments(&moments_bytes(0, -beyond, TICKS), "DateTimeOffset offset", -beyond);
    assert_invalid_moments(
        &moments_bytes(0, TICKS_PER_SECOND, TICKS),
        "DateTimeOffset offset",
        TICKS_PER_SECOND,
    );
    assert_invalid_moments(&moments_bytes(0, 0, -1), "DateTimeOffset ticks", -1);
    assert_invalid_moments(&moments_bytes(0, 0, i64::MAX), "DateTimeOffset ticks", i64::MAX);
    assert_invalid_moments(
        &moments_bytes(0, -TICKS_PER_HOUR, 0),
        "DateTimeOffset local ticks",
        -TICKS_PER_HOUR,
    );
    assert_invalid_moments(
        &moments_bytes(0, TICKS_PER_HOUR, MAX_TICKS),
        "DateTimeOffset local ticks",
        MAX_TICKS + TICKS_PER_HOUR,
    );
}

#[test]
fn test_entity_with_most_negative_offset() {
    let entity = Entity {
        changed_at: compact_serde::DateTimeOffset::new(0x0102_0304_0506_0708, 0).unwrap(),
        ..sample()
    };
    let mut bytes = compiled_bytes(&entity);
    let utc = 0x0102_0304_0506_0708i64.to_le_bytes();
    let at = bytes
        .windows(8)
        .position(|w| w == utc)
        .expect("UTC ticks present");
    bytes[at - 8..at].copy_from_slice(&i64::MIN.to_le_bytes());
    let (compiled, reflective) = decode_both::<Entity>(&bytes, Config::default());
    for err in [compiled, reflective] {
        assert!(
            matches!(err, Error::InvalidValue { context: "DateTimeOffset offset", found: i64::MIN }),
            "{:?}",
            err
        );
    }
}

record! {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Nested {
        id: u32,
        grid: Vec<Vec<i32>>,
    }
}

record! {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct DoubleOptional {
        id: u32,
        value: Option<Option<i32>>,
    }
}

#[test]
fn test_unsupported_member_writes_nothing() {
    let expected = UnsupportedType {
        record: "Nested",
        member: "grid",
        type_name: std::any::type_name::<Vec<Vec<i32>>>(),
    };
    let err = CompiledCodec::<Nested>::new().unwrap_err();
    assert!(matches!(&err, Error::UnsupportedType(e) if *e == expected), "{:?}", err);
    let err = ReflectiveCodec::<Nested>::new().unwrap_err();
    assert!(matches!(&err, Error::UnsupportedType(e) if *e == expected), "{:?}", err);

    let mut sink = Vec::new();
    let err = to_writer(&mut sink, &Nested::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType(_)));
    assert!(sink.is_empty());

    // the failure is cached and reported again
    assert!(to_bytes(&Nested::default()).is_err());
    assert!(compact_serde::compile::<Nested>().is_err());
}

#[test]
fn test_double_optional_is_unsupported() {
    let err = CompiledCodec::<DoubleOptional>::new().unwrap_err();
    match err {
        Error::UnsupportedType(e) => {
            assert_eq!(e.record, "DoubleOptional");
            assert_eq!(e.member, "value");
            assert!(e.to_string().contains("DoubleOptional.value"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

record! {
    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Skipping {
        kept: u32,
        #[serde(skip)]
        cache: u32,
    }
}

record! {
    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Renamed {
        #[serde(rename = "other")]
        kept: u32,
    }
}

#[test]
fn test_serde_walk_must_match_members() {
    let codec = ReflectiveCodec::<Skipping>::new().unwrap();
    let err = codec.serialize(&Skipping::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "{:?}", err);
    let err = codec.deserialize(&mut &[0u8; 8][..]).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "{:?}", err);

    let codec = ReflectiveCodec::<Renamed>::new().unwrap();
    let err = codec.serialize(&Renamed::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "{:?}", err);

    // the compiled engine does not consult serde
    let codec = CompiledCodec::<Skipping>::new().unwrap();
    let mut buf = Vec::new();
    codec
        .serialize(&Skipping { kept: 1, cache: 2 }, &mut buf)
        .unwrap();
    assert_eq!(buf, [1, 0, 0, 0, 2, 0, 0, 0]);
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_io_errors_propagate() {
    let entity = sample();
    let err = CompiledCodec::<Entity>::new()
        .unwrap()
        .serialize(&entity, &mut FailingWriter)
        .unwrap_err();
    assert!(matches!(&err, Error::Io(e) if e.to_string() == "disk full"), "{:?}", err);

    let err = ReflectiveCodec::<Entity>::new()
        .unwrap()
        .serialize(&entity, &mut FailingWriter)
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{:?}", err);
}

#[test]
fn test_char_outside_basic_plane_is_rejected_on_write() {
    let entity = Entity {
        label: '😀',
        ..sample()
    };
    let err = CompiledCodec::<Entity>::new()
        .unwrap()
        .serialize(&entity, &mut Vec::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { context: "char", .. }), "{:?}", err);
}
