//! # compact-serde
//!
//! A compact, non-self-describing binary codec for plain record types, with
//! two interchangeable engines.
//!
//! ## Overview
//!
//! A record is a struct with a fixed set of members, declared with the
//! [`record!`] macro. Each member's declared type maps to exactly one wire
//! category, and members are written back to back in declaration order with
//! no tags, names or padding. A stream carries a version string followed by
//! the members.
//!
//! - [`CompiledCodec`] classifies a record type once, binds a read and write
//!   procedure per member and caches the resulting [`Plan`] for the life of
//!   the process.
//! - [`ReflectiveCodec`] drives the record's `serde` implementation and
//!   resolves each member's category on every call.
//!
//! Both engines produce identical bytes.
//!
//! ## Type mapping
//!
//! | Rust type | Encoding (little-endian) |
//! |-----------|--------------------------|
//! | `u8`      | 1 byte |
//! | `bool`    | 1 byte: 0 or 1 |
//! | `char`    | 2 bytes: one UTF-16 code unit |
//! | `i16`, `u16` | 2 bytes |
//! | `i32`, `u32`, `f32` | 4 bytes |
//! | `i64`, `u64`, `f64` | 8 bytes |
//! | [`Decimal`] | 16 bytes: four `i32` bit groups |
//! | `uuid::Uuid` | 16 raw bytes |
//! | `String`  | `i32` byte count + UTF-8 bytes |
//! | [`DateTime`] | 1-byte kind + `i64` ticks |
//! | [`DateTimeOffset`] | `i64` offset ticks + `i64` UTC ticks |
//! | `Vec<T>`, `Box<[T]>` | `i32` count + elements |
//! | `VecDeque<T>`, `LinkedList<T>`, `BTreeSet<T>`, `HashSet<T>`, any [`Collection`] | `i32` count + elements |
//! | `Option<String>`, `Option` of an array or collection | `-1` count for `None` |
//! | `Option<T>` of any other type above | flag byte (1 = `None`, 0 = `Some`) + value |
//!
//! Nested containers (`Vec<Vec<T>>`) and `Option<Option<T>>` are rejected
//! with [`Error::UnsupportedType`] before anything is written.
//!
//! ## Example
//!
//! ```rust
//! use compact_serde::{Decimal, from_bytes, record, to_bytes};
//! use serde::{Deserialize, Serialize};
//!
//! record! {
//!     version = "1.0.0";
//!
//!     #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//!     pub struct Invoice {
//!         pub number: u32,
//!         pub customer: String,
//!         pub total: Decimal,
//!         pub lines: Vec<u16>,
//!     }
//! }
//!
//! let invoice = Invoice {
//!     number: 17,
//!     customer: "ACME".into(),
//!     total: "129.95".parse().unwrap(),
//!     lines: vec![3, 4],
//! };
//!
//! let bytes = to_bytes(&invoice).unwrap();
//! // version (4 + 5) + number (4) + customer (4 + 4) + total (16) + lines (4 + 2 * 2)
//! assert_eq!(bytes.len(), 45);
//!
//! let (version, decoded): (String, Invoice) = from_bytes(&bytes).unwrap();
//! assert_eq!(version, "1.0.0");
//! assert_eq!(decoded, invoice);
//! ```

pub mod classify;
pub mod codec;
pub mod config;
pub mod de;
pub mod decimal;
pub mod error;
pub mod field;
pub mod plan;
pub mod record;
mod reflect;
mod registry;
pub mod ser;
pub mod time;
pub mod version;
pub mod wire;

pub use classify::{Category, MemberDescriptor, Primitive, classify, descriptors};
pub use codec::CompactCodec;
pub use config::Config;
pub use decimal::{Decimal, ParseDecimalError};
pub use error::{Error, Result, UnsupportedType};
pub use field::{Collection, Field, Shape};
pub use plan::{CompiledCodec, Plan, compile, is_compiled};
pub use record::{MemberVisitor, Record};
pub use reflect::ReflectiveCodec;
pub use time::{DateTime, DateTimeKind, DateTimeOffset};

use std::io::{Read, Write};

/// Serialize `value` with its default version header into a new buffer.
pub fn to_bytes<T: Record>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    to_writer(&mut buf, value)?;
    Ok(buf)
}

/// Serialize `value` with its default version header into `writer`.
///
/// The record type is compiled before anything is written, so an
/// unsupported type leaves `writer` untouched.
pub fn to_writer<W: Write, T: Record>(mut writer: W, value: &T) -> Result<()> {
    let codec = CompiledCodec::<T>::new()?;
    codec.write_version(&mut writer, codec.default_version())?;
    codec.serialize(value, &mut writer)
}

/// Read a version header and one record from `bytes`.
pub fn from_bytes<T: Record>(bytes: &[u8]) -> Result<(String, T)> {
    let mut input = bytes;
    from_reader(&mut input)
}

/// Read a version header and one record from `reader`.
pub fn from_reader<R: Read, T: Record>(mut reader: R) -> Result<(String, T)> {
    let codec = CompiledCodec::<T>::new()?;
    let version = codec.read_version(&mut reader)?;
    let value = codec.deserialize(&mut reader)?;
    Ok((version, value))
}
