//! Stateless wire routines.
//!
//! ## Wire format summary
//! - All multi-byte values are little-endian
//! - Fixed-width values carry no marker: bool=1, char=2 (UTF-16 code unit),
//!   i16/u16=2, i32/u32/f32=4, i64/u64/f64=8
//! - Decimal: four `i32` bit groups (lo, mid, hi, flags)
//! - Guid: 16 raw bytes
//! - String: `i32` byte count (`-1` = null) + UTF-8 bytes
//! - DateTime: 1-byte kind + `i64` ticks
//! - DateTimeOffset: `i64` offset ticks + `i64` UTC ticks
//! - Arrays/collections: `i32` element count (`-1` = null) + elements
//! - Optional values: 1-byte flag (`1` = null, `0` = present) + value
//!
//! Every routine is shared by both engines, so the reflective and compiled
//! paths validate input identically.

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::time::{self, DateTime, DateTimeKind, DateTimeOffset};
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Length or count prefix denoting a null string, array or collection.
pub const NULL_LENGTH: i32 = -1;

/// Optional flag for an absent value.
pub const FLAG_NULL: u8 = 1;

/// Optional flag for a present value.
pub const FLAG_PRESENT: u8 = 0;

/// Elements preallocated before any element has actually been read.
const PREALLOC_LIMIT: usize = 4096;

/// A byte source bounded by a maximum length prefix.
pub struct Source<'a> {
    inner: &'a mut dyn Read,
    max_length: usize,
}

impl<'a> Source<'a> {
    pub fn new(inner: &'a mut dyn Read, max_length: usize) -> Self {
        Source { inner, max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Fill `buf` completely. Fails with `TruncatedStream` at end of input.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::TruncatedStream { needed: buf.len() },
            _ => Error::Io(e),
        })
    }

    /// Read exactly `len` bytes without preallocating `len` up front.
    fn take(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        let got = (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        if got < len {
            return Err(Error::TruncatedStream { needed: len - got });
        }
        Ok(bytes)
    }
}

/// Capacity to reserve for `count` elements about to be decoded.
pub(crate) fn initial_capacity(count: usize) -> usize {
    count.min(PREALLOC_LIMIT)
}

// ── Fixed-width values ─────────────────────────────────────────────────────

macro_rules! fixed_width {
    ($($write:ident, $read:ident: $t:ty;)*) => {
        $(
            pub fn $write<W: Write + ?Sized>(sink: &mut W, value: $t) -> Result<()> {
                sink.write_all(&value.to_le_bytes())?;
                Ok(())
            }

            pub fn $read(source: &mut Source<'_>) -> Result<$t> {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                source.fill(&mut buf)?;
                Ok(<$t>::from_le_bytes(buf))
            }
        )*
    };
}

fixed_width! {
    write_u8, read_u8: u8;
    write_i16, read_i16: i16;
    write_u16, read_u16: u16;
    write_i32, read_i32: i32;
    write_u32, read_u32: u32;
    write_i64, read_i64: i64;
    write_u64, read_u64: u64;
    write_f32, read_f32: f32;
    write_f64, read_f64: f64;
}

pub fn write_bool<W: Write + ?Sized>(sink: &mut W, value: bool) -> Result<()> {
    write_u8(sink, value as u8)
}

pub fn read_bool(source: &mut Source<'_>) -> Result<bool> {
    match read_u8(source)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::InvalidValue {
            context: "bool",
            found: other.into(),
        }),
    }
}

/// Chars travel as one UTF-16 code unit, so only the Basic Multilingual Plane
/// is representable.
pub fn write_char<W: Write + ?Sized>(sink: &mut W, value: char) -> Result<()> {
    let unit = u16::try_from(value as u32).map_err(|_| Error::InvalidValue {
        context: "char",
        found: (value as u32).into(),
    })?;
    write_u16(sink, unit)
}

pub fn read_char(source: &mut Source<'_>) -> Result<char> {
    let unit = read_u16(source)?;
    char::from_u32(unit.into()).ok_or(Error::InvalidValue {
        context: "char",
        found: unit.into(),
    })
}

pub fn write_decimal<W: Write + ?Sized>(sink: &mut W, value: &Decimal) -> Result<()> {
    for part in value.to_bits() {
        write_i32(sink, part)?;
    }
    Ok(())
}

pub fn read_decimal(source: &mut Source<'_>) -> Result<Decimal> {
    let mut bits = [0i32; 4];
    for part in bits.iter_mut() {
        *part = read_i32(source)?;
    }
    Decimal::from_bits(bits).ok_or(Error::InvalidValue {
        context: "decimal flags",
        found: bits[3].into(),
    })
}

pub fn write_guid<W: Write + ?Sized>(sink: &mut W, value: &Uuid) -> Result<()> {
    sink.write_all(value.as_bytes())?;
    Ok(())
}

pub fn read_guid(source: &mut Source<'_>) -> Result<Uuid> {
    let mut bytes = [0u8; 16];
    source.fill(&mut bytes)?;
    Ok(Uuid::from_bytes(bytes))
}

pub fn write_datetime<W: Write + ?Sized>(sink: &mut W, value: &DateTime) -> Result<()> {
    write_u8(sink, value.kind() as u8)?;
    write_i64(sink, value.ticks())
}

pub fn read_datetime(source: &mut Source<'_>) -> Result<DateTime> {
    let tag = read_u8(source)?;
    let ticks = read_i64(source)?;
    let kind = DateTimeKind::try_from(tag).map_err(|tag| Error::InvalidValue {
        context: "DateTime kind",
        found: tag.into(),
    })?;
    DateTime::new(ticks, kind).ok_or(Error::InvalidValue {
        context: "DateTime ticks",
        found: ticks,
    })
}

pub fn write_datetime_offset<W: Write + ?Sized>(sink: &mut W, value: &DateTimeOffset) -> Result<()> {
    write_i64(sink, value.offset_ticks())?;
    write_i64(sink, value.utc_ticks())
}

pub fn read_datetime_offset(source: &mut Source<'_>) -> Result<DateTimeOffset> {
    let offset_ticks = read_i64(source)?;
    let utc_ticks = read_i64(source)?;
    if !time::offset_in_range(offset_ticks) {
        return Err(Error::InvalidValue {
            context: "DateTimeOffset offset",
            found: offset_ticks,
        });
    }
    if !time::ticks_in_range(utc_ticks) {
        return Err(Error::InvalidValue {
            context: "DateTimeOffset ticks",
            found: utc_ticks,
        });
    }
    DateTimeOffset::new(utc_ticks, offset_ticks).ok_or(Error::InvalidValue {
        context: "DateTimeOffset local ticks",
        found: utc_ticks + offset_ticks,
    })
}

// ── Length-prefixed values ─────────────────────────────────────────────────

/// Write a string or container length, or the null sentinel for `None`.
pub fn write_length<W: Write + ?Sized>(
    sink: &mut W,
    context: &'static str,
    len: Option<usize>,
) -> Result<()> {
    let prefix = match len {
        None => NULL_LENGTH,
        Some(len) => i32::try_from(len).map_err(|_| Error::MalformedLength {
            context,
            found: len as i64,
        })?,
    };
    write_i32(sink, prefix)
}

/// Read a length prefix. `Ok(None)` is the null sentinel, accepted only when
/// `nullable` is set.
pub fn read_length(
    source: &mut Source<'_>,
    context: &'static str,
    nullable: bool,
) -> Result<Option<usize>> {
    match read_i32(source)? {
        NULL_LENGTH if nullable => Ok(None),
        prefix if prefix < 0 => Err(Error::MalformedLength {
            context,
            found: prefix.into(),
        }),
        prefix => {
            let len = prefix as usize;
            if len > source.max_length {
                return Err(Error::LengthExceeded {
                    context,
                    found: len,
                    max: source.max_length,
                });
            }
            Ok(Some(len))
        }
    }
}

pub fn write_string<W: Write + ?Sized>(sink: &mut W, value: Option<&str>) -> Result<()> {
    write_length(sink, "string length", value.map(str::len))?;
    if let Some(s) = value {
        sink.write_all(s.as_bytes())?;
    }
    Ok(())
}

/// Read a string whose length prefix has already been consumed.
pub fn read_utf8(source: &mut Source<'_>, len: usize) -> Result<String> {
    let bytes = source.take(len)?;
    Ok(String::from_utf8(bytes)?)
}

pub fn read_string(source: &mut Source<'_>, nullable: bool) -> Result<Option<String>> {
    match read_length(source, "string length", nullable)? {
        None => Ok(None),
        Some(len) => read_utf8(source, len).map(Some),
    }
}

/// Read `len` raw bytes, used for byte buffers whose count is already known.
pub fn read_raw(source: &mut Source<'_>, len: usize) -> Result<Vec<u8>> {
    source.take(len)
}

pub fn write_count<W: Write + ?Sized>(sink: &mut W, count: Option<usize>) -> Result<()> {
    write_length(sink, "element count", count)
}

pub fn read_count(source: &mut Source<'_>, nullable: bool) -> Result<Option<usize>> {
    read_length(source, "element count", nullable)
}

// ── Optional flag ──────────────────────────────────────────────────────────

pub fn write_flag<W: Write + ?Sized>(sink: &mut W, is_null: bool) -> Result<()> {
    write_u8(sink, if is_null { FLAG_NULL } else { FLAG_PRESENT })
}

/// Returns `true` when the flag marks a null value. Any byte other than the
/// two canonical flags is rejected.
pub fn read_flag(source: &mut Source<'_>) -> Result<bool> {
    match read_u8(source)? {
        FLAG_NULL => Ok(true),
        FLAG_PRESENT => Ok(false),
        other => Err(Error::MalformedLength {
            context: "optional flag",
            found: other.into(),
        }),
    }
}
