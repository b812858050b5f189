//! Reflective serializer.
//!
//! The [`Serializer`] drives a record's `serde::Serialize` walk. For every
//! struct field serde reports, it looks up the member's descriptor and
//! branches on its [`Category`] to pick the wire routine. Nothing is bound
//! ahead of time: the branch is taken again on every call, for every member
//! and every element.
//!
//! The bytes are the same as those of the compiled engine because both end
//! in the routines of [`crate::wire`].
//!
//! ## serde data model mapping
//! - Record: `serialize_struct` whose field names and count match the
//!   member descriptors
//! - Byte and fixed primitives: the matching scalar method
//! - Decimal, DateTime, DateTimeOffset: a tuple of their fixed-width parts
//! - Guid: `serialize_bytes` with 16 bytes
//! - Strings: `serialize_str`; arrays and collections: `serialize_seq` with
//!   a known length, or `serialize_bytes` for byte elements
//! - Null strings, arrays and collections: `serialize_none`, written as the
//!   `-1` sentinel; `Option` of a value: flag byte then the value

use crate::classify::{Category, Descriptors, Primitive};
use crate::error::{Error, Result};
use crate::wire;
use serde::ser::{self, Impossible, Serialize};
use std::io::Write;

// ── Serializer ─────────────────────────────────────────────────────────────

/// The record-level serializer. Generic over any `W: Write`.
///
/// ```rust
/// use compact_serde::{descriptors, record, ser::Serializer};
/// use serde::{Deserialize, Serialize};
///
/// record! {
///     #[derive(Default, Serialize, Deserialize)]
///     struct Point {
///         x: i16,
///         y: i16,
///     }
/// }
///
/// let mut buf = Vec::new();
/// let mut ser = Serializer::new(&mut buf, descriptors::<Point>().unwrap());
/// Point { x: 1, y: -1 }.serialize(&mut ser).unwrap();
/// assert_eq!(buf, [1, 0, 0xFF, 0xFF]);
/// ```
pub struct Serializer<W: Write> {
    writer: W,
    members: Descriptors,
}

impl<W: Write> Serializer<W> {
    /// Create a serializer for a record with the given members.
    pub fn new(writer: W, members: Descriptors) -> Self {
        Serializer { writer, members }
    }

    /// Consume the serializer and return the inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn not_a_record<T>(found: &str) -> Result<T> {
    Err(Error::mismatch("a record struct", found))
}

impl<'a, W: Write> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = RecordFields<'a, W>;
    type SerializeStructVariant = Impossible<(), Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    /// A record: its fields follow one another with no count prefix.
    fn serialize_struct(self, name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        if len != self.members.len() {
            return Err(Error::SchemaMismatch(format!(
                "`{}` serializes {} fields but has {} members",
                name,
                len,
                self.members.len()
            )));
        }
        Ok(RecordFields {
            ser: self,
            index: 0,
        })
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<()> {
        not_a_record("bool")
    }
    fn serialize_i8(self, _v: i8) -> Result<()> {
        not_a_record("i8")
    }
    fn serialize_i16(self, _v: i16) -> Result<()> {
        not_a_record("i16")
    }
    fn serialize_i32(self, _v: i32) -> Result<()> {
        not_a_record("i32")
    }
    fn serialize_i64(self, _v: i64) -> Result<()> {
        not_a_record("i64")
    }
    fn serialize_u8(self, _v: u8) -> Result<()> {
        not_a_record("u8")
    }
    fn serialize_u16(self, _v: u16) -> Result<()> {
        not_a_record("u16")
    }
    fn serialize_u32(self, _v: u32) -> Result<()> {
        not_a_record("u32")
    }
    fn serialize_u64(self, _v: u64) -> Result<()> {
        not_a_record("u64")
    }
    fn serialize_f32(self, _v: f32) -> Result<()> {
        not_a_record("f32")
    }
    fn serialize_f64(self, _v: f64) -> Result<()> {
        not_a_record("f64")
    }
    fn serialize_char(self, _v: char) -> Result<()> {
        not_a_record("char")
    }
    fn serialize_str(self, _v: &str) -> Result<()> {
        not_a_record("string")
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        not_a_record("bytes")
    }
    fn serialize_none(self) -> Result<()> {
        not_a_record("null")
    }
    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<()> {
        not_a_record("option")
    }
    fn serialize_unit(self) -> Result<()> {
        not_a_record("unit")
    }
    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        not_a_record(name)
    }
    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        not_a_record(name)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        not_a_record(name)
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        not_a_record("sequence")
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        not_a_record("tuple")
    }
    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        not_a_record(name)
    }
    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        not_a_record(name)
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        not_a_record("map")
    }
    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        not_a_record(name)
    }
}

// ── Record fields ──────────────────────────────────────────────────────────

/// Pairs each serde field with the member descriptor at the same position.
pub struct RecordFields<'a, W: Write> {
    ser: &'a mut Serializer<W>,
    index: usize,
}

impl<W: Write> ser::SerializeStruct for RecordFields<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let Serializer { writer, members } = &mut *self.ser;
        let member = members
            .get(self.index)
            .ok_or_else(|| Error::mismatch("end of record", key))?;
        if member.name != key {
            return Err(Error::mismatch(member.name, key));
        }
        self.index += 1;
        value.serialize(ValueSerializer {
            writer,
            category: &member.category,
        })
    }

    fn skip_field(&mut self, key: &'static str) -> Result<()> {
        Err(Error::SchemaMismatch(format!(
            "field `{}` skipped; every member is written",
            key
        )))
    }

    fn end(self) -> Result<()> {
        match self.ser.members.get(self.index) {
            Some(member) => Err(Error::mismatch(member.name, "end of record")),
            None => Ok(()),
        }
    }
}

// ── Value serializer ───────────────────────────────────────────────────────

/// Serializes one member or element according to its category.
struct ValueSerializer<'a, W: Write> {
    writer: &'a mut W,
    category: &'a Category,
}

impl<'a, W: Write> ValueSerializer<'a, W> {
    fn primitive(&self, primitive: Primitive) -> Result<()> {
        match self.category {
            Category::FixedPrimitive(p) if *p == primitive => Ok(()),
            other => Err(Error::mismatch(other, Category::FixedPrimitive(primitive))),
        }
    }

    fn unexpected<T>(&self, found: &str) -> Result<T> {
        Err(Error::mismatch(self.category, found))
    }
}

impl<'a, W: Write> ser::Serializer for ValueSerializer<'a, W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Elements<'a, W>;
    type SerializeTuple = Parts<'a, W>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    // ── Fixed width ────────────────────────────────────────────────────────

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.primitive(Primitive::Bool)?;
        wire::write_bool(self.writer, v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        match self.category {
            Category::Byte => wire::write_u8(self.writer, v),
            _ => self.unexpected("u8"),
        }
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.primitive(Primitive::I16)?;
        wire::write_i16(self.writer, v)
    }
    fn serialize_u16(self, v: u16) -> Result<()> {
        self.primitive(Primitive::U16)?;
        wire::write_u16(self.writer, v)
    }
    fn serialize_i32(self, v: i32) -> Result<()> {
        self.primitive(Primitive::I32)?;
        wire::write_i32(self.writer, v)
    }
    fn serialize_u32(self, v: u32) -> Result<()> {
        self.primitive(Primitive::U32)?;
        wire::write_u32(self.writer, v)
    }
    fn serialize_i64(self, v: i64) -> Result<()> {
        self.primitive(Primitive::I64)?;
        wire::write_i64(self.writer, v)
    }
    fn serialize_u64(self, v: u64) -> Result<()> {
        self.primitive(Primitive::U64)?;
        wire::write_u64(self.writer, v)
    }
    fn serialize_f32(self, v: f32) -> Result<()> {
        self.primitive(Primitive::F32)?;
        wire::write_f32(self.writer, v)
    }
    fn serialize_f64(self, v: f64) -> Result<()> {
        self.primitive(Primitive::F64)?;
        wire::write_f64(self.writer, v)
    }
    fn serialize_char(self, v: char) -> Result<()> {
        self.primitive(Primitive::Char)?;
        wire::write_char(self.writer, v)
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        self.unexpected("i8")
    }

    // ── Length prefixed ────────────────────────────────────────────────────

    fn serialize_str(self, v: &str) -> Result<()> {
        match self.category {
            Category::Utf8String { .. } => wire::write_string(self.writer, Some(v)),
            _ => self.unexpected("string"),
        }
    }

    /// A Guid's 16 raw bytes, or a byte array written in one piece.
    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        match self.category {
            Category::Guid if v.len() == 16 => {
                self.writer.write_all(v)?;
                Ok(())
            }
            Category::FixedArray { element, .. } | Category::GenericCollection { element, .. }
                if **element == Category::Byte =>
            {
                wire::write_count(self.writer, Some(v.len()))?;
                self.writer.write_all(v)?;
                Ok(())
            }
            _ => self.unexpected("bytes"),
        }
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let element = match self.category {
            Category::FixedArray { element, .. } | Category::GenericCollection { element, .. } => {
                element.as_ref()
            }
            _ => return self.unexpected("sequence"),
        };
        let len = len.ok_or_else(|| Error::mismatch(self.category, "sequence of unknown length"))?;
        wire::write_count(self.writer, Some(len))?;
        Ok(Elements {
            writer: self.writer,
            element,
            remaining: len,
        })
    }

    /// Decimal, DateTime and DateTimeOffset arrive as tuples of their parts.
    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        match self.category.parts() {
            Some(parts) if parts.len() == len => Ok(Parts {
                writer: self.writer,
                parts: parts.iter(),
            }),
            _ => self.unexpected("tuple"),
        }
    }

    // ── Null markers ───────────────────────────────────────────────────────

    fn serialize_none(self) -> Result<()> {
        match self.category {
            Category::Utf8String { nullable: true } => wire::write_string(self.writer, None),
            Category::FixedArray { nullable: true, .. }
            | Category::GenericCollection { nullable: true, .. } => {
                wire::write_count(self.writer, None)
            }
            Category::Optional(_) => wire::write_flag(self.writer, true),
            _ => self.unexpected("null"),
        }
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        match self.category {
            Category::Optional(inner) => {
                wire::write_flag(self.writer, false)?;
                value.serialize(ValueSerializer {
                    writer: self.writer,
                    category: inner,
                })
            }
            // the present form of a nullable reference has no marker
            category if category.is_nullable() => value.serialize(ValueSerializer {
                writer: self.writer,
                category,
            }),
            _ => self.unexpected("option"),
        }
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    // ── Outside the format ─────────────────────────────────────────────────

    fn serialize_unit(self) -> Result<()> {
        self.unexpected("unit")
    }
    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        self.unexpected(name)
    }
    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        self.unexpected(name)
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        self.unexpected(name)
    }
    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.unexpected(name)
    }
    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.unexpected(name)
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.unexpected("map")
    }
    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.unexpected(name)
    }
    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.unexpected(name)
    }
}

// ── Compound serializers ───────────────────────────────────────────────────

/// Elements of an array or collection, all of one category.
struct Elements<'a, W: Write> {
    writer: &'a mut W,
    element: &'a Category,
    remaining: usize,
}

impl<W: Write> ser::SerializeSeq for Elements<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if self.remaining == 0 {
            return Err(Error::mismatch("end of sequence", "extra element"));
        }
        self.remaining -= 1;
        value.serialize(ValueSerializer {
            writer: &mut *self.writer,
            category: self.element,
        })
    }

    fn end(self) -> Result<()> {
        match self.remaining {
            0 => Ok(()),
            n => Err(Error::SchemaMismatch(format!(
                "sequence ended {} elements short of its count",
                n
            ))),
        }
    }
}

/// Fixed-width parts of a composite value, each with its own category.
struct Parts<'a, W: Write> {
    writer: &'a mut W,
    parts: std::slice::Iter<'static, Category>,
}

impl<W: Write> ser::SerializeTuple for Parts<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let category = self
            .parts
            .next()
            .ok_or_else(|| Error::mismatch("end of value", "extra part"))?;
        value.serialize(ValueSerializer {
            writer: &mut *self.writer,
            category,
        })
    }

    fn end(self) -> Result<()> {
        match self.parts.len() {
            0 => Ok(()),
            n => Err(Error::SchemaMismatch(format!("value ended {} parts short", n))),
        }
    }
}
