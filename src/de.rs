//! Reflective deserializer.
//!
//! The format is not self-describing: every request serde makes is resolved
//! against the category of the member (or element) being read. Scalar
//! requests forward to `deserialize_any`, which reads whatever the category
//! prescribes and visits it.

use crate::classify::{Category, Descriptors, MemberDescriptor, Primitive};
use crate::error::{Error, Result};
use crate::wire::{self, Source};
use serde::de::{self, DeserializeSeed, IntoDeserializer, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

/// The record-level deserializer. Reads from a [`Source`], one member at a
/// time, in descriptor order.
pub struct Deserializer<'a, 'r> {
    source: &'a mut Source<'r>,
    members: Descriptors,
}

impl<'a, 'r> Deserializer<'a, 'r> {
    pub fn new(source: &'a mut Source<'r>, members: Descriptors) -> Self {
        Deserializer { source, members }
    }
}

// ── Main Deserializer impl ─────────────────────────────────────────────────

impl<'de> de::Deserializer<'de> for &mut Deserializer<'_, '_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::mismatch("a record struct", "a non-struct type"))
    }

    /// A record: serde's field list must match the member descriptors.
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if fields.len() != self.members.len() {
            return Err(Error::SchemaMismatch(format!(
                "`{}` deserializes {} fields but has {} members",
                name,
                fields.len(),
                self.members.len()
            )));
        }
        if let Some((field, member)) = fields
            .iter()
            .zip(self.members.iter())
            .find(|(field, member)| **field != member.name)
        {
            return Err(Error::mismatch(member.name, field));
        }
        visitor.visit_seq(RecordAccess {
            source: &mut *self.source,
            members: &self.members,
        })
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple tuple_struct map enum
        identifier ignored_any
    }
}

// ── RecordAccess: one element per member ───────────────────────────────────

struct RecordAccess<'a, 'r> {
    source: &'a mut Source<'r>,
    members: &'a [MemberDescriptor],
}

impl<'de> SeqAccess<'de> for RecordAccess<'_, '_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        let Some((member, rest)) = self.members.split_first() else {
            return Ok(None);
        };
        self.members = rest;
        seed.deserialize(ValueDeserializer::new(&mut *self.source, &member.category))
            .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.members.len())
    }
}

// ── Value deserializer ─────────────────────────────────────────────────────

/// Reads one member or element according to its category.
struct ValueDeserializer<'a, 'r> {
    source: &'a mut Source<'r>,
    category: &'a Category,
    /// Length already consumed while resolving a nullable reference.
    prefix: Option<usize>,
}

impl<'a, 'r> ValueDeserializer<'a, 'r> {
    fn new(source: &'a mut Source<'r>, category: &'a Category) -> Self {
        ValueDeserializer {
            source,
            category,
            prefix: None,
        }
    }

    /// The length of a string, array or collection; `None` for null.
    fn length(&mut self, nullable: bool) -> Result<Option<usize>> {
        if let Some(len) = self.prefix.take() {
            return Ok(Some(len));
        }
        let context = match self.category {
            Category::Utf8String { .. } => "string length",
            _ => "element count",
        };
        wire::read_length(self.source, context, nullable)
    }

    fn unexpected<T>(&self, found: &str) -> Result<T> {
        Err(Error::mismatch(self.category, found))
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'_, '_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        let category = self.category;
        match category {
            Category::Byte => visitor.visit_u8(wire::read_u8(self.source)?),
            Category::FixedPrimitive(primitive) => match primitive {
                Primitive::Bool => visitor.visit_bool(wire::read_bool(self.source)?),
                Primitive::Char => visitor.visit_char(wire::read_char(self.source)?),
                Primitive::I16 => visitor.visit_i16(wire::read_i16(self.source)?),
                Primitive::U16 => visitor.visit_u16(wire::read_u16(self.source)?),
                Primitive::I32 => visitor.visit_i32(wire::read_i32(self.source)?),
                Primitive::U32 => visitor.visit_u32(wire::read_u32(self.source)?),
                Primitive::I64 => visitor.visit_i64(wire::read_i64(self.source)?),
                Primitive::U64 => visitor.visit_u64(wire::read_u64(self.source)?),
                Primitive::F32 => visitor.visit_f32(wire::read_f32(self.source)?),
                Primitive::F64 => visitor.visit_f64(wire::read_f64(self.source)?),
            },
            Category::Decimal => {
                let bits = wire::read_decimal(self.source)?.to_bits();
                visit_parts(bits.map(Part::I32), visitor)
            }
            Category::DateTime => {
                let value = wire::read_datetime(self.source)?;
                visit_parts(
                    [Part::U8(value.kind() as u8), Part::I64(value.ticks())],
                    visitor,
                )
            }
            Category::DateTimeOffset => {
                let value = wire::read_datetime_offset(self.source)?;
                visit_parts(
                    [Part::I64(value.offset_ticks()), Part::I64(value.utc_ticks())],
                    visitor,
                )
            }
            Category::Guid => visitor.visit_bytes(wire::read_guid(self.source)?.as_bytes()),
            Category::Utf8String { nullable } => match self.length(*nullable)? {
                Some(len) => visitor.visit_string(wire::read_utf8(self.source, len)?),
                None => visitor.visit_none(),
            },
            Category::FixedArray { element, nullable }
            | Category::GenericCollection { element, nullable } => {
                let Some(count) = self.length(*nullable)? else {
                    return visitor.visit_none();
                };
                let mut elements = Elements {
                    source: self.source,
                    element: element.as_ref(),
                    remaining: count,
                };
                let value = visitor.visit_seq(&mut elements)?;
                match elements.remaining {
                    0 => Ok(value),
                    n => Err(Error::SchemaMismatch(format!(
                        "sequence left {} of {} elements unread",
                        n, count
                    ))),
                }
            }
            Category::Optional(inner) => {
                if wire::read_flag(self.source)? {
                    visitor.visit_none()
                } else {
                    visitor.visit_some(ValueDeserializer::new(self.source, inner))
                }
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        let category = self.category;
        match category {
            Category::Optional(_) => self.deserialize_any(visitor),
            category if category.is_nullable() => match self.length(true)? {
                Some(len) => visitor.visit_some(ValueDeserializer {
                    prefix: Some(len),
                    ..self
                }),
                None => visitor.visit_none(),
            },
            _ => self.unexpected("option"),
        }
    }

    /// A Guid's 16 raw bytes, or a byte array read in one piece.
    fn deserialize_bytes<V: Visitor<'de>>(mut self, visitor: V) -> Result<V::Value> {
        let category = self.category;
        match category {
            Category::Guid => self.deserialize_any(visitor),
            Category::FixedArray { element, nullable }
            | Category::GenericCollection { element, nullable }
                if **element == Category::Byte =>
            {
                match self.length(*nullable)? {
                    Some(len) => visitor.visit_byte_buf(wire::read_raw(self.source, len)?),
                    None => visitor.visit_none(),
                }
            }
            _ => self.unexpected("bytes"),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        match self.category.parts() {
            Some(parts) if parts.len() == len => self.deserialize_any(visitor),
            _ => self.unexpected("tuple"),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        self.unexpected("unit")
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value> {
        self.unexpected(name)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value> {
        self.unexpected(name)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        self.unexpected("map")
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        self.unexpected(name)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        self.unexpected(name)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        self.unexpected("identifier")
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        self.unexpected("ignored value")
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string seq
    }
}

// ── Elements: fixed count, one category ────────────────────────────────────

struct Elements<'a, 'r> {
    source: &'a mut Source<'r>,
    element: &'a Category,
    remaining: usize,
}

impl<'de> SeqAccess<'de> for Elements<'_, '_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(ValueDeserializer::new(&mut *self.source, self.element))
            .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

// ── Parts of a composite value ─────────────────────────────────────────────

/// One already-validated part of a Decimal, DateTime or DateTimeOffset.
#[derive(Clone, Copy)]
enum Part {
    U8(u8),
    I32(i32),
    I64(i64),
}

fn visit_parts<'de, V: Visitor<'de>, const N: usize>(parts: [Part; N], visitor: V) -> Result<V::Value> {
    let mut seq = de::value::SeqDeserializer::<_, Error>::new(parts.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

impl<'de> IntoDeserializer<'de, Error> for Part {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> de::Deserializer<'de> for Part {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Part::U8(v) => visitor.visit_u8(v),
            Part::I32(v) => visitor.visit_i32(v),
            Part::I64(v) => visitor.visit_i64(v),
        }
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}
