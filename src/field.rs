//! Member types and their bound codecs.
//!
//! Every type that can appear as a record member implements [`Field`]. The
//! trait carries two things:
//!
//! - [`Field::shape`], the declared-type description the classifier turns
//!   into a wire [`Category`](crate::Category), and
//! - the typed encode/decode routines the plan compiler binds to the member.
//!
//! Composite types implement `Field` structurally (`Vec<Vec<i32>>` has a
//! shape and codecs), and the classifier decides whether the composition is
//! part of the format. Nested containers and `Option<Option<T>>` are not.

use crate::decimal::Decimal;
use crate::error::Result;
use crate::time::{DateTime, DateTimeOffset};
use crate::wire::{self, Source};
use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::io::Write;
use uuid::Uuid;

/// Declared type of a record member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Bool,
    Char,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    Guid,
    String,
    DateTime,
    DateTimeOffset,
    /// `Vec<T>`, `Box<[T]>`
    Array(Box<Shape>),
    /// A growable collection exposing count, add and iteration
    Collection(Box<Shape>),
    /// `Option<T>`
    Optional(Box<Shape>),
    /// A type outside the format, named for diagnostics
    Opaque(&'static str),
}

/// A record member type with a bound wire codec.
pub trait Field: Sized + 'static {
    fn shape() -> Shape;

    fn encode(&self, sink: &mut dyn Write) -> Result<()>;

    fn decode(source: &mut Source<'_>) -> Result<Self>;

    /// Encode `Option<Self>`. Values use a leading flag byte; strings and
    /// containers override this with their `-1` length sentinel.
    fn encode_nullable(value: Option<&Self>, sink: &mut dyn Write) -> Result<()> {
        wire::write_flag(sink, value.is_none())?;
        match value {
            Some(v) => v.encode(sink),
            None => Ok(()),
        }
    }

    fn decode_nullable(source: &mut Source<'_>) -> Result<Option<Self>> {
        if wire::read_flag(source)? {
            return Ok(None);
        }
        Self::decode(source).map(Some)
    }
}

// ── Fixed-width values ─────────────────────────────────────────────────────

macro_rules! impl_fixed {
    ($($t:ty => $shape:ident, $write:ident, $read:ident;)*) => {
        $(
            impl Field for $t {
                fn shape() -> Shape {
                    Shape::$shape
                }

                #[inline]
                fn encode(&self, sink: &mut dyn Write) -> Result<()> {
                    wire::$write(sink, *self)
                }

                #[inline]
                fn decode(source: &mut Source<'_>) -> Result<Self> {
                    wire::$read(source)
                }
            }
        )*
    };
}

impl_fixed! {
    bool => Bool, write_bool, read_bool;
    char => Char, write_char, read_char;
    u8 => U8, write_u8, read_u8;
    i16 => I16, write_i16, read_i16;
    u16 => U16, write_u16, read_u16;
    i32 => I32, write_i32, read_i32;
    u32 => U32, write_u32, read_u32;
    i64 => I64, write_i64, read_i64;
    u64 => U64, write_u64, read_u64;
    f32 => F32, write_f32, read_f32;
    f64 => F64, write_f64, read_f64;
}

macro_rules! impl_by_ref {
    ($($t:ty => $shape:ident, $write:ident, $read:ident;)*) => {
        $(
            impl Field for $t {
                fn shape() -> Shape {
                    Shape::$shape
                }

                #[inline]
                fn encode(&self, sink: &mut dyn Write) -> Result<()> {
                    wire::$write(sink, self)
                }

                #[inline]
                fn decode(source: &mut Source<'_>) -> Result<Self> {
                    wire::$read(source)
                }
            }
        )*
    };
}

impl_by_ref! {
    Decimal => Decimal, write_decimal, read_decimal;
    Uuid => Guid, write_guid, read_guid;
    DateTime => DateTime, write_datetime, read_datetime;
    DateTimeOffset => DateTimeOffset, write_datetime_offset, read_datetime_offset;
}

// ── Strings ────────────────────────────────────────────────────────────────

impl Field for String {
    fn shape() -> Shape {
        Shape::String
    }

    fn encode(&self, sink: &mut dyn Write) -> Result<()> {
        wire::write_string(sink, Some(self))
    }

    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let len = read_present_length(source, "string length")?;
        wire::read_utf8(source, len)
    }

    fn encode_nullable(value: Option<&Self>, sink: &mut dyn Write) -> Result<()> {
        wire::write_string(sink, value.map(String::as_str))
    }

    fn decode_nullable(source: &mut Source<'_>) -> Result<Option<Self>> {
        wire::read_string(source, true)
    }
}

/// Read a length prefix in a context where null is not allowed.
fn read_present_length(source: &mut Source<'_>, context: &'static str) -> Result<usize> {
    // read_length only yields None for nullable contexts
    Ok(wire::read_length(source, context, false)?.unwrap_or_default())
}

// ── Optional ───────────────────────────────────────────────────────────────

impl<T: Field> Field for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }

    fn encode(&self, sink: &mut dyn Write) -> Result<()> {
        T::encode_nullable(self.as_ref(), sink)
    }

    fn decode(source: &mut Source<'_>) -> Result<Self> {
        T::decode_nullable(source)
    }
}

// ── Arrays ─────────────────────────────────────────────────────────────────

fn encode_elements<'a, T: Field + 'a>(
    count: usize,
    items: impl Iterator<Item = &'a T>,
    sink: &mut dyn Write,
) -> Result<()> {
    wire::write_count(sink, Some(count))?;
    for item in items {
        item.encode(sink)?;
    }
    Ok(())
}

fn decode_elements<T: Field>(source: &mut Source<'_>, count: usize) -> Result<Vec<T>> {
    let mut items = Vec::with_capacity(wire::initial_capacity(count));
    for _ in 0..count {
        items.push(T::decode(source)?);
    }
    Ok(items)
}

impl<T: Field> Field for Vec<T> {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()))
    }

    fn encode(&self, sink: &mut dyn Write) -> Result<()> {
        encode_elements(self.len(), self.iter(), sink)
    }

    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let count = read_present_length(source, "element count")?;
        decode_elements(source, count)
    }

    fn encode_nullable(value: Option<&Self>, sink: &mut dyn Write) -> Result<()> {
        match value {
            Some(v) => v.encode(sink),
            None => wire::write_count(sink, None),
        }
    }

    fn decode_nullable(source: &mut Source<'_>) -> Result<Option<Self>> {
        match wire::read_count(source, true)? {
            Some(count) => decode_elements(source, count).map(Some),
            None => Ok(None),
        }
    }
}

impl<T: Field> Field for Box<[T]> {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()))
    }

    fn encode(&self, sink: &mut dyn Write) -> Result<()> {
        encode_elements(self.len(), self.iter(), sink)
    }

    fn decode(source: &mut Source<'_>) -> Result<Self> {
        Vec::<T>::decode(source).map(Vec::into_boxed_slice)
    }

    fn encode_nullable(value: Option<&Self>, sink: &mut dyn Write) -> Result<()> {
        match value {
            Some(v) => v.encode(sink),
            None => wire::write_count(sink, None),
        }
    }

    fn decode_nullable(source: &mut Source<'_>) -> Result<Option<Self>> {
        Ok(Vec::<T>::decode_nullable(source)?.map(Vec::into_boxed_slice))
    }
}

// ── Generic collections ────────────────────────────────────────────────────

/// A default-constructible collection with a count, an add operation and a
/// stable iteration order.
///
/// Implement this together with [`Field`] (delegating to
/// [`encode_collection`] and [`decode_collection`]) to use a custom
/// collection as a record member.
pub trait Collection: Default {
    type Item;

    fn count(&self) -> usize;

    fn add(&mut self, item: Self::Item);

    fn items(&self) -> impl Iterator<Item = &Self::Item>;
}

pub fn encode_collection<C>(value: Option<&C>, sink: &mut dyn Write) -> Result<()>
where
    C: Collection,
    C::Item: Field,
{
    match value {
        Some(c) => encode_elements(c.count(), c.items(), sink),
        None => wire::write_count(sink, None),
    }
}

pub fn decode_collection<C>(source: &mut Source<'_>, nullable: bool) -> Result<Option<C>>
where
    C: Collection,
    C::Item: Field,
{
    let Some(count) = wire::read_count(source, nullable)? else {
        return Ok(None);
    };
    let mut collection = C::default();
    for _ in 0..count {
        collection.add(C::Item::decode(source)?);
    }
    Ok(Some(collection))
}

impl<T> Collection for VecDeque<T> {
    type Item = T;

    fn count(&self) -> usize {
        self.len()
    }

    fn add(&mut self, item: T) {
        self.push_back(item);
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T> Collection for LinkedList<T> {
    type Item = T;

    fn count(&self) -> usize {
        self.len()
    }

    fn add(&mut self, item: T) {
        self.push_back(item);
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T: Ord> Collection for BTreeSet<T> {
    type Item = T;

    fn count(&self) -> usize {
        self.len()
    }

    fn add(&mut self, item: T) {
        self.insert(item);
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

impl<T: Eq + Hash, S: BuildHasher + Default> Collection for HashSet<T, S> {
    type Item = T;

    fn count(&self) -> usize {
        self.len()
    }

    fn add(&mut self, item: T) {
        self.insert(item);
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }
}

macro_rules! impl_collection_field {
    ($ty:ty, $($generics:tt)*) => {
        impl<$($generics)*> Field for $ty {
            fn shape() -> Shape {
                Shape::Collection(Box::new(<<Self as Collection>::Item as Field>::shape()))
            }

            fn encode(&self, sink: &mut dyn Write) -> Result<()> {
                encode_collection(Some(self), sink)
            }

            fn decode(source: &mut Source<'_>) -> Result<Self> {
                Ok(decode_collection(source, false)?.unwrap_or_default())
            }

            fn encode_nullable(value: Option<&Self>, sink: &mut dyn Write) -> Result<()> {
                encode_collection(value, sink)
            }

            fn decode_nullable(source: &mut Source<'_>) -> Result<Option<Self>> {
                decode_collection(source, true)
            }
        }
    };
}

impl_collection_field!(VecDeque<T>, T: Field);
impl_collection_field!(LinkedList<T>, T: Field);
impl_collection_field!(BTreeSet<T>, T: Field + Ord);
impl_collection_field!(HashSet<T, S>, T: Field + Eq + Hash, S: BuildHasher + Default + 'static);
