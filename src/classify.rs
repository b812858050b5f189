//! Type classifier.
//!
//! Maps a member's declared [`Shape`] to exactly one wire [`Category`]. The
//! mapping is a pure function of the shape, so results are derived once per
//! record type and cached in a process-wide registry shared by both engines.

use crate::error::UnsupportedType;
use crate::field::{Field, Shape};
use crate::record::{MemberVisitor, Record};
use crate::registry::Registry;
use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// Fixed-width primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Char,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Primitive {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Primitive::Bool => 1,
            Primitive::Char | Primitive::I16 | Primitive::U16 => 2,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I64 | Primitive::U64 | Primitive::F64 => 8,
        }
    }
}

/// Wire category of a member or element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Byte,
    FixedPrimitive(Primitive),
    Decimal,
    Guid,
    Utf8String {
        nullable: bool,
    },
    DateTime,
    DateTimeOffset,
    FixedArray {
        element: Box<Category>,
        nullable: bool,
    },
    GenericCollection {
        element: Box<Category>,
        nullable: bool,
    },
    /// A flag-prefixed value category
    Optional(Box<Category>),
}

const BYTE: Category = Category::Byte;
const I32: Category = Category::FixedPrimitive(Primitive::I32);
const I64: Category = Category::FixedPrimitive(Primitive::I64);

static DECIMAL_PARTS: [Category; 4] = [I32; 4];
static DATETIME_PARTS: [Category; 2] = [BYTE, I64];
static DATETIME_OFFSET_PARTS: [Category; 2] = [I64; 2];

impl Category {
    /// Categories with a fixed width and no null marker.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Category::Byte
                | Category::FixedPrimitive(_)
                | Category::Decimal
                | Category::Guid
                | Category::DateTime
                | Category::DateTimeOffset
        )
    }

    /// Whether the category has a null encoding.
    pub fn is_nullable(&self) -> bool {
        match self {
            Category::Utf8String { nullable }
            | Category::FixedArray { nullable, .. }
            | Category::GenericCollection { nullable, .. } => *nullable,
            Category::Optional(_) => true,
            _ => false,
        }
    }

    /// Fixed-width components of a composite value, in wire order.
    pub fn parts(&self) -> Option<&'static [Category]> {
        match self {
            Category::Decimal => Some(&DECIMAL_PARTS),
            Category::DateTime => Some(&DATETIME_PARTS),
            Category::DateTimeOffset => Some(&DATETIME_OFFSET_PARTS),
            _ => None,
        }
    }

    /// Encoded width for categories without a length prefix.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Category::Byte => Some(1),
            Category::FixedPrimitive(p) => Some(p.width()),
            Category::Decimal | Category::Guid | Category::DateTimeOffset => Some(16),
            Category::DateTime => Some(9),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let null = |nullable: bool| if nullable { "?" } else { "" };
        match self {
            Category::Byte => f.write_str("Byte"),
            Category::FixedPrimitive(p) => write!(f, "{:?}", p),
            Category::Decimal => f.write_str("Decimal"),
            Category::Guid => f.write_str("Guid"),
            Category::Utf8String { nullable } => write!(f, "String{}", null(*nullable)),
            Category::DateTime => f.write_str("DateTime"),
            Category::DateTimeOffset => f.write_str("DateTimeOffset"),
            Category::FixedArray { element, nullable } => {
                write!(f, "[{}]{}", element, null(*nullable))
            }
            Category::GenericCollection { element, nullable } => {
                write!(f, "Collection<{}>{}", element, null(*nullable))
            }
            Category::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}

/// Classify a declared shape. `None` means the shape is outside the format.
pub fn classify(shape: &Shape) -> Option<Category> {
    let category = match shape {
        Shape::U8 => Category::Byte,
        Shape::Bool => Category::FixedPrimitive(Primitive::Bool),
        Shape::Char => Category::FixedPrimitive(Primitive::Char),
        Shape::I16 => Category::FixedPrimitive(Primitive::I16),
        Shape::U16 => Category::FixedPrimitive(Primitive::U16),
        Shape::I32 => Category::FixedPrimitive(Primitive::I32),
        Shape::U32 => Category::FixedPrimitive(Primitive::U32),
        Shape::I64 => Category::FixedPrimitive(Primitive::I64),
        Shape::U64 => Category::FixedPrimitive(Primitive::U64),
        Shape::F32 => Category::FixedPrimitive(Primitive::F32),
        Shape::F64 => Category::FixedPrimitive(Primitive::F64),
        Shape::Decimal => Category::Decimal,
        Shape::Guid => Category::Guid,
        Shape::DateTime => Category::DateTime,
        Shape::DateTimeOffset => Category::DateTimeOffset,
        Shape::String => Category::Utf8String { nullable: false },
        Shape::Array(element) => Category::FixedArray {
            element: Box::new(classify_element(element)?),
            nullable: false,
        },
        Shape::Collection(element) => Category::GenericCollection {
            element: Box::new(classify_element(element)?),
            nullable: false,
        },
        Shape::Optional(inner) => match classify(inner)? {
            Category::Utf8String { nullable: false } => Category::Utf8String { nullable: true },
            Category::FixedArray {
                element,
                nullable: false,
            } => Category::FixedArray {
                element,
                nullable: true,
            },
            Category::GenericCollection {
                element,
                nullable: false,
            } => Category::GenericCollection {
                element,
                nullable: true,
            },
            value if value.is_value() => Category::Optional(Box::new(value)),
            _ => return None,
        },
        Shape::Opaque(_) => return None,
    };
    Some(category)
}

/// Elements keep their own null markers but may not be containers.
fn classify_element(shape: &Shape) -> Option<Category> {
    match classify(shape)? {
        Category::FixedArray { .. } | Category::GenericCollection { .. } => None,
        element => Some(element),
    }
}

pub fn classify_member(
    record: &'static str,
    member: &'static str,
    type_name: &'static str,
    shape: &Shape,
) -> Result<Category, UnsupportedType> {
    classify(shape).ok_or(UnsupportedType {
        record,
        member,
        type_name,
    })
}

/// A classified record member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub type_name: &'static str,
    pub shape: Shape,
    pub category: Category,
}

pub type Descriptors = Arc<[MemberDescriptor]>;

static DESCRIPTORS: Registry<Result<Descriptors, UnsupportedType>> = Registry::new();

/// The classified members of `T` in wire order, derived once per process.
///
/// Fails with the first member that has no wire category.
pub fn descriptors<T: Record>() -> Result<Descriptors, UnsupportedType> {
    DESCRIPTORS.get_or_init(TypeId::of::<T>(), || {
        let mut collector = Collector {
            record: T::NAME,
            members: Vec::new(),
            failure: None,
        };
        T::visit_members(&mut collector);
        match collector.failure {
            Some(err) => {
                tracing::warn!(record = T::NAME, error = %err, "record is not serializable");
                Err(err)
            }
            None => {
                tracing::debug!(
                    record = T::NAME,
                    members = collector.members.len(),
                    "classified record members"
                );
                Ok(collector.members.into())
            }
        }
    })
}

struct Collector {
    record: &'static str,
    members: Vec<MemberDescriptor>,
    failure: Option<UnsupportedType>,
}

impl<T> MemberVisitor<T> for Collector {
    fn member<F: Field>(&mut self, name: &'static str, _get: fn(&T) -> &F, _set: fn(&mut T, F)) {
        if self.failure.is_some() {
            return;
        }
        let shape = F::shape();
        match classify_member(self.record, name, type_name::<F>(), &shape) {
            Ok(category) => self.members.push(MemberDescriptor {
                name,
                type_name: type_name::<F>(),
                shape,
                category,
            }),
            Err(err) => self.failure = Some(err),
        }
    }
}
