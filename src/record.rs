//! Record descriptions.
//!
//! A record is a plain struct whose members are enumerated, in declaration
//! order, by [`Record::visit_members`]. The visitor receives each member's
//! name, its type (as the [`Field`] type parameter) and a getter/setter pair.
//! That order is the wire order for both engines.
//!
//! The [`record!`](crate::record!) macro writes the impl from the struct
//! definition:
//!
//! ```rust
//! use compact_serde::{CompactCodec, CompiledCodec, record};
//! use serde::{Deserialize, Serialize};
//!
//! record! {
//!     version = "1.2.3";
//!
//!     #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//!     pub struct Reading {
//!         pub sensor: u32,
//!         pub label: Option<String>,
//!         pub samples: Vec<f64>,
//!     }
//! }
//!
//! let codec = CompiledCodec::<Reading>::new().unwrap();
//! assert_eq!(codec.default_version(), "1.2.3");
//! ```

use crate::field::Field;

/// A type with a fixed, ordered set of serializable members.
pub trait Record: Default + 'static {
    /// Type name used in diagnostics.
    const NAME: &'static str;

    /// Declared schema version, the codec's default version tag.
    const VERSION: &'static str;

    /// Visit every member in declaration order.
    fn visit_members<V: MemberVisitor<Self>>(visitor: &mut V);
}

/// Receives the members of a record, one call per member, in wire order.
pub trait MemberVisitor<T> {
    fn member<F: Field>(&mut self, name: &'static str, get: fn(&T) -> &F, set: fn(&mut T, F));
}

/// Define a struct and implement [`Record`] for it.
///
/// An optional leading `version = "...";` sets [`Record::VERSION`]; without
/// it the defining crate's package version is used.
#[macro_export]
macro_rules! record {
    (
        version = $version:expr;
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            const NAME: &'static str = stringify!($name);
            const VERSION: &'static str = $version;

            fn visit_members<V: $crate::MemberVisitor<Self>>(visitor: &mut V) {
                $(
                    {
                        fn get(record: &$name) -> &$ty {
                            &record.$field
                        }
                        fn set(record: &mut $name, value: $ty) {
                            record.$field = value;
                        }
                        visitor.member::<$ty>(stringify!($field), get, set);
                    }
                )*
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident { $($body:tt)* }
    ) => {
        $crate::record! {
            version = env!("CARGO_PKG_VERSION");
            $(#[$meta])*
            $vis struct $name { $($body)* }
        }
    };
}
