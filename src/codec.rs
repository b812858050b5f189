//! The contract shared by both engines.

use crate::config::Config;
use crate::error::Result;
use crate::record::Record;
use crate::version;
use crate::wire::Source;
use std::io::{Read, Write};

/// A codec bound to the record type `T`.
///
/// Both implementations, [`CompiledCodec`](crate::CompiledCodec) and
/// [`ReflectiveCodec`](crate::ReflectiveCodec), produce and accept identical
/// bytes, so a stream written by one can be read by the other.
///
/// ```rust
/// use compact_serde::{CompactCodec, CompiledCodec, ReflectiveCodec, record};
/// use serde::{Deserialize, Serialize};
///
/// record! {
///     version = "3.1.0";
///
///     #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
///     struct Order {
///         id: u32,
///         note: Option<String>,
///     }
/// }
///
/// let compiled = CompiledCodec::<Order>::new().unwrap();
/// let reflective = ReflectiveCodec::<Order>::new().unwrap();
/// let order = Order { id: 9, note: None };
///
/// let mut buf = Vec::new();
/// compiled.write_version(&mut buf, compiled.default_version()).unwrap();
/// compiled.serialize(&order, &mut buf).unwrap();
///
/// let mut input = &buf[..];
/// assert_eq!(reflective.read_version(&mut input).unwrap(), "3.1.0");
/// assert_eq!(reflective.deserialize(&mut input).unwrap(), order);
/// ```
pub trait CompactCodec<T: Record> {
    fn config(&self) -> &Config;

    /// The configured version override, or the record's declared version.
    fn default_version(&self) -> &str {
        self.config().version.as_deref().unwrap_or(T::VERSION)
    }

    fn write_version(&self, sink: &mut dyn Write, version: &str) -> Result<()> {
        version::write_version(sink, version)
    }

    fn read_version(&self, source: &mut dyn Read) -> Result<String> {
        version::read_version(&mut Source::new(source, self.config().max_length))
    }

    /// Write every member of `value`, in declaration order.
    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<()>;

    fn deserialize(&self, source: &mut dyn Read) -> Result<T>;
}
