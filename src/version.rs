//! Version header.
//!
//! A stream starts with a version tag written with the string codec: `i32`
//! byte count followed by UTF-8 bytes. The tag is opaque to the codec; it is
//! never compared against anything, and reading it consumes no payload byte.

use crate::error::{Error, Result};
use crate::wire::{self, Source};
use std::io::Write;

const CONTEXT: &str = "version length";

pub fn write_version(sink: &mut dyn Write, version: &str) -> Result<()> {
    wire::write_string(sink, Some(version))
}

/// Read a version tag. A null tag is malformed.
pub fn read_version(source: &mut Source<'_>) -> Result<String> {
    match wire::read_length(source, CONTEXT, false)? {
        Some(len) => wire::read_utf8(source, len),
        None => Err(Error::MalformedLength {
            context: CONTEXT,
            found: wire::NULL_LENGTH.into(),
        }),
    }
}
