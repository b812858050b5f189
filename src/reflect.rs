//! The reflective engine.

use crate::classify::{Descriptors, MemberDescriptor, descriptors};
use crate::codec::CompactCodec;
use crate::config::Config;
use crate::de::Deserializer;
use crate::error::Result;
use crate::record::Record;
use crate::ser::Serializer;
use crate::wire::Source;
use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned};
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

/// Codec that resolves every member's wire category on every call.
///
/// Construction classifies `T`, so a record with an unsupported member type
/// fails here, at first encounter, rather than partway through a stream.
pub struct ReflectiveCodec<T> {
    members: Descriptors,
    config: Config,
    marker: PhantomData<fn() -> T>,
}

impl<T: Record> ReflectiveCodec<T> {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Ok(ReflectiveCodec {
            members: descriptors::<T>()?,
            config,
            marker: PhantomData,
        })
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }
}

impl<T> Clone for ReflectiveCodec<T> {
    fn clone(&self) -> Self {
        ReflectiveCodec {
            members: self.members.clone(),
            config: self.config.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: Record + Serialize + DeserializeOwned> CompactCodec<T> for ReflectiveCodec<T> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<()> {
        value.serialize(&mut Serializer::new(sink, self.members.clone()))
    }

    fn deserialize(&self, source: &mut dyn Read) -> Result<T> {
        let mut source = Source::new(source, self.config.max_length);
        T::deserialize(&mut Deserializer::new(&mut source, self.members.clone()))
    }
}

impl<T> fmt::Debug for ReflectiveCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveCodec")
            .field("members", &self.members.len())
            .field("config", &self.config)
            .finish()
    }
}
