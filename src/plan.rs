//! Plan compiler.
//!
//! A [`Plan`] is the compiled form of a record type: one [`FieldCodec`] per
//! member, in wire order, each holding the member's getter/setter and the
//! encode/decode routines of its [`Field`] type. Element and inner codecs are
//! resolved by monomorphization, so executing a plan never classifies,
//! looks up or branches on a category.
//!
//! Plans are compiled at most once per type and shared for the life of the
//! process:
//!
//! ```rust
//! use compact_serde::{compile, record};
//! use std::sync::Arc;
//!
//! record! {
//!     #[derive(Default)]
//!     struct Sample {
//!         id: u64,
//!         tags: Vec<String>,
//!     }
//! }
//!
//! let first = compile::<Sample>().unwrap();
//! let second = compile::<Sample>().unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(first.members()[1].name, "tags");
//! ```

use crate::classify::{Descriptors, MemberDescriptor, descriptors};
use crate::codec::CompactCodec;
use crate::config::Config;
use crate::error::{Result, UnsupportedType};
use crate::field::Field;
use crate::record::{MemberVisitor, Record};
use crate::registry::Registry;
use crate::wire::Source;
use std::any::{Any, TypeId};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

type WriteFn<T> = Box<dyn Fn(&T, &mut dyn Write) -> Result<()> + Send + Sync>;
type ReadFn<T> = Box<dyn Fn(&mut Source<'_>, &mut T) -> Result<()> + Send + Sync>;

/// The bound read and write procedures of one member.
pub struct FieldCodec<T> {
    name: &'static str,
    write: WriteFn<T>,
    read: ReadFn<T>,
}

impl<T> FieldCodec<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for FieldCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCodec").field("name", &self.name).finish()
    }
}

/// The compiled form of a record type.
#[derive(Debug)]
pub struct Plan<T> {
    record: &'static str,
    members: Descriptors,
    fields: Vec<FieldCodec<T>>,
}

impl<T> Plan<T> {
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Classified members in wire order.
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub fn fields(&self) -> &[FieldCodec<T>] {
        &self.fields
    }

    /// Write every member of `value`, in order.
    #[inline]
    pub fn write_all(&self, value: &T, sink: &mut dyn Write) -> Result<()> {
        for field in &self.fields {
            (field.write)(value, sink)?;
        }
        Ok(())
    }

    /// Read every member into `record`, in order.
    #[inline]
    pub fn read_all(&self, source: &mut Source<'_>, record: &mut T) -> Result<()> {
        for field in &self.fields {
            (field.read)(source, record)?;
        }
        Ok(())
    }
}

// ── Compilation ────────────────────────────────────────────────────────────

type ErasedPlan = Arc<dyn Any + Send + Sync>;

static PLANS: Registry<std::result::Result<ErasedPlan, UnsupportedType>> = Registry::new();

/// The compiled plan for `T`, building it on first use.
///
/// Concurrent first callers block on the single in-flight compilation and
/// all observe the same plan. A type that fails classification fails here
/// every time, without having written anything.
pub fn compile<T: Record>() -> Result<Arc<Plan<T>>> {
    let mut compiled = false;
    let erased = PLANS.get_or_init(TypeId::of::<T>(), || {
        compiled = true;
        build::<T>().map(|plan| Arc::new(plan) as ErasedPlan)
    })?;
    if !compiled {
        tracing::trace!(record = T::NAME, "plan cache hit");
    }
    match erased.downcast::<Plan<T>>() {
        Ok(plan) => Ok(plan),
        Err(_) => unreachable!("plan registry is keyed by the plan's record type"),
    }
}

/// Whether a plan for `T` has already been published.
pub fn is_compiled<T: Record>() -> bool {
    PLANS.contains(TypeId::of::<T>())
}

fn build<T: Record>() -> std::result::Result<Plan<T>, UnsupportedType> {
    // classification fails fast for the whole type before anything is bound
    let members = descriptors::<T>()?;
    let mut binder = Binder {
        fields: Vec::with_capacity(members.len()),
    };
    T::visit_members(&mut binder);
    debug_assert!(
        binder
            .fields
            .iter()
            .map(FieldCodec::name)
            .eq(members.iter().map(|m| m.name))
    );
    tracing::debug!(
        record = T::NAME,
        members = binder.fields.len(),
        "compiled record plan"
    );
    Ok(Plan {
        record: T::NAME,
        members,
        fields: binder.fields,
    })
}

struct Binder<T> {
    fields: Vec<FieldCodec<T>>,
}

impl<T: 'static> MemberVisitor<T> for Binder<T> {
    fn member<F: Field>(&mut self, name: &'static str, get: fn(&T) -> &F, set: fn(&mut T, F)) {
        self.fields.push(FieldCodec {
            name,
            write: Box::new(move |record: &T, sink: &mut dyn Write| get(record).encode(sink)),
            read: Box::new(move |source: &mut Source<'_>, record: &mut T| {
                set(record, F::decode(source)?);
                Ok(())
            }),
        });
    }
}

// ── Compiled codec ─────────────────────────────────────────────────────────

/// Codec backed by the shared compiled plan of `T`.
pub struct CompiledCodec<T> {
    plan: Arc<Plan<T>>,
    config: Config,
}

impl<T: Record> CompiledCodec<T> {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Ok(CompiledCodec {
            plan: compile::<T>()?,
            config,
        })
    }

    pub fn plan(&self) -> &Arc<Plan<T>> {
        &self.plan
    }
}

impl<T> Clone for CompiledCodec<T> {
    fn clone(&self) -> Self {
        CompiledCodec {
            plan: Arc::clone(&self.plan),
            config: self.config.clone(),
        }
    }
}

impl<T: Record> CompactCodec<T> for CompiledCodec<T> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn serialize(&self, value: &T, sink: &mut dyn Write) -> Result<()> {
        self.plan.write_all(value, sink)
    }

    fn deserialize(&self, source: &mut dyn Read) -> Result<T> {
        let mut source = Source::new(source, self.config.max_length);
        let mut record = T::default();
        self.plan.read_all(&mut source, &mut record)?;
        Ok(record)
    }
}

impl<T> fmt::Debug for CompiledCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCodec")
            .field("record", &self.plan.record)
            .field("config", &self.config)
            .finish()
    }
}
