//! Tick-based instants.
//!
//! A tick is 100 nanoseconds. Instants count ticks since 0001-01-01T00:00:00
//! in the proleptic Gregorian calendar, up to the last tick of 9999-12-31.

use chrono::{FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt;

pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;
pub const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;

/// Ticks of 9999-12-31T23:59:59.9999999.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

/// Largest UTC offset, in ticks, a [`DateTimeOffset`] may carry.
pub const MAX_OFFSET_TICKS: i64 = 14 * TICKS_PER_HOUR;

/// Ticks of 1970-01-01T00:00:00.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// How a [`DateTime`]'s ticks relate to UTC. The discriminant is the wire tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DateTimeKind {
    #[default]
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

impl TryFrom<u8> for DateTimeKind {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        match tag {
            0 => Ok(DateTimeKind::Unspecified),
            1 => Ok(DateTimeKind::Utc),
            2 => Ok(DateTimeKind::Local),
            other => Err(other),
        }
    }
}

pub(crate) fn ticks_in_range(ticks: i64) -> bool {
    (0..=MAX_TICKS).contains(&ticks)
}

/// Whole minutes within ±14 hours.
pub(crate) fn offset_in_range(offset_ticks: i64) -> bool {
    (-MAX_OFFSET_TICKS..=MAX_OFFSET_TICKS).contains(&offset_ticks)
        && offset_ticks % TICKS_PER_MINUTE == 0
}

fn naive_to_ticks(naive: NaiveDateTime) -> Option<i64> {
    let utc = naive.and_utc();
    let ticks = utc
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(UNIX_EPOCH_TICKS)?
        .checked_add(i64::from(utc.timestamp_subsec_nanos() / 100))?;
    ticks_in_range(ticks).then_some(ticks)
}

fn ticks_to_naive(ticks: i64) -> Option<NaiveDateTime> {
    let since_epoch = ticks - UNIX_EPOCH_TICKS;
    let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    chrono::DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

/// A calendar instant with a [`DateTimeKind`] tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateTime {
    ticks: i64,
    kind: DateTimeKind,
}

impl DateTime {
    pub const MIN: DateTime = DateTime {
        ticks: 0,
        kind: DateTimeKind::Unspecified,
    };

    /// Returns `None` when `ticks` is outside `0..=MAX_TICKS`.
    pub fn new(ticks: i64, kind: DateTimeKind) -> Option<Self> {
        ticks_in_range(ticks).then_some(DateTime { ticks, kind })
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }

    /// The same ticks under another kind tag.
    pub fn with_kind(self, kind: DateTimeKind) -> Self {
        DateTime { kind, ..self }
    }

    pub fn from_utc(dt: chrono::DateTime<Utc>) -> Option<Self> {
        Self::new(naive_to_ticks(dt.naive_utc())?, DateTimeKind::Utc)
    }

    /// Local wall-clock ticks tagged [`DateTimeKind::Local`].
    pub fn from_local(dt: chrono::DateTime<Local>) -> Option<Self> {
        Self::new(naive_to_ticks(dt.naive_local())?, DateTimeKind::Local)
    }

    pub fn from_naive(naive: NaiveDateTime) -> Option<Self> {
        Self::new(naive_to_ticks(naive)?, DateTimeKind::Unspecified)
    }

    pub fn now_utc() -> Option<Self> {
        Self::from_utc(Utc::now())
    }

    pub fn now_local() -> Option<Self> {
        Self::from_local(Local::now())
    }

    /// Calendar value of the ticks, ignoring the kind tag.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        ticks_to_naive(self.ticks)
    }
}

/// An instant paired with the UTC offset it was observed at.
///
/// Equality compares both the instant and the offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateTimeOffset {
    utc_ticks: i64,
    offset_ticks: i64,
}

impl DateTimeOffset {
    /// Returns `None` unless the offset is a whole number of minutes within
    /// ±14 hours and both the UTC and the local ticks are in range.
    pub fn new(utc_ticks: i64, offset_ticks: i64) -> Option<Self> {
        if !offset_in_range(offset_ticks) || !ticks_in_range(utc_ticks) {
            return None;
        }
        if !ticks_in_range(utc_ticks + offset_ticks) {
            return None;
        }
        Some(DateTimeOffset {
            utc_ticks,
            offset_ticks,
        })
    }

    /// Ticks of the instant at zero offset.
    pub fn utc_ticks(&self) -> i64 {
        self.utc_ticks
    }

    pub fn offset_ticks(&self) -> i64 {
        self.offset_ticks
    }

    /// Wall-clock ticks at the stored offset.
    pub fn local_ticks(&self) -> i64 {
        self.utc_ticks + self.offset_ticks
    }

    pub fn from_chrono(dt: chrono::DateTime<FixedOffset>) -> Option<Self> {
        let offset_ticks = i64::from(dt.offset().local_minus_utc()) * TICKS_PER_SECOND;
        Self::new(naive_to_ticks(dt.naive_utc())?, offset_ticks)
    }

    pub fn to_chrono(&self) -> Option<chrono::DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt((self.offset_ticks / TICKS_PER_SECOND) as i32)?;
        Some(offset.from_utc_datetime(&ticks_to_naive(self.utc_ticks)?))
    }

    pub fn now() -> Option<Self> {
        Self::from_chrono(Local::now().fixed_offset())
    }
}

// ── serde ──────────────────────────────────────────────────────────────────
//
// DateTime is the tuple (kind tag, ticks); DateTimeOffset is the tuple
// (offset ticks, UTC ticks). Both match the field order on the wire.

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&(self.kind as u8))?;
        tuple.serialize_element(&self.ticks)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DateTimeVisitor;

        impl<'de> Visitor<'de> for DateTimeVisitor {
            type Value = DateTime;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a (kind, ticks) pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DateTime, A::Error> {
                let tag: u8 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let ticks: i64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let kind = DateTimeKind::try_from(tag)
                    .map_err(|tag| de::Error::custom(format!("invalid DateTime kind {}", tag)))?;
                DateTime::new(ticks, kind)
                    .ok_or_else(|| de::Error::custom(format!("DateTime ticks {} out of range", ticks)))
            }
        }

        deserializer.deserialize_tuple(2, DateTimeVisitor)
    }
}

impl Serialize for DateTimeOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.offset_ticks)?;
        tuple.serialize_element(&self.utc_ticks)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for DateTimeOffset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DateTimeOffsetVisitor;

        impl<'de> Visitor<'de> for DateTimeOffsetVisitor {
            type Value = DateTimeOffset;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an (offset ticks, UTC ticks) pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DateTimeOffset, A::Error> {
                let offset_ticks: i64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let utc_ticks: i64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                DateTimeOffset::new(utc_ticks, offset_ticks)
                    .ok_or_else(|| de::Error::custom("DateTimeOffset out of range"))
            }
        }

        deserializer.deserialize_tuple(2, DateTimeOffsetVisitor)
    }
}
