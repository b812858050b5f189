//! 128-bit exact decimal.
//!
//! A [`Decimal`] is a 96-bit unsigned mantissa, a sign and a power-of-ten
//! scale between 0 and 28. Its value is `(-1)^sign * mantissa / 10^scale`.
//!
//! The four 32-bit "bit" groups are kept exactly as they appear on the wire:
//!
//! ```text
//! group 0: mantissa bits  0..32
//! group 1: mantissa bits 32..64
//! group 2: mantissa bits 64..96
//! group 3: bits 16..24 scale, bit 31 sign, all other bits zero
//! ```
//!
//! Equality is representational: `1.0` and `1.00` differ in scale and are not
//! equal.

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest scale a decimal may carry.
pub const MAX_SCALE: u32 = 28;

const SCALE_SHIFT: u32 = 16;
const SCALE_MASK: u32 = 0x00FF_0000;
const SIGN_MASK: u32 = 0x8000_0000;
const MANTISSA_LIMIT: u128 = 1 << 96;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        lo: 0,
        mid: 0,
        hi: 0,
        flags: 0,
    };

    /// Build a decimal from its mantissa words, sign and scale.
    ///
    /// Returns `None` when `scale` exceeds [`MAX_SCALE`].
    pub fn from_parts(lo: u32, mid: u32, hi: u32, negative: bool, scale: u32) -> Option<Self> {
        if scale > MAX_SCALE {
            return None;
        }
        let sign = if negative { SIGN_MASK } else { 0 };
        Some(Decimal {
            lo,
            mid,
            hi,
            flags: sign | (scale << SCALE_SHIFT),
        })
    }

    /// Build `mantissa / 10^scale`. The mantissa magnitude must fit in 96 bits.
    pub fn from_i128_with_scale(mantissa: i128, scale: u32) -> Option<Self> {
        let magnitude = mantissa.unsigned_abs();
        if magnitude >= MANTISSA_LIMIT {
            return None;
        }
        Self::from_parts(
            magnitude as u32,
            (magnitude >> 32) as u32,
            (magnitude >> 64) as u32,
            mantissa < 0,
            scale,
        )
    }

    /// Rebuild a decimal from its four bit groups, rejecting reserved bits and
    /// out-of-range scales.
    pub fn from_bits(bits: [i32; 4]) -> Option<Self> {
        let flags = bits[3] as u32;
        if flags & !(SCALE_MASK | SIGN_MASK) != 0 {
            return None;
        }
        if (flags & SCALE_MASK) >> SCALE_SHIFT > MAX_SCALE {
            return None;
        }
        Some(Decimal {
            lo: bits[0] as u32,
            mid: bits[1] as u32,
            hi: bits[2] as u32,
            flags,
        })
    }

    pub fn to_bits(&self) -> [i32; 4] {
        [
            self.lo as i32,
            self.mid as i32,
            self.hi as i32,
            self.flags as i32,
        ]
    }

    pub fn scale(&self) -> u32 {
        (self.flags & SCALE_MASK) >> SCALE_SHIFT
    }

    pub fn is_sign_negative(&self) -> bool {
        self.flags & SIGN_MASK != 0
    }

    /// The signed unscaled value.
    pub fn mantissa(&self) -> i128 {
        let magnitude =
            (self.lo as i128) | ((self.mid as i128) << 32) | ((self.hi as i128) << 64);
        if self.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa().unsigned_abs().to_string();
        let scale = self.scale() as usize;
        let sign = if self.is_sign_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int, frac)
    }
}

/// Error returned when a string is not a decimal literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseDecimalError {
    #[error("empty decimal literal")]
    Empty,
    #[error("invalid digit in decimal literal")]
    InvalidDigit,
    #[error("decimal literal has more than 28 fractional digits")]
    ScaleOverflow,
    #[error("decimal mantissa does not fit in 96 bits")]
    MantissaOverflow,
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            Some(_) => (false, s),
            None => return Err(ParseDecimalError::Empty),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        if int.is_empty() && frac.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        if frac.len() > MAX_SCALE as usize {
            return Err(ParseDecimalError::ScaleOverflow);
        }

        let mut magnitude: u128 = 0;
        for c in int.chars().chain(frac.chars()) {
            let digit = c.to_digit(10).ok_or(ParseDecimalError::InvalidDigit)?;
            magnitude = magnitude * 10 + digit as u128;
            if magnitude >= MANTISSA_LIMIT {
                return Err(ParseDecimalError::MantissaOverflow);
            }
        }

        let mantissa = magnitude as i128;
        let mantissa = if negative { -mantissa } else { mantissa };
        Decimal::from_i128_with_scale(mantissa, frac.len() as u32)
            .ok_or(ParseDecimalError::MantissaOverflow)
            .map(|d| {
                // keep the sign of "-0.00"
                if negative && magnitude == 0 {
                    Decimal {
                        flags: d.flags | SIGN_MASK,
                        ..d
                    }
                } else {
                    d
                }
            })
    }
}

// ── serde ──────────────────────────────────────────────────────────────────
//
// Binary formats see the four bit groups as a tuple; human-readable formats
// see the decimal literal.

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return serializer.collect_str(self);
        }
        let mut tuple = serializer.serialize_tuple(4)?;
        for part in self.to_bits() {
            tuple.serialize_element(&part)?;
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(DecimalVisitor)
        } else {
            deserializer.deserialize_tuple(4, DecimalVisitor)
        }
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal literal or four 32-bit decimal bit groups")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Decimal, A::Error> {
        let mut bits = [0i32; 4];
        for (i, part) in bits.iter_mut().enumerate() {
            *part = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Decimal::from_bits(bits).ok_or_else(|| de::Error::custom("invalid decimal flags"))
    }
}
