use crate::error::DecodeError;
use crate::layout::ID_BITS;
use serde::de::{self, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A generated identifier.
///
/// The value is plain data: it carries no reference to the generator or its
/// configuration. Its canonical text form is the decimal number, which is
/// also what it serializes to, so consumers with narrower numerics (e.g. JSON
/// doubles) never lose precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId(u64);

impl SnowflakeId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        debug_assert!(raw >> ID_BITS == 0);
        Self(raw)
    }

    /// Returns the identifier as an unsigned integer.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for SnowflakeId {
    type Error = DecodeError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        if raw >> ID_BITS != 0 {
            return Err(DecodeError::ReservedBitSet(raw));
        }
        Ok(Self(raw))
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.0
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        // the reserved top bit is always clear
        id.0 as i64
    }
}

impl FromStr for SnowflakeId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DecodeError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecodeError::NotNumeric(s.to_owned()));
        }
        let raw = s
            .parse::<u64>()
            .map_err(|_| DecodeError::OutOfRange(s.to_owned()))?;
        Self::try_from(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SnowflakeId").field(&self.0).finish()
    }
}

impl Serialize for SnowflakeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SnowflakeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(SnowflakeIdVisitor)
    }
}

struct SnowflakeIdVisitor;

impl<'de> Visitor<'de> for SnowflakeIdVisitor {
    type Value = SnowflakeId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        SnowflakeId::try_from(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        let raw = u64::try_from(v).map_err(|_| E::custom(DecodeError::OutOfRange(v.to_string())))?;
        self.visit_u64(raw)
    }
}
