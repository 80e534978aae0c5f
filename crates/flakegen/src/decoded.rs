use crate::error::DecodeError;
use crate::layout::BitLayout;
use crate::snowflake_id::SnowflakeId;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// The fields recovered from an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedId {
    /// Unix milliseconds, epoch already added back.
    pub timestamp: i64,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub sequence_id: u64,
}

impl DecodedId {
    /// The timestamp field as an instant, if it is within jiff's range.
    pub fn to_timestamp(&self) -> Option<Timestamp> {
        Timestamp::from_millisecond(self.timestamp).ok()
    }
}

/// Stateless shift-and-mask decoding for one epoch and bit layout.
///
/// Identifiers carry no header, so decoding with a configuration other than
/// the one that encoded them yields meaningless fields rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    epoch_ms: i64,
    layout: BitLayout,
}

impl Decoder {
    pub fn new(epoch: Timestamp, layout: BitLayout) -> Self {
        Self {
            epoch_ms: epoch.as_millisecond(),
            layout,
        }
    }

    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }

    pub fn decode(&self, id: SnowflakeId) -> DecodedId {
        let parts = self.layout.decompose(id.as_u64());
        DecodedId {
            // at most 62 bits, so the cast is lossless
            timestamp: self.epoch_ms.saturating_add(parts.timestamp as i64),
            datacenter_id: parts.datacenter_id,
            worker_id: parts.worker_id,
            sequence_id: parts.sequence_id,
        }
    }

    pub fn decode_str(&self, id: &str) -> Result<DecodedId, DecodeError> {
        Ok(self.decode(id.parse()?))
    }

    pub fn decode_u64(&self, id: u64) -> Result<DecodedId, DecodeError> {
        Ok(self.decode(SnowflakeId::try_from(id)?))
    }
}
