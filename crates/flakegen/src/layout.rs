use crate::error::{Error, Result};

/// Total identifier width. The top bit of the `u64` stays clear so every ID
/// also fits a signed 64-bit integer.
pub const ID_BITS: u32 = 63;

/// The four fields of an identifier, timestamp relative to the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    pub timestamp: u64,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub sequence_id: u64,
}

/// Bit layout `[timestamp][datacenter][worker][sequence]`, high to low.
///
/// Field widths are the bit lengths of the configured maxima; the timestamp
/// takes whatever is left of [`ID_BITS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLayout {
    sequence_bits: u32,
    worker_bits: u32,
    datacenter_bits: u32,
    max_sequence_id: u64,
    max_worker_id: u64,
    max_datacenter_id: u64,
}

impl BitLayout {
    pub fn new(max_sequence_id: u64, max_worker_id: u64, max_datacenter_id: u64) -> Result<Self> {
        let layout = Self {
            sequence_bits: field_bits("sequence", max_sequence_id)?,
            worker_bits: field_bits("worker", max_worker_id)?,
            datacenter_bits: field_bits("datacenter", max_datacenter_id)?,
            max_sequence_id,
            max_worker_id,
            max_datacenter_id,
        };

        let field_bits = layout.timestamp_shift();
        if field_bits >= ID_BITS {
            return Err(Error::LayoutTooWide { field_bits });
        }

        Ok(layout)
    }

    pub fn sequence_bits(&self) -> u32 {
        self.sequence_bits
    }

    pub fn worker_bits(&self) -> u32 {
        self.worker_bits
    }

    pub fn datacenter_bits(&self) -> u32 {
        self.datacenter_bits
    }

    pub fn timestamp_bits(&self) -> u32 {
        ID_BITS - self.timestamp_shift()
    }

    pub fn max_sequence_id(&self) -> u64 {
        self.max_sequence_id
    }

    pub fn max_worker_id(&self) -> u64 {
        self.max_worker_id
    }

    pub fn max_datacenter_id(&self) -> u64 {
        self.max_datacenter_id
    }

    /// Largest epoch-relative millisecond value the timestamp field holds.
    pub fn max_timestamp(&self) -> u64 {
        (1_u64 << self.timestamp_bits()) - 1
    }

    fn worker_shift(&self) -> u32 {
        self.sequence_bits
    }

    fn datacenter_shift(&self) -> u32 {
        self.sequence_bits + self.worker_bits
    }

    fn timestamp_shift(&self) -> u32 {
        self.sequence_bits + self.worker_bits + self.datacenter_bits
    }

    /// Packs the parts into a raw identifier.
    ///
    /// Each field is masked to its width; the timestamp must not exceed
    /// [`max_timestamp`](Self::max_timestamp).
    pub fn compose(&self, parts: IdParts) -> u64 {
        debug_assert!(parts.timestamp <= self.max_timestamp());
        (parts.timestamp << self.timestamp_shift())
            | ((parts.datacenter_id & self.max_datacenter_id) << self.datacenter_shift())
            | ((parts.worker_id & self.max_worker_id) << self.worker_shift())
            | (parts.sequence_id & self.max_sequence_id)
    }

    pub fn decompose(&self, raw: u64) -> IdParts {
        IdParts {
            timestamp: (raw >> self.timestamp_shift()) & self.max_timestamp(),
            datacenter_id: (raw >> self.datacenter_shift()) & self.max_datacenter_id,
            worker_id: (raw >> self.worker_shift()) & self.max_worker_id,
            sequence_id: raw & self.max_sequence_id,
        }
    }
}

impl Default for BitLayout {
    fn default() -> Self {
        Self {
            sequence_bits: 12,
            worker_bits: 5,
            datacenter_bits: 5,
            max_sequence_id: 4095,
            max_worker_id: 31,
            max_datacenter_id: 31,
        }
    }
}

/// Bit length of `max`, which must be all ones (`2^k - 1`, including 0).
fn field_bits(field: &'static str, max: u64) -> Result<u32> {
    if max & max.wrapping_add(1) != 0 {
        return Err(Error::InvalidFieldMax { field, max });
    }
    Ok(u64::BITS - max.leading_zeros())
}
