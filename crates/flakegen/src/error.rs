use jiff::Timestamp;
use thiserror::Error;

/// Errors returned by generator construction and ID generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid worker id {worker_id}; expected 0..={max_worker_id}")]
    InvalidWorkerId { worker_id: u64, max_worker_id: u64 },
    #[error("invalid datacenter id {datacenter_id}; expected 0..={max_datacenter_id}")]
    InvalidDatacenterId {
        datacenter_id: u64,
        max_datacenter_id: u64,
    },
    #[error("invalid maximum {max} for the {field} field; expected 2^k - 1")]
    InvalidFieldMax { field: &'static str, max: u64 },
    #[error("field layout needs {field_bits} bits, leaving no room for the timestamp")]
    LayoutTooWide { field_bits: u32 },
    #[error("epoch is before the unix epoch: {epoch}")]
    NegativeEpoch { epoch: Timestamp },
    #[error("epoch is ahead of current clock time: epoch={epoch}, now={now}")]
    EpochAhead { epoch: Timestamp, now: Timestamp },
    #[error("timestamp {timestamp}ms does not fit the {timestamp_bits}-bit timestamp field")]
    TimestampOverflow { timestamp: i64, timestamp_bits: u32 },
    #[error("clock moved backwards: last={last}ms, now={now}ms (epoch-relative)")]
    ClockMovedBackwards { last: i64, now: i64 },
    #[error("generator state lock is poisoned")]
    StatePoisoned,
}

/// Errors returned when parsing an identifier from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier is not a decimal number: {0:?}")]
    NotNumeric(String),
    #[error("identifier does not fit in 64 bits: {0}")]
    OutOfRange(String),
    #[error("identifier {0} has the reserved top bit set")]
    ReservedBitSet(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
