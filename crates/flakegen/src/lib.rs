//! Snowflake-style identifier generation.
//!
//! An identifier packs `[timestamp][datacenter][worker][sequence]` into the
//! low 63 bits of a `u64`. The timestamp counts milliseconds since a
//! configurable epoch, so identifiers from one generator sort by creation
//! time. Uniqueness across generators relies on the caller handing out
//! distinct `(worker_id, datacenter_id)` pairs.
//!
//! ```
//! use flakegen::{GeneratorSettings, IdGenerator};
//!
//! let settings = GeneratorSettings::builder()
//!     .worker_id(5)
//!     .datacenter_id(3)
//!     .build();
//! let mut generator = IdGenerator::new(settings).unwrap();
//!
//! let id = generator.generate().unwrap();
//! let decoded = generator.decode_str(&id).unwrap();
//! assert_eq!(decoded.worker_id, 5);
//! assert_eq!(decoded.datacenter_id, 3);
//! ```

mod clock;
mod decoded;
pub mod error;
mod generator;
mod layout;
mod shared;
mod snowflake_id;

pub use clock::{Clock, SystemClock};
pub use decoded::{DecodedId, Decoder};
pub use error::{DecodeError, Error};
pub use generator::{
    BackwardClockPolicy, GeneratorSettings, IdGenerator, DEFAULT_EPOCH,
    DEFAULT_MAX_DATACENTER_ID, DEFAULT_MAX_SEQUENCE_ID, DEFAULT_MAX_WORKER_ID,
};
pub use layout::{BitLayout, IdParts, ID_BITS};
pub use shared::SharedIdGenerator;
pub use snowflake_id::SnowflakeId;
