use crate::{
    clock::{Clock, SystemClock},
    decoded::{DecodedId, Decoder},
    error::{DecodeError, Error, Result},
    GeneratorSettings, IdGenerator, SnowflakeId,
};
use std::sync::Mutex;

/// An [`IdGenerator`] behind a mutex, for hosts that generate from several
/// threads against one set of coordinates.
///
/// Decoding only needs the immutable configuration and never takes the lock.
pub struct SharedIdGenerator<C: Clock = SystemClock> {
    decoder: Decoder,
    inner: Mutex<IdGenerator<C>>,
}

impl SharedIdGenerator<SystemClock> {
    /// Creates a shared generator backed by the real system clock.
    pub fn new(settings: GeneratorSettings) -> Result<Self> {
        IdGenerator::new(settings).map(Self::from)
    }
}

impl<C: Clock> From<IdGenerator<C>> for SharedIdGenerator<C> {
    fn from(generator: IdGenerator<C>) -> Self {
        Self {
            decoder: generator.decoder(),
            inner: Mutex::new(generator),
        }
    }
}

impl<C: Clock> SharedIdGenerator<C> {
    pub fn next_id(&self) -> Result<SnowflakeId> {
        self.inner
            .lock()
            .map_err(|_| Error::StatePoisoned)?
            .next_id()
    }

    pub fn generate(&self) -> Result<String> {
        Ok(self.next_id()?.to_string())
    }

    pub fn decode(&self, id: SnowflakeId) -> DecodedId {
        self.decoder.decode(id)
    }

    pub fn decode_str(&self, id: &str) -> std::result::Result<DecodedId, DecodeError> {
        self.decoder.decode_str(id)
    }

    pub fn decoder(&self) -> Decoder {
        self.decoder
    }
}
