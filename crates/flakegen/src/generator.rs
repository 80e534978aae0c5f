use crate::{
    clock::{Clock, SystemClock},
    decoded::{DecodedId, Decoder},
    error::{DecodeError, Error, Result},
    layout::{BitLayout, IdParts},
    SnowflakeId,
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// 2023-01-01T00:00:00Z
pub const DEFAULT_EPOCH: Timestamp = Timestamp::constant(1_672_531_200, 0);
pub const DEFAULT_MAX_SEQUENCE_ID: u64 = 4095;
pub const DEFAULT_MAX_WORKER_ID: u64 = 31;
pub const DEFAULT_MAX_DATACENTER_ID: u64 = 31;

/// What to do when the clock reads earlier than the last used timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackwardClockPolicy {
    /// Block until the clock has caught up, then continue in that millisecond.
    #[default]
    Wait,
    /// Fail with [`Error::ClockMovedBackwards`].
    Reject,
}

/// Configures an [`IdGenerator`] instance.
///
/// Every field has a default, so `GeneratorSettings::builder().build()` gives
/// the classic 41/5/5/12 layout. The same defaults apply to missing fields
/// when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorSettings {
    /// Zero point of the timestamp field. Must not be before the unix epoch
    /// or ahead of the clock.
    #[builder(default = DEFAULT_EPOCH)]
    pub epoch: Timestamp,
    /// Largest sequence value; must be `2^k - 1`.
    #[builder(default = DEFAULT_MAX_SEQUENCE_ID)]
    pub max_sequence_id: u64,
    /// Largest worker id; must be `2^k - 1`.
    #[builder(default = DEFAULT_MAX_WORKER_ID)]
    pub max_worker_id: u64,
    /// Largest datacenter id; must be `2^k - 1`.
    #[builder(default = DEFAULT_MAX_DATACENTER_ID)]
    pub max_datacenter_id: u64,
    /// Worker coordinate. The caller keeps `(worker_id, datacenter_id)`
    /// unique across running generators.
    #[builder(default)]
    pub worker_id: u64,
    /// Datacenter coordinate.
    #[builder(default)]
    pub datacenter_id: u64,
    #[builder(default)]
    pub backward_clock_policy: BackwardClockPolicy,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Snowflake ID generator with wait-on-overflow semantics.
///
/// Generation takes `&mut self`: one instance serves one thread of control.
/// Wrap it in a [`SharedIdGenerator`](crate::SharedIdGenerator) to share it.
pub struct IdGenerator<C: Clock = SystemClock> {
    epoch: Timestamp,
    decoder: Decoder,
    worker_id: u64,
    datacenter_id: u64,
    backward_clock_policy: BackwardClockPolicy,
    clock: C,
    last_timestamp: Option<i64>,
    sequence_id: u64,
}

impl IdGenerator<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(settings: GeneratorSettings) -> Result<Self> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> IdGenerator<C> {
    pub fn with_clock(settings: GeneratorSettings, clock: C) -> Result<Self> {
        let layout = BitLayout::new(
            settings.max_sequence_id,
            settings.max_worker_id,
            settings.max_datacenter_id,
        )?;

        if settings.worker_id > layout.max_worker_id() {
            return Err(Error::InvalidWorkerId {
                worker_id: settings.worker_id,
                max_worker_id: layout.max_worker_id(),
            });
        }
        if settings.datacenter_id > layout.max_datacenter_id() {
            return Err(Error::InvalidDatacenterId {
                datacenter_id: settings.datacenter_id,
                max_datacenter_id: layout.max_datacenter_id(),
            });
        }

        if settings.epoch < Timestamp::UNIX_EPOCH {
            return Err(Error::NegativeEpoch {
                epoch: settings.epoch,
            });
        }
        let now = clock.now();
        if settings.epoch > now {
            return Err(Error::EpochAhead {
                epoch: settings.epoch,
                now,
            });
        }

        debug!(
            epoch = %settings.epoch,
            worker_id = settings.worker_id,
            datacenter_id = settings.datacenter_id,
            timestamp_bits = layout.timestamp_bits(),
            sequence_bits = layout.sequence_bits(),
            "id generator initialized"
        );

        Ok(Self {
            epoch: settings.epoch,
            decoder: Decoder::new(settings.epoch, layout),
            worker_id: settings.worker_id,
            datacenter_id: settings.datacenter_id,
            backward_clock_policy: settings.backward_clock_policy,
            clock,
            last_timestamp: None,
            sequence_id: 0,
        })
    }

    pub fn epoch(&self) -> Timestamp {
        self.epoch
    }

    pub fn layout(&self) -> &BitLayout {
        self.decoder.layout()
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    /// A decoder for this generator's epoch and layout.
    pub fn decoder(&self) -> Decoder {
        self.decoder
    }

    /// Generates the next identifier.
    ///
    /// - within one millisecond the sequence increments; once it wraps, block
    ///   until the next millisecond
    /// - if the clock moved backward, apply the [`BackwardClockPolicy`]
    ///
    /// On error the generator state is left untouched.
    pub fn next_id(&mut self) -> Result<SnowflakeId> {
        let now = self.clock.now();
        let mut timestamp = self.elapsed_since_epoch(now);
        let mut sequence_id = 0;

        if let Some(last) = self.last_timestamp {
            // a reading before the epoch is just a larger backward jump
            if timestamp < last {
                timestamp = self.catch_up(last, timestamp)?;
            }

            if timestamp == last {
                sequence_id = (self.sequence_id + 1) & self.layout().max_sequence_id();
                if sequence_id == 0 {
                    trace!(timestamp = last, "sequence exhausted, waiting for next millisecond");
                    timestamp = self.wait_for(last + 1)?;
                }
            }
        } else if timestamp < 0 {
            return Err(Error::EpochAhead {
                epoch: self.epoch,
                now,
            });
        }

        // non-negative: either checked above or at least `last`
        let elapsed = timestamp as u64;
        if elapsed > self.layout().max_timestamp() {
            return Err(Error::TimestampOverflow {
                timestamp,
                timestamp_bits: self.layout().timestamp_bits(),
            });
        }

        let raw = self.layout().compose(IdParts {
            timestamp: elapsed,
            datacenter_id: self.datacenter_id,
            worker_id: self.worker_id,
            sequence_id,
        });

        self.last_timestamp = Some(timestamp);
        self.sequence_id = sequence_id;

        Ok(SnowflakeId::from_raw(raw))
    }

    /// Generates the next identifier in its decimal text form.
    pub fn generate(&mut self) -> Result<String> {
        Ok(self.next_id()?.to_string())
    }

    pub fn decode(&self, id: SnowflakeId) -> DecodedId {
        self.decoder.decode(id)
    }

    pub fn decode_str(&self, id: &str) -> std::result::Result<DecodedId, DecodeError> {
        self.decoder.decode_str(id)
    }

    pub fn decode_u64(&self, id: u64) -> std::result::Result<DecodedId, DecodeError> {
        self.decoder.decode_u64(id)
    }

    /// Milliseconds since the epoch, floored. Negative if `now` is before it.
    fn elapsed_since_epoch(&self, now: Timestamp) -> i64 {
        now.as_millisecond() - self.epoch.as_millisecond()
    }

    /// Blocks until the epoch-relative clock reads at least `target`.
    fn wait_for(&self, target: i64) -> Result<i64> {
        let deadline = self
            .epoch
            .as_millisecond()
            .checked_add(target)
            .and_then(|ms| Timestamp::from_millisecond(ms).ok())
            .ok_or(Error::TimestampOverflow {
                timestamp: target,
                timestamp_bits: self.layout().timestamp_bits(),
            })?;

        loop {
            self.clock.wait_until(deadline);
            let timestamp = self.elapsed_since_epoch(self.clock.now());
            if timestamp >= target {
                return Ok(timestamp);
            }
        }
    }

    fn catch_up(&self, last: i64, now: i64) -> Result<i64> {
        warn!(
            last,
            now,
            policy = ?self.backward_clock_policy,
            "clock moved backwards"
        );
        match self.backward_clock_policy {
            BackwardClockPolicy::Reject => Err(Error::ClockMovedBackwards { last, now }),
            BackwardClockPolicy::Wait => self.wait_for(last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;

    const EPOCH_MS: i64 = 1_672_531_200_000;
    const START_MS: i64 = EPOCH_MS + 10_000;

    fn make_generator(settings: GeneratorSettings) -> (IdGenerator<TestClock>, TestClock) {
        let clock = TestClock::from_millisecond(START_MS);
        let gen = IdGenerator::with_clock(settings, clock.clone()).unwrap();
        (gen, clock)
    }

    fn coordinates(worker_id: u64, datacenter_id: u64) -> GeneratorSettings {
        GeneratorSettings::builder()
            .worker_id(worker_id)
            .datacenter_id(datacenter_id)
            .build()
    }

    #[test]
    fn defaults_match_classic_layout() {
        let settings = GeneratorSettings::default();
        assert_eq!(settings.epoch.as_millisecond(), EPOCH_MS);
        assert_eq!(settings.max_sequence_id, 4095);
        assert_eq!(settings.max_worker_id, 31);
        assert_eq!(settings.max_datacenter_id, 31);
        assert_eq!(settings.worker_id, 0);
        assert_eq!(settings.datacenter_id, 0);
        assert_eq!(settings.backward_clock_policy, BackwardClockPolicy::Wait);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: GeneratorSettings = serde_json::from_str(
            r#"{"workerId": 7, "epoch": "2024-01-01T00:00:00Z", "backwardClockPolicy": "reject"}"#,
        )
        .unwrap();
        assert_eq!(settings.worker_id, 7);
        assert_eq!(settings.datacenter_id, 0);
        assert_eq!(settings.max_sequence_id, DEFAULT_MAX_SEQUENCE_ID);
        assert_eq!(
            settings.epoch,
            "2024-01-01T00:00:00Z".parse::<Timestamp>().unwrap()
        );
        assert_eq!(settings.backward_clock_policy, BackwardClockPolicy::Reject);
    }

    #[test]
    fn first_id_has_sequence_zero() {
        let (mut gen, _) = make_generator(GeneratorSettings::default());
        let id = gen.next_id().unwrap();
        let decoded = gen.decode(id);
        assert_eq!(decoded.sequence_id, 0);
        assert_eq!(decoded.timestamp, START_MS);
    }

    #[test]
    fn timestamp_field_is_epoch_relative() {
        let (mut gen, _) = make_generator(GeneratorSettings::default());
        let id = gen.next_id().unwrap();
        assert_eq!(id.as_u64() >> 22, 10_000);
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let (mut gen, _) = make_generator(GeneratorSettings::default());
        let sequences: Vec<u64> = (0..3)
            .map(|_| {
                let id = gen.next_id().unwrap();
                gen.decode(id).sequence_id
            })
            .collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn new_millisecond_resets_sequence() {
        let (mut gen, clock) = make_generator(GeneratorSettings::default());
        gen.next_id().unwrap();
        gen.next_id().unwrap();
        clock.advance_ms(1);
        let id = gen.next_id().unwrap();
        let decoded = gen.decode(id);
        assert_eq!(decoded.sequence_id, 0);
        assert_eq!(decoded.timestamp, START_MS + 1);
    }

    #[test]
    fn sequence_overflow_advances_clock() {
        let (mut gen, _) = make_generator(GeneratorSettings::default());
        let mut previous = gen.next_id().unwrap();
        // Exhaust the remaining 4095 sequence values of this millisecond.
        for _ in 0..4095 {
            let id = gen.next_id().unwrap();
            assert!(id > previous);
            assert_eq!(gen.decode(id).timestamp, START_MS);
            previous = id;
        }
        assert_eq!(gen.decode(previous).sequence_id, 4095);

        // The 4097th call must wait for the next millisecond.
        let id = gen.next_id().unwrap();
        let decoded = gen.decode(id);
        assert!(id > previous);
        assert_eq!(decoded.sequence_id, 0);
        assert_eq!(decoded.timestamp, START_MS + 1);
    }

    #[test]
    fn small_sequence_space_rolls_over_every_few_ids() {
        let (mut gen, _) = make_generator(
            GeneratorSettings::builder().max_sequence_id(3).build(),
        );
        let decoded: Vec<(i64, u64)> = (0..6)
            .map(|_| {
                let id = gen.next_id().unwrap();
                let decoded = gen.decode(id);
                (decoded.timestamp - START_MS, decoded.sequence_id)
            })
            .collect();
        assert_eq!(decoded, vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1)]);
    }

    #[test]
    fn coordinates_are_embedded() {
        let (mut gen, _) = make_generator(coordinates(5, 3));
        let id = gen.next_id().unwrap();
        let decoded = gen.decode(id);
        assert_eq!(decoded.worker_id, 5);
        assert_eq!(decoded.datacenter_id, 3);
    }

    #[test]
    fn maximum_coordinates_stay_in_their_fields() {
        let (mut gen, _) = make_generator(coordinates(31, 31));
        let id = gen.next_id().unwrap();
        let decoded = gen.decode(id);
        assert_eq!(decoded.worker_id, 31);
        assert_eq!(decoded.datacenter_id, 31);
        assert_eq!(decoded.sequence_id, 0);
        assert_eq!(decoded.timestamp, START_MS);
        assert_eq!(id.as_u64(), (10_000 << 22) | (31 << 17) | (31 << 12));
    }

    #[test]
    fn generate_returns_decimal_text() {
        let (mut gen, _) = make_generator(coordinates(1, 2));
        let text = gen.generate().unwrap();
        assert!(text.bytes().all(|b| b.is_ascii_digit()));
        let decoded = gen.decode_str(&text).unwrap();
        assert_eq!(decoded.worker_id, 1);
        assert_eq!(decoded.datacenter_id, 2);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let clock = TestClock::from_millisecond(START_MS);
        assert_eq!(
            IdGenerator::with_clock(coordinates(32, 0), clock.clone()).err(),
            Some(Error::InvalidWorkerId {
                worker_id: 32,
                max_worker_id: 31
            })
        );
        assert_eq!(
            IdGenerator::with_clock(coordinates(0, 32), clock.clone()).err(),
            Some(Error::InvalidDatacenterId {
                datacenter_id: 32,
                max_datacenter_id: 31
            })
        );

        // a wider worker field admits the larger id
        let settings = GeneratorSettings::builder()
            .max_worker_id(63)
            .worker_id(32)
            .build();
        assert!(IdGenerator::with_clock(settings, clock).is_ok());
    }

    #[test]
    fn rejects_invalid_layout() {
        let clock = TestClock::from_millisecond(START_MS);
        let settings = GeneratorSettings::builder().max_datacenter_id(20).build();
        assert_eq!(
            IdGenerator::with_clock(settings, clock).err(),
            Some(Error::InvalidFieldMax {
                field: "datacenter",
                max: 20
            })
        );
    }

    #[test]
    fn rejects_epoch_before_unix_epoch() {
        let clock = TestClock::from_millisecond(START_MS);
        let epoch = Timestamp::from_millisecond(-1).unwrap();
        let settings = GeneratorSettings::builder().epoch(epoch).build();
        assert_eq!(
            IdGenerator::with_clock(settings, clock).err(),
            Some(Error::NegativeEpoch { epoch })
        );
    }

    #[test]
    fn rejects_epoch_ahead_of_clock() {
        let clock = TestClock::from_millisecond(EPOCH_MS - 1);
        assert!(matches!(
            IdGenerator::with_clock(GeneratorSettings::default(), clock),
            Err(Error::EpochAhead { .. })
        ));
    }

    #[test]
    fn backward_clock_waits_until_caught_up() {
        let (mut gen, clock) = make_generator(GeneratorSettings::default());
        let first = gen.next_id().unwrap();

        clock.advance_ms(-5);
        let second = gen.next_id().unwrap();

        assert!(second > first);
        let decoded = gen.decode(second);
        assert_eq!(decoded.timestamp, START_MS);
        assert_eq!(decoded.sequence_id, 1);
        assert_eq!(clock.now().as_millisecond(), START_MS);
    }

    #[test]
    fn backward_clock_rejected_by_policy() {
        let settings = GeneratorSettings::builder()
            .backward_clock_policy(BackwardClockPolicy::Reject)
            .build();
        let (mut gen, clock) = make_generator(settings);
        let first = gen.next_id().unwrap();

        clock.advance_ms(-5);
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockMovedBackwards {
                last: 10_000,
                now: 9_995
            })
        );

        // once the clock is back, generation resumes where it left off
        clock.set(Timestamp::from_millisecond(START_MS).unwrap());
        let second = gen.next_id().unwrap();
        assert!(second > first);
        assert_eq!(gen.decode(second).sequence_id, 1);
    }

    #[test]
    fn clock_before_epoch_waits_like_any_backward_jump() {
        let (mut gen, clock) = make_generator(GeneratorSettings::default());
        let first = gen.next_id().unwrap();

        clock.set(Timestamp::from_millisecond(EPOCH_MS - 10).unwrap());
        let second = gen.next_id().unwrap();

        assert!(second > first);
        let decoded = gen.decode(second);
        assert_eq!(decoded.timestamp, START_MS);
        assert_eq!(decoded.sequence_id, 1);
    }

    #[test]
    fn clock_before_epoch_rejected_by_policy() {
        let settings = GeneratorSettings::builder()
            .backward_clock_policy(BackwardClockPolicy::Reject)
            .build();
        let (mut gen, clock) = make_generator(settings);
        gen.next_id().unwrap();

        clock.set(Timestamp::from_millisecond(EPOCH_MS - 10).unwrap());
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockMovedBackwards {
                last: 10_000,
                now: -10
            })
        );
    }

    #[test]
    fn clock_before_epoch_on_first_call_is_an_error() {
        let (mut gen, clock) = make_generator(GeneratorSettings::default());
        let now = Timestamp::from_millisecond(EPOCH_MS - 1).unwrap();
        clock.set(now);
        assert_eq!(
            gen.next_id(),
            Err(Error::EpochAhead {
                epoch: DEFAULT_EPOCH,
                now
            })
        );
    }

    #[test]
    fn accessors_report_configuration() {
        let epoch = Timestamp::from_millisecond(EPOCH_MS - 60_000).unwrap();
        let settings = GeneratorSettings::builder()
            .epoch(epoch)
            .worker_id(12)
            .datacenter_id(4)
            .build();
        let (gen, _) = make_generator(settings);
        assert_eq!(gen.epoch(), epoch);
        assert_eq!(gen.worker_id(), 12);
        assert_eq!(gen.datacenter_id(), 4);
        assert_eq!(gen.layout(), &BitLayout::default());
    }

    #[test]
    fn timestamp_overflow_returns_error() {
        // 31 + 31 field bits leave a single timestamp bit
        let max_31_bits = (1_u64 << 31) - 1;
        let settings = GeneratorSettings::builder()
            .epoch(Timestamp::UNIX_EPOCH)
            .max_sequence_id(max_31_bits)
            .max_worker_id(max_31_bits)
            .max_datacenter_id(0)
            .build();
        let clock = TestClock::from_millisecond(1);
        let mut gen = IdGenerator::with_clock(settings, clock.clone()).unwrap();
        assert_eq!(gen.layout().max_timestamp(), 1);

        let id = gen.next_id().unwrap();
        assert_eq!(gen.decode(id).timestamp, 1);

        clock.advance_ms(1);
        assert_eq!(
            gen.next_id(),
            Err(Error::TimestampOverflow {
                timestamp: 2,
                timestamp_bits: 1
            })
        );

        // the failed call did not consume state
        clock.set(Timestamp::from_millisecond(1).unwrap());
        let id = gen.next_id().unwrap();
        assert_eq!(gen.decode(id).sequence_id, 1);
    }

    #[test]
    fn decode_uses_generator_epoch() {
        let (mut gen, _) = make_generator(GeneratorSettings::default());
        let id = gen.next_id().unwrap();

        let other_epoch = Decoder::new(Timestamp::UNIX_EPOCH, *gen.layout());
        assert_eq!(other_epoch.decode(id).timestamp, 10_000);
        assert_eq!(gen.decoder().decode(id).timestamp, START_MS);
    }

    #[test]
    fn decode_str_rejects_garbage() {
        let (gen, _) = make_generator(GeneratorSettings::default());
        assert_eq!(
            gen.decode_str("not-an-id"),
            Err(DecodeError::NotNumeric("not-an-id".to_owned()))
        );
    }
}
