use jiff::Timestamp;
use std::time::Duration;

/// Time source used by [`IdGenerator`](crate::IdGenerator).
///
/// The generator only reads milliseconds, so a clock may be coarser than
/// `Timestamp` resolution.
pub trait Clock: Send + Sync {
    /// Current wall-clock reading.
    fn now(&self) -> Timestamp;
    /// Returns no earlier than the moment `now()` reaches `target`.
    fn wait_until(&self, target: Timestamp);
}

/// The host wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn wait_until(&self, target: Timestamp) {
        // Sequence exhaustion leaves less than a millisecond to wait, which is
        // spun out. Only a backward clock jump can leave more; sleep off the
        // whole milliseconds of that and spin the last one.
        loop {
            let now = Timestamp::now();
            if now >= target {
                return;
            }
            let remaining_ms = target.as_millisecond() - now.as_millisecond();
            if remaining_ms > 1 {
                std::thread::sleep(Duration::from_millis((remaining_ms - 1) as u64));
            } else {
                std::hint::spin_loop();
            }
        }
    }
}
