use std::thread;
use std::time::Instant;

use crate::pal::Clock;

/// The operating system monotonic clock, parking via thread sleep.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn park_until(&self, deadline: Instant) {
        // Sleeping may wake up early on some platforms, so we keep going until we are past it.
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return;
            };

            if remaining.is_zero() {
                return;
            }

            thread::sleep(remaining);
        }
    }
}

#[cfg(test)]
#[cfg(not(miri))] // Miri sleeping is slow and tells us nothing new.
mod tests {
    use std::time::Duration;

    use testing::with_watchdog;

    use super::*;

    #[test]
    fn park_until_waits_for_deadline() {
        with_watchdog(|| {
            let clock = RealClock;
            let deadline = clock.now() + Duration::from_millis(5);

            clock.park_until(deadline);

            assert!(clock.now() >= deadline);
        });
    }

    #[test]
    fn park_until_past_deadline_returns_immediately() {
        with_watchdog(|| {
            let clock = RealClock;
            let before = clock.now();

            clock.park_until(before);

            assert!(clock.now().duration_since(before) < Duration::from_secs(1));
        });
    }
}
