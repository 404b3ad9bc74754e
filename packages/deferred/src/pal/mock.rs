use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pal::{ClockFacade, MockClock};

/// Virtual time shared between a test and the mock clock it drives.
///
/// Time only moves when the event loop parks, and it jumps straight to the requested deadline,
/// so timer-heavy tests complete instantly and deterministically.
#[derive(Clone, Debug)]
pub(crate) struct VirtualTime {
    start: Instant,
    now: Arc<Mutex<Instant>>,
    parks: Arc<Mutex<Vec<Instant>>>,
}

impl VirtualTime {
    pub(crate) fn elapsed(&self) -> Duration {
        self.now
            .lock()
            .expect("virtual time lock is never held across a panic")
            .duration_since(self.start)
    }

    /// How many times the loop had to park, i.e. wait for a timer with nothing else to do.
    pub(crate) fn park_count(&self) -> usize {
        self.parks
            .lock()
            .expect("virtual time lock is never held across a panic")
            .len()
    }
}

/// Creates a clock that reports virtual time and advances it whenever the loop parks.
pub(crate) fn virtual_clock() -> (ClockFacade, VirtualTime) {
    let start = Instant::now();
    let time = VirtualTime {
        start,
        now: Arc::new(Mutex::new(start)),
        parks: Arc::new(Mutex::new(Vec::new())),
    };

    let mut mock = MockClock::new();

    let now = Arc::clone(&time.now);
    mock.expect_now().returning(move || {
        *now.lock()
            .expect("virtual time lock is never held across a panic")
    });

    let now = Arc::clone(&time.now);
    let parks = Arc::clone(&time.parks);
    mock.expect_park_until().returning(move |deadline| {
        let mut now = now
            .lock()
            .expect("virtual time lock is never held across a panic");

        if deadline > *now {
            *now = deadline;
        }

        parks
            .lock()
            .expect("virtual time lock is never held across a panic")
            .push(deadline);
    });

    (ClockFacade::from_mock(mock), time)
}
