use std::fmt::{self, Debug};
#[cfg(test)]
use std::rc::Rc;
use std::time::Instant;

#[cfg(test)]
use crate::pal::MockClock;
use crate::pal::{Clock, RealClock};

/// Dispatches to the real clock or, in tests, to a mock.
#[derive(Clone)]
pub(crate) enum ClockFacade {
    Real(RealClock),

    #[cfg(test)]
    Mock(Rc<MockClock>),
}

impl ClockFacade {
    pub(crate) const fn real() -> Self {
        Self::Real(RealClock)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockClock) -> Self {
        Self::Mock(Rc::new(mock))
    }
}

impl Clock for ClockFacade {
    fn now(&self) -> Instant {
        match self {
            Self::Real(clock) => clock.now(),
            #[cfg(test)]
            Self::Mock(clock) => clock.now(),
        }
    }

    fn park_until(&self, deadline: Instant) {
        match self {
            Self::Real(clock) => clock.park_until(deadline),
            #[cfg(test)]
            Self::Mock(clock) => clock.park_until(deadline),
        }
    }
}

impl From<RealClock> for ClockFacade {
    fn from(clock: RealClock) -> Self {
        Self::Real(clock)
    }
}

#[cfg(test)]
impl From<MockClock> for ClockFacade {
    fn from(clock: MockClock) -> Self {
        Self::from_mock(clock)
    }
}

impl Debug for ClockFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(clock) => clock.fmt(f),
            #[cfg(test)]
            Self::Mock(clock) => clock.fmt(f),
        }
    }
}
