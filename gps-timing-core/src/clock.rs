//! The GPS sends us a time and a PPS edge. Both get stamped with a free running tick counter and everything else is
//! math on those ticks. This is the only place that knows where the ticks come from.
#[cfg(any(test, feature = "std"))]
use core::sync::atomic::{AtomicU64, Ordering};

/// a free-running, monotonic, glitch-free tick counter with a known frequency
pub trait MonotonicClock {
    fn now_ticks(&self) -> u64;

    fn ticks_per_second(&self) -> u64;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    #[inline]
    fn now_ticks(&self) -> u64 {
        (**self).now_ticks()
    }

    #[inline]
    fn ticks_per_second(&self) -> u64 {
        (**self).ticks_per_second()
    }
}

/// microsecond ticks since the clock was created
#[cfg(feature = "std")]
pub struct StdClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl MonotonicClock for StdClock {
    fn now_ticks(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn ticks_per_second(&self) -> u64 {
        1_000_000
    }
}

/// embassy's time driver. the tick rate is whatever `tick-hz-*` feature the firmware picked
#[cfg(feature = "embassy")]
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy")]
impl MonotonicClock for EmbassyClock {
    #[inline]
    fn now_ticks(&self) -> u64 {
        embassy_time::Instant::now().as_ticks()
    }

    #[inline]
    fn ticks_per_second(&self) -> u64 {
        embassy_time::TICK_HZ
    }
}

/// a clock that only moves when you tell it to. for simulations and tests
#[cfg(any(test, feature = "std"))]
#[derive(Debug)]
pub struct ManualClock {
    ticks: AtomicU64,
    ticks_per_second: u64,
}

#[cfg(any(test, feature = "std"))]
impl ManualClock {
    pub const fn new(ticks_per_second: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            ticks_per_second,
        }
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Release);
    }

    /// returns the new tick count
    pub fn advance(&self, ticks: u64) -> u64 {
        self.ticks.fetch_add(ticks, Ordering::AcqRel) + ticks
    }
}

#[cfg(any(test, feature = "std"))]
impl MonotonicClock for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }
}
