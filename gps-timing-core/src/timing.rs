//! The state shared between the pulse handler, the sentence handler, and everyone who wants to know the time.
//!
//! Writers build their update outside of any lock and then publish it inside a short critical section. Readers
//! copy the whole snapshot out. Nobody ever sees half of an update.
use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::TimeError;
use crate::pps::div_round;

/// Packed NMEA degrees and minutes, times 1000, negative south and west.
///
/// `3150.6731,N` is `3_150_673`: 31 degrees 50.673 minutes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, MaxSize, PartialEq, Eq)]
pub struct Position {
    pub latitude: i32,
    pub longitude: i32,
}

impl Position {
    /// decimal degrees times 1e5
    pub fn latitude_degrees_e5(&self) -> i32 {
        degrees_e5(self.latitude)
    }

    /// decimal degrees times 1e5
    pub fn longitude_degrees_e5(&self) -> i32 {
        degrees_e5(self.longitude)
    }
}

fn degrees_e5(packed: i32) -> i32 {
    let magnitude = i64::from(packed).abs();

    let degrees = magnitude / 100_000;
    let milli_minutes = magnitude % 100_000;

    let value = degrees * 100_000 + div_round(i128::from(milli_minutes) * 100, 60) as i64;

    (packed.signum() as i64 * value) as i32
}

/// a utc time and the monotonic tick it was true at
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Serialize, Deserialize, MaxSize, PartialEq, Eq)]
pub struct TimeAnchor {
    pub utc_secs: u64,
    pub tick: u64,
}

/// One consistent view of everything the gps has told us.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Serialize, Deserialize, MaxSize, PartialEq, Eq)]
pub struct TimingState {
    /// the most recent RMC had a valid navigation solution
    pub solution_active: bool,
    pub position: Position,
    /// None until the first valid fix
    pub anchor: Option<TimeAnchor>,

    pub last_pulse_tick: u64,
    pub pulse_count: u32,
    pub accepted_pulses: u32,
    /// the window of `window` pulses, low-pass filtered and multiplied by `upscale`. None until the first accepted
    /// pulse
    pub smoothed_interval_scaled: Option<i64>,
    pub frequency_shift_ppb: i32,

    pub parse_errors: u32,

    pub window: u32,
    pub upscale: u64,
}

impl TimingState {
    pub const fn new(window: u32, upscale: u64) -> Self {
        Self {
            solution_active: false,
            position: Position {
                latitude: 0,
                longitude: 0,
            },
            anchor: None,
            last_pulse_tick: 0,
            pulse_count: 0,
            accepted_pulses: 0,
            smoothed_interval_scaled: None,
            frequency_shift_ppb: 0,
            parse_errors: 0,
            window,
            upscale,
        }
    }

    /// seconds since the unix epoch at tick `now`
    pub fn utc_time_at(&self, now: u64, config: &Config) -> Result<u64, TimeError> {
        let anchor = self.anchor.ok_or(TimeError::NoFix)?;

        // a reader that sampled the clock just before a new anchor was published
        let elapsed_ticks = now.saturating_sub(anchor.tick);

        if elapsed_ticks > config.stale_after_ticks() {
            return Err(TimeError::StaleFix);
        }

        Ok(anchor.utc_secs + elapsed_ticks / config.ticks_per_second)
    }

    /// smoothed ticks per pulse, times 1000
    pub fn milli_ticks_per_pulse(&self) -> Option<u64> {
        let smoothed = self.smoothed_interval_scaled?;
        let divisor = i128::from(self.upscale) * i128::from(self.window.max(1));

        u64::try_from(div_round(i128::from(smoothed) * 1_000, divisor)).ok()
    }

    /// postcard encoding, for shipping a snapshot to another core or a console
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }
}

impl fmt::Display for TimingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "fix: {}",
            if self.solution_active { "active" } else { "void" }
        )?;
        writeln!(
            f,
            "position: {}, {}",
            self.position.latitude, self.position.longitude
        )?;

        match self.anchor {
            Some(anchor) => writeln!(f, "anchor: {} at tick {}", anchor.utc_secs, anchor.tick)?,
            None => writeln!(f, "anchor: none")?,
        }

        writeln!(f, "last pulse: tick {}", self.last_pulse_tick)?;
        writeln!(
            f,
            "pulses: {} ({} accepted)",
            self.pulse_count, self.accepted_pulses
        )?;

        match self.milli_ticks_per_pulse() {
            Some(milli) => writeln!(f, "period: {}.{:03} ticks", milli / 1_000, milli % 1_000)?,
            None => writeln!(f, "period: unknown")?,
        }

        writeln!(f, "shift: {} ppb", self.frequency_shift_ppb)?;
        write!(f, "parse errors: {}", self.parse_errors)
    }
}

/// The one place `TimingState` lives. Safe to share between interrupt handlers, threads, and cores.
pub struct SharedTiming(Mutex<Cell<TimingState>>);

impl SharedTiming {
    pub const fn new(initial: TimingState) -> Self {
        Self(Mutex::new(Cell::new(initial)))
    }

    pub fn snapshot(&self) -> TimingState {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// `f` runs inside the critical section. keep it to field assignments
    pub fn update<R>(&self, f: impl FnOnce(&mut TimingState) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);

            let mut state = cell.get();
            let result = f(&mut state);
            cell.set(state);

            result
        })
    }
}
