//! GPS time and PPS frequency drift for a GPS-disciplined oscillator.
//!
//! NMEA RMC sentences anchor UTC to a monotonic tick. PPS edges measure how fast that tick really runs.
#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod calendar;
pub mod clock;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod nmea;
pub mod pps;
pub mod timing;

pub use clock::MonotonicClock;
pub use config::Config;
pub use context::{GpsTime, PulseHandler, SentenceHandler, TimingReader};
pub use errors::{ConfigError, MyError, MyResult, ParseError, TimeError};
pub use timing::{Position, TimeAnchor, TimingState};
