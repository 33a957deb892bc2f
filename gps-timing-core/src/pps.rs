//! PPS filter and frequency estimator.
//!
//! Every pulse edge is stamped with the monotonic clock. Comparing each stamp with the one `W` pulses earlier
//! gives a window that is `W` times more sensitive to drift than a single period. Windows that are too far from
//! `W` seconds are gated out, the rest go through a single-pole low-pass filter, and the smoothed window becomes a
//! frequency shift in parts per billion.
//!
//! Everything is integer math. This runs in the pulse interrupt.
use circular_buffer::CircularBuffer;

use crate::config::Config;
use crate::logging::{debug, info};
use crate::timing::TimingState;

const PPB: i128 = 1_000_000_000;

/// `x / 2^k` rounded to nearest. halves round toward positive infinity for both signs
#[inline]
pub const fn round_shift(x: i64, k: u32) -> i64 {
    if k == 0 {
        return x;
    }

    (x + (1 << (k - 1))) >> k
}

/// `num / den` rounded to nearest, same tie rule as [`round_shift`]. `den` must be positive
#[inline]
pub const fn div_round(num: i128, den: i128) -> i128 {
    (num + den / 2).div_euclid(den)
}

/// frequency error of a smoothed window compared to the ideal one. both are in upscaled ticks
pub fn shift_ppb(smoothed_interval_scaled: i64, ideal_interval_scaled: i64) -> i32 {
    let error = i128::from(smoothed_interval_scaled) - i128::from(ideal_interval_scaled);

    let ppb = div_round(error * PPB, i128::from(ideal_interval_scaled));

    ppb.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
}

/// what happened to one pulse
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseOutcome {
    /// ticks since the pulse `W` pulses ago
    pub window_ticks: u64,
    /// the window passed the gate and went into the filter
    pub accepted: bool,
}

pub struct PpsFilter<const W: usize> {
    /// the last `W` pulse ticks. starts full of zeros so startup windows are nonsense and get gated out
    history: CircularBuffer<W, u64>,
    upscale: i64,
    expected_window_ticks: u64,
    gate_ticks: u64,
    smoothing_shift: u32,

    last_pulse_tick: u64,
    smoothed_interval_scaled: Option<i64>,
    frequency_shift_ppb: i32,
    pulse_count: u32,
    accepted_pulses: u32,
}

impl<const W: usize> PpsFilter<W> {
    pub fn new(config: &Config) -> Self {
        const { assert!(W > 0, "the pulse window needs at least one slot") };

        Self {
            history: CircularBuffer::from([0; W]),
            upscale: config.upscale() as i64,
            expected_window_ticks: config.expected_window_ticks::<W>(),
            gate_ticks: config.gate_ticks::<W>(),
            smoothing_shift: config.smoothing_shift,
            last_pulse_tick: 0,
            smoothed_interval_scaled: None,
            frequency_shift_ppb: 0,
            pulse_count: 0,
            accepted_pulses: 0,
        }
    }

    /// the smoothed window on a perfect clock
    pub fn ideal_interval_scaled(&self) -> i64 {
        self.upscale * self.expected_window_ticks as i64
    }

    /// feed one pulse edge stamped at `now`
    pub fn on_pulse(&mut self, now: u64) -> PulseOutcome {
        self.last_pulse_tick = now;
        self.pulse_count = self.pulse_count.saturating_add(1);

        // the history is always full, so the front is the stamp from W pulses ago
        let oldest = self.history.front().copied().unwrap_or(0);
        self.history.push_back(now);

        let window_ticks = now.wrapping_sub(oldest);

        if window_ticks.abs_diff(self.expected_window_ticks) >= self.gate_ticks {
            debug!(
                "pps window rejected: {} ticks, expected {} +/- {}",
                window_ticks, self.expected_window_ticks, self.gate_ticks
            );

            return PulseOutcome {
                window_ticks,
                accepted: false,
            };
        }

        let sample = self.upscale * window_ticks as i64;

        let smoothed = match self.smoothed_interval_scaled {
            None => sample,
            Some(smoothed) => smoothed + round_shift(sample - smoothed, self.smoothing_shift),
        };

        self.smoothed_interval_scaled = Some(smoothed);
        self.frequency_shift_ppb = shift_ppb(smoothed, self.ideal_interval_scaled());
        self.accepted_pulses = self.accepted_pulses.saturating_add(1);

        if self.accepted_pulses == 1 {
            info!(
                "pps locked after {} pulses: {} ppb",
                self.pulse_count, self.frequency_shift_ppb
            );
        }

        PulseOutcome {
            window_ticks,
            accepted: true,
        }
    }

    /// copy the estimator's half of the shared state
    pub fn publish(&self, state: &mut TimingState) {
        state.last_pulse_tick = self.last_pulse_tick;
        state.pulse_count = self.pulse_count;
        state.accepted_pulses = self.accepted_pulses;
        state.smoothed_interval_scaled = self.smoothed_interval_scaled;
        state.frequency_shift_ppb = self.frequency_shift_ppb;
    }

    pub fn smoothed_interval_scaled(&self) -> Option<i64> {
        self.smoothed_interval_scaled
    }

    pub fn frequency_shift_ppb(&self) -> i32 {
        self.frequency_shift_ppb
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    pub fn accepted_pulses(&self) -> u32 {
        self.accepted_pulses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 32;

    /// not a multiple of a second, so the zero-primed history can't look like a real window
    const START: u64 = 500_000;

    /// send `count` pulses `interval` apart, the first one `interval` after `last`. returns the last tick
    fn pulses(filter: &mut PpsFilter<W>, last: u64, interval: u64, count: usize) -> u64 {
        let mut tick = last;

        for _ in 0..count {
            tick += interval;
            filter.on_pulse(tick);
        }

        tick
    }

    #[test]
    fn test_round_shift() {
        assert_eq!(round_shift(8, 2), 2);
        assert_eq!(round_shift(7, 2), 2);
        assert_eq!(round_shift(6, 2), 2);
        assert_eq!(round_shift(5, 2), 1);
        assert_eq!(round_shift(-5, 2), -1);
        assert_eq!(round_shift(-6, 2), -1);
        assert_eq!(round_shift(-7, 2), -2);
        assert_eq!(round_shift(5, 1), 3);
        assert_eq!(round_shift(-5, 1), -2);
        assert_eq!(round_shift(-5, 0), -5);
    }

    #[test]
    fn test_div_round() {
        assert_eq!(div_round(5, 2), 3);
        assert_eq!(div_round(-5, 2), -2);
        assert_eq!(div_round(160_000 * 1_000_000_000, 32_000_000_000), 5_000);
        assert_eq!(div_round(-160_000 * 1_000_000_000, 32_000_000_000), -5_000);
    }

    #[test]
    fn test_shift_ppb_saturates() {
        assert_eq!(shift_ppb(i64::MAX, 1), i32::MAX);
        assert_eq!(shift_ppb(0, 1), -1_000_000_000);
    }

    #[test_log::test]
    fn test_startup_is_gated() {
        let config = Config::default();
        let mut filter = PpsFilter::<W>::new(&config);

        let last = pulses(&mut filter, START, 1_000_000, W);

        assert_eq!(filter.pulse_count(), W as u32);
        assert_eq!(filter.accepted_pulses(), 0);
        assert_eq!(filter.smoothed_interval_scaled(), None);
        assert_eq!(filter.frequency_shift_ppb(), 0);

        let outcome = filter.on_pulse(last + 1_000_000);

        assert_eq!(
            outcome,
            PulseOutcome {
                window_ticks: 32_000_000,
                accepted: true,
            }
        );
        // cold start takes the first sample as is
        assert_eq!(filter.smoothed_interval_scaled(), Some(32_000_000_000));
        assert_eq!(filter.frequency_shift_ppb(), 0);
    }

    #[test_log::test]
    fn test_gate_rejection_leaves_estimate_alone() {
        let config = Config::default();
        let mut filter = PpsFilter::<W>::new(&config);

        let last = pulses(&mut filter, START, 1_000_003, 2 * W);

        let smoothed = filter.smoothed_interval_scaled();
        let ppb = filter.frequency_shift_ppb();
        let accepted = filter.accepted_pulses();
        assert!(smoothed.is_some());
        assert_eq!(ppb, 3_000);

        // a missed pulse
        let outcome = filter.on_pulse(last + 2_000_006);
        assert!(!outcome.accepted);
        assert_eq!(outcome.window_ticks, 33_000_099);

        assert_eq!(filter.smoothed_interval_scaled(), smoothed);
        assert_eq!(filter.frequency_shift_ppb(), ppb);
        assert_eq!(filter.accepted_pulses(), accepted);
        assert_eq!(filter.pulse_count(), 2 * W as u32 + 1);

        // just outside the gate. 250ppm of 32 seconds is 8000 ticks
        let mut filter = PpsFilter::<W>::new(&config);
        let last = pulses(&mut filter, START, 1_000_000, 2 * W);
        let smoothed = filter.smoothed_interval_scaled();

        let outcome = filter.on_pulse(last + 1_000_000 + 8_000);
        assert!(!outcome.accepted);
        assert_eq!(filter.smoothed_interval_scaled(), smoothed);
        assert_eq!(filter.frequency_shift_ppb(), 0);
    }

    #[test_log::test]
    fn test_converges_to_offset() {
        let config = Config::default();
        let mut filter = PpsFilter::<W>::new(&config);

        // lock on a perfect clock first
        let mut last = pulses(&mut filter, START, 1_000_000, W + 1);
        assert_eq!(filter.frequency_shift_ppb(), 0);

        // then the oscillator runs 5ppm slow, so 5 extra ticks per second
        let mut previous = filter.smoothed_interval_scaled().unwrap();
        for _ in 0..200 {
            last = pulses(&mut filter, last, 1_000_005, 1);

            let smoothed = filter.smoothed_interval_scaled().unwrap();
            assert!(smoothed >= previous, "{smoothed} < {previous}");
            previous = smoothed;
        }

        // round_shift can't close the last unit of error
        assert!(32_000_160_000 - previous <= 1, "{previous}");
        assert!(
            (filter.frequency_shift_ppb() - 5_000).abs() <= 1,
            "{}",
            filter.frequency_shift_ppb()
        );
    }

    #[test]
    fn test_fast_clock_is_negative() {
        let config = Config::default();
        let mut filter = PpsFilter::<W>::new(&config);

        pulses(&mut filter, START, 999_990, 3 * W);

        assert_eq!(filter.frequency_shift_ppb(), -10_000);
    }

    #[test]
    fn test_32khz_clock() {
        let config = Config {
            ticks_per_second: 32_768,
            ..Default::default()
        };
        let mut filter = PpsFilter::<W>::new(&config);

        pulses(&mut filter, 1_234, 32_768, 3 * W);

        assert_eq!(filter.accepted_pulses(), 2 * W as u32);
        assert_eq!(filter.frequency_shift_ppb(), 0);
    }

    #[test]
    fn test_publish() {
        let config = Config::default();
        let mut filter = PpsFilter::<W>::new(&config);
        let last = pulses(&mut filter, START, 1_000_002, 2 * W);

        let mut state = TimingState::new(W as u32, config.upscale());
        filter.publish(&mut state);

        assert_eq!(state.last_pulse_tick, last);
        assert_eq!(state.pulse_count, 2 * W as u32);
        assert_eq!(state.accepted_pulses, W as u32);
        assert_eq!(state.smoothed_interval_scaled, filter.smoothed_interval_scaled());
        assert_eq!(state.frequency_shift_ppb, 2_000);
    }
}
