use crate::errors::ConfigError;

/// 1 part per billion
const PPB: u64 = 1_000_000_000;

/// 1 part per million
const PPM: u64 = 1_000_000;

pub const MAX_BAUD_RATE: u32 = 115_200;

/// the pico only has gpio 0-28
pub const MAX_PPS_GPIO: u8 = 29;

pub const SECONDS_PER_DAY: u64 = 86_400;

pub const MAX_TICKS_PER_SECOND: u64 = PPB;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 0 or 1
    pub uart_id: u8,
    pub uart_baud: u32,
    pub pps_gpio: u8,
    /// frequency of the monotonic clock that timestamps everything
    pub ticks_per_second: u64,
    /// pulses further than this from the expected interval are ignored
    pub max_deviation_ppm: u32,
    /// the low-pass filter moves 1/2^k of the way to each new sample
    pub smoothing_shift: u32,
    /// a fix older than this can't be used to tell time
    pub stale_after_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uart_id: 0,
            uart_baud: 9_600,
            pps_gpio: 2,
            ticks_per_second: 1_000_000,
            max_deviation_ppm: 250,
            smoothing_shift: 2,
            stale_after_secs: SECONDS_PER_DAY,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uart_id > 1 {
            return Err(ConfigError::InvalidUart(self.uart_id));
        }

        if self.uart_baud == 0 || self.uart_baud > MAX_BAUD_RATE {
            return Err(ConfigError::InvalidBaudRate(self.uart_baud));
        }

        if self.pps_gpio >= MAX_PPS_GPIO {
            return Err(ConfigError::InvalidPpsPin(self.pps_gpio));
        }

        // above 1GHz the upscale would be zero and the window math gets close to u64
        if self.ticks_per_second == 0 || self.ticks_per_second > MAX_TICKS_PER_SECOND {
            return Err(ConfigError::InvalidTickRate(self.ticks_per_second));
        }

        if self.max_deviation_ppm == 0 || u64::from(self.max_deviation_ppm) >= PPM {
            return Err(ConfigError::InvalidMaxDeviation(self.max_deviation_ppm));
        }

        if !(1..=16).contains(&self.smoothing_shift) {
            return Err(ConfigError::InvalidSmoothingShift(self.smoothing_shift));
        }

        Ok(())
    }

    /// fixed-point scale for the smoothed interval.
    ///
    /// chosen so that one unit of `upscale * ticks` is about one nanosecond. with a 1MHz clock this is 1000 and
    /// the smoothed window error divided by the window length is directly in ppb.
    pub const fn upscale(&self) -> u64 {
        let u = PPB / self.ticks_per_second;

        if u == 0 { 1 } else { u }
    }

    /// ticks between pulses on a perfect clock
    pub const fn expected_ticks_per_pulse(&self) -> u64 {
        self.ticks_per_second
    }

    /// ticks spanning `W` pulses on a perfect clock
    pub const fn expected_window_ticks<const W: usize>(&self) -> u64 {
        self.ticks_per_second.saturating_mul(W as u64)
    }

    /// a window sample is accepted only if it is strictly closer than this to `expected_window_ticks`
    pub const fn gate_ticks<const W: usize>(&self) -> u64 {
        // max_deviation_ppm * W when the clock is 1MHz
        (self.max_deviation_ppm as u64)
            .saturating_mul(self.ticks_per_second)
            .saturating_mul(W as u64)
            / PPM
    }

    pub const fn stale_after_ticks(&self) -> u64 {
        self.stale_after_secs.saturating_mul(self.ticks_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.upscale(), 1_000);
        assert_eq!(config.expected_window_ticks::<32>(), 32_000_000);
        assert_eq!(config.gate_ticks::<32>(), 250 * 32);
        assert_eq!(config.stale_after_ticks(), 86_400_000_000);
    }

    #[test]
    fn test_invalid_peripherals() {
        let config = Config {
            uart_id: 2,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidUart(2)));

        let config = Config {
            uart_baud: 230_400,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBaudRate(230_400)));

        let config = Config {
            uart_baud: MAX_BAUD_RATE,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));

        let config = Config {
            pps_gpio: 29,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPpsPin(29)));

        let config = Config {
            pps_gpio: 28,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_invalid_tuning() {
        let config = Config {
            ticks_per_second: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidTickRate(0)));

        let config = Config {
            ticks_per_second: MAX_TICKS_PER_SECOND + 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTickRate(MAX_TICKS_PER_SECOND + 1))
        );

        let config = Config {
            max_deviation_ppm: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxDeviation(0)));

        let config = Config {
            smoothing_shift: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSmoothingShift(0)));
    }

    #[test]
    fn test_fastest_clock_does_not_overflow() {
        let config = Config {
            ticks_per_second: MAX_TICKS_PER_SECOND,
            max_deviation_ppm: 999_999,
            ..Default::default()
        };

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.upscale(), 1);
        assert_eq!(config.gate_ticks::<32>(), 999_999 * 32_000);

        // a silly window saturates instead of panicking
        assert_eq!(config.expected_window_ticks::<{ usize::MAX }>(), u64::MAX);
        assert_eq!(config.gate_ticks::<1_000_000>(), u64::MAX / PPM);
    }

    #[test]
    fn test_32khz_clock() {
        // embassy's common tick rate doesn't divide a billion evenly
        let config = Config {
            ticks_per_second: 32_768,
            ..Default::default()
        };

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.upscale(), 30_517);
        assert_eq!(config.gate_ticks::<32>(), 250 * 32_768 * 32 / 1_000_000);
    }
}
