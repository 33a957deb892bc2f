use thiserror::Error;

/// Bad peripheral ids or estimator tuning. These are fatal: refuse to start.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("uart id must be 0 or 1, got {0}")]
    InvalidUart(u8),
    #[error("baud rate must be between 1 and 115200, got {0}")]
    InvalidBaudRate(u32),
    #[error("pps gpio must be below 29, got {0}")]
    InvalidPpsPin(u8),
    #[error("monotonic clock tick rate must be between 1 and 1GHz, got {0}")]
    InvalidTickRate(u64),
    #[error("max deviation must be between 1 and 999999 ppm, got {0}")]
    InvalidMaxDeviation(u32),
    #[error("smoothing shift must be between 1 and 16, got {0}")]
    InvalidSmoothingShift(u32),
}

/// A sentence that could not be framed or understood. The sentence is dropped and counted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    #[error("sentence overflowed the line buffer")]
    Overflow,
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("invalid number in {0} field")]
    InvalidNumber(&'static str),
    #[error("invalid hemisphere {0:#04x}")]
    InvalidHemisphere(u8),
    #[error("missing checksum delimiter")]
    MissingChecksumDelimiter,
    #[error("invalid date field")]
    InvalidDate,
    #[error("invalid time field")]
    InvalidTime,
}

impl ParseError {
    /// negative result code, for consumers that still speak in C-style status codes
    pub const fn code(&self) -> i32 {
        match self {
            Self::Overflow => -1,
            Self::InvalidHemisphere(_) => -2,
            Self::MissingField(_) => -3,
            Self::MissingChecksumDelimiter => -4,
            Self::InvalidNumber(_) => -5,
            Self::InvalidDate => -6,
            Self::InvalidTime => -7,
        }
    }
}

/// No usable time right now. This is a normal state, not a crash.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    #[error("no gps fix has ever been received")]
    NoFix,
    #[error("the last gps fix is more than 24 hours old")]
    StaleFix,
}

/// i still don't love this pattern, but it keeps `?` working across the config, parse and query paths
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MyError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("time error: {0}")]
    Time(#[from] TimeError),
}

pub type MyResult<T> = Result<T, MyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_codes_are_negative_and_distinct() {
        let errors = [
            ParseError::Overflow,
            ParseError::InvalidHemisphere(b'X'),
            ParseError::MissingField("date"),
            ParseError::MissingChecksumDelimiter,
            ParseError::InvalidNumber("latitude"),
            ParseError::InvalidDate,
            ParseError::InvalidTime,
        ];

        for (i, a) in errors.iter().enumerate() {
            assert!(a.code() < 0);

            for b in errors.iter().skip(i + 1) {
                assert_ne!(a.code(), b.code(), "{a:?} and {b:?} share a code");
            }
        }
    }

    #[test]
    fn test_from_conversions() {
        let err: MyError = TimeError::StaleFix.into();
        assert_eq!(err, MyError::Time(TimeError::StaleFix));

        let err: MyError = ConfigError::InvalidUart(2).into();
        assert_eq!(err, MyError::Config(ConfigError::InvalidUart(2)));
    }
}
