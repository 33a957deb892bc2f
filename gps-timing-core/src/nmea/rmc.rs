//! `$GPRMC`, recommended minimum specific GNSS data. The only sentence we need for time.
//!
//! ```text
//! $GPRMC,105954.000,A,3150.6731,N,11711.9399,E,0.00,96.10,250313,,,A*53
//!        1          2 3         4 5          6 7    8     9      101112
//! ```
use super::Fields;
use crate::calendar::unix_seconds;
use crate::errors::ParseError;
use crate::logging::trace;
use crate::timing::Position;

pub const RMC_PREFIX: &[u8] = b"$GPRMC,";

const TIME: usize = 1;
const STATUS: usize = 2;
const LATITUDE: usize = 3;
const LATITUDE_HEMISPHERE: usize = 4;
const LONGITUDE: usize = 5;
const LONGITUDE_HEMISPHERE: usize = 6;
const DATE: usize = 9;
/// NMEA 2.0 ends at the magnetic variation direction
const MAGVAR_DIRECTION: usize = 11;
/// NMEA 2.3 and later add a mode indicator
const MODE: usize = 12;

/// a valid navigation solution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RmcFix {
    pub position: Position,
    pub utc_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rmc {
    /// status was not `A`. nothing else in the sentence can be trusted
    Void,
    Fix(RmcFix),
}

/// Ok(None) if there is no RMC sentence in `line`. That isn't an error, the receiver sends plenty of other sentences.
pub fn parse_rmc(line: &[u8]) -> Result<Option<Rmc>, ParseError> {
    let Some(start) = find(line, RMC_PREFIX) else {
        return Ok(None);
    };

    let fields = Fields::tokenize(&line[start..]);

    let status = required(&fields, STATUS, "status")?;
    if status != b"A" {
        return Ok(Some(Rmc::Void));
    }

    let latitude = parse_coordinate(required(&fields, LATITUDE, "latitude")?, "latitude")?;
    let hemisphere = required(&fields, LATITUDE_HEMISPHERE, "latitude hemisphere")?;
    let latitude = if is_negative(hemisphere, b'N', b'S')? {
        -latitude
    } else {
        latitude
    };

    let longitude = parse_coordinate(required(&fields, LONGITUDE, "longitude")?, "longitude")?;
    let hemisphere = required(&fields, LONGITUDE_HEMISPHERE, "longitude hemisphere")?;
    let longitude = if is_negative(hemisphere, b'E', b'W')? {
        -longitude
    } else {
        longitude
    };

    // the `*` has to close the last field. anything else is a truncated or mangled sentence
    if !matches!(fields.delimiter_field(), Some(MAGVAR_DIRECTION | MODE)) {
        return Err(ParseError::MissingChecksumDelimiter);
    }

    // TODO: compare these once we've seen what the receivers we use actually send
    if fields.transmitted_checksum() != Some(fields.computed_checksum()) {
        trace!("rmc checksum mismatch");
    }

    let (day, month, year) = parse_date(fields.get(DATE).unwrap_or_default())?;
    let (hour, minute, second) = parse_time(fields.get(TIME).unwrap_or_default())?;

    let utc_secs =
        unix_seconds(year, month, day, hour, minute, second).ok_or(ParseError::InvalidDate)?;

    Ok(Some(Rmc::Fix(RmcFix {
        position: Position {
            latitude,
            longitude,
        },
        utc_secs,
    })))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn required<'a>(
    fields: &Fields<'a>,
    index: usize,
    name: &'static str,
) -> Result<&'a [u8], ParseError> {
    match fields.get(index) {
        Some(field) if !field.is_empty() => Ok(field),
        _ => Err(ParseError::MissingField(name)),
    }
}

/// a one letter hemisphere. errors name the first byte that isn't `positive` or `negative`
fn is_negative(field: &[u8], positive: u8, negative: u8) -> Result<bool, ParseError> {
    match field {
        [b] if *b == positive => Ok(false),
        [b] if *b == negative => Ok(true),
        _ => {
            let bad = field
                .iter()
                .copied()
                .find(|&b| b != positive && b != negative)
                .or_else(|| field.get(1).copied())
                .unwrap_or_default();

            Err(ParseError::InvalidHemisphere(bad))
        }
    }
}

/// `DDMM.MMMM` (or `DDDMM.MMMM`) times 1000, rounded half up on the fourth decimal. no floats
fn parse_coordinate(field: &[u8], name: &'static str) -> Result<i32, ParseError> {
    let (whole, fraction) = match field.iter().position(|&b| b == b'.') {
        Some(dot) => (&field[..dot], &field[dot + 1..]),
        None => (field, &b""[..]),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseError::InvalidNumber(name));
    }

    let mut value: i64 = 0;
    for &b in whole {
        value = value * 10 + i64::from(digit(b, name)?);

        if value > i64::from(i32::MAX) {
            return Err(ParseError::InvalidNumber(name));
        }
    }

    let mut milli = 0;
    let mut round_up = false;
    for (i, &b) in fraction.iter().enumerate() {
        let d = digit(b, name)?;

        match i {
            0..3 => milli = milli * 10 + i64::from(d),
            3 => round_up = d >= 5,
            _ => {}
        }
    }
    // "3150.6" is 3150.600
    for _ in fraction.len()..3 {
        milli *= 10;
    }

    let value = value * 1000 + milli + i64::from(round_up);

    i32::try_from(value).map_err(|_| ParseError::InvalidNumber(name))
}

fn digit(b: u8, name: &'static str) -> Result<u8, ParseError> {
    if b.is_ascii_digit() {
        Ok(b - b'0')
    } else {
        Err(ParseError::InvalidNumber(name))
    }
}

fn two_digits(pair: &[u8]) -> Option<u8> {
    match pair {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Some((a - b'0') * 10 + (b - b'0')),
        _ => None,
    }
}

/// `DDMMYY`. always this century
fn parse_date(field: &[u8]) -> Result<(u8, u8, u16), ParseError> {
    if field.len() != 6 {
        return Err(ParseError::InvalidDate);
    }

    let day = two_digits(&field[0..2]).ok_or(ParseError::InvalidDate)?;
    let month = two_digits(&field[2..4]).ok_or(ParseError::InvalidDate)?;
    let year = two_digits(&field[4..6]).ok_or(ParseError::InvalidDate)?;

    Ok((day, month, 2000 + u16::from(year)))
}

/// `HHMMSS[.sss]`. the fraction is ignored
fn parse_time(field: &[u8]) -> Result<(u8, u8, u8), ParseError> {
    if field.len() < 6 {
        return Err(ParseError::InvalidTime);
    }

    let hour = two_digits(&field[0..2]).ok_or(ParseError::InvalidTime)?;
    let minute = two_digits(&field[2..4]).ok_or(ParseError::InvalidTime)?;
    let second = two_digits(&field[4..6]).ok_or(ParseError::InvalidTime)?;

    if hour > 23 || minute > 59 || second > 60 {
        return Err(ParseError::InvalidTime);
    }

    Ok((hour, minute, second))
}
