//! Civil date to unix time without a calendar crate.
//!
//! Howard Hinnant's days_from_civil. O(1), no year iteration, correct for every leap year in the proleptic
//! Gregorian calendar. Reference: <http://howardhinnant.github.io/date_algorithms.html>
//!
//! UTC only. Leap seconds don't exist here (GPS time in RMC is already UTC and NTP ignores them too).

const SECONDS_PER_DAY: u64 = 86_400;

/// days from 0000-03-01 to 1970-01-01
const EPOCH_SHIFT: i64 = 719_468;

pub const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// days since 1970-01-01. negative before the epoch
pub const fn days_from_civil(year: u16, month: u8, day: u8) -> i64 {
    let y = year as i64;
    let m = month as i64;
    let d = day as i64;

    // march is month 0 so the leap day lands at the end of the year
    let (y, m) = if m <= 2 { (y - 1, m + 9) } else { (y, m - 3) };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    // [0, 399]
    let yoe = y - era * 400;
    // [0, 365]
    let doy = (153 * m + 2) / 5 + d - 1;
    // [0, 146096]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;

    era * 146_097 + doe - EPOCH_SHIFT
}

/// seconds since the unix epoch, or None if any component is out of range or the instant is before 1970
pub fn unix_seconds(
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> Option<u64> {
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }

    // 60 is a leap second. we fold it into the next minute
    if hour > 23 || minute > 59 || second > 60 {
        return None;
    }

    let days = u64::try_from(days_from_civil(year, month, day)).ok()?;

    Some(
        days * SECONDS_PER_DAY
            + u64::from(hour) * 3_600
            + u64::from(minute) * 60
            + u64::from(second),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(2100));
    }

    #[test]
    fn test_days_from_civil() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 1, 1), 10_957);
        assert_eq!(days_from_civil(2024, 1, 1), 19_723);
        assert_eq!(days_from_civil(1969, 12, 31), -1);
    }

    #[test]
    fn test_unix_seconds() {
        assert_eq!(unix_seconds(1970, 1, 1, 0, 0, 0), Some(0));
        assert_eq!(unix_seconds(2013, 3, 25, 10, 59, 54), Some(1_364_209_194));
        assert_eq!(unix_seconds(2000, 2, 29, 0, 0, 0), Some(951_782_400));
        assert_eq!(unix_seconds(2038, 1, 19, 3, 14, 7), Some(2_147_483_647));
    }

    #[test]
    fn test_unix_seconds_rejects_garbage() {
        assert_eq!(unix_seconds(2023, 2, 29, 0, 0, 0), None);
        assert_eq!(unix_seconds(2024, 13, 1, 0, 0, 0), None);
        assert_eq!(unix_seconds(2024, 0, 1, 0, 0, 0), None);
        assert_eq!(unix_seconds(2024, 4, 31, 0, 0, 0), None);
        assert_eq!(unix_seconds(2024, 4, 30, 24, 0, 0), None);
        assert_eq!(unix_seconds(2024, 4, 30, 23, 60, 0), None);
        assert_eq!(unix_seconds(1969, 12, 31, 23, 59, 59), None);
    }
}
