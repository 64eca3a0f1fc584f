// SPDX-License-Identifier: MIT

//! Timestamp conversions for on-disk formats.
//!
//! - `now_unix()`: build time in seconds (0 without `std`)
//! - `fat_datetime()`: packed FAT date/time pair
//! - `unix_to_micros()`: LeanFS / FS/Z microsecond stamps

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Current time as seconds since the Unix epoch.
pub fn now_unix() -> i64 {
    #[cfg(feature = "std")]
    {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    #[cfg(not(feature = "std"))]
    {
        0
    }
}

/// Packs a Unix timestamp into FAT `(time, date)`.
///
/// FAT dates cover 1980-01-01 to 2107-12-31; values outside are clamped.
pub fn fat_datetime(unix: i64) -> (u16, u16) {
    let min = PrimitiveDateTime::new(
        Date::from_calendar_date(1980, Month::January, 1).unwrap_or(Date::MIN),
        Time::MIDNIGHT,
    )
    .assume_utc();
    let max = PrimitiveDateTime::new(
        Date::from_calendar_date(2107, Month::December, 31).unwrap_or(Date::MAX),
        Time::from_hms(23, 59, 58).unwrap_or(Time::MIDNIGHT),
    )
    .assume_utc();

    let ts = OffsetDateTime::from_unix_timestamp(unix)
        .unwrap_or(min)
        .clamp(min, max);

    let time = ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
    let date = (((ts.year() - 1980) as u16) << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
    (time, date)
}

/// Seconds to microseconds, saturating on overflow and clamping negatives to 0.
#[inline]
pub fn unix_to_micros(unix: i64) -> u64 {
    (unix.max(0) as u64).saturating_mul(1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fat_datetime_epoch_clamped() {
        // 1970 is before the FAT epoch
        assert_eq!(fat_datetime(0), (0, (1 << 5) | 1));
    }

    #[test]
    fn test_fat_datetime_known_value() {
        // 2021-03-14 15:09:26 UTC
        let (time, date) = fat_datetime(1_615_734_566);
        assert_eq!(time, (15 << 11) | (9 << 5) | 13);
        assert_eq!(date, ((2021 - 1980) << 9) | (3 << 5) | 14);
    }

    #[test]
    fn test_micros() {
        assert_eq!(unix_to_micros(-5), 0);
        assert_eq!(unix_to_micros(2), 2_000_000);
    }
}
