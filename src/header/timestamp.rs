//! Timestamp conversions for the two on-disk formats LHA headers carry.
use chrono::prelude::*;

/// Decodes an MS-DOS packed date/time into a naive (timezone-less) value.
///
/// ```text
/// bit   24       16        8        0
/// 76543210 76543210 76543210 76543210
/// YYYYYYYM MMMDDDDD hhhhhmmm mmmsssss
/// ```
///
/// | Sym. | Description                                 |
/// |------|---------------------------------------------|
/// | Y    | The year from 1980 (0 = 1980)               |
/// | M    | Month. [1, 12]                              |
/// | D    | Day. [1, 31]                                |
/// | h    | Hour. [0, 23].                              |
/// | m    | Minute. [0, 59].                            |
/// | s    | 2 seconds. [0, 29] (in units of 2 seconds). |
pub fn parse_msdos_datetime(ts: u32) -> Option<NaiveDateTime> {
    let sec = ts << 1 & 0x3e;
    let min = ts >> 5 & 0x3f;
    let hour = ts >> 11 & 0x1f;
    let day = ts >> 16 & 0x1f;
    let mon = ts >> 21 & 0xf;
    let year = 1980 + (ts >> 25 & 0x7f) as i32;
    NaiveDate::from_ymd_opt(year, mon, day).and_then(|d| d.and_hms_opt(hour, min, sec))
}

/// Converts an MS-DOS packed date/time to Unix epoch seconds, treating it as UTC.
pub fn msdos_datetime_to_epoch(ts: u32) -> Option<i64> {
    parse_msdos_datetime(ts).map(|dt| dt.and_utc().timestamp())
}

/// Converts a Windows [FILETIME] value to Unix epoch seconds.
///
/// [FILETIME]: https://docs.microsoft.com/en-us/windows/win32/api/minwinbase/ns-minwinbase-filetime
pub fn win_filetime_to_epoch(filetime: u64) -> Option<i64> {
    let ft = i64::try_from(filetime).ok()?.checked_sub(116_444_736_000_000_000)?;
    Some(ft / 10_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msdos_datetime_round_trips_known_value() {
        // 2021-05-17 10:30:00, encoded per the bit layout above.
        let ts: u32 = (41 << 25) | (5 << 21) | (17 << 16) | (10 << 11) | (30 << 5) | 0;
        let dt = parse_msdos_datetime(ts).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-05-17 10:30:00");
    }

    #[test]
    fn win_filetime_matches_known_unix_epoch() {
        // 1970-01-01T00:00:00Z in FILETIME units.
        assert_eq!(win_filetime_to_epoch(116_444_736_000_000_000), Some(0));
    }
}
