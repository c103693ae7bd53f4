//! Converts canonical timezone names into UTC offsets.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset for `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// Returns [None] if `canonical_timezone` is not a valid canonical timezone name.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

#[cfg(test)]
mod timezone_tests {
    use super::get_local_offset;

    #[test]
    fn returns_offset_for_canonical_name() {
        assert!(get_local_offset("Pacific/Auckland").is_some());
    }

    #[test]
    fn returns_none_for_unknown_name() {
        assert_eq!(get_local_offset("Middle/Nowhere"), None);
    }
}
