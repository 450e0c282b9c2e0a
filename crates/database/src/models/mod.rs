mod file;
mod property;

pub(crate) use self::file::{FileHeaderRow, FileRow, NewFileRow};
pub(crate) use self::property::PropertyRow;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Timestamps are persisted as milliseconds since the Unix epoch.
pub(crate) fn to_millis(timestamp: UtcDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / NANOS_PER_MILLI) as i64
}

pub(crate) fn from_millis(millis: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * NANOS_PER_MILLI).or_raise(|| ErrorKind::InvalidData(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millisecond_round_trip_truncates_sub_millis() {
        let now = UtcDateTime::now();
        let restored = from_millis(to_millis(now), "now").unwrap();
        assert!(now - restored < time::Duration::milliseconds(1));
        assert!(restored <= now);
    }

    #[test]
    fn test_out_of_range_millis_are_invalid_data() {
        let err = from_millis(i64::MAX, "created").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("created")));
    }
}
