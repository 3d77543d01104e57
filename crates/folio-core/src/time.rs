//! Millisecond-precision wall-clock helpers.
//!
//! Every timestamp the data layer persists is truncated to milliseconds so
//! that all three backends (text, `TIMESTAMPTZ`, epoch-ms `BIGINT`) return
//! exactly the value that was written.

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to whole milliseconds.
pub fn now_ms() -> DateTime<Utc> {
    truncate_ms(Utc::now())
}

/// Drop everything below the millisecond.
pub fn truncate_ms(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Milliseconds since the Unix epoch.
pub fn to_epoch_ms(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Inverse of [`to_epoch_ms`]. `None` if out of chrono's range.
pub fn from_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_no_sub_millisecond_part() {
        let ts = now_ms();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn epoch_ms_round_trips() {
        let ts = now_ms();
        assert_eq!(from_epoch_ms(to_epoch_ms(ts)), Some(ts));
    }

    #[test]
    fn truncate_drops_sub_millisecond_digits() {
        let ts = DateTime::from_timestamp(1_700_000_000, 987_654_321).unwrap();
        assert_eq!(truncate_ms(ts).timestamp_subsec_nanos(), 987_000_000);
        assert_eq!(truncate_ms(truncate_ms(ts)), truncate_ms(ts));
    }

    #[test]
    fn out_of_range_is_none() {
        assert!(from_epoch_ms(i64::MAX).is_none());
    }
}
