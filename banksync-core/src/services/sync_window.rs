//! Sync window - how far back the next fetch reaches
//!
//! Incremental fetches overlap the previous run by `lookback_buffer_days` so
//! that transactions which settle late are re-fetched and reconciled by id
//! instead of being missed.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

/// `last_sync - (lookback_buffer_days + 1 ms)`, in the zone of `last_sync`.
///
/// The extra millisecond keeps the window strictly before the previous
/// boundary instant.
pub fn fetch_start<Tz: TimeZone>(last_sync: &DateTime<Tz>, lookback_buffer_days: u16) -> DateTime<Tz> {
    let lookback = Duration::days(i64::from(lookback_buffer_days)) + Duration::milliseconds(1);
    last_sync.clone() - lookback
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    /// No previous sync recorded
    Initial,
    Incremental,
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncKind::Initial => f.write_str("initial"),
            SyncKind::Incremental => f.write_str("incremental"),
        }
    }
}

/// Fetch range for one batch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: SyncKind,
}

impl SyncWindow {
    pub fn compute(
        last_sync: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        lookback_buffer_days: u16,
        initial_sync_days: u16,
    ) -> Self {
        let (start, kind) = match last_sync {
            Some(last) => (fetch_start(&last, lookback_buffer_days), SyncKind::Incremental),
            None => (
                now - Duration::days(i64::from(initial_sync_days)),
                SyncKind::Initial,
            ),
        };

        // A clock that moved backwards must not yield an inverted range
        Self {
            start: start.min(now),
            end: now,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_fetch_start_lookback() {
        let last_sync = Utc.with_ymd_and_hms(2025, 11, 16, 12, 0, 0).unwrap();
        let start = fetch_start(&last_sync, 3);

        let expected = Utc.with_ymd_and_hms(2025, 11, 13, 11, 59, 59).unwrap()
            + Duration::milliseconds(999);
        assert_eq!(start, expected);
        assert!(last_sync - start > Duration::days(3));
    }

    #[test]
    fn test_zero_lookback_still_precedes_boundary() {
        let last_sync = Utc.with_ymd_and_hms(2025, 11, 16, 12, 0, 0).unwrap();
        assert_eq!(last_sync - fetch_start(&last_sync, 0), Duration::milliseconds(1));
    }

    #[test]
    fn test_fetch_start_keeps_time_zone() {
        let nzdt = FixedOffset::east_opt(13 * 3600).unwrap();
        let last_sync = nzdt.with_ymd_and_hms(2025, 11, 17, 1, 0, 0).unwrap();
        let start = fetch_start(&last_sync, 3);

        assert_eq!(start.offset(), last_sync.offset());
        assert_eq!(
            start.with_timezone(&Utc),
            fetch_start(&last_sync.with_timezone(&Utc), 3)
        );
    }

    #[test]
    fn test_window_incremental() {
        let last = Utc.with_ymd_and_hms(2025, 11, 16, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap();
        let window = SyncWindow::compute(Some(last), now, 3, 90);

        assert_eq!(window.kind, SyncKind::Incremental);
        assert_eq!(window.start, fetch_start(&last, 3));
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_window_initial() {
        let now = Utc.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap();
        let window = SyncWindow::compute(None, now, 3, 90);

        assert_eq!(window.kind, SyncKind::Initial);
        assert_eq!(window.start, now - Duration::days(90));
        assert_eq!(window.kind.to_string(), "initial");
    }

    #[test]
    fn test_window_never_inverted() {
        let now = Utc.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap();
        let future_last = now + Duration::days(30);
        let window = SyncWindow::compute(Some(future_last), now, 3, 90);
        assert_eq!(window.start, now);
        assert!(window.start <= window.end);
    }
}
