//! Replay Timeline
//!
//! Converts decoded access log rows into the ordered event sequence the
//! replay loop runs over. The whole log is materialized before playback
//! starts: scale-mode pacing needs per-second counts over the full timeline.

use crate::access_log::LogRecord;
use chrono::NaiveDateTime;
use tracing::warn;

/// One replayed HTTP request derived from a single log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEvent {
    /// Epoch milliseconds derived from the log's local-time field,
    /// interpreted literally (any timezone suffix is ignored).
    pub timestamp_ms: i64,
    pub method: String,
    /// Path including the query string, exactly as logged.
    pub path: String,
    /// Possibly empty; forwarded as a request header when it is not.
    pub user_agent: String,
    /// String form of the originally recorded status code.
    pub recorded_status: String,
}

/// The full event sequence, in input order.
#[derive(Debug, Default)]
pub struct Timeline {
    pub events: Vec<ReplayEvent>,
    /// Rows dropped for an unparseable time field or malformed request line.
    pub skipped_rows: usize,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Millisecond span between the first and last event.
    pub fn original_duration_ms(&self) -> i64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0,
        }
    }
}

/// Parse an nginx `$time_local` value ("10/Oct/2000:13:55:36 -0700") into
/// epoch milliseconds. The offset suffix is deliberately not applied: the
/// replay only cares about relative spacing, not the absolute wall clock.
pub fn parse_local_time(time_local: &str) -> Option<i64> {
    let stamp = time_local.split_whitespace().next()?;
    let parsed = NaiveDateTime::parse_from_str(stamp, "%d/%b/%Y:%H:%M:%S").ok()?;
    Some(parsed.and_utc().timestamp_millis())
}

/// Build the replay timeline, preserving input order exactly.
///
/// Rows that cannot become an event are skipped and counted, never fatal.
/// Input is trusted to be timestamp-sorted; a regression is logged once so
/// out-of-order logs are visible, but the order is kept as-is.
pub fn build_timeline(records: Vec<LogRecord>) -> Timeline {
    let mut timeline = Timeline::default();
    let mut regression_seen = false;

    for record in records {
        let Some(timestamp_ms) = parse_local_time(&record.time_local) else {
            warn!(time_local = %record.time_local, "skipping row with unparseable time");
            timeline.skipped_rows += 1;
            continue;
        };

        let mut parts = record.request.split_whitespace();
        let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
            warn!(request = %record.request, "skipping row with malformed request line");
            timeline.skipped_rows += 1;
            continue;
        };

        if !regression_seen {
            if let Some(prev) = timeline.events.last() {
                if timestamp_ms < prev.timestamp_ms {
                    regression_seen = true;
                    warn!("timestamps regress in the log; keeping input order as-is");
                }
            }
        }

        timeline.events.push(ReplayEvent {
            timestamp_ms,
            method: method.to_string(),
            path: path.to_string(),
            user_agent: record.http_user_agent,
            recorded_status: record.status,
        });
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(time_local: &str, request: &str, status: &str) -> LogRecord {
        LogRecord {
            time_local: time_local.to_string(),
            request: request.to_string(),
            status: status.to_string(),
            http_user_agent: String::new(),
        }
    }

    #[test]
    fn test_parse_local_time_ignores_offset() {
        let expected = NaiveDate::from_ymd_opt(2000, 10, 10)
            .unwrap()
            .and_hms_opt(13, 55, 36)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(parse_local_time("10/Oct/2000:13:55:36 -0700"), Some(expected));
        // The same instant with a different offset parses identically.
        assert_eq!(parse_local_time("10/Oct/2000:13:55:36 +0200"), Some(expected));
    }

    #[test]
    fn test_parse_local_time_rejects_garbage() {
        assert_eq!(parse_local_time("not-a-time"), None);
        assert_eq!(parse_local_time(""), None);
    }

    #[test]
    fn test_build_timeline_splits_request_line() {
        let timeline = build_timeline(vec![record(
            "10/Oct/2000:13:55:36 -0700",
            "GET /a?x=1 HTTP/1.1",
            "200",
        )]);
        assert_eq!(timeline.len(), 1);
        let event = &timeline.events[0];
        assert_eq!(event.method, "GET");
        assert_eq!(event.path, "/a?x=1");
        assert_eq!(event.recorded_status, "200");
    }

    #[test]
    fn test_build_timeline_skips_malformed_rows() {
        let timeline = build_timeline(vec![
            record("10/Oct/2000:13:55:36 -0700", "GET /a HTTP/1.1", "200"),
            record("10/Oct/2000:13:55:36 -0700", "GET", "200"),
            record("garbage", "GET /b HTTP/1.1", "200"),
            record("10/Oct/2000:13:55:37 -0700", "GET /c HTTP/1.1", "404"),
        ]);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.skipped_rows, 2);
        assert_eq!(timeline.events[1].path, "/c");
    }

    #[test]
    fn test_build_timeline_keeps_input_order_on_regression() {
        let timeline = build_timeline(vec![
            record("10/Oct/2000:13:55:37 -0700", "GET /late HTTP/1.1", "200"),
            record("10/Oct/2000:13:55:36 -0700", "GET /early HTTP/1.1", "200"),
        ]);
        assert_eq!(timeline.events[0].path, "/late");
        assert_eq!(timeline.events[1].path, "/early");
    }

    #[test]
    fn test_original_duration() {
        let timeline = build_timeline(vec![
            record("10/Oct/2000:13:55:36 -0700", "GET /a HTTP/1.1", "200"),
            record("10/Oct/2000:13:55:38 -0700", "GET /b HTTP/1.1", "200"),
        ]);
        assert_eq!(timeline.original_duration_ms(), 2000);
        assert_eq!(Timeline::default().original_duration_ms(), 0);
    }
}
