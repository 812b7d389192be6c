//! Request Outcomes
//!
//! Per-request completion data and the classification rule: a replayed
//! request counts as a success only when its status code equals the one the
//! log recorded. A response with any other code is a failure that still
//! produces a result line; a transport failure produces none.

use crate::replay::timeline::ReplayEvent;
use std::time::Duration;

/// What a single dispatch task reports back, exactly once per event.
#[derive(Debug)]
pub struct DispatchReport {
    pub event: ReplayEvent,
    /// Unix milliseconds at dispatch initiation.
    pub dispatched_at_ms: i64,
    pub outcome: RequestOutcome,
}

#[derive(Debug)]
pub enum RequestOutcome {
    /// The target answered, with any status code.
    Completed { status: u16, elapsed: Duration },
    /// No response at all: connect, DNS, or TLS failure, or a timeout.
    Failed { error: String },
}

/// Recorded statuses come out of the log as text and are never assumed
/// numeric, so the comparison is on the string form.
pub fn is_status_match(recorded: &str, replayed: u16) -> bool {
    recorded == replayed.to_string()
}

/// One line per resolved request: replayed status, recorded status, event
/// timestamp, dispatch timestamp, elapsed seconds, path.
pub fn result_line(report: &DispatchReport, status: u16, elapsed: Duration) -> String {
    format!(
        "{}     {}     {}     {}     {:.2}     {}",
        status,
        report.event.recorded_status,
        report.event.timestamp_ms,
        report.dispatched_at_ms,
        elapsed.as_secs_f64(),
        report.event.path
    )
}
