//! Replay Summary
//!
//! The aggregate report produced exactly once, when every dispatch has
//! resolved: status fidelity, latency totals, pacing accounting, and the
//! original-vs-replayed request rates.

use crate::replay::aggregate::OutcomeTally;
use serde::Serialize;
use std::time::Duration;

/// Section divider used by the console report.
pub const DIVIDER: &str =
    "___________________________________________________________________________";

#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub total_events: u64,
    pub failed_events: u64,
    pub success_percent: f64,
    /// Sum of per-request elapsed time, seconds.
    pub total_response_time_s: f64,
    /// Wall-clock duration of the pacing loop, seconds.
    pub replay_duration_s: f64,
    /// Time spent awaiting computed pacing delays, seconds.
    pub total_sleep_s: f64,
    pub original_duration_s: f64,
    pub original_rps: f64,
    pub replay_rps: f64,
}

impl ReplaySummary {
    pub fn compute(
        total_events: u64,
        tally: &OutcomeTally,
        replay_duration: Duration,
        total_sleep: Duration,
        original_duration_ms: i64,
    ) -> Self {
        let success_percent = if total_events == 0 {
            0.0
        } else {
            100.0 * tally.success_count as f64 / total_events as f64
        };
        // Degenerate timelines (a single event, or all events in the same
        // second) span zero time; report zero rates instead of dividing.
        let original_rps = if original_duration_ms > 0 {
            1000.0 * total_events as f64 / original_duration_ms as f64
        } else {
            0.0
        };
        let replay_rps = if replay_duration > Duration::ZERO {
            total_events as f64 / replay_duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_events,
            failed_events: tally.fail_count,
            success_percent,
            total_response_time_s: tally.total_response_time.as_secs_f64(),
            replay_duration_s: replay_duration.as_secs_f64(),
            total_sleep_s: total_sleep.as_secs_f64(),
            original_duration_s: original_duration_ms as f64 / 1000.0,
            original_rps,
            replay_rps,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n\
             Total number of events: {}. Number of the failed events: {}. Percent of the successful events: {:.2}%.\n\
             Total response time: {:.2} seconds. Total requests time: {:.2} seconds. Total sleep time: {:.2} seconds.\n\
             Original time: {:.2} seconds. Original rps: {:.4}. Replay rps: {:.4}.",
            DIVIDER,
            self.total_events,
            self.failed_events,
            self.success_percent,
            self.total_response_time_s,
            self.replay_duration_s,
            self.total_sleep_s,
            self.original_duration_s,
            self.original_rps,
            self.replay_rps,
        )
    }
}
