//! Outcome Aggregation
//!
//! Single consumer of dispatch reports. Owns the tally and the result sink,
//! so counter updates and result lines never race. Terminates once resolved
//! reports equal the timeline length: the counting barrier that triggers
//! the final report.

use crate::replay::outcome::{is_status_match, result_line, DispatchReport, RequestOutcome};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Running success/failure/latency counters across the whole replay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutcomeTally {
    pub success_count: u64,
    pub fail_count: u64,
    /// Sum of elapsed time for completed responses. Transport failures
    /// contribute no latency sample.
    pub total_response_time: Duration,
}

impl OutcomeTally {
    pub fn resolved(&self) -> u64 {
        self.success_count + self.fail_count
    }

    pub fn record(&mut self, report: &DispatchReport) {
        match &report.outcome {
            RequestOutcome::Completed { status, elapsed } => {
                if is_status_match(&report.event.recorded_status, *status) {
                    self.success_count += 1;
                } else {
                    self.fail_count += 1;
                }
                self.total_response_time += *elapsed;
            }
            RequestOutcome::Failed { .. } => {
                self.fail_count += 1;
            }
        }
    }
}

/// Where result lines go: always stdout, optionally duplicated to a file.
pub struct ResultSink {
    file: Option<BufWriter<File>>,
}

impl ResultSink {
    pub fn stdout_only() -> Self {
        Self { file: None }
    }

    /// Truncates a pre-existing file, per the results-file contract.
    pub fn with_file(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("cannot create results file {}", path.display()))?;
        Ok(Self {
            file: Some(BufWriter::new(file)),
        })
    }

    pub fn write_line(&mut self, line: &str) {
        println!("{}", line);
        if let Some(file) = &mut self.file {
            if let Err(err) = writeln!(file, "{}", line) {
                error!(error = %err, "failed writing to the results file");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(file) = &mut self.file {
            let _ = file.flush();
        }
    }
}

/// Drain `rx` until `expected` reports have resolved, then return the tally.
///
/// Completion order is whatever the network produced; the additive updates
/// are commutative, so the final totals do not depend on it.
pub async fn collect_outcomes(
    mut rx: mpsc::Receiver<DispatchReport>,
    expected: u64,
    mut sink: ResultSink,
) -> OutcomeTally {
    let mut tally = OutcomeTally::default();

    while tally.resolved() < expected {
        let Some(report) = rx.recv().await else {
            // All senders gone before the barrier resolved; report what we
            // have rather than hang.
            error!(
                resolved = tally.resolved(),
                expected, "dispatch channel closed early"
            );
            break;
        };

        match &report.outcome {
            RequestOutcome::Completed { status, elapsed } => {
                debug!(
                    path = %report.event.path,
                    status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "response"
                );
                if !is_status_match(&report.event.recorded_status, *status) {
                    debug!(
                        path = %report.event.path,
                        replayed = status,
                        recorded = %report.event.recorded_status,
                        "status differs from the recording"
                    );
                }
                sink.write_line(&result_line(&report, *status, *elapsed));
            }
            RequestOutcome::Failed { error } => {
                error!(path = %report.event.path, error = %error, "request failed without a response");
            }
        }

        tally.record(&report);
    }

    sink.flush();
    tally
}
