//! Replay Runner
//!
//! Drives the whole replay: one pacing loop initiating dispatches in order,
//! one aggregator task draining completions, and the summary once the
//! counting barrier resolves. The loop suspends only for computed pacing
//! delays, never for responses, so dispatch latency cannot distort the
//! replay cadence.

use crate::replay::aggregate::{collect_outcomes, OutcomeTally, ResultSink};
use crate::replay::dispatch::{DispatchConfig, Dispatcher};
use crate::replay::pacing::{PacingMode, PacingPlan};
use crate::replay::report::ReplaySummary;
use crate::replay::stats::{StatsConfig, StatsTable};
use crate::replay::timeline::Timeline;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub dispatch: DispatchConfig,
    pub ratio: f64,
    pub scale_mode: bool,
    /// Bypass pacing entirely and fire every event immediately.
    pub skip_sleep: bool,
    pub stats: Option<StatsConfig>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            ratio: 1.0,
            scale_mode: false,
            skip_sleep: false,
            stats: None,
        }
    }
}

impl ReplayOptions {
    fn pacing_mode(&self) -> PacingMode {
        if self.scale_mode {
            PacingMode::Scale
        } else {
            PacingMode::Literal
        }
    }
}

pub struct ReplayOutput {
    pub summary: ReplaySummary,
    pub tally: OutcomeTally,
    pub stats: Option<StatsTable>,
}

/// Run the replay to completion. There is no cancellation path: once the
/// loop starts, every event is dispatched and every outcome awaited.
pub async fn run(timeline: Timeline, options: &ReplayOptions, sink: ResultSink) -> Result<ReplayOutput> {
    let original_duration_ms = timeline.original_duration_ms();
    let events = timeline.events;
    let total = events.len() as u64;

    let plan = PacingPlan::new(&events, options.pacing_mode());
    let dispatcher = Dispatcher::new(&options.dispatch)?;
    let mut stats = options.stats.clone().map(StatsTable::new);

    let (tx, rx) = mpsc::channel(1024);
    let collector = tokio::spawn(collect_outcomes(rx, total, sink));

    let started = Instant::now();
    let mut total_sleep = Duration::ZERO;
    for (index, event) in events.iter().enumerate() {
        debug!(method = %event.method, path = %event.path, "dispatching");
        // Stats count attempted requests, recorded before dispatch resolves.
        if let Some(stats) = stats.as_mut() {
            stats.record(&event.path);
        }
        dispatcher.spawn(event.clone(), tx.clone());

        if options.skip_sleep {
            continue;
        }
        if let Some(delay) = plan.delay_after(&events, index, options.ratio) {
            total_sleep += delay;
            debug!(delay_ms = delay.as_millis() as u64, "sleeping");
            tokio::time::sleep(delay).await;
        }
    }
    let replay_duration = started.elapsed();
    drop(tx);

    let tally = collector
        .await
        .context("outcome collector task panicked")?;
    let summary = ReplaySummary::compute(
        total,
        &tally,
        replay_duration,
        total_sleep,
        original_duration_ms,
    );

    Ok(ReplayOutput {
        summary,
        tally,
        stats,
    })
}
