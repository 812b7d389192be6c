//! Replay Engine
//!
//! Scheduler and dispatch/aggregation engine for access log replay.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐
//! │  Timeline    │─────▶│ PacingPlan   │  literal / scale waits,
//! │  (events)    │      │ (per-second  │  precomputed burst counts
//! └──────────────┘      │  repeats)    │
//!                       └──────┬───────┘
//!                              ▼
//!                 ┌────────────────────────┐
//!                 │      pacing loop       │  one dispatch initiation per
//!                 │  (runner::run, single  │  event, awaits only computed
//!                 │   point of suspension) │  delays, never responses
//!                 └───────┬───────┬────────┘
//!                         │       │ spawn per event
//!                 stats ▼ │       ▼
//!                 ┌──────────┐  ┌──────────────┐
//!                 │StatsTable│  │ Dispatcher   │  reqwest, fire-and-forget
//!                 └──────────┘  └──────┬───────┘
//!                                      │ mpsc (DispatchReport)
//!                                      ▼
//!                          ┌──────────────────────┐
//!                          │ aggregator task      │  sole mutator of the
//!                          │ (tally + result sink)│  tally; counting barrier
//!                          └──────────┬───────────┘
//!                                     ▼
//!                              ReplaySummary
//! ```

pub mod aggregate;
pub mod dispatch;
pub mod outcome;
pub mod pacing;
pub mod report;
pub mod runner;
pub mod stats;
pub mod timeline;

pub use aggregate::{collect_outcomes, OutcomeTally, ResultSink};
pub use dispatch::{DispatchConfig, Dispatcher};
pub use outcome::{is_status_match, DispatchReport, RequestOutcome};
pub use pacing::{PacingMode, PacingPlan};
pub use report::{ReplaySummary, DIVIDER};
pub use runner::{run, ReplayOptions, ReplayOutput};
pub use stats::{StatsConfig, StatsTable};
pub use timeline::{build_timeline, parse_local_time, ReplayEvent, Timeline};
