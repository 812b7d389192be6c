//! Pacing Engine
//!
//! Decides how long the replay loop waits between consecutive dispatch
//! initiations. Literal mode preserves the recorded deltas (bursts stay
//! bursts); scale mode spreads same-second bursts evenly across the
//! one-second window implied by log timestamp granularity, carrying the
//! remaining inter-second gap forward.

use crate::replay::timeline::ReplayEvent;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Preserve original inter-event deltas.
    Literal,
    /// Redistribute same-timestamp bursts evenly across their window.
    Scale,
}

/// Precomputed pacing decisions for one timeline.
///
/// Scale mode needs the count of events sharing each distinct timestamp over
/// the *whole* timeline, which is why playback cannot start until the log is
/// fully materialized.
pub struct PacingPlan {
    mode: PacingMode,
    second_repeats: HashMap<i64, u32>,
}

impl PacingPlan {
    pub fn new(events: &[ReplayEvent], mode: PacingMode) -> Self {
        let mut second_repeats = HashMap::new();
        if mode == PacingMode::Scale {
            for event in events {
                *second_repeats.entry(event.timestamp_ms).or_insert(0u32) += 1;
            }
        }
        Self {
            mode,
            second_repeats,
        }
    }

    /// Wait between dispatching `events[index]` and its successor.
    ///
    /// None means fire the next event immediately; it is also returned after
    /// the last event, and when the computed wait is non-positive (in scale
    /// mode the carried remainder can go negative when consecutive seconds
    /// sit closer than a full second apart).
    pub fn delay_after(
        &self,
        events: &[ReplayEvent],
        index: usize,
        ratio: f64,
    ) -> Option<Duration> {
        let next = events.get(index + 1)?;
        let current = &events[index];

        let wait_ms = match self.mode {
            PacingMode::Literal => {
                if current.timestamp_ms == next.timestamp_ms {
                    return None;
                }
                (next.timestamp_ms - current.timestamp_ms) as f64 / ratio
            }
            PacingMode::Scale => {
                let repeats = self
                    .second_repeats
                    .get(&current.timestamp_ms)
                    .copied()
                    .unwrap_or(1);
                let share = (1000.0 / repeats as f64).round();
                let carry = if current.timestamp_ms == next.timestamp_ms {
                    0.0
                } else {
                    (next.timestamp_ms - current.timestamp_ms - 1000) as f64
                };
                (share + carry) / ratio
            }
        };

        if wait_ms <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(wait_ms / 1000.0))
    }
}
