//! Attempt ledger
//!
//! Append-only record of validated submissions for one problem session. The ledger is
//! the time series the behavior classifier reads; it is cleared when the learner moves
//! to a different problem.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_DEDUP_WINDOW_MS;
use crate::normalizer::normalize;
use crate::types::{Attempt, StepLabel};

/// The most recent event seen, used for debouncing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LastEvent {
    step_index: usize,
    sanitized_input: String,
    at: DateTime<Utc>,
}

/// Append-only attempt history with per-step timers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptLedger {
    attempts: Vec<Attempt>,
    next_id: u64,
    /// Start time of every step that has been worked on and not yet solved
    step_timers: BTreeMap<usize, DateTime<Utc>>,
    last_event: Option<LastEvent>,
    dedup_window_ms: i64,
}

impl Default for AttemptLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::with_dedup_window(DEFAULT_DEDUP_WINDOW_MS)
    }

    /// Create a ledger that drops repeats closer together than `dedup_window_ms`
    pub fn with_dedup_window(dedup_window_ms: i64) -> Self {
        Self {
            attempts: Vec::new(),
            next_id: 1,
            step_timers: BTreeMap::new(),
            last_event: None,
            dedup_window_ms,
        }
    }

    /// Start timing `step_index` unless it is already being timed
    pub fn start_step_timer(&mut self, step_index: usize, at: DateTime<Utc>) {
        self.step_timers.entry(step_index).or_insert(at);
    }

    /// When work on `step_index` started, if it is being timed
    pub fn step_started_at(&self, step_index: usize) -> Option<DateTime<Utc>> {
        self.step_timers.get(&step_index).copied()
    }

    /// Record an attempt at the current time
    pub fn record(
        &mut self,
        step_index: usize,
        step_label: StepLabel,
        user_input: &str,
        is_correct: bool,
        expected_answer: &str,
        cumulative_progress: f64,
    ) -> Option<Attempt> {
        self.record_at(
            step_index,
            step_label,
            user_input,
            is_correct,
            expected_answer,
            cumulative_progress,
            Utc::now(),
        )
    }

    /// Record an attempt made at `at`.
    ///
    /// Returns `None` when the attempt repeats the previous event (same step, same
    /// normalized input) within the debounce window. A correct attempt closes the
    /// step's timer and is the only attempt carrying `time_spent_on_step`.
    #[allow(clippy::too_many_arguments)]
    pub fn record_at(
        &mut self,
        step_index: usize,
        step_label: StepLabel,
        user_input: &str,
        is_correct: bool,
        expected_answer: &str,
        cumulative_progress: f64,
        at: DateTime<Utc>,
    ) -> Option<Attempt> {
        let sanitized_input = normalize(user_input);

        let duplicate = self.last_event.as_ref().is_some_and(|last| {
            let gap = at - last.at;
            last.step_index == step_index
                && last.sanitized_input == sanitized_input
                && gap >= Duration::zero()
                && gap < Duration::milliseconds(self.dedup_window_ms)
        });
        self.last_event = Some(LastEvent {
            step_index,
            sanitized_input: sanitized_input.clone(),
            at,
        });
        if duplicate {
            debug!(step_index, "duplicate attempt ignored");
            return None;
        }

        let step_start_time = *self.step_timers.entry(step_index).or_insert(at);
        let time_spent_on_step = if is_correct {
            self.step_timers.remove(&step_index);
            Some((at - step_start_time).num_milliseconds() as f64 / 1000.0)
        } else {
            None
        };

        let attempt = Attempt {
            attempt_id: self.next_id,
            step_index,
            step_label,
            user_input: user_input.to_string(),
            sanitized_input,
            is_correct,
            expected_answer: expected_answer.to_string(),
            sanitized_expected_answer: normalize(expected_answer),
            cumulative_progress,
            step_start_time,
            attempt_time: at,
            time_spent_on_step,
        };
        self.next_id += 1;

        debug!(
            attempt_id = attempt.attempt_id,
            step_index,
            is_correct,
            "attempt recorded"
        );
        self.attempts.push(attempt.clone());
        Some(attempt)
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Attempts made on one step, oldest first
    pub fn for_step(&self, step_index: usize) -> impl Iterator<Item = &Attempt> {
        self.attempts
            .iter()
            .filter(move |a| a.step_index == step_index)
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Drop every attempt and timer; ids restart at 1
    pub fn clear(&mut self) {
        *self = Self::with_dedup_window(self.dedup_window_ms);
    }

    /// Load a ledger from JSON.
    ///
    /// The stored id counter is raised past every loaded attempt so new ids never repeat.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut ledger: Self = serde_json::from_str(json)?;
        let after_last = ledger
            .attempts
            .iter()
            .map(|a| a.attempt_id.saturating_add(1))
            .max()
            .unwrap_or(1);
        ledger.next_id = ledger.next_id.max(after_last);
        Ok(ledger)
    }

    /// Serialize the ledger to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
