//! Step validation state machine
//!
//! [`validate_step`] checks one input against one declared step and applies the ordering
//! rule: the problem's final answer typed on an earlier line is rejected unless it is
//! literally that line's own expected answer. [`StepTracker`] holds the per-line state
//! (`empty → attempted → correct | incorrect`) and only validates on an explicit commit.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::equivalence::are_equivalent_for_label;
use crate::normalizer::normalize;
use crate::types::{Step, StepLabel, ValidationResult};

/// Validate `user_input` against the step at `step_index`.
///
/// `all_steps` is the problem's full step list; it supplies the final answer for the
/// premature-final check. An empty list disables that check. An index outside a
/// non-empty list yields the all-false result.
pub fn validate_step(
    user_input: &str,
    expected_answer: &str,
    step_label: StepLabel,
    step_index: usize,
    all_steps: &[Step],
) -> ValidationResult {
    let sanitized = normalize(user_input);
    if sanitized.is_empty() {
        return ValidationResult::default();
    }

    let Some(last) = all_steps.last() else {
        let correct = are_equivalent_for_label(user_input, expected_answer, step_label);
        return ValidationResult {
            mathematically_correct: correct,
            positionally_valid: correct,
            final_answer_detected: false,
            is_current_step_correct: correct,
        };
    };

    if step_index >= all_steps.len() {
        warn!(step_index, steps = all_steps.len(), "step index out of range");
        return ValidationResult::default();
    }

    let last_index = all_steps.len() - 1;
    let final_answer_detected = are_equivalent_for_label(user_input, &last.answer, last.label);
    let direct_match = sanitized == normalize(expected_answer);
    let premature_final = step_index < last_index && final_answer_detected && !direct_match;

    let mathematically_correct =
        !premature_final && are_equivalent_for_label(user_input, expected_answer, step_label);

    let result = ValidationResult {
        mathematically_correct,
        positionally_valid: mathematically_correct && !premature_final,
        final_answer_detected,
        is_current_step_correct: (step_index == last_index && final_answer_detected)
            || (mathematically_correct && !premature_final),
    };

    debug!(
        step_index,
        premature_final,
        correct = result.is_current_step_correct,
        "step validated"
    );
    result
}

/// Lifecycle of one answer line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    #[default]
    Empty,
    /// Text entered but not yet (re)validated
    Attempted,
    /// Terminal
    Correct,
    Incorrect,
}

/// What a commit did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
    /// The line was validated and its state updated
    Validated,
    /// The line was already correct; the stored result is returned unchanged
    AlreadyCorrect,
    /// The line is blank; nothing was validated
    Blank,
    /// No step exists at this index
    OutOfRange,
}

/// Result of committing one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommit {
    pub kind: CommitKind,
    pub result: ValidationResult,
    pub state: StepState,
}

/// Per-line state for one problem, sized to its step count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTracker {
    /// Text currently in each line, committed or not
    drafts: Vec<String>,
    /// Text as of the last commit of each line
    committed: Vec<String>,
    states: Vec<StepState>,
    validated: Vec<Option<ValidationResult>>,
}

impl StepTracker {
    pub fn new(step_count: usize) -> Self {
        Self {
            drafts: vec![String::new(); step_count],
            committed: vec![String::new(); step_count],
            states: vec![StepState::Empty; step_count],
            validated: vec![None; step_count],
        }
    }

    /// Discard every line and resize for a new problem
    pub fn reset(&mut self, step_count: usize) {
        *self = Self::new(step_count);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Record a transient edit. Returns `false` when the line is locked or missing.
    pub fn edit(&mut self, index: usize, text: &str) -> bool {
        let Some(state) = self.states.get_mut(index) else {
            warn!(index, "edit on missing line ignored");
            return false;
        };
        if *state == StepState::Correct {
            return false;
        }

        *state = if text.trim().is_empty() {
            StepState::Empty
        } else {
            StepState::Attempted
        };
        self.drafts[index] = text.to_string();
        true
    }

    /// Validate the current draft of line `index` against `steps`
    pub fn commit(&mut self, index: usize, steps: &[Step]) -> StepCommit {
        let step = match steps.get(index) {
            Some(step) if index < self.len() => step,
            _ => {
                warn!(index, steps = steps.len(), "commit on missing step");
                return StepCommit {
                    kind: CommitKind::OutOfRange,
                    result: ValidationResult::default(),
                    state: StepState::Empty,
                };
            }
        };

        if self.states[index] == StepState::Correct {
            return StepCommit {
                kind: CommitKind::AlreadyCorrect,
                result: self.validated[index].unwrap_or_default(),
                state: StepState::Correct,
            };
        }

        let draft = self.drafts[index].clone();
        if normalize(&draft).is_empty() {
            self.states[index] = StepState::Empty;
            self.committed[index].clear();
            self.validated[index] = None;
            return StepCommit {
                kind: CommitKind::Blank,
                result: ValidationResult::default(),
                state: StepState::Empty,
            };
        }

        let result = validate_step(&draft, &step.answer, step.label, index, steps);
        let state = if result.is_current_step_correct {
            StepState::Correct
        } else {
            StepState::Incorrect
        };
        self.states[index] = state;
        self.committed[index] = draft;
        self.validated[index] = Some(result);

        StepCommit {
            kind: CommitKind::Validated,
            result,
            state,
        }
    }

    pub fn state(&self, index: usize) -> Option<StepState> {
        self.states.get(index).copied()
    }

    pub fn states(&self) -> &[StepState] {
        &self.states
    }

    pub fn draft(&self, index: usize) -> Option<&str> {
        self.drafts.get(index).map(String::as_str)
    }

    /// Committed text per line (empty when never committed)
    pub fn committed_lines(&self) -> &[String] {
        &self.committed
    }

    pub fn validated(&self) -> &[Option<ValidationResult>] {
        &self.validated
    }
}
