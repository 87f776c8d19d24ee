//! Core data types
//!
//! This module defines the problem, validation, progress and attempt types that flow
//! through the step validation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of answer a step expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLabel {
    Substitution,
    Simplification,
    Final,
    Math,
    Text,
}

impl StepLabel {
    /// Whether answers for this step are compared as mathematics
    pub fn is_math(self) -> bool {
        !matches!(self, StepLabel::Text)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepLabel::Substitution => "substitution",
            StepLabel::Simplification => "simplification",
            StepLabel::Final => "final",
            StepLabel::Math => "math",
            StepLabel::Text => "text",
        }
    }
}

/// One labeled sub-answer of a multi-step problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step kind
    pub label: StepLabel,
    /// Expected answer as authored in the problem content
    pub answer: String,
}

impl Step {
    pub fn new(label: StepLabel, answer: impl Into<String>) -> Self {
        Self {
            label,
            answer: answer.into(),
        }
    }
}

/// Identity of the problem a session is working on.
///
/// A change of any field means the learner moved to a different problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemKey {
    pub topic: String,
    pub category: String,
    pub question: String,
}

impl ProblemKey {
    pub fn new(
        topic: impl Into<String>,
        category: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            category: category.into(),
            question: question.into(),
        }
    }
}

/// Two-phase validation result for one (input, step index) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Input matches the step's expected answer (after the premature-final check)
    pub mathematically_correct: bool,
    /// Correct and not entered ahead of the steps it depends on
    pub positionally_valid: bool,
    /// Input is equivalent to the problem's final answer, wherever it was typed
    pub final_answer_detected: bool,
    /// The step counts as solved
    pub is_current_step_correct: bool,
}

/// Progress over all steps of the active problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionStatus {
    /// Number of declared steps
    pub total_steps: usize,
    /// Number of committed, non-empty lines
    pub completed_steps: usize,
    /// Number of lines whose step is solved
    pub correct_steps: usize,
    /// Overall completion (0-100, two decimals)
    pub percentage: f64,
    /// Credit from solved steps
    pub base_progress: f64,
    /// Partial credit from attempted but incorrect steps
    pub consolation_progress: f64,
    /// Per-step solved flags
    pub step_correctness: Vec<bool>,
    /// Whether any committed line matched the final answer
    pub final_answer_detected: bool,
    /// First line index at which the final answer was detected
    pub final_answer_position: Option<usize>,
}

impl CompletionStatus {
    /// Zeroed status for a problem with `total_steps` steps
    pub fn empty(total_steps: usize) -> Self {
        Self {
            total_steps,
            completed_steps: 0,
            correct_steps: 0,
            percentage: 0.0,
            base_progress: 0.0,
            consolation_progress: 0.0,
            step_correctness: vec![false; total_steps],
            final_answer_detected: false,
            final_answer_position: None,
        }
    }

    /// All declared steps are solved
    pub fn is_complete(&self) -> bool {
        self.total_steps > 0 && self.correct_steps == self.total_steps
    }
}

/// One validated submission, as recorded in the attempt ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Strictly increasing within a ledger
    pub attempt_id: u64,
    pub step_index: usize,
    pub step_label: StepLabel,
    /// Raw text as committed
    pub user_input: String,
    /// Normalized form of `user_input`
    pub sanitized_input: String,
    pub is_correct: bool,
    pub expected_answer: String,
    pub sanitized_expected_answer: String,
    /// Completion percentage after this attempt
    pub cumulative_progress: f64,
    /// When work on this step started
    pub step_start_time: DateTime<Utc>,
    /// When this attempt was committed
    pub attempt_time: DateTime<Utc>,
    /// Seconds spent on the step; only set on the attempt that solved it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_on_step: Option<f64>,
}
