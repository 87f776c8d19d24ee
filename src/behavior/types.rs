//! Behavior classification types
//!
//! Categories, severities, triggers, and the per-step and per-session analyses the
//! classifier produces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::StepLabel;

/// Learner behavior categories
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorType {
    #[default]
    Normal,
    Struggling,
    StrugglingHigh,
    Guessing,
    Persistent,
}

impl BehaviorType {
    /// Every category, in tie-break priority order (normal last)
    pub const ALL: [BehaviorType; 5] = [
        BehaviorType::StrugglingHigh,
        BehaviorType::Struggling,
        BehaviorType::Guessing,
        BehaviorType::Persistent,
        BehaviorType::Normal,
    ];

    pub fn is_normal(self) -> bool {
        self == BehaviorType::Normal
    }

    /// Short human-readable name
    pub fn label(self) -> &'static str {
        match self {
            BehaviorType::Normal => "Normal",
            BehaviorType::Struggling => "Struggling",
            BehaviorType::StrugglingHigh => "Struggling (high)",
            BehaviorType::Guessing => "Guessing",
            BehaviorType::Persistent => "Persistent",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BehaviorType::Normal => "Working through the problem at a steady pace",
            BehaviorType::Struggling => "Several wrong attempts on the same step",
            BehaviorType::StrugglingHigh => {
                "Many wrong attempts, or a long time on one step without progress"
            }
            BehaviorType::Guessing => "Rapid or random-looking answers",
            BehaviorType::Persistent => "Many deliberate attempts over a sustained period",
        }
    }

    /// Tone a hint should take for this behavior
    pub fn hint_tone(self) -> &'static str {
        match self {
            BehaviorType::Normal => "none",
            BehaviorType::Struggling => "guided",
            BehaviorType::StrugglingHigh => "worked-example",
            BehaviorType::Guessing => "slow-down",
            BehaviorType::Persistent => "encouraging",
        }
    }

    /// Severity of the behavior itself, independent of any score
    pub fn severity(self) -> Severity {
        match self {
            BehaviorType::Normal | BehaviorType::Persistent => Severity::Low,
            BehaviorType::Struggling | BehaviorType::Guessing => Severity::Medium,
            BehaviorType::StrugglingHigh => Severity::High,
        }
    }

    /// Position in tie-break order; lower wins
    pub(crate) fn priority(self) -> usize {
        Self::ALL.iter().position(|b| *b == self).unwrap_or(Self::ALL.len())
    }
}

/// Trigger severity, ordered `Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A behavior strong enough to warrant intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub step_index: usize,
    pub behavior: BehaviorType,
    pub severity: Severity,
    pub score: f64,
    /// Raised by a flag rather than the step's primary behavior
    pub secondary: bool,
}

/// Raw signals extracted from one step's attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSignals {
    pub attempts: usize,
    pub wrong_attempts: usize,
    pub solved: bool,
    /// Seconds from step start to the last attempt
    pub total_time_secs: f64,
    /// Mean seconds per attempt, counting the first from step start
    pub average_attempt_time_secs: f64,
    /// Consecutive attempt pairs closer than the rapid threshold
    pub rapid_submissions: usize,
    /// Incorrect attempts that look like random input
    pub random_inputs: usize,
    /// Three consecutive attempts were n, n+1, n+2
    pub sequential_guessing: bool,
    pub last_attempt_time: Option<DateTime<Utc>>,
}

/// Classification of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepBehaviorAnalysis {
    pub step_label: StepLabel,
    pub primary_behavior: BehaviorType,
    pub behavior_flags: Vec<BehaviorType>,
    pub attempts: usize,
    pub wrong_attempts: usize,
    /// Seconds
    pub total_time: f64,
    /// Seconds
    pub average_attempt_time: f64,
    pub is_stuck: bool,
    /// Final score of every category, in [0, 1]
    pub behavior_scores: BTreeMap<BehaviorType, f64>,
    pub last_attempt_time: Option<DateTime<Utc>>,
}

impl StepBehaviorAnalysis {
    pub fn score(&self, behavior: BehaviorType) -> f64 {
        self.behavior_scores.get(&behavior).copied().unwrap_or(0.0)
    }
}

/// Session-wide classification, recomputed from the full attempt history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserBehaviorProfile {
    pub current_behavior: BehaviorType,
    pub active_triggers: Vec<Trigger>,
    pub step_behaviors: BTreeMap<usize, StepBehaviorAnalysis>,
    /// Correct attempts over all attempts (0 when there are none)
    pub overall_accuracy: f64,
    /// Seconds
    pub average_time_per_attempt: f64,
    pub total_attempts: usize,
    pub struggling_steps: Vec<usize>,
}

impl UserBehaviorProfile {
    /// Profile for an empty attempt history
    pub fn empty() -> Self {
        Self::default()
    }

    /// Most severe active trigger
    pub fn highest_severity(&self) -> Option<Severity> {
        self.active_triggers.iter().map(|t| t.severity).max()
    }
}
