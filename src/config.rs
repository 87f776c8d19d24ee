//! Engine configuration
//!
//! Every field has a default, and partial JSON documents override only the fields they
//! name, so `{"thresholds": {"stuck_time_secs": 90}}` is a complete configuration.

use serde::{Deserialize, Serialize};

use crate::error::StepwiseError;

/// Attempts closer together than this are "rapid" (seconds)
pub const DEFAULT_RAPID_SUBMISSION_SECS: f64 = 3.0;

/// Inputs shorter than this fraction of the expected answer look random
pub const DEFAULT_RANDOM_INPUT_RATIO: f64 = 0.3;

/// Wrong attempts on one step before struggling is scored
pub const DEFAULT_STRUGGLING_WRONG_ATTEMPTS: usize = 3;

/// Wrong attempts on one step that mean struggling-high
pub const DEFAULT_STRUGGLING_HIGH_WRONG_ATTEMPTS: usize = 5;

/// Attempts on one step before persistence is scored
pub const DEFAULT_PERSISTENT_MIN_ATTEMPTS: usize = 7;

/// Seconds on one step before persistence is scored
pub const DEFAULT_PERSISTENT_MIN_TIME_SECS: f64 = 30.0;

/// Seconds on one step without solving it before the step counts as stuck
pub const DEFAULT_STUCK_TIME_SECS: f64 = 120.0;

/// Duplicate commits closer than this are dropped (milliseconds)
pub const DEFAULT_DEDUP_WINDOW_MS: i64 = 100;

/// Attempts between hints when no behavior warrants one
pub const DEFAULT_HINT_ATTEMPT_INTERVAL: usize = 3;

/// Classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub rapid_submission_secs: f64,
    pub random_input_ratio: f64,
    pub struggling_wrong_attempts: usize,
    pub struggling_high_wrong_attempts: usize,
    pub persistent_min_attempts: usize,
    pub persistent_min_time_secs: f64,
    pub stuck_time_secs: f64,
    /// A behavior must score above this to become a step's primary behavior
    pub primary_min_score: f64,
    /// Non-primary behaviors scoring above this are reported as flags
    pub flag_min_score: f64,
    /// A primary behavior scoring above this raises a trigger
    pub trigger_min_score: f64,
    /// Triggers at or above this score are high severity
    pub high_severity_score: f64,
    /// Flags scoring above this raise a secondary trigger
    pub secondary_trigger_score: f64,
    /// Number of most recent steps that decide the current behavior
    pub recent_steps: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rapid_submission_secs: DEFAULT_RAPID_SUBMISSION_SECS,
            random_input_ratio: DEFAULT_RANDOM_INPUT_RATIO,
            struggling_wrong_attempts: DEFAULT_STRUGGLING_WRONG_ATTEMPTS,
            struggling_high_wrong_attempts: DEFAULT_STRUGGLING_HIGH_WRONG_ATTEMPTS,
            persistent_min_attempts: DEFAULT_PERSISTENT_MIN_ATTEMPTS,
            persistent_min_time_secs: DEFAULT_PERSISTENT_MIN_TIME_SECS,
            stuck_time_secs: DEFAULT_STUCK_TIME_SECS,
            primary_min_score: 0.5,
            flag_min_score: 0.3,
            trigger_min_score: 0.6,
            high_severity_score: 0.8,
            secondary_trigger_score: 0.7,
            recent_steps: 3,
        }
    }
}

/// Attempt ledger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub dedup_window_ms: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
        }
    }
}

/// Hint escalation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintConfig {
    pub attempt_interval: usize,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            attempt_interval: DEFAULT_HINT_ATTEMPT_INTERVAL,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub ledger: LedgerConfig,
    pub hints: HintConfig,
}

impl EngineConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, StepwiseError> {
        serde_json::from_str(json).map_err(|e| StepwiseError::ConfigError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StepwiseError> {
        serde_json::to_string_pretty(self).map_err(StepwiseError::JsonError)
    }
}
