//! Snapshot encoding
//!
//! Wraps the derived state of a problem session in a versioned, self-describing
//! snapshot for downstream collaborators (hint service, UI, analytics).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::behavior::{HintSignal, UserBehaviorProfile};
use crate::error::StepwiseError;
use crate::types::{CompletionStatus, ProblemKey};
use crate::validator::StepState;
use crate::{PRODUCER_NAME, STEPWISE_VERSION};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Who produced a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Derived session state, before it is stamped by the encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContents {
    pub problem: ProblemKey,
    pub step_states: Vec<StepState>,
    pub completion: CompletionStatus,
    pub profile: UserBehaviorProfile,
    pub hint: HintSignal,
}

/// Read-only view of a problem session at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub snapshot_version: String,
    pub producer: SnapshotProducer,
    /// RFC 3339
    pub computed_at_utc: String,
    pub problem: ProblemKey,
    pub step_states: Vec<StepState>,
    pub completion: CompletionStatus,
    pub profile: UserBehaviorProfile,
    pub hint: HintSignal,
}

/// Snapshot encoder
pub struct SnapshotEncoder {
    instance_id: String,
}

impl Default for SnapshotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(&self, contents: SnapshotContents) -> SessionSnapshot {
        SessionSnapshot {
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            producer: SnapshotProducer {
                name: PRODUCER_NAME.to_string(),
                version: STEPWISE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            problem: contents.problem,
            step_states: contents.step_states,
            completion: contents.completion,
            profile: contents.profile,
            hint: contents.hint,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, contents: SnapshotContents) -> Result<String, StepwiseError> {
        let snapshot = self.encode(contents);
        serde_json::to_string_pretty(&snapshot).map_err(StepwiseError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents() -> SnapshotContents {
        SnapshotContents {
            problem: ProblemKey::new("algebra", "evaluate", "q1"),
            step_states: vec![StepState::Correct, StepState::Empty],
            completion: CompletionStatus::empty(2),
            profile: UserBehaviorProfile::empty(),
            hint: HintSignal::none(),
        }
    }

    #[test]
    fn test_encode_snapshot() {
        let encoder = SnapshotEncoder::with_instance_id("test-instance".to_string());
        let snapshot = encoder.encode(contents());

        assert_eq!(snapshot.snapshot_version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.producer.name, "stepwise");
        assert_eq!(snapshot.producer.instance_id, "test-instance");
        assert_eq!(snapshot.problem.question, "q1");
        assert!(chrono::DateTime::parse_from_rfc3339(&snapshot.computed_at_utc).is_ok());
    }

    #[test]
    fn test_encode_to_json() {
        let encoder = SnapshotEncoder::new();
        let json = encoder.encode_to_json(contents()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["snapshot_version"], "1.0.0");
        assert_eq!(parsed["step_states"][0], "correct");
        assert_eq!(parsed["profile"]["current_behavior"], "normal");
        assert_eq!(parsed["hint"]["reason"], "none");
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = SnapshotEncoder::new();
        let b = SnapshotEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }
}
