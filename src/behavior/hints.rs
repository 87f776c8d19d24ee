//! Hint escalation policy
//!
//! Decides *when* a hint is warranted. Producing the hint itself is left to an external
//! collaborator.

use serde::{Deserialize, Serialize};

use crate::behavior::types::{BehaviorType, Severity, UserBehaviorProfile};
use crate::config::HintConfig;

/// Why a hint is (or is not) warranted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintReason {
    /// The learner's current behavior calls for help
    Behavior,
    /// Enough attempts have passed since the last hint
    AttemptInterval,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintSignal {
    pub warranted: bool,
    pub reason: HintReason,
    pub behavior: BehaviorType,
    pub severity: Severity,
}

impl HintSignal {
    pub fn none() -> Self {
        Self {
            warranted: false,
            reason: HintReason::None,
            behavior: BehaviorType::Normal,
            severity: Severity::Low,
        }
    }
}

pub struct HintPolicy;

impl HintPolicy {
    /// Evaluate whether to request a hint now.
    ///
    /// A non-normal current behavior always warrants one; otherwise a hint is due once
    /// `attempt_interval` attempts have passed since the last one.
    pub fn evaluate(
        profile: &UserBehaviorProfile,
        attempts_since_last_hint: usize,
        config: &HintConfig,
    ) -> HintSignal {
        let behavior = profile.current_behavior;

        if !behavior.is_normal() {
            let severity = profile
                .active_triggers
                .iter()
                .filter(|t| t.behavior == behavior)
                .map(|t| t.severity)
                .max()
                .unwrap_or_else(|| behavior.severity());
            return HintSignal {
                warranted: true,
                reason: HintReason::Behavior,
                behavior,
                severity,
            };
        }

        if config.attempt_interval > 0 && attempts_since_last_hint >= config.attempt_interval {
            return HintSignal {
                warranted: true,
                reason: HintReason::AttemptInterval,
                behavior,
                severity: Severity::Low,
            };
        }

        HintSignal::none()
    }
}
