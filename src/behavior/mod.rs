//! Learner behavior classification
//!
//! Reads the attempt ledger and explains how the learner is working: struggling,
//! guessing, persisting, or progressing normally.
//!
//! Pipeline: Attempts → Signals → Scores → Conflict resolution → Profile → Hint policy

pub mod classifier;
pub mod hints;
pub mod scores;
pub mod signals;
pub mod types;

pub use classifier::{classify, BehaviorClassifier};
pub use hints::{HintPolicy, HintReason, HintSignal};
pub use scores::BehaviorScores;
pub use signals::SignalExtractor;
pub use types::{
    BehaviorType, Severity, StepBehaviorAnalysis, StepSignals, Trigger, UserBehaviorProfile,
};
