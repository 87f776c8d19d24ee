//! Stepwise - step-answer validation and learner-behavior classification
//!
//! Stepwise checks a learner's successive answers to a multi-step math problem,
//! scores partial completion, and classifies how the learner is working so a tutor
//! knows when to step in:
//!
//! raw input → normalization → equivalence → per-step validation → progress
//! → attempt ledger → behavior classification → hint signal
//!
//! ## Modules
//!
//! - **Validation**: [`normalizer`], [`math`], [`equivalence`], [`validator`], [`progress`]
//! - **Behavior**: [`ledger`], [`behavior`]
//! - **Sessions**: [`pipeline`], [`encoder`]

pub mod behavior;
pub mod config;
pub mod encoder;
pub mod equivalence;
pub mod error;
pub mod ledger;
pub mod math;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod types;
pub mod validator;

pub use config::{EngineConfig, HintConfig, LedgerConfig, Thresholds};
pub use error::StepwiseError;
pub use pipeline::{evaluate_transcript, evaluate_transcript_with_config, ProblemSession};

// Validation exports
pub use equivalence::{are_equivalent, are_equivalent_for_label, check_equivalence};
pub use normalizer::normalize;
pub use progress::ProgressScorer;
pub use types::{Attempt, CompletionStatus, ProblemKey, Step, StepLabel, ValidationResult};
pub use validator::{validate_step, StepTracker};

// Behavioral exports
pub use behavior::{classify, BehaviorClassifier, BehaviorType, HintPolicy, UserBehaviorProfile};
pub use ledger::AttemptLedger;

/// Stepwise version embedded in all snapshots
pub const STEPWISE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshots
pub const PRODUCER_NAME: &str = "stepwise";
