//! Problem session orchestration
//!
//! Ties the stages together for one problem-solving session:
//!
//! edit → commit → Validator (per step) → Progress scorer → Attempt ledger
//! → Behavior classifier → Hint policy → Snapshot encoder
//!
//! [`ProblemSession`] is the stateful entry point; [`evaluate_transcript`] replays a
//! recorded JSON transcript in one shot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::behavior::{BehaviorClassifier, HintPolicy, HintSignal, UserBehaviorProfile};
use crate::config::EngineConfig;
use crate::encoder::{SessionSnapshot, SnapshotContents, SnapshotEncoder};
use crate::error::StepwiseError;
use crate::ledger::AttemptLedger;
use crate::progress::ProgressScorer;
use crate::types::{Attempt, CompletionStatus, ProblemKey, Step};
use crate::validator::{CommitKind, StepCommit, StepState, StepTracker};

/// Result of committing one line in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub commit: StepCommit,
    /// Completion after the commit
    pub completion: CompletionStatus,
    /// The ledger entry, when the commit was validated and not debounced
    pub attempt: Option<Attempt>,
}

/// Stateful session for one problem
pub struct ProblemSession {
    problem: ProblemKey,
    steps: Vec<Step>,
    tracker: StepTracker,
    ledger: AttemptLedger,
    completion: CompletionStatus,
    config: EngineConfig,
    attempts_since_hint: usize,
}

impl ProblemSession {
    /// Create a session with default configuration
    pub fn new(problem: ProblemKey, steps: Vec<Step>) -> Self {
        Self::with_config(problem, steps, EngineConfig::default())
    }

    pub fn with_config(problem: ProblemKey, steps: Vec<Step>, config: EngineConfig) -> Self {
        Self {
            tracker: StepTracker::new(steps.len()),
            ledger: AttemptLedger::with_dedup_window(config.ledger.dedup_window_ms),
            completion: CompletionStatus::empty(steps.len()),
            problem,
            steps,
            config,
            attempts_since_hint: 0,
        }
    }

    /// Switch to `problem`. Returns `true` when the identity changed and the session
    /// was reset; loading the same problem again is a no-op.
    pub fn load_problem(&mut self, problem: ProblemKey, steps: Vec<Step>) -> bool {
        if problem == self.problem {
            return false;
        }

        debug!(
            topic = %problem.topic,
            category = %problem.category,
            question = %problem.question,
            "problem changed, resetting session"
        );
        self.tracker.reset(steps.len());
        self.ledger.clear();
        self.completion = CompletionStatus::empty(steps.len());
        self.attempts_since_hint = 0;
        self.problem = problem;
        self.steps = steps;
        true
    }

    /// Transient edit of line `index`; never validates
    pub fn edit_line(&mut self, index: usize, text: &str) -> bool {
        self.edit_line_at(index, text, Utc::now())
    }

    pub fn edit_line_at(&mut self, index: usize, text: &str, at: DateTime<Utc>) -> bool {
        let accepted = self.tracker.edit(index, text);
        if accepted && !text.trim().is_empty() {
            self.ledger.start_step_timer(index, at);
        }
        accepted
    }

    /// Validate line `index` and record the attempt
    pub fn commit_line(&mut self, index: usize) -> CommitOutcome {
        self.commit_line_at(index, Utc::now())
    }

    pub fn commit_line_at(&mut self, index: usize, at: DateTime<Utc>) -> CommitOutcome {
        let commit = self.tracker.commit(index, &self.steps);

        let mut attempt = None;
        match commit.kind {
            CommitKind::Validated => {
                self.rescore();
                let step = &self.steps[index];
                let input = &self.tracker.committed_lines()[index];
                attempt = self.ledger.record_at(
                    index,
                    step.label,
                    input,
                    commit.result.is_current_step_correct,
                    &step.answer,
                    self.completion.percentage,
                    at,
                );
                if attempt.is_some() {
                    self.attempts_since_hint += 1;
                }
            }
            CommitKind::Blank => self.rescore(),
            CommitKind::AlreadyCorrect | CommitKind::OutOfRange => {}
        }

        debug!(index, kind = ?commit.kind, state = ?commit.state, "line committed");
        CommitOutcome {
            commit,
            completion: self.completion.clone(),
            attempt,
        }
    }

    /// Edit followed by commit
    pub fn submit(&mut self, index: usize, text: &str) -> CommitOutcome {
        self.submit_at(index, text, Utc::now())
    }

    pub fn submit_at(&mut self, index: usize, text: &str, at: DateTime<Utc>) -> CommitOutcome {
        self.edit_line_at(index, text, at);
        self.commit_line_at(index, at)
    }

    fn rescore(&mut self) {
        self.completion = ProgressScorer::score(
            self.tracker.committed_lines(),
            &self.steps,
            self.tracker.validated(),
        );
    }

    pub fn completion(&self) -> &CompletionStatus {
        &self.completion
    }

    /// Classify the full attempt history
    pub fn profile(&self) -> UserBehaviorProfile {
        BehaviorClassifier::classify(self.ledger.attempts(), &self.config.thresholds)
    }

    /// Whether a hint should be requested now
    pub fn hint_signal(&self) -> HintSignal {
        HintPolicy::evaluate(&self.profile(), self.attempts_since_hint, &self.config.hints)
    }

    /// Restart the attempt count used for hint cadence
    pub fn mark_hint_delivered(&mut self) {
        self.attempts_since_hint = 0;
    }

    pub fn attempts_since_hint(&self) -> usize {
        self.attempts_since_hint
    }

    pub fn problem(&self) -> &ProblemKey {
        &self.problem
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_states(&self) -> &[StepState] {
        self.tracker.states()
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Everything a snapshot carries, computed now
    pub fn snapshot_contents(&self) -> SnapshotContents {
        let profile = self.profile();
        let hint = HintPolicy::evaluate(&profile, self.attempts_since_hint, &self.config.hints);
        SnapshotContents {
            problem: self.problem.clone(),
            step_states: self.tracker.states().to_vec(),
            completion: self.completion.clone(),
            profile,
            hint,
        }
    }

    pub fn snapshot(&self, encoder: &SnapshotEncoder) -> SessionSnapshot {
        encoder.encode(self.snapshot_contents())
    }

    /// Save the attempt ledger to JSON for persistence
    pub fn save_ledger(&self) -> Result<String, StepwiseError> {
        self.ledger
            .to_json()
            .map_err(|e| StepwiseError::EncodingError(e.to_string()))
    }

    /// Restore a previously saved attempt ledger
    pub fn load_ledger(&mut self, json: &str) -> Result<(), StepwiseError> {
        self.ledger =
            AttemptLedger::from_json(json).map_err(|e| StepwiseError::ParseError(e.to_string()))?;
        Ok(())
    }
}

/// A recorded session: the problem, its steps, and every commit in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub problem: ProblemKey,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub commits: Vec<TranscriptCommit>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptCommit {
    pub step_index: usize,
    pub input: String,
    /// Commit time; the replay time is used when absent
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

impl Transcript {
    pub fn from_json(json: &str) -> Result<Self, StepwiseError> {
        serde_json::from_str(json).map_err(|e| StepwiseError::ParseError(e.to_string()))
    }
}

/// Replay a JSON transcript and return the final snapshot as JSON (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let snapshot_json = evaluate_transcript(&transcript_json)?;
/// ```
pub fn evaluate_transcript(transcript_json: &str) -> Result<String, StepwiseError> {
    evaluate_transcript_with_config(transcript_json, None)
}

/// Like [`evaluate_transcript`]; `config` takes precedence over the transcript's own
pub fn evaluate_transcript_with_config(
    transcript_json: &str,
    config: Option<EngineConfig>,
) -> Result<String, StepwiseError> {
    // Stage 1: Parse transcript
    let transcript = Transcript::from_json(transcript_json)?;
    if transcript.steps.is_empty() {
        return Err(StepwiseError::EmptyProblem(transcript.problem.question));
    }

    // Stage 2: Replay commits
    let config = config.or(transcript.config).unwrap_or_default();
    let mut session = ProblemSession::with_config(transcript.problem, transcript.steps, config);
    for commit in &transcript.commits {
        let at = commit.at.unwrap_or_else(Utc::now);
        session.submit_at(commit.step_index, &commit.input, at);
    }

    // Stage 3: Encode snapshot
    SnapshotEncoder::new().encode_to_json(session.snapshot_contents())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{BehaviorType, HintReason};
    use crate::types::StepLabel;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
    }

    fn arithmetic_problem() -> (ProblemKey, Vec<Step>) {
        (
            ProblemKey::new("arithmetic", "order-of-operations", "6(x)+4 for x=6"),
            vec![
                Step::new(StepLabel::Substitution, "6(6)+4"),
                Step::new(StepLabel::Simplification, "36+4"),
                Step::new(StepLabel::Final, "40"),
            ],
        )
    }

    fn session() -> ProblemSession {
        let (problem, steps) = arithmetic_problem();
        ProblemSession::new(problem, steps)
    }

    fn sample_transcript_json() -> &'static str {
        r#"{
            "problem": {"topic": "arithmetic", "category": "order-of-operations", "question": "q1"},
            "steps": [
                {"label": "substitution", "answer": "6(6)+4"},
                {"label": "simplification", "answer": "36+4"},
                {"label": "final", "answer": "40"}
            ],
            "commits": [
                {"step_index": 0, "input": "6(6)+4", "at": "2024-03-04T15:00:10Z"},
                {"step_index": 1, "input": "36+4", "at": "2024-03-04T15:00:20Z"},
                {"step_index": 2, "input": "40", "at": "2024-03-04T15:00:30Z"}
            ]
        }"#
    }

    #[test]
    fn test_sequential_solve_reaches_100() {
        let mut session = session();
        session.submit_at(0, "6(6)+4", t0());
        session.submit_at(1, "36+4", t0() + Duration::seconds(10));
        let outcome = session.submit_at(2, "40", t0() + Duration::seconds(20));

        assert!(outcome.commit.result.is_current_step_correct);
        assert_eq!(outcome.completion.percentage, 100.0);
        assert!(session.completion().is_complete());
        assert_eq!(session.ledger().len(), 3);
        assert_eq!(
            session.step_states(),
            &[StepState::Correct, StepState::Correct, StepState::Correct]
        );

        let attempt = outcome.attempt.unwrap();
        assert_eq!(attempt.cumulative_progress, 100.0);
    }

    #[test]
    fn test_premature_final_answer() {
        let mut session = session();
        let outcome = session.submit_at(0, "40", t0());

        assert!(!outcome.commit.result.is_current_step_correct);
        assert!(outcome.commit.result.final_answer_detected);
        assert_eq!(outcome.commit.state, StepState::Incorrect);
        assert_eq!(outcome.completion.final_answer_position, Some(0));
        assert!(!outcome.attempt.unwrap().is_correct);
    }

    #[test]
    fn test_edits_do_not_record_attempts() {
        let mut session = session();
        assert!(session.edit_line_at(0, "6", t0()));
        assert!(session.edit_line_at(0, "6(6", t0() + Duration::seconds(1)));

        assert!(session.ledger().is_empty());
        assert_eq!(session.step_states()[0], StepState::Attempted);
        // the timer started at the first keystroke
        assert_eq!(session.ledger().step_started_at(0), Some(t0()));
    }

    #[test]
    fn test_step_timer_from_first_edit() {
        let mut session = session();
        session.edit_line_at(0, "6", t0());
        let outcome = session.submit_at(0, "6(6)+4", t0() + Duration::seconds(12));

        let attempt = outcome.attempt.unwrap();
        assert_eq!(attempt.step_start_time, t0());
        assert_eq!(attempt.time_spent_on_step, Some(12.0));
    }

    #[test]
    fn test_repeat_commit_on_correct_line() {
        let mut session = session();
        session.submit_at(0, "6(6)+4", t0());
        let again = session.commit_line_at(0, t0() + Duration::seconds(5));

        assert_eq!(again.commit.kind, CommitKind::AlreadyCorrect);
        assert!(again.attempt.is_none());
        assert_eq!(session.ledger().len(), 1);
    }

    #[test]
    fn test_load_problem_resets_on_identity_change() {
        let mut session = session();
        session.submit_at(0, "41", t0());

        let (same, steps) = arithmetic_problem();
        assert!(!session.load_problem(same, steps.clone()));
        assert_eq!(session.ledger().len(), 1);

        let other = ProblemKey::new("arithmetic", "order-of-operations", "another");
        assert!(session.load_problem(other, steps));
        assert!(session.ledger().is_empty());
        assert_eq!(session.completion().percentage, 0.0);
        assert_eq!(session.step_states()[0], StepState::Empty);
        assert_eq!(session.attempts_since_hint(), 0);
    }

    #[test]
    fn test_struggling_session_requests_hint() {
        let mut session = session();
        for (i, input) in ["41", "42", "38", "45", "39"].iter().enumerate() {
            session.submit_at(2, input, t0() + Duration::seconds(10 * (i as i64 + 1)));
        }

        let profile = session.profile();
        assert_eq!(profile.current_behavior, BehaviorType::StrugglingHigh);

        let signal = session.hint_signal();
        assert!(signal.warranted);
        assert_eq!(signal.reason, HintReason::Behavior);
    }

    #[test]
    fn test_hint_cadence_resets_when_delivered() {
        let mut session = session();
        // one miss per step keeps the current behavior normal
        session.submit_at(0, "6(6)+5", t0());
        session.submit_at(1, "35+4", t0() + Duration::seconds(20));
        session.submit_at(2, "41", t0() + Duration::seconds(40));

        assert_eq!(session.attempts_since_hint(), 3);
        assert_eq!(session.hint_signal().reason, HintReason::AttemptInterval);

        session.mark_hint_delivered();
        assert!(!session.hint_signal().warranted);
    }

    #[test]
    fn test_ledger_save_and_load() {
        let mut session = session();
        session.submit_at(0, "41", t0());
        let saved = session.save_ledger().unwrap();

        let mut restored = self::session();
        restored.load_ledger(&saved).unwrap();
        assert_eq!(restored.ledger(), session.ledger());
        assert!(restored.load_ledger("not json").is_err());
    }

    #[test]
    fn test_evaluate_transcript() {
        let json = evaluate_transcript(sample_transcript_json()).unwrap();
        let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot.completion.percentage, 100.0);
        assert_eq!(snapshot.profile.total_attempts, 3);
        assert_eq!(snapshot.profile.current_behavior, BehaviorType::Normal);
        assert_eq!(snapshot.problem.question, "q1");
    }

    #[test]
    fn test_evaluate_transcript_errors() {
        assert!(matches!(
            evaluate_transcript("{}"),
            Err(StepwiseError::ParseError(_))
        ));

        let empty = r#"{"problem": {"topic": "t", "category": "c", "question": "q"}, "steps": []}"#;
        assert!(matches!(
            evaluate_transcript(empty),
            Err(StepwiseError::EmptyProblem(_))
        ));
    }
}
