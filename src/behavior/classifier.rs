//! Behavior classification
//!
//! Pipeline: attempts → group by step → raw signals → scores → conflict resolution
//! → primary behavior and flags → triggers → session-wide current behavior.
//!
//! Classification is a pure function of the attempt history and thresholds; the
//! profile is rebuilt from scratch on every call.

use std::collections::BTreeMap;

use tracing::trace;

use crate::behavior::scores::{is_stuck, BehaviorScores};
use crate::behavior::signals::SignalExtractor;
use crate::behavior::types::{
    BehaviorType, Severity, StepBehaviorAnalysis, Trigger, UserBehaviorProfile,
};
use crate::config::Thresholds;
use crate::types::{Attempt, StepLabel};

/// Classify with default thresholds
pub fn classify(attempts: &[Attempt]) -> UserBehaviorProfile {
    BehaviorClassifier::classify(attempts, &Thresholds::default())
}

/// Classifies learner behavior from an attempt history
pub struct BehaviorClassifier;

impl BehaviorClassifier {
    pub fn classify(attempts: &[Attempt], thresholds: &Thresholds) -> UserBehaviorProfile {
        if attempts.is_empty() {
            return UserBehaviorProfile::empty();
        }

        let mut by_step: BTreeMap<usize, Vec<&Attempt>> = BTreeMap::new();
        for attempt in attempts {
            by_step.entry(attempt.step_index).or_default().push(attempt);
        }

        let step_behaviors: BTreeMap<usize, StepBehaviorAnalysis> = by_step
            .iter()
            .map(|(step_index, step_attempts)| {
                (
                    *step_index,
                    Self::analyze_step(*step_index, step_attempts, thresholds),
                )
            })
            .collect();

        let active_triggers = step_behaviors
            .iter()
            .flat_map(|(step_index, analysis)| triggers_for(*step_index, analysis, thresholds))
            .collect();

        let total_attempts = attempts.len();
        let correct = attempts.iter().filter(|a| a.is_correct).count();
        let total_time: f64 = step_behaviors.values().map(|s| s.total_time).sum();

        let struggling_steps = step_behaviors
            .iter()
            .filter(|(_, s)| {
                s.is_stuck
                    || matches!(
                        s.primary_behavior,
                        BehaviorType::Struggling | BehaviorType::StrugglingHigh
                    )
            })
            .map(|(step_index, _)| *step_index)
            .collect();

        UserBehaviorProfile {
            current_behavior: current_behavior(&step_behaviors, thresholds.recent_steps),
            active_triggers,
            overall_accuracy: correct as f64 / total_attempts as f64,
            average_time_per_attempt: total_time / total_attempts as f64,
            total_attempts,
            struggling_steps,
            step_behaviors,
        }
    }

    fn analyze_step(
        step_index: usize,
        attempts: &[&Attempt],
        thresholds: &Thresholds,
    ) -> StepBehaviorAnalysis {
        let signals = SignalExtractor::extract(attempts, thresholds);
        let scores = BehaviorScores::from_signals(&signals, thresholds);
        trace!(step_index, ?signals, ?scores, "step scored");

        let primary_behavior = primary_behavior(&scores, thresholds.primary_min_score);
        let behavior_flags = BehaviorType::ALL
            .iter()
            .copied()
            .filter(|b| {
                !b.is_normal()
                    && *b != primary_behavior
                    && scores.get(*b) > thresholds.flag_min_score
            })
            .collect();

        StepBehaviorAnalysis {
            step_label: attempts
                .last()
                .map_or(StepLabel::Math, |a| a.step_label),
            primary_behavior,
            behavior_flags,
            attempts: signals.attempts,
            wrong_attempts: signals.wrong_attempts,
            total_time: signals.total_time_secs,
            average_attempt_time: signals.average_attempt_time_secs,
            is_stuck: is_stuck(&signals, thresholds),
            behavior_scores: scores.to_map(),
            last_attempt_time: signals.last_attempt_time,
        }
    }
}

/// Highest-scoring non-normal behavior above `min_score`; ties go to the higher priority
fn primary_behavior(scores: &BehaviorScores, min_score: f64) -> BehaviorType {
    BehaviorType::ALL
        .iter()
        .copied()
        .filter(|b| !b.is_normal())
        .map(|b| (b, scores.get(b)))
        .filter(|(_, score)| *score > min_score)
        .min_by(|(a, score_a), (b, score_b)| {
            score_b
                .total_cmp(score_a)
                .then(a.priority().cmp(&b.priority()))
        })
        .map_or(BehaviorType::Normal, |(behavior, _)| behavior)
}

fn severity_for(score: f64, thresholds: &Thresholds) -> Severity {
    if score >= thresholds.high_severity_score {
        Severity::High
    } else if score >= thresholds.trigger_min_score {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn triggers_for(
    step_index: usize,
    analysis: &StepBehaviorAnalysis,
    thresholds: &Thresholds,
) -> Vec<Trigger> {
    let mut triggers = Vec::new();

    let primary = analysis.primary_behavior;
    let primary_score = analysis.score(primary);
    if !primary.is_normal() && primary_score > thresholds.trigger_min_score {
        triggers.push(Trigger {
            step_index,
            behavior: primary,
            severity: severity_for(primary_score, thresholds),
            score: primary_score,
            secondary: false,
        });
    }

    for flag in &analysis.behavior_flags {
        let score = analysis.score(*flag);
        if score > thresholds.secondary_trigger_score {
            triggers.push(Trigger {
                step_index,
                behavior: *flag,
                severity: severity_for(score, thresholds),
                score,
                secondary: true,
            });
        }
    }

    triggers
}

/// Vote over the most recently active steps; the latest counts double.
///
/// The most voted non-normal behavior wins; a tie or no votes means normal.
fn current_behavior(
    steps: &BTreeMap<usize, StepBehaviorAnalysis>,
    recent: usize,
) -> BehaviorType {
    let mut ordered: Vec<(usize, &StepBehaviorAnalysis)> =
        steps.iter().map(|(index, s)| (*index, s)).collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        a.last_attempt_time
            .cmp(&b.last_attempt_time)
            .then(ia.cmp(ib))
    });

    let recent_steps: Vec<&StepBehaviorAnalysis> = ordered
        .iter()
        .rev()
        .take(recent)
        .map(|(_, s)| *s)
        .collect();

    let mut votes: BTreeMap<BehaviorType, usize> = BTreeMap::new();
    for (position, step) in recent_steps.iter().enumerate() {
        if step.primary_behavior.is_normal() {
            continue;
        }
        let weight = if position == 0 { 2 } else { 1 };
        *votes.entry(step.primary_behavior).or_insert(0) += weight;
    }

    let Some(top) = votes.values().copied().max() else {
        return BehaviorType::Normal;
    };
    let mut leaders = votes.iter().filter(|(_, count)| **count == top);
    match (leaders.next(), leaders.next()) {
        (Some((behavior, _)), None) => *behavior,
        _ => BehaviorType::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()
    }

    /// Attempts on one step at the given second offsets
    fn step_attempts(
        step_index: usize,
        first_id: u64,
        expected: &str,
        inputs: &[(&str, bool, i64)],
        start: DateTime<Utc>,
    ) -> Vec<Attempt> {
        inputs
            .iter()
            .enumerate()
            .map(|(i, (input, correct, offset_ms))| Attempt {
                attempt_id: first_id + i as u64,
                step_index,
                step_label: StepLabel::Substitution,
                user_input: input.to_string(),
                sanitized_input: input.to_string(),
                is_correct: *correct,
                expected_answer: expected.to_string(),
                sanitized_expected_answer: expected.to_string(),
                cumulative_progress: 0.0,
                step_start_time: start,
                attempt_time: start + Duration::milliseconds(*offset_ms),
                time_spent_on_step: None,
            })
            .collect()
    }

    fn struggling_attempts() -> Vec<Attempt> {
        step_attempts(
            0,
            1,
            "40",
            &[
                ("41", false, 10_000),
                ("42", false, 20_000),
                ("38", false, 30_000),
                ("45", false, 40_000),
                ("39", false, 50_000),
            ],
            t0(),
        )
    }

    fn guessing_attempts() -> Vec<Attempt> {
        step_attempts(
            0,
            1,
            "6(6)+4",
            &[
                ("1", false, 1_000),
                ("2", false, 2_500),
                ("3", false, 4_000),
                ("5", false, 5_500),
            ],
            t0(),
        )
    }

    #[test]
    fn test_empty_history() {
        let profile = classify(&[]);
        assert_eq!(profile, UserBehaviorProfile::empty());
        assert_eq!(profile.current_behavior, BehaviorType::Normal);
        assert_eq!(profile.total_attempts, 0);
        assert!(profile.active_triggers.is_empty());
    }

    #[test]
    fn test_struggling_classification() {
        let profile = classify(&struggling_attempts());
        let step = &profile.step_behaviors[&0];

        assert_eq!(step.primary_behavior, BehaviorType::StrugglingHigh);
        assert_eq!(step.wrong_attempts, 5);
        assert!((step.score(BehaviorType::Struggling) - 0.3).abs() < 0.001);
        assert_eq!(profile.current_behavior, BehaviorType::StrugglingHigh);
        assert_eq!(profile.struggling_steps, vec![0]);
        assert_eq!(profile.overall_accuracy, 0.0);
        assert!((profile.average_time_per_attempt - 10.0).abs() < 0.001);

        assert_eq!(profile.active_triggers.len(), 1);
        let trigger = &profile.active_triggers[0];
        assert_eq!(trigger.behavior, BehaviorType::StrugglingHigh);
        assert_eq!(trigger.severity, Severity::High);
        assert!(!trigger.secondary);
    }

    #[test]
    fn test_struggling_across_more_than_a_minute() {
        // five misses about 10s apart, ending 62s after the step opened
        let attempts = step_attempts(
            0,
            1,
            "40",
            &[
                ("41", false, 22_000),
                ("42", false, 32_000),
                ("38", false, 42_000),
                ("45", false, 52_000),
                ("39", false, 62_000),
            ],
            t0(),
        );
        let profile = classify(&attempts);
        let step = &profile.step_behaviors[&0];

        assert!(step.total_time > 60.0);
        assert!(!step.is_stuck);
        assert!(matches!(
            step.primary_behavior,
            BehaviorType::Struggling | BehaviorType::StrugglingHigh
        ));
        assert!(!profile.active_triggers.is_empty());
        assert_eq!(profile.struggling_steps, vec![0]);
    }

    #[test]
    fn test_primary_tie_goes_to_higher_priority() {
        let scores = BehaviorScores {
            struggling: 0.7,
            guessing: 0.7,
            ..BehaviorScores::default()
        };
        assert_eq!(primary_behavior(&scores, 0.5), BehaviorType::Struggling);
        assert_eq!(primary_behavior(&scores, 0.7), BehaviorType::Normal);
    }

    #[test]
    fn test_guessing_classification() {
        let profile = classify(&guessing_attempts());
        let step = &profile.step_behaviors[&0];

        // all gaps under 3s, every input under 30% of the expected length, plus 1-2-3
        assert_eq!(step.primary_behavior, BehaviorType::Guessing);
        assert_eq!(step.score(BehaviorType::Guessing), 1.0);
        // struggling 0.8 halved because guessing outscores it
        assert!((step.score(BehaviorType::Struggling) - 0.4).abs() < 0.001);
        assert_eq!(step.behavior_flags, vec![BehaviorType::Struggling]);
        assert_eq!(profile.current_behavior, BehaviorType::Guessing);

        assert_eq!(profile.active_triggers.len(), 1);
        assert_eq!(profile.active_triggers[0].severity, Severity::High);
    }

    #[test]
    fn test_steady_solve_is_normal() {
        let attempts = step_attempts(0, 1, "40", &[("40", true, 15_000)], t0());
        let profile = classify(&attempts);

        assert_eq!(profile.current_behavior, BehaviorType::Normal);
        assert_eq!(profile.step_behaviors[&0].primary_behavior, BehaviorType::Normal);
        assert_eq!(profile.overall_accuracy, 1.0);
        assert!(profile.active_triggers.is_empty());
        assert!(profile.struggling_steps.is_empty());
    }

    #[test]
    fn test_secondary_trigger_for_strong_flag() {
        // 7 wrong rapid attempts after a long pause: struggling-high primary, persistent flag
        let attempts = step_attempts(
            0,
            1,
            "6(6)+4",
            &[
                ("1", false, 120_000),
                ("2", false, 121_000),
                ("3", false, 122_000),
                ("4", false, 123_000),
                ("5", false, 124_000),
                ("6", false, 125_000),
                ("7", false, 126_000),
            ],
            t0(),
        );
        let profile = classify(&attempts);
        let step = &profile.step_behaviors[&0];

        assert_eq!(step.primary_behavior, BehaviorType::StrugglingHigh);
        assert!(step.behavior_flags.contains(&BehaviorType::Persistent));
        let secondary: Vec<&Trigger> = profile
            .active_triggers
            .iter()
            .filter(|t| t.secondary)
            .collect();
        assert!(!secondary.is_empty());
        assert!(secondary.iter().all(|t| t.score > 0.7));
    }

    #[test]
    fn test_current_behavior_weights_latest_step() {
        let mut attempts = struggling_attempts();
        // step 1 afterwards: guessing
        attempts.extend(step_attempts(
            1,
            10,
            "6(6)+4",
            &[
                ("1", false, 1_000),
                ("2", false, 2_500),
                ("3", false, 4_000),
                ("5", false, 5_500),
            ],
            t0() + Duration::seconds(120),
        ));

        let profile = classify(&attempts);
        // one vote for struggling-high, two for the latest guessing step
        assert_eq!(profile.current_behavior, BehaviorType::Guessing);
    }

    #[test]
    fn test_current_behavior_tie_is_normal() {
        let mut attempts = guessing_attempts();
        attempts.extend(step_attempts(
            1,
            10,
            "40",
            &[("40", true, 5_000)],
            t0() + Duration::seconds(60),
        ));
        attempts.extend(step_attempts(
            2,
            20,
            "40",
            &[
                ("41", false, 10_000),
                ("42", false, 20_000),
                ("38", false, 30_000),
                ("45", false, 40_000),
                ("39", false, 50_000),
            ],
            t0() - Duration::seconds(300),
        ));

        // recency order: step 2 (oldest), step 0, step 1 (latest, normal)
        // guessing 1 vote, struggling-high 1 vote: tie
        let profile = classify(&attempts);
        assert_eq!(profile.current_behavior, BehaviorType::Normal);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let attempts = struggling_attempts();
        assert_eq!(classify(&attempts), classify(&attempts));
    }
}
