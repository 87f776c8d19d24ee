//! Completion and progress scoring
//!
//! Turns the committed lines of a problem into a 0-100 completion score. Every solved
//! step is worth an equal share of 100. Wrong but attempted steps earn a small
//! consolation share proportional to how much of the expected answer's length they cover,
//! unless the attempt is far longer than the expected answer.

use crate::normalizer::normalize;
use crate::types::{CompletionStatus, Step, ValidationResult};

/// An incorrect attempt this many characters longer than expected earns nothing
pub const MAX_CONSOLATION_EXCESS_CHARS: usize = 3;

/// Scores committed lines against a problem's steps
pub struct ProgressScorer;

impl ProgressScorer {
    /// Score the committed state of every line.
    ///
    /// `lines[i]` is the text committed for step `i` and `validated[i]` its stored result
    /// (`None` when never committed). Only committed lines count; extra lines beyond
    /// the step list are ignored.
    pub fn score(
        lines: &[String],
        steps: &[Step],
        validated: &[Option<ValidationResult>],
    ) -> CompletionStatus {
        let total_steps = steps.len();
        let mut status = CompletionStatus::empty(total_steps);
        if total_steps == 0 {
            return status;
        }

        let weight = 100.0 / total_steps as f64;
        let mut base = 0.0;
        let mut consolation = 0.0;

        for (index, step) in steps.iter().enumerate() {
            let Some(Some(result)) = validated.get(index) else {
                continue;
            };
            let user = normalize(lines.get(index).map(String::as_str).unwrap_or_default());
            if user.is_empty() {
                continue;
            }
            status.completed_steps += 1;

            if result.final_answer_detected && status.final_answer_position.is_none() {
                status.final_answer_detected = true;
                status.final_answer_position = Some(index);
            }

            if result.is_current_step_correct {
                status.correct_steps += 1;
                status.step_correctness[index] = true;
                base += weight;
            } else {
                let expected = normalize(&step.answer);
                consolation += Self::consolation(
                    weight,
                    user.chars().count(),
                    expected.chars().count(),
                );
            }
        }

        status.base_progress = round2(base).min(100.0);
        status.consolation_progress = round2(consolation);
        status.percentage = round2(status.base_progress + status.consolation_progress).min(100.0);
        status
    }

    /// Partial credit for a wrong answer of `user_len` characters.
    ///
    /// `per_char = weight / expected_len / 2`, credit = `per_char × min(user_len, expected_len)`,
    /// so a wrong step never earns more than half its weight.
    fn consolation(weight: f64, user_len: usize, expected_len: usize) -> f64 {
        if expected_len == 0 || user_len > expected_len + MAX_CONSOLATION_EXCESS_CHARS {
            return 0.0;
        }
        let per_char = weight / expected_len as f64 / 2.0;
        per_char * user_len.min(expected_len) as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepLabel;
    use crate::validator::validate_step;
    use proptest::prelude::*;

    fn arithmetic_steps() -> Vec<Step> {
        vec![
            Step::new(StepLabel::Substitution, "6(6)+4"),
            Step::new(StepLabel::Simplification, "36+4"),
            Step::new(StepLabel::Final, "40"),
        ]
    }

    /// Commit `inputs` line by line and score the result
    fn score_inputs(inputs: &[&str], steps: &[Step]) -> CompletionStatus {
        let lines: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        let validated: Vec<Option<ValidationResult>> = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                Some(validate_step(input, &steps[i].answer, steps[i].label, i, steps))
            })
            .collect();
        ProgressScorer::score(&lines, steps, &validated)
    }

    #[test]
    fn test_full_solve_is_100_percent() {
        let steps = arithmetic_steps();
        let status = score_inputs(&["6(6)+4", "36+4", "40"], &steps);

        assert_eq!(status.percentage, 100.0);
        assert_eq!(status.base_progress, 100.0);
        assert_eq!(status.consolation_progress, 0.0);
        assert_eq!(status.correct_steps, 3);
        assert_eq!(status.step_correctness, vec![true, true, true]);
        assert!(status.is_complete());
        assert!(status.final_answer_detected);
    }

    #[test]
    fn test_consolation_for_wrong_attempt() {
        let steps = arithmetic_steps();
        let status = score_inputs(&["6(6)+4", "35+4"], &steps);

        // base: 33.33; consolation: (33.33 / 4 / 2) * 4 = 16.67
        assert!((status.base_progress - 33.33).abs() < 0.001);
        assert!((status.consolation_progress - 16.67).abs() < 0.001);
        assert!((status.percentage - 50.0).abs() < 0.001);
        assert_eq!(status.completed_steps, 2);
        assert_eq!(status.correct_steps, 1);
    }

    #[test]
    fn test_overlong_wrong_answer_earns_nothing() {
        let steps = arithmetic_steps();
        // "40" expected, 6 characters is 4 over
        let status = score_inputs(&["6(6)+4", "36+4", "123456"], &steps);
        assert!((status.consolation_progress - 0.0).abs() < 0.001);

        // exactly 3 over still earns credit
        let status = score_inputs(&["6(6)+4", "36+4", "12345"], &steps);
        assert!(status.consolation_progress > 0.0);
    }

    #[test]
    fn test_premature_final_is_located() {
        let steps = arithmetic_steps();
        let status = score_inputs(&["40"], &steps);

        assert_eq!(status.correct_steps, 0);
        assert!(status.final_answer_detected);
        assert_eq!(status.final_answer_position, Some(0));
    }

    #[test]
    fn test_uncommitted_lines_do_not_count() {
        let steps = arithmetic_steps();
        let lines = vec!["6(6)+4".to_string(), "36+4".to_string(), String::new()];
        let validated = vec![None, None, None];
        let status = ProgressScorer::score(&lines, &steps, &validated);

        assert_eq!(status.percentage, 0.0);
        assert_eq!(status.completed_steps, 0);
    }

    #[test]
    fn test_no_steps() {
        let status = ProgressScorer::score(&[], &[], &[]);
        assert_eq!(status, CompletionStatus::empty(0));
    }

    proptest! {
        #[test]
        fn prop_progress_bounds(inputs in proptest::collection::vec("[0-9()+]{0,12}", 0..=3)) {
            let steps = arithmetic_steps();
            let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            let status = score_inputs(&refs, &steps);

            prop_assert!((0.0..=100.0).contains(&status.base_progress));
            prop_assert!((0.0..=100.0).contains(&status.consolation_progress));
            prop_assert!((0.0..=100.0).contains(&status.percentage));
            prop_assert!(
                (status.percentage - (status.base_progress + status.consolation_progress)).abs() < 0.011
            );
        }

        #[test]
        fn prop_scoring_is_idempotent(inputs in proptest::collection::vec("[0-9()+]{0,12}", 0..=3)) {
            let steps = arithmetic_steps();
            let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            prop_assert_eq!(score_inputs(&refs, &steps), score_inputs(&refs, &steps));
        }
    }
}
