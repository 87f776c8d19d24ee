//! Raw signal extraction
//!
//! Reduces the attempts made on one step to the counts and timings the scorer works
//! from. Nothing here judges behavior; it only measures.

use crate::behavior::types::StepSignals;
use crate::config::Thresholds;
use crate::types::Attempt;

/// Keyboard rows; three or more adjacent keys in an answer look like a key roll
const KEYBOARD_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Minimum run length for key rolls and repeated characters
const MIN_RUN: usize = 3;

/// Extracts raw signals from a step's attempts
pub struct SignalExtractor;

impl SignalExtractor {
    /// Measure one step. `attempts` must all belong to the same step.
    pub fn extract(attempts: &[&Attempt], thresholds: &Thresholds) -> StepSignals {
        if attempts.is_empty() {
            return StepSignals::default();
        }

        let mut ordered: Vec<&Attempt> = attempts.to_vec();
        ordered.sort_by(|a, b| {
            a.attempt_time
                .cmp(&b.attempt_time)
                .then(a.attempt_id.cmp(&b.attempt_id))
        });

        let count = ordered.len();
        let wrong_attempts = ordered.iter().filter(|a| !a.is_correct).count();
        let total_time_secs = total_time_secs(&ordered);

        let rapid_submissions = ordered
            .windows(2)
            .filter(|pair| seconds_between(pair[0], pair[1]) < thresholds.rapid_submission_secs)
            .count();

        let random_inputs = ordered
            .iter()
            .filter(|a| !a.is_correct && looks_random(a, thresholds.random_input_ratio))
            .count();

        StepSignals {
            attempts: count,
            wrong_attempts,
            solved: wrong_attempts < count,
            total_time_secs,
            average_attempt_time_secs: total_time_secs / count as f64,
            rapid_submissions,
            random_inputs,
            sequential_guessing: has_sequential_run(&ordered),
            last_attempt_time: ordered.last().map(|a| a.attempt_time),
        }
    }
}

/// Seconds from the earliest step start (or first attempt) to the last attempt
fn total_time_secs(ordered: &[&Attempt]) -> f64 {
    let (Some(first), Some(last)) = (ordered.first(), ordered.last()) else {
        return 0.0;
    };
    let start = ordered
        .iter()
        .map(|a| a.step_start_time)
        .min()
        .unwrap_or(first.attempt_time)
        .min(first.attempt_time);
    ((last.attempt_time - start).num_milliseconds() as f64 / 1000.0).max(0.0)
}

fn seconds_between(earlier: &Attempt, later: &Attempt) -> f64 {
    (later.attempt_time - earlier.attempt_time).num_milliseconds() as f64 / 1000.0
}

/// Input much shorter than expected, a key roll, or a run of one repeated character
fn looks_random(attempt: &Attempt, ratio: f64) -> bool {
    let input = &attempt.sanitized_input;
    let input_len = input.chars().count();
    let expected_len = attempt.sanitized_expected_answer.chars().count();

    if expected_len > 0 && (input_len as f64) < ratio * expected_len as f64 {
        return true;
    }
    has_key_roll(input) || has_repeated_run(input)
}

fn has_key_roll(input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    chars.windows(MIN_RUN).any(|window| {
        let run: String = window.iter().collect();
        KEYBOARD_ROWS.iter().any(|row| row.contains(&run))
    })
}

fn has_repeated_run(input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    chars
        .windows(MIN_RUN)
        .any(|window| window.iter().all(|c| *c == window[0]))
}

/// Three consecutive attempts parse as n, n+1, n+2
fn has_sequential_run(ordered: &[&Attempt]) -> bool {
    let values: Vec<Option<i64>> = ordered
        .iter()
        .map(|a| a.sanitized_input.parse::<i64>().ok())
        .collect();
    values.windows(3).any(|w| match (w[0], w[1], w[2]) {
        (Some(a), Some(b), Some(c)) => b == a + 1 && c == b + 1,
        _ => false,
    })
}
