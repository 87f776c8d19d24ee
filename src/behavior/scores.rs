//! Behavior scoring and conflict resolution
//!
//! Each category gets an independent score in [0, 1] from the step's raw signals.
//! Overlapping categories are then reconciled so a single explanation dominates.

use std::collections::BTreeMap;

use crate::behavior::types::{BehaviorType, StepSignals};
use crate::config::Thresholds;

/// Score given to struggling-high when the step is stuck by time alone
const STUCK_SCORE: f64 = 0.65;

/// Scores per behavior category
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BehaviorScores {
    pub struggling: f64,
    pub struggling_high: f64,
    pub guessing: f64,
    pub persistent: f64,
    pub normal: f64,
}

impl BehaviorScores {
    /// Score every category from raw signals, then resolve conflicts
    pub fn from_signals(signals: &StepSignals, thresholds: &Thresholds) -> Self {
        let mut scores = Self::raw(signals, thresholds);
        scores.resolve_conflicts();
        scores
    }

    /// Independent scores before conflict resolution
    pub fn raw(signals: &StepSignals, thresholds: &Thresholds) -> Self {
        let struggling = struggling_score(signals.wrong_attempts, thresholds);
        let struggling_high = struggling_high_score(signals, thresholds);
        let guessing = guessing_score(signals);
        let persistent = persistent_score(signals, thresholds);
        let strongest = struggling
            .max(struggling_high)
            .max(guessing)
            .max(persistent);

        Self {
            struggling,
            struggling_high,
            guessing,
            persistent,
            normal: (1.0 - 1.2 * strongest).max(0.0),
        }
    }

    /// Apply the overlap rules in order:
    /// 1. strong struggling-high caps struggling at 0.3
    /// 2. guessing outscoring struggling halves struggling
    /// 3. strong persistence scales guessing to 20%
    pub fn resolve_conflicts(&mut self) {
        if self.struggling_high > 0.5 {
            self.struggling = self.struggling.min(0.3);
        }
        if self.guessing > self.struggling {
            self.struggling *= 0.5;
        }
        if self.persistent > 0.5 {
            self.guessing *= 0.2;
        }
    }

    pub fn get(&self, behavior: BehaviorType) -> f64 {
        match behavior {
            BehaviorType::Normal => self.normal,
            BehaviorType::Struggling => self.struggling,
            BehaviorType::StrugglingHigh => self.struggling_high,
            BehaviorType::Guessing => self.guessing,
            BehaviorType::Persistent => self.persistent,
        }
    }

    pub fn to_map(&self) -> BTreeMap<BehaviorType, f64> {
        BehaviorType::ALL
            .iter()
            .map(|behavior| (*behavior, self.get(*behavior)))
            .collect()
    }
}

/// Whether the step has run past the stuck threshold without being solved
pub fn is_stuck(signals: &StepSignals, thresholds: &Thresholds) -> bool {
    !signals.solved
        && signals.attempts > 0
        && signals.total_time_secs >= thresholds.stuck_time_secs
}

/// Struggling from wrong attempts
///
/// Formula: `0.7 + 0.1 × (wrong - threshold)` once the threshold is reached, capped at 1;
/// below it `0.15 × wrong`
fn struggling_score(wrong_attempts: usize, thresholds: &Thresholds) -> f64 {
    let threshold = thresholds.struggling_wrong_attempts;
    if wrong_attempts >= threshold {
        (0.7 + 0.1 * (wrong_attempts - threshold) as f64).min(1.0)
    } else {
        0.15 * wrong_attempts as f64
    }
}

fn struggling_high_score(signals: &StepSignals, thresholds: &Thresholds) -> f64 {
    if signals.wrong_attempts >= thresholds.struggling_high_wrong_attempts {
        1.0
    } else if is_stuck(signals, thresholds) {
        STUCK_SCORE
    } else {
        0.0
    }
}

/// Guessing from rapid and random-looking submissions
///
/// Formula: `0.5 × rapid_ratio + 0.5 × random_ratio (+ 0.3 for a sequential run)`, capped at 1
fn guessing_score(signals: &StepSignals) -> f64 {
    if signals.attempts < 2 {
        return 0.0;
    }
    let rapid_ratio = signals.rapid_submissions as f64 / (signals.attempts - 1) as f64;
    let random_ratio = signals.random_inputs as f64 / signals.attempts as f64;
    let sequential = if signals.sequential_guessing { 0.3 } else { 0.0 };
    (0.5 * rapid_ratio + 0.5 * random_ratio + sequential).min(1.0)
}

/// Persistence: many attempts over a sustained time
///
/// Formula: `0.6 + 0.05 × extra_attempts + 0.1 × extra_seconds / 60`, capped at 1
fn persistent_score(signals: &StepSignals, thresholds: &Thresholds) -> f64 {
    if signals.attempts < thresholds.persistent_min_attempts
        || signals.total_time_secs < thresholds.persistent_min_time_secs
    {
        return 0.0;
    }
    let extra_attempts = (signals.attempts - thresholds.persistent_min_attempts) as f64;
    let extra_secs = signals.total_time_secs - thresholds.persistent_min_time_secs;
    (0.6 + 0.05 * extra_attempts + 0.1 * extra_secs / 60.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(attempts: usize, wrong: usize, total_time_secs: f64) -> StepSignals {
        StepSignals {
            attempts,
            wrong_attempts: wrong,
            solved: wrong < attempts,
            total_time_secs,
            average_attempt_time_secs: total_time_secs / attempts.max(1) as f64,
            ..StepSignals::default()
        }
    }

    #[test]
    fn test_struggling_scale() {
        let t = Thresholds::default();
        assert!((struggling_score(2, &t) - 0.3).abs() < 0.001);
        assert!((struggling_score(3, &t) - 0.7).abs() < 0.001);
        assert!((struggling_score(4, &t) - 0.8).abs() < 0.001);
        assert!((struggling_score(9, &t) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_struggling_high_caps_struggling() {
        let t = Thresholds::default();
        let scores = BehaviorScores::from_signals(&signals(5, 5, 50.0), &t);

        assert_eq!(scores.struggling_high, 1.0);
        assert!((scores.struggling - 0.3).abs() < 0.001);
        assert_eq!(scores.normal, 0.0);
    }

    #[test]
    fn test_stuck_without_many_wrong_attempts() {
        let t = Thresholds::default();
        let stuck = signals(2, 2, 150.0);
        assert!(is_stuck(&stuck, &t));
        assert!((BehaviorScores::raw(&stuck, &t).struggling_high - STUCK_SCORE).abs() < 0.001);

        let solved = signals(2, 1, 150.0);
        assert!(!is_stuck(&solved, &t));
    }

    #[test]
    fn test_guessing_halves_struggling() {
        let t = Thresholds::default();
        let mut s = signals(4, 4, 6.0);
        s.rapid_submissions = 3;
        s.random_inputs = 4;
        let scores = BehaviorScores::from_signals(&s, &t);

        assert_eq!(scores.guessing, 1.0);
        // 0.8 halved
        assert!((scores.struggling - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_persistence_suppresses_guessing() {
        let t = Thresholds::default();
        let mut s = signals(9, 8, 90.0);
        s.rapid_submissions = 4;
        let raw = BehaviorScores::raw(&s, &t);
        // 0.6 + 0.05 * 2 + 0.1 * 60 / 60
        assert!((raw.persistent - 0.8).abs() < 0.001);

        let scores = BehaviorScores::from_signals(&s, &t);
        assert!((scores.guessing - raw.guessing * 0.2).abs() < 0.001);
    }

    #[test]
    fn test_calm_step_is_normal() {
        let t = Thresholds::default();
        let scores = BehaviorScores::from_signals(&signals(1, 0, 20.0), &t);
        assert_eq!(scores.normal, 1.0);
        assert_eq!(scores.to_map().len(), 5);
    }
}
