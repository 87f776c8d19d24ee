//! Equivalence validation
//!
//! Decides whether a learner's answer denotes the same value or step as the expected
//! answer. Comparison strategies run in a fixed order; each either decides (`Some`) or
//! defers to the next one (`None`). The final literal comparison always decides, so the
//! chain never fails.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::{canonical_form, evaluate, parse, simplify};
use crate::normalizer::normalize;
use crate::types::StepLabel;

/// Absolute tolerance for numeric comparison
pub const NUMERIC_TOLERANCE: f64 = 1e-10;

/// A comparison strategy: `Some(verdict)` when it can decide, `None` to defer
type Strategy = fn(&str, &str) -> Option<bool>;

/// Which comparison decided the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalencePhase {
    Normalized,
    Numeric,
    Symbolic,
    Structural,
    Synonym,
    Literal,
}

/// Verdict plus the phase that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceReport {
    pub equivalent: bool,
    pub phase: EquivalencePhase,
}

const MATH_STRATEGIES: &[(EquivalencePhase, Strategy)] = &[
    (EquivalencePhase::Normalized, normalized_match),
    (EquivalencePhase::Numeric, numeric_match),
    (EquivalencePhase::Symbolic, symbolic_match),
    (EquivalencePhase::Structural, structural_match),
];

const TEXT_STRATEGIES: &[(EquivalencePhase, Strategy)] =
    &[(EquivalencePhase::Synonym, synonym_match)];

/// Accepted spellings for yes/no answers
const SYNONYMS: &[&[&str]] = &[&["yes", "y", "true", "t"], &["no", "n", "false", "f"]];

/// Whether two math answers are equivalent
pub fn are_equivalent(user: &str, expected: &str) -> bool {
    check_equivalence(user, expected).equivalent
}

/// Compare two answers the way a step with `label` is compared
pub fn are_equivalent_for_label(user: &str, expected: &str, label: StepLabel) -> bool {
    check_equivalence_for_label(user, expected, label).equivalent
}

/// Run the math strategy chain and report which phase decided
pub fn check_equivalence(user: &str, expected: &str) -> EquivalenceReport {
    run_chain(MATH_STRATEGIES, user, expected)
}

/// Run the strategy chain appropriate for `label`.
///
/// Text steps skip every math phase and compare through the synonym table instead.
pub fn check_equivalence_for_label(
    user: &str,
    expected: &str,
    label: StepLabel,
) -> EquivalenceReport {
    if label.is_math() {
        run_chain(MATH_STRATEGIES, user, expected)
    } else {
        run_chain(TEXT_STRATEGIES, user, expected)
    }
}

fn run_chain(
    strategies: &[(EquivalencePhase, Strategy)],
    user: &str,
    expected: &str,
) -> EquivalenceReport {
    for (phase, strategy) in strategies {
        if let Some(equivalent) = strategy(user, expected) {
            debug!(?phase, equivalent, "equivalence decided");
            return EquivalenceReport {
                equivalent,
                phase: *phase,
            };
        }
    }

    let equivalent = literal_match(user, expected);
    debug!(phase = ?EquivalencePhase::Literal, equivalent, "equivalence decided");
    EquivalenceReport {
        equivalent,
        phase: EquivalencePhase::Literal,
    }
}

fn normalized_match(user: &str, expected: &str) -> Option<bool> {
    (normalize(user) == normalize(expected)).then_some(true)
}

/// Both sides evaluate to finite numbers within tolerance
fn numeric_match(user: &str, expected: &str) -> Option<bool> {
    let a = evaluate(&parse(&normalize(user)).ok()?).ok()?;
    let b = evaluate(&parse(&normalize(expected)).ok()?).ok()?;
    Some((a - b).abs() < NUMERIC_TOLERANCE)
}

/// Both sides expand to the same polynomial
fn symbolic_match(user: &str, expected: &str) -> Option<bool> {
    let a = simplify(&parse(&normalize(user)).ok()?).ok()?;
    let b = simplify(&parse(&normalize(expected)).ok()?).ok()?;
    Some(a.to_canonical_string() == b.to_canonical_string())
}

/// Both sides parse to the same tree up to operand order
fn structural_match(user: &str, expected: &str) -> Option<bool> {
    let a = parse(&normalize(user)).ok()?;
    let b = parse(&normalize(expected)).ok()?;
    Some(canonical_form(&a) == canonical_form(&b))
}

fn synonym_match(user: &str, expected: &str) -> Option<bool> {
    let (a, b) = (normalize(user), normalize(expected));
    if a == b {
        return Some(true);
    }
    let group_of = |word: &str| SYNONYMS.iter().position(|group| group.contains(&word));
    match (group_of(a.as_str()), group_of(b.as_str())) {
        (Some(x), Some(y)) => Some(x == y),
        _ => None,
    }
}

/// Raw inputs with whitespace removed, case-insensitive
fn literal_match(user: &str, expected: &str) -> bool {
    let squash = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    };
    squash(user) == squash(expected)
}
