//! Symbolic simplification into expanded polynomial form
//!
//! Expressions are expanded into a sum of monomials with numeric coefficients. Two
//! expressions that expand to the same polynomial render to the same canonical string,
//! so `2(x+3)` and `2x+6` compare equal without evaluation.

use std::collections::BTreeMap;

use thiserror::Error;

use super::{format_number, Expr};

/// Coefficients below this magnitude are treated as zero
const COEFFICIENT_EPSILON: f64 = 1e-12;

/// Largest integer exponent expanded by repeated multiplication
const MAX_EXPANDED_EXPONENT: i32 = 16;

/// Guard against combinatorial blow-up while expanding products
const MAX_TERMS: usize = 512;

/// Reasons an expression cannot be brought into polynomial form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimplifyError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("division by a non-monomial polynomial")]
    NonMonomialDivisor,

    #[error("unsupported exponent")]
    UnsupportedExponent,

    #[error("function '{0}' of a symbolic argument")]
    SymbolicFunction(&'static str),

    #[error("expansion exceeds the term limit")]
    TooManyTerms,

    #[error("constant is not a finite number")]
    NonFinite,

    #[error("equation nested inside an expression")]
    NestedEquation,
}

/// Product of variables raised to non-zero integer powers, sorted by variable name
type Monomial = Vec<(String, i32)>;

/// Sum of monomials with non-zero coefficients
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, f64>,
}

impl Polynomial {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        let mut poly = Self::zero();
        poly.add_term(Vec::new(), value);
        poly
    }

    pub fn variable(name: &str) -> Self {
        let mut poly = Self::zero();
        poly.add_term(vec![(name.to_string(), 1)], 1.0);
        poly
    }

    fn add_term(&mut self, monomial: Monomial, coefficient: f64) {
        let entry = self.terms.entry(monomial).or_insert(0.0);
        *entry += coefficient;
        if entry.abs() < COEFFICIENT_EPSILON {
            self.terms.retain(|_, c| c.abs() >= COEFFICIENT_EPSILON);
        }
    }

    /// Value of a polynomial without variables
    pub fn as_constant(&self) -> Option<f64> {
        match self.terms.len() {
            0 => Some(0.0),
            1 => self.terms.get(&Vec::new()).copied(),
            _ => None,
        }
    }

    fn as_single_term(&self) -> Option<(&Monomial, f64)> {
        if self.terms.len() == 1 {
            self.terms.iter().next().map(|(m, c)| (m, *c))
        } else {
            None
        }
    }

    pub fn plus(&self, other: &Polynomial) -> Polynomial {
        let mut sum = self.clone();
        for (monomial, coefficient) in &other.terms {
            sum.add_term(monomial.clone(), *coefficient);
        }
        sum
    }

    pub fn negate(&self) -> Polynomial {
        self.scale(-1.0)
    }

    pub fn minus(&self, other: &Polynomial) -> Polynomial {
        self.plus(&other.negate())
    }

    fn scale(&self, factor: f64) -> Polynomial {
        let mut scaled = Polynomial::zero();
        for (monomial, coefficient) in &self.terms {
            scaled.add_term(monomial.clone(), coefficient * factor);
        }
        scaled
    }

    pub fn times(&self, other: &Polynomial) -> Result<Polynomial, SimplifyError> {
        let mut product = Polynomial::zero();
        for (lm, lc) in &self.terms {
            for (rm, rc) in &other.terms {
                product.add_term(multiply_monomials(lm, rm), lc * rc);
                if product.terms.len() > MAX_TERMS {
                    return Err(SimplifyError::TooManyTerms);
                }
            }
        }
        Ok(product)
    }

    /// Divide by a constant or a single monomial
    pub fn divided_by(&self, divisor: &Polynomial) -> Result<Polynomial, SimplifyError> {
        if let Some(c) = divisor.as_constant() {
            if c.abs() < COEFFICIENT_EPSILON {
                return Err(SimplifyError::DivisionByZero);
            }
            return Ok(self.scale(1.0 / c));
        }
        let inverse = divisor.reciprocal()?;
        self.times(&inverse)
    }

    fn reciprocal(&self) -> Result<Polynomial, SimplifyError> {
        let (monomial, coefficient) = self
            .as_single_term()
            .ok_or(SimplifyError::NonMonomialDivisor)?;
        let inverted: Monomial = monomial
            .iter()
            .map(|(name, exp)| (name.clone(), -exp))
            .collect();
        let mut poly = Polynomial::zero();
        poly.add_term(inverted, 1.0 / coefficient);
        Ok(poly)
    }

    /// Raise to a constant exponent
    pub fn raised_to(&self, exponent: &Polynomial) -> Result<Polynomial, SimplifyError> {
        let exponent = exponent
            .as_constant()
            .ok_or(SimplifyError::UnsupportedExponent)?;

        if let Some(base) = self.as_constant() {
            let value = base.powf(exponent);
            if !value.is_finite() {
                return Err(SimplifyError::NonFinite);
            }
            return Ok(Polynomial::constant(value));
        }

        if exponent.fract() != 0.0 || exponent.abs() > MAX_EXPANDED_EXPONENT as f64 {
            return Err(SimplifyError::UnsupportedExponent);
        }
        let n = exponent as i32;
        let base = if n < 0 { self.reciprocal()? } else { self.clone() };

        let mut result = Polynomial::constant(1.0);
        for _ in 0..n.abs() {
            result = result.times(&base)?;
        }
        Ok(result)
    }

    /// Flip the sign so the leading term is positive (used for equations)
    fn with_positive_leading_term(self) -> Polynomial {
        let leading_negative = self.ordered_terms().first().is_some_and(|(_, c)| *c < 0.0);
        if leading_negative {
            self.negate()
        } else {
            self
        }
    }

    /// Terms ordered by descending total degree, then by variables
    fn ordered_terms(&self) -> Vec<(&Monomial, f64)> {
        let mut terms: Vec<(&Monomial, f64)> = self.terms.iter().map(|(m, c)| (m, *c)).collect();
        terms.sort_by(|(a, _), (b, _)| degree(b).cmp(&degree(a)).then_with(|| a.cmp(b)));
        terms
    }

    /// Deterministic rendering; equal polynomials render identically
    pub fn to_canonical_string(&self) -> String {
        let terms = self.ordered_terms();
        if terms.is_empty() {
            return "0".to_string();
        }

        let mut out = String::new();
        for (i, (monomial, coefficient)) in terms.into_iter().enumerate() {
            let magnitude = coefficient.abs();
            if coefficient < 0.0 {
                out.push('-');
            } else if i > 0 {
                out.push('+');
            }

            let factors: Vec<String> = monomial
                .iter()
                .map(|(name, exp)| match exp {
                    1 => name.clone(),
                    _ => format!("{name}^{exp}"),
                })
                .collect();

            let coefficient_text = format_number(magnitude);
            if factors.is_empty() {
                out.push_str(&coefficient_text);
            } else if coefficient_text == "1" {
                out.push_str(&factors.join("*"));
            } else {
                out.push_str(&coefficient_text);
                out.push('*');
                out.push_str(&factors.join("*"));
            }
        }
        out
    }
}

fn degree(monomial: &Monomial) -> i32 {
    monomial.iter().map(|(_, exp)| exp).sum()
}

fn multiply_monomials(a: &Monomial, b: &Monomial) -> Monomial {
    let mut exponents: BTreeMap<String, i32> = BTreeMap::new();
    for (name, exp) in a.iter().chain(b.iter()) {
        *exponents.entry(name.clone()).or_insert(0) += exp;
    }
    exponents.into_iter().filter(|(_, exp)| *exp != 0).collect()
}

/// Expand an expression into polynomial form.
///
/// Equations are reduced to `lhs - rhs` with a positive leading coefficient.
pub fn simplify(expr: &Expr) -> Result<Polynomial, SimplifyError> {
    match expr {
        Expr::Equation(lhs, rhs) => {
            let difference = expand(lhs)?.minus(&expand(rhs)?);
            Ok(difference.with_positive_leading_term())
        }
        other => expand(other),
    }
}

fn expand(expr: &Expr) -> Result<Polynomial, SimplifyError> {
    match expr {
        Expr::Num(n) => Ok(Polynomial::constant(*n)),
        Expr::Const(c) => Ok(Polynomial::constant(c.value())),
        Expr::Var(name) => Ok(Polynomial::variable(name)),
        Expr::Neg(inner) => Ok(expand(inner)?.negate()),
        Expr::Add(l, r) => Ok(expand(l)?.plus(&expand(r)?)),
        Expr::Sub(l, r) => Ok(expand(l)?.minus(&expand(r)?)),
        Expr::Mul(l, r) => expand(l)?.times(&expand(r)?),
        Expr::Div(l, r) => expand(l)?.divided_by(&expand(r)?),
        Expr::Pow(l, r) => expand(l)?.raised_to(&expand(r)?),
        Expr::Func(f, arg) => {
            let argument = expand(arg)?
                .as_constant()
                .ok_or(SimplifyError::SymbolicFunction(f.name()))?;
            let value = f.apply(argument);
            if value.is_finite() {
                Ok(Polynomial::constant(value))
            } else {
                Err(SimplifyError::NonFinite)
            }
        }
        Expr::Equation(..) => Err(SimplifyError::NestedEquation),
    }
}
