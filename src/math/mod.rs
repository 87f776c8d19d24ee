//! Expression engine
//!
//! Parses normalized linear math into an [`Expr`] tree and offers three independent
//! ways of reducing it to something comparable:
//!
//! - [`evaluate`]: numeric value (fails on free variables)
//! - [`simplify`]: expanded polynomial canonical form (fails on non-polynomial input)
//! - [`canonical_form`]: structural representation with commutative operands sorted

pub mod canonical;
pub mod eval;
pub mod parser;
pub mod simplify;

pub use canonical::canonical_form;
pub use eval::{evaluate, EvalError};
pub use parser::{parse, ParseError};
pub use simplify::{simplify, Polynomial, SimplifyError};

/// Named functions understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Ln,
    Log,
    Exp,
    Abs,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::Sqrt,
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Ln,
        Function::Log,
        Function::Exp,
        Function::Abs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Ln => "ln",
            Function::Log => "log",
            Function::Exp => "exp",
            Function::Abs => "abs",
        }
    }

    /// Apply the function to a numeric argument
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sqrt => x.sqrt(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Ln => x.ln(),
            Function::Log => x.log10(),
            Function::Exp => x.exp(),
            Function::Abs => x.abs(),
        }
    }
}

/// Named constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "e",
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Const(Constant),
    Var(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(Function, Box<Expr>),
    /// Top-level `lhs = rhs`
    Equation(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Build a binary node from an operator character
    pub(crate) fn binary(op: char, lhs: Expr, rhs: Expr) -> Expr {
        let (l, r) = (Box::new(lhs), Box::new(rhs));
        match op {
            '+' => Expr::Add(l, r),
            '-' => Expr::Sub(l, r),
            '/' => Expr::Div(l, r),
            '^' => Expr::Pow(l, r),
            _ => Expr::Mul(l, r),
        }
    }
}

/// Render a float without noise from binary rounding (10 significant decimals)
pub(crate) fn format_number(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == 0.0 {
        // avoids "-0"
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(40.0), "40");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.5), "-2.5");
    }
}
