//! Numeric evaluation of expression trees

use thiserror::Error;

use super::Expr;

/// Reasons an expression has no single numeric value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("free variable '{0}'")]
    FreeVariable(String),

    #[error("equations have no numeric value")]
    Equation,

    #[error("result is not a finite number")]
    NonFinite,
}

/// Evaluate an expression to a finite number
pub fn evaluate(expr: &Expr) -> Result<f64, EvalError> {
    let value = eval_node(expr)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

fn eval_node(expr: &Expr) -> Result<f64, EvalError> {
    let value = match expr {
        Expr::Num(n) => *n,
        Expr::Const(c) => c.value(),
        Expr::Var(name) => return Err(EvalError::FreeVariable(name.clone())),
        Expr::Neg(inner) => -eval_node(inner)?,
        Expr::Add(l, r) => eval_node(l)? + eval_node(r)?,
        Expr::Sub(l, r) => eval_node(l)? - eval_node(r)?,
        Expr::Mul(l, r) => eval_node(l)? * eval_node(r)?,
        Expr::Div(l, r) => eval_node(l)? / eval_node(r)?,
        Expr::Pow(l, r) => eval_node(l)?.powf(eval_node(r)?),
        Expr::Func(f, arg) => f.apply(eval_node(arg)?),
        Expr::Equation(..) => return Err(EvalError::Equation),
    };
    Ok(value)
}
