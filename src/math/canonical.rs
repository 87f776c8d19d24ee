//! Structural canonical form
//!
//! Works on any expression, including ones with functions of variables that the polynomial
//! simplifier rejects. Sums and products are flattened and their operands sorted so that
//! commutative rearrangements render identically. No algebra beyond that is attempted.

use super::{format_number, Expr};

/// Render an expression with commutative operands in sorted order
pub fn canonical_form(expr: &Expr) -> String {
    match expr {
        Expr::Num(n) => format_number(*n),
        Expr::Const(c) => c.name().to_string(),
        Expr::Var(name) => name.clone(),
        Expr::Add(..) | Expr::Sub(..) => {
            let mut terms = Vec::new();
            collect_sum(expr, false, &mut terms);
            terms.sort();
            format!("add({})", terms.join(","))
        }
        Expr::Neg(inner) => {
            let inner = canonical_form(inner);
            format!("neg({inner})")
        }
        Expr::Mul(..) => {
            let mut factors = Vec::new();
            collect_product(expr, &mut factors);
            factors.sort();
            format!("mul({})", factors.join(","))
        }
        Expr::Div(l, r) => format!("div({},{})", canonical_form(l), canonical_form(r)),
        Expr::Pow(l, r) => format!("pow({},{})", canonical_form(l), canonical_form(r)),
        Expr::Func(f, arg) => format!("{}({})", f.name(), canonical_form(arg)),
        Expr::Equation(l, r) => {
            let mut sides = [canonical_form(l), canonical_form(r)];
            sides.sort();
            format!("eq({},{})", sides[0], sides[1])
        }
    }
}

/// Flatten a chain of additions and subtractions into signed terms
fn collect_sum(expr: &Expr, negated: bool, out: &mut Vec<String>) {
    match expr {
        Expr::Add(l, r) => {
            collect_sum(l, negated, out);
            collect_sum(r, negated, out);
        }
        Expr::Sub(l, r) => {
            collect_sum(l, negated, out);
            collect_sum(r, !negated, out);
        }
        Expr::Neg(inner) => collect_sum(inner, !negated, out),
        leaf => {
            let rendered = canonical_form(leaf);
            if negated {
                out.push(format!("neg({rendered})"));
            } else {
                out.push(rendered);
            }
        }
    }
}

fn collect_product(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Mul(l, r) => {
            collect_product(l, out);
            collect_product(r, out);
        }
        leaf => out.push(canonical_form(leaf)),
    }
}
