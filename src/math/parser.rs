//! Linear math parser
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! equation := expr ( "=" expr )?
//! expr     := term ( ("+" | "-") term )*
//! term     := unary ( ("*" | "/") unary | power )*      -- bare `power` is implicit multiplication
//! unary    := ("-" | "+") unary | power
//! power    := primary ( ("^" | "**") unary )?           -- right associative
//! primary  := number | word | function primary | constant | variable
//!           | "(" expr ")" | "[" expr "]"
//! ```
//!
//! Nesting through groups, prefix signs, function arguments and exponents is capped at
//! [`MAX_DEPTH`], and inputs longer than [`MAX_INPUT_LEN`] are rejected up front, so every
//! tree handed to the evaluators stays shallow.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alphanumeric1, char, digit0, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    error::{Error as NomError, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use thiserror::Error;

use super::{Constant, Expr, Function};

type PResult<'a, T> = IResult<&'a str, T>;

/// Deepest nesting of groups, signs, function arguments and exponents
pub const MAX_DEPTH: usize = 64;

/// Longest input, in characters, the parser accepts
pub const MAX_INPUT_LEN: usize = 512;

/// Letter runs at least this long are read as one identifier
const MIN_WORD_LEN: usize = 3;

/// Failure to parse an answer as linear math
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected input at offset {offset}")]
    Syntax { offset: usize },

    #[error("incomplete expression")]
    Incomplete,

    #[error("expression nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("expression longer than {} characters", MAX_INPUT_LEN)]
    TooLong,
}

/// Parse a normalized answer into an expression tree
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if input.chars().count() > MAX_INPUT_LEN {
        return Err(ParseError::TooLong);
    }

    match all_consuming(equation)(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => Err(ParseError::TooDeep),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::Syntax {
            offset: input.len() - e.input.len(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::Incomplete),
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Enter one nesting level, failing hard past [`MAX_DEPTH`]
fn descend(input: &str, depth: usize) -> Result<usize, nom::Err<NomError<&str>>> {
    if depth >= MAX_DEPTH {
        Err(nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge)))
    } else {
        Ok(depth + 1)
    }
}

fn fold(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |acc, (op, rhs)| Expr::binary(op, acc, rhs))
}

fn equation(input: &str) -> PResult<Expr> {
    let (input, lhs) = expr(input, 0)?;
    let (input, rhs) = opt(preceded(ws(char('=')), |i| expr(i, 0)))(input)?;
    let parsed = match rhs {
        Some(rhs) => Expr::Equation(Box::new(lhs), Box::new(rhs)),
        None => lhs,
    };
    Ok((input, parsed))
}

fn expr(input: &str, depth: usize) -> PResult<Expr> {
    let (input, first) = term(input, depth)?;
    let (input, rest) = many0(pair(
        ws(alt((char('+'), char('-')))),
        |i| term(i, depth),
    ))(input)?;
    Ok((input, fold(first, rest)))
}

fn term(input: &str, depth: usize) -> PResult<Expr> {
    let (input, first) = unary(input, depth)?;
    let (input, rest) = many0(alt((
        pair(ws(alt((char('*'), char('/')))), |i| unary(i, depth)),
        map(|i| power(i, depth), |factor| ('*', factor)),
    )))(input)?;
    Ok((input, fold(first, rest)))
}

fn unary(input: &str, depth: usize) -> PResult<Expr> {
    let (rest, sign) = opt(ws(alt((char('-'), char('+')))))(input)?;
    let Some(sign) = sign else {
        return power(input, depth);
    };
    let inner_depth = descend(input, depth)?;
    let (rest, operand) = unary(rest, inner_depth)?;
    let parsed = match sign {
        '-' => Expr::Neg(Box::new(operand)),
        _ => operand,
    };
    Ok((rest, parsed))
}

fn power(input: &str, depth: usize) -> PResult<Expr> {
    let (input, base) = primary(input, depth)?;
    let (rest, operator) = opt(ws(alt((tag("^"), tag("**")))))(input)?;
    if operator.is_none() {
        return Ok((input, base));
    }
    let (rest, exponent) = unary(rest, descend(input, depth)?)?;
    Ok((rest, Expr::Pow(Box::new(base), Box::new(exponent))))
}

fn primary(input: &str, depth: usize) -> PResult<Expr> {
    ws(alt((
        number,
        word,
        |i| function_call(i, depth),
        constant,
        variable,
        |i| grouped(i, depth),
    )))(input)
}

fn number(input: &str) -> PResult<Expr> {
    map_res(
        recognize(alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        ))),
        |s: &str| s.parse::<f64>().map(Expr::Num),
    )(input)
}

fn function_name(input: &str) -> PResult<Function> {
    alt((
        value(Function::Sqrt, tag("sqrt")),
        value(Function::Sin, tag("sin")),
        value(Function::Cos, tag("cos")),
        value(Function::Tan, tag("tan")),
        value(Function::Ln, tag("ln")),
        value(Function::Log, tag("log")),
        value(Function::Exp, tag("exp")),
        value(Function::Abs, tag("abs")),
    ))(input)
}

fn function_call(input: &str, depth: usize) -> PResult<Expr> {
    let (rest, func) = function_name(input)?;
    let inner_depth = descend(input, depth)?;
    let (rest, argument) = alt((|i| grouped(i, inner_depth), |i| power(i, inner_depth)))(rest)?;
    Ok((rest, Expr::Func(func, Box::new(argument))))
}

fn constant(input: &str) -> PResult<Expr> {
    alt((
        value(Expr::Const(Constant::Pi), alt((tag("pi"), tag("π")))),
        value(
            Expr::Const(Constant::E),
            terminated(char('e'), not(char('_'))),
        ),
    ))(input)
}

/// Whole word such as `undefined` or `none`, kept as a single identifier.
///
/// Runs that open with a function name or `pi` are left to the other rules, so `sqrtx`
/// and `2pir` still read as products.
fn word(input: &str) -> PResult<Expr> {
    let (rest, run) = letters(input)?;
    let opens_with_name = Function::ALL.iter().any(|f| run.starts_with(f.name()))
        || run.starts_with(Constant::Pi.name())
        || run.starts_with('π');
    if run.chars().count() < MIN_WORD_LEN || opens_with_name {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Alpha)));
    }
    let (rest, subscript) = opt(subscript)(rest)?;
    let name = format!("{run}{}", subscript.unwrap_or_default());
    Ok((rest, Expr::Var(name)))
}

/// Single-letter variable with an optional alphanumeric subscript (`x`, `x_1`)
fn variable(input: &str) -> PResult<Expr> {
    map(
        recognize(pair(satisfy(char::is_alphabetic), opt(subscript))),
        |name: &str| Expr::Var(name.to_string()),
    )(input)
}

fn letters(input: &str) -> PResult<&str> {
    take_while1(char::is_alphabetic)(input)
}

fn subscript(input: &str) -> PResult<&str> {
    recognize(pair(char('_'), alphanumeric1))(input)
}

fn grouped(input: &str, depth: usize) -> PResult<Expr> {
    let (rest, open) = ws(alt((char('('), char('['))))(input)?;
    let inner_depth = descend(input, depth)?;
    let close = if open == '(' { ')' } else { ']' };
    let (rest, inner) = expr(rest, inner_depth)?;
    let (rest, _) = ws(char(close))(rest)?;
    Ok((rest, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Num(n))
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.to_string()))
    }

    #[test]
    fn test_implicit_multiplication_with_parentheses() {
        let parsed = parse("6(6)+4").unwrap();
        assert_eq!(
            parsed,
            Expr::Add(Box::new(Expr::Mul(num(6.0), num(6.0))), num(4.0))
        );
    }

    #[test]
    fn test_coefficient_binds_to_power() {
        let parsed = parse("2x^2").unwrap();
        assert_eq!(
            parsed,
            Expr::Mul(num(2.0), Box::new(Expr::Pow(var("x"), num(2.0))))
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let parsed = parse("-2^2").unwrap();
        assert_eq!(
            parsed,
            Expr::Neg(Box::new(Expr::Pow(num(2.0), num(2.0))))
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let parsed = parse("2^3^2").unwrap();
        assert_eq!(
            parsed,
            Expr::Pow(num(2.0), Box::new(Expr::Pow(num(3.0), num(2.0))))
        );
        assert_eq!(parse("2**3").unwrap(), Expr::Pow(num(2.0), num(3.0)));
    }

    #[test]
    fn test_left_to_right_division() {
        let parsed = parse("1/2x").unwrap();
        assert_eq!(
            parsed,
            Expr::Mul(Box::new(Expr::Div(num(1.0), num(2.0))), var("x"))
        );
    }

    #[test]
    fn test_functions_constants_and_subscripts() {
        assert_eq!(
            parse("sqrt(16)").unwrap(),
            Expr::Func(Function::Sqrt, num(16.0))
        );
        assert_eq!(parse("sqrt2").unwrap(), Expr::Func(Function::Sqrt, num(2.0)));
        assert_eq!(parse("pi").unwrap(), Expr::Const(Constant::Pi));
        assert_eq!(parse("x_1").unwrap(), Expr::Var("x_1".to_string()));
        assert_eq!(parse("e_1").unwrap(), Expr::Var("e_1".to_string()));
    }

    #[test]
    fn test_equation() {
        assert_eq!(
            parse("x=5").unwrap(),
            Expr::Equation(var("x"), num(5.0))
        );
    }

    #[test]
    fn test_whitespace_and_brackets() {
        assert_eq!(parse(" 3 + [4] ").unwrap(), Expr::Add(num(3.0), num(4.0)));
        assert_eq!(parse(".5").unwrap(), Expr::Num(0.5));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("").unwrap_err(), ParseError::Empty);
        assert!(matches!(parse("3+"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse("(1"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse("x_(n+1)"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse("hello!"), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_words_are_single_identifiers() {
        assert_eq!(parse("undefined").unwrap(), Expr::Var("undefined".to_string()));
        assert_eq!(parse("end").unwrap(), Expr::Var("end".to_string()));
        assert_eq!(parse("abc_1").unwrap(), Expr::Var("abc_1".to_string()));
        // two letters stay a product
        assert_eq!(parse("xy").unwrap(), Expr::Mul(var("x"), var("y")));
        assert_eq!(
            parse("2pir").unwrap(),
            Expr::Mul(
                Box::new(Expr::Mul(num(2.0), Box::new(Expr::Const(Constant::Pi)))),
                var("r")
            )
        );
        assert_eq!(parse("sqrtx").unwrap(), Expr::Func(Function::Sqrt, var("x")));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse(&shallow).unwrap(), Expr::Num(1.0));

        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(parse(&deep).unwrap_err(), ParseError::TooDeep);
        assert_eq!(parse(&format!("{}1", "-".repeat(200))).unwrap_err(), ParseError::TooDeep);
        assert_eq!(parse(&format!("2{}", "^2".repeat(200))).unwrap_err(), ParseError::TooDeep);
        assert_eq!(parse(&format!("{}2", "sqrt".repeat(100))).unwrap_err(), ParseError::TooDeep);
    }

    #[test]
    fn test_long_input_is_rejected() {
        assert_eq!(parse(&"(".repeat(10_000)).unwrap_err(), ParseError::TooLong);
        let chain = vec!["1"; 1_000].join("+");
        assert_eq!(parse(&chain).unwrap_err(), ParseError::TooLong);
    }
}
