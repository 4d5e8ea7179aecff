use std::f64::consts::{E, PI};
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use regex::Regex;

/// Upper bound on operators, parentheses and signs in one expression.
/// Parser and evaluator recursion is proportional to it.
pub const MAX_OPERATORS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Empty,
    Syntax(String),
    UnknownSymbol(String),
    UnknownFunction(String),
    DivisionByZero,
    NotFinite,
    TooComplex,
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::Syntax(detail) => write!(f, "malformed expression: {detail}"),
            Self::UnknownSymbol(name) => write!(f, "unknown symbol: {name}"),
            Self::UnknownFunction(name) => write!(f, "unknown function: {name}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::NotFinite => write!(f, "result is not a finite number"),
            Self::TooComplex => {
                write!(f, "expression has more than {MAX_OPERATORS} operators")
            }
        }
    }
}

impl std::error::Error for EvalError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Symbol(String),
    Call(String, Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Evaluates `input` and formats the result for display.
///
/// Integral results render without a fractional part (`"4"`), everything else
/// uses the shortest representation that round-trips.
pub fn evaluate(input: &str) -> Result<String, EvalError> {
    evaluate_value(input).map(format_number)
}

pub fn evaluate_value(input: &str) -> Result<f64, EvalError> {
    let rewritten = rewrite_degrees(input);
    let trimmed = rewritten.trim();
    if trimmed.is_empty() {
        return Err(EvalError::Empty);
    }
    if operator_count(trimmed) > MAX_OPERATORS {
        return Err(EvalError::TooComplex);
    }

    let (_, ast) = all_consuming(ws(expr))(trimmed)
        .map_err(|error| EvalError::Syntax(error.to_string()))?;
    let value = eval(&ast)?;
    if !value.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(value)
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // Also folds -0 into "0".
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn operator_count(input: &str) -> usize {
    input
        .chars()
        .filter(|c| matches!(c, '+' | '-' | '*' | '/' | '%' | '('))
        .count()
}

/// Rewrites `90°` to `(90*pi/180)` so degrees and radians can be mixed.
fn rewrite_degrees(input: &str) -> String {
    static DEGREES: OnceLock<Regex> = OnceLock::new();
    let pattern = DEGREES
        .get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)°").expect("degree pattern should compile"));
    pattern.replace_all(input, "(${1}*pi/180)").into_owned()
}

fn eval(node: &Expr) -> Result<f64, EvalError> {
    match node {
        Expr::Number(value) => Ok(*value),
        Expr::Symbol(name) => match name.as_str() {
            "pi" => Ok(PI),
            "e" => Ok(E),
            _ => Err(EvalError::UnknownSymbol(name.clone())),
        },
        Expr::Call(name, arg) => {
            let function = lookup_function(name)
                .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
            Ok(function(eval(arg)?))
        }
        Expr::Neg(inner) => Ok(-eval(inner)?),
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs)?;
            let b = eval(rhs)?;
            match op {
                BinaryOp::Add => Ok(a + b),
                BinaryOp::Sub => Ok(a - b),
                BinaryOp::Mul => Ok(a * b),
                BinaryOp::Div if b == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Div => Ok(a / b),
                BinaryOp::Rem if b == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Rem => Ok(floored_rem(a, b)),
                BinaryOp::Pow => Ok(a.powf(b)),
            }
        }
    }
}

// Result takes the sign of the divisor.
fn floored_rem(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn lookup_function(name: &str) -> Option<fn(f64) -> f64> {
    let function: fn(f64) -> f64 = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "arcsin" => f64::asin,
        "arccos" => f64::acos,
        "arctan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "exp" => f64::exp,
        "log" => f64::ln,
        "log10" => f64::log10,
        "sqrt" => f64::sqrt,
        "abs" => f64::abs,
        _ => return None,
    };
    Some(function)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/%")), unary))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter().fold(first, |lhs, (symbol, rhs)| {
        let op = match symbol {
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            _ => BinaryOp::Rem,
        };
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    })
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('-')), unary), |inner| {
            Expr::Neg(Box::new(inner))
        }),
        preceded(ws(char('+')), unary),
        power,
    ))(input)
}

// `**` binds tighter than unary minus on its left and is right associative.
fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(tag("**")), unary))(input)?;
    let node = match exponent {
        Some(exponent) => Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
        None => base,
    };
    Ok((input, node))
}

fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        number,
        call_or_symbol,
        delimited(char('('), expr, char(')')),
    )))(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    map_res(
        recognize(tuple((
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| text.parse::<f64>().map(Expr::Number),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn call_or_symbol(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, argument) = opt(delimited(ws(char('(')), expr, char(')')))(input)?;
    let node = match argument {
        Some(argument) => Expr::Call(name.to_string(), Box::new(argument)),
        None => Expr::Symbol(name.to_string()),
    };
    Ok((input, node))
}
