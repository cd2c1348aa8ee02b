//! Arithmetic expressions over named parameters
//!
//! Expressions are the textual form of a theta function: `"k"`, `"0.5 * nu^2"`,
//! `"exp(-t) * sin(omega)"`. They are parsed once with nom into an [`Expression`]
//! tree and then evaluated against any [`EvaluationContext`], most commonly a
//! [`StepContext`](crate::parameters::StepContext) that exposes one step of a
//! [`ParameterSet`](crate::parameters::ParameterSet).
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | ident '(' args ')' | ident | '(' expr ')'
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of, satisfy},
    combinator::{map, peek, recognize},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Source of variable values during evaluation
pub trait EvaluationContext {
    /// Get the value of a variable
    fn get_variable(&self, name: &str) -> ExprResult<f64>;

    /// Check if a variable exists
    fn has_variable(&self, name: &str) -> bool;

    /// Get the names of all variables
    fn variable_names(&self) -> Vec<String>;
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl EvaluationContext for BTreeMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl Expression {
    /// Parse an expression from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtheta_rs::parameters::expression::Expression;
    /// use std::collections::HashMap;
    ///
    /// let expr = Expression::parse("2 * k - 1").unwrap();
    /// let mut vars = HashMap::new();
    /// vars.insert("k".to_string(), 3.0);
    /// assert_eq!(expr.evaluate(&vars).unwrap(), 5.0);
    /// ```
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expr_parser(input) {
            Ok((remainder, expr)) => {
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),

            Self::Variable(name) => context.get_variable(name),

            Self::Unary(UnaryOp::Neg, expr) => Ok(-expr.evaluate(context)?),

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;

                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
                    BinaryOp::Div => Ok(lhs / rhs),
                    BinaryOp::Pow => Ok(lhs.powf(rhs)),
                }
            }

            Self::Function(name, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<ExprResult<Vec<f64>>>()?;
                call_function(name, &values)
            }
        }
    }

    /// Find all variable names used in the expression, sorted and deduplicated
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => vars.push(name.clone()),
            Self::Unary(_, expr) => expr.collect_variables(vars),
            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

fn call_function(name: &str, args: &[f64]) -> ExprResult<f64> {
    let unary = |f: fn(f64) -> f64| -> ExprResult<f64> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(ExpressionError::InvalidOperation {
                message: format!("{}() requires 1 argument, got {}", name, args.len()),
            }),
        }
    };
    let variadic = |init: f64, f: fn(f64, f64) -> f64| -> ExprResult<f64> {
        if args.len() < 2 {
            return Err(ExpressionError::InvalidOperation {
                message: format!(
                    "{}() requires at least 2 arguments, got {}",
                    name,
                    args.len()
                ),
            });
        }
        Ok(args.iter().fold(init, |acc, &x| f(acc, x)))
    };

    match name {
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "exp" => unary(f64::exp),
        "log" | "ln" => unary(f64::ln),
        "log10" => unary(f64::log10),
        "sqrt" => unary(f64::sqrt),
        "abs" => unary(f64::abs),
        "max" => variadic(f64::NEG_INFINITY, f64::max),
        "min" => variadic(f64::INFINITY, f64::min),
        _ => Err(ExpressionError::UndefinedFunction {
            name: name.to_string(),
        }),
    }
}

// Parser functions using nom

fn sp(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

/// A single punctuation character surrounded by optional whitespace
fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    move |input| delimited(sp, char(c), sp).parse(input)
}

/// One of several operator characters surrounded by optional whitespace
fn operator<'a>(ops: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    move |input| delimited(sp, one_of(ops), sp).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

// Signs are handled by `unary`, and a leading letter is always an identifier,
// so names such as `inflow` never reach the float parser.
fn number(input: &str) -> IResult<&str, Expression> {
    preceded(
        peek(satisfy(|c: char| c.is_ascii_digit() || c == '.')),
        map(double, Expression::Number),
    )
    .parse(input)
}

fn variable(input: &str) -> IResult<&str, Expression> {
    map(identifier, |name: &str| Expression::Variable(name.to_string())).parse(input)
}

fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, _) = symbol('(')(input)?;
    let (input, args) = separated_list0(symbol(','), expr_parser).parse(input)?;
    let (input, _) = symbol(')')(input)?;
    Ok((input, Expression::Function(name.to_string(), args)))
}

fn parens(input: &str) -> IResult<&str, Expression> {
    delimited(symbol('('), expr_parser, symbol(')')).parse(input)
}

fn primary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = sp(input)?;
    alt((number, function_call, variable, parens)).parse(input)
}

fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;
    match symbol('^')(input) {
        Ok((rest, _)) => {
            let (rest, exponent) = unary(rest)?;
            Ok((
                rest,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        Err(nom::Err::Error(_)) => Ok((input, base)),
        Err(e) => Err(e),
    }
}

fn unary(input: &str) -> IResult<&str, Expression> {
    match symbol('-')(input) {
        Ok((rest, _)) => {
            let (rest, expr) = unary(rest)?;
            Ok((rest, Expression::Unary(UnaryOp::Neg, Box::new(expr))))
        }
        Err(nom::Err::Error(_)) => power(input),
        Err(e) => Err(e),
    }
}

fn term(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut acc) = unary(input)?;
    loop {
        match operator("*/")(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = unary(rest)?;
                let op = if op == '*' { BinaryOp::Mul } else { BinaryOp::Div };
                acc = Expression::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        }
    }
}

fn expr_parser(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut acc) = term(input)?;
    loop {
        match operator("+-")(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = term(rest)?;
                let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
                acc = Expression::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        }
    }
}
