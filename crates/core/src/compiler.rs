//! Expression compiler — infix text to postfix tokens.
//!
//! Tokenizes on whitespace and the six characters `+ - * / ( )`, then runs a
//! shunting-yard translation (`* /` bind tighter than `+ -`, all
//! left-associative). Malformed input is reported as a [`CompileError`];
//! nothing here panics on user input.

use crate::error::CompileError;
use crate::task::Operator;

/// A lexical token of an infix expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A maximal run of characters that are neither whitespace nor one of
    /// the six special characters. Validated as a number during translation.
    Operand(String),
    Operator(Operator),
    Open,
    Close,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Operand(text) => write!(f, "{text}"),
            Token::Operator(op) => write!(f, "{op}"),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

/// A token of the postfix (reverse Polish) output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Postfix {
    Number(f64),
    Operator(Operator),
}

impl std::fmt::Display for Postfix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Postfix::Number(v) => write!(f, "{v}"),
            Postfix::Operator(op) => write!(f, "{op}"),
        }
    }
}

/// Compile an infix expression into postfix order.
///
/// Empty (or whitespace-only) input compiles to an empty sequence; whether
/// that is meaningful is up to the caller.
pub fn compile(text: &str) -> Result<Vec<Postfix>, CompileError> {
    to_postfix(&tokenize(text))
}

pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        let special = match c {
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            c => Operator::from_symbol(c).map(Token::Operator),
        };
        if special.is_some() || c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(Token::Operand(std::mem::take(&mut current)));
            }
            tokens.extend(special);
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Operand(current));
    }

    tokens
}

/// What the translator saw last; drives the adjacency checks.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Prev {
    Start,
    Operand,
    Operator,
    Open,
    Close,
}

enum Pending {
    Open,
    Operator(Operator),
}

pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Postfix>, CompileError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Pending> = Vec::new();
    let mut operands = 0usize;
    let mut operators = 0usize;
    let mut prev = Prev::Start;

    let unexpected = |token: &Token, position: usize| CompileError::UnexpectedToken {
        token: token.to_string(),
        position,
    };

    for (position, token) in tokens.iter().enumerate() {
        let after_value = matches!(prev, Prev::Operand | Prev::Close);
        match token {
            Token::Operand(text) => {
                if after_value {
                    return Err(unexpected(token, position));
                }
                output.push(Postfix::Number(parse_number(text)?));
                operands += 1;
                prev = Prev::Operand;
            }
            Token::Open => {
                if after_value {
                    return Err(unexpected(token, position));
                }
                stack.push(Pending::Open);
                prev = Prev::Open;
            }
            Token::Close => {
                if !after_value {
                    return Err(unexpected(token, position));
                }
                loop {
                    match stack.pop() {
                        Some(Pending::Operator(op)) => output.push(Postfix::Operator(op)),
                        Some(Pending::Open) => break,
                        None => return Err(CompileError::MismatchedParentheses),
                    }
                }
                prev = Prev::Close;
            }
            Token::Operator(op) => {
                if !after_value {
                    return Err(unexpected(token, position));
                }
                while let Some(Pending::Operator(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(Postfix::Operator(*top));
                    stack.pop();
                }
                stack.push(Pending::Operator(*op));
                operators += 1;
                prev = Prev::Operator;
            }
        }
    }

    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Operator(op) => output.push(Postfix::Operator(op)),
            Pending::Open => return Err(CompileError::MismatchedParentheses),
        }
    }

    if operators + 1 != operands {
        return Err(CompileError::OperatorCountMismatch {
            operators,
            operands,
        });
    }

    Ok(output)
}

fn parse_number(text: &str) -> Result<f64, CompileError> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CompileError::InvalidOperand(text.to_string())),
    }
}

/// Evaluate a postfix sequence directly. Returns `None` for an empty or
/// ill-formed sequence.
pub fn evaluate_postfix(postfix: &[Postfix]) -> Option<f64> {
    let mut stack = Vec::new();
    for token in postfix {
        match *token {
            Postfix::Number(v) => stack.push(v),
            Postfix::Operator(op) => {
                let right = stack.pop()?;
                let left = stack.pop()?;
                stack.push(op.apply(left, right));
            }
        }
    }
    match stack.as_slice() {
        [value] => Some(*value),
        _ => None,
    }
}
