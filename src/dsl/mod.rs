//! Rule language for matching listing text.
//!
//! Syntax:
//!   {text}                  - text contains `text` (whitespace ignored)
//!   [>600w]                 - some number followed by `w` is > 600
//!                             (operators: > < >= <= ==)
//!   and( ... )              - every block inside matches
//!   or( ... )               - at least one block inside matches
//!   ( ... )                 - same as and( ... )
//!
//! The whole expression is an implicit `and( ... )`.

mod ast;
mod eval;
mod lexer;
mod parser;

use thiserror::Error;

pub use ast::FilterAst;
pub use eval::evaluate_filter;

use lexer::tokenize;
use parser::parse;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("literal opened with '{0}' is never closed")]
    Unterminated(char),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("expected {expected}, received {found}")]
    Expected { expected: String, found: String },
    #[error("could not parse comparison '{0}'")]
    InvalidComparison(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("tokenization error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Tokenize and parse a rule expression.
pub fn parse_filter(input: &str) -> Result<FilterAst, ExprError> {
    let tokens = tokenize(input)?;
    Ok(parse(&tokens)?)
}
