//! Parser for the filter rule language.
//!
//! Grammar (in rough EBNF):
//!
//! start      = block*                   (implicitly wrapped in `and( ... )`)
//! block      = "(" block* ")"
//!            | "and" "(" block* ")"
//!            | "or" "(" block* ")"
//!            | MATCH_LITERAL
//!            | COMPARISON_LITERAL
//!
//! There is no precedence: every group is spelled out with parentheses.

use winnow::ascii::digit1;
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::take_while;

use super::ParseError;
use super::ast::{CompareOp, Comparison, FilterAst, Threshold, UnitPattern};
use super::lexer::Token;

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Cursor over an immutable token slice.
struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        TokenCursor { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn remaining(&self) -> &'a [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn expect_open(&mut self, after: &Token) -> Result<(), ParseError> {
        match self.advance() {
            Some(Token::OpenParen) => Ok(()),
            Some(other) => Err(ParseError::Expected {
                expected: format!("'(' after {after}"),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEnd {
                expected: format!("'(' after {after}"),
            }),
        }
    }

    /// Parse the implicit top-level group. A stray `)` closes it early.
    fn parse_top(&mut self) -> Result<FilterAst, ParseError> {
        let mut children = Vec::new();
        while let Some(tok) = self.peek() {
            if *tok == Token::CloseParen {
                self.advance();
                break;
            }
            children.push(self.parse_block()?);
        }
        Ok(FilterAst::And(children))
    }

    /// Parse blocks up to and including the `)` closing the current group.
    fn parse_items(&mut self) -> Result<Vec<FilterAst>, ParseError> {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some(Token::CloseParen) => {
                    self.advance();
                    return Ok(children);
                }
                Some(_) => children.push(self.parse_block()?),
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        expected: "')'".into(),
                    });
                }
            }
        }
    }

    fn parse_block(&mut self) -> Result<FilterAst, ParseError> {
        let Some(tok) = self.advance() else {
            return Err(ParseError::UnexpectedEnd {
                expected: "expression".into(),
            });
        };

        match tok {
            Token::OpenParen => Ok(FilterAst::And(self.parse_items()?)),
            Token::And => {
                self.expect_open(tok)?;
                Ok(FilterAst::And(self.parse_items()?))
            }
            Token::Or => {
                self.expect_open(tok)?;
                Ok(FilterAst::Or(self.parse_items()?))
            }
            Token::MatchLiteral(text) => Ok(FilterAst::matching(text)),
            Token::ComparisonLiteral(text) => parse_comparison(text).map(FilterAst::Compare),
            Token::CloseParen => Err(ParseError::Expected {
                expected: "expression".into(),
                found: tok.to_string(),
            }),
        }
    }
}

fn lex_op(input: &mut &str) -> PResult<CompareOp> {
    alt((
        // Multi-char operators first
        ">=".value(CompareOp::Ge),
        "<=".value(CompareOp::Le),
        "==".value(CompareOp::Eq),
        ">".value(CompareOp::Gt),
        "<".value(CompareOp::Lt),
    ))
    .parse_next(input)
}

/// `OP DIGITS ('.' DIGITS)? UNIT`. Anything after the unit is ignored.
fn lex_comparison<'i>(
    input: &mut &'i str,
) -> PResult<(CompareOp, &'i str, Option<&'i str>, &'i str)> {
    (
        lex_op,
        digit1,
        opt(preceded('.', digit1)),
        take_while(0.., |c: char| !c.is_ascii_digit()),
    )
        .parse_next(input)
}

/// Parse the body of a `[...]` literal, e.g. `>600w` or `<=2.5 tb`.
pub fn parse_comparison(text: &str) -> Result<Comparison, ParseError> {
    let invalid = || ParseError::InvalidComparison(text.to_string());

    let mut input = text.trim();
    let (op, whole, fraction, unit) = lex_comparison(&mut input).map_err(|_| invalid())?;

    let threshold = match fraction {
        // Integers past i64 still compare fine as floats
        None => match whole.parse::<i64>() {
            Ok(n) => Threshold::Integer(n),
            Err(_) => Threshold::Float(whole.parse().map_err(|_| invalid())?),
        },
        Some(fraction) => Threshold::Float(
            format!("{whole}.{fraction}")
                .parse()
                .map_err(|_| invalid())?,
        ),
    };
    let unit = UnitPattern::new(unit).map_err(|_| invalid())?;

    Ok(Comparison {
        op,
        threshold,
        unit,
    })
}

/// Parse a token stream into an AST rooted at `And`.
pub fn parse(tokens: &[Token]) -> Result<FilterAst, ParseError> {
    let mut parser = TokenCursor::new(tokens);
    let ast = parser.parse_top()?;

    let trailing = parser.remaining();
    if !trailing.is_empty() {
        tracing::warn!(
            "Ignoring {} token(s) after the closing ')' of the expression",
            trailing.len()
        );
    }

    Ok(ast)
}
