//! Lexer/tokenizer for the filter rule language.

use std::fmt;

use winnow::combinator::{alt, delimited};
use winnow::prelude::*;
use winnow::token::take_till;

use super::TokenizeError;

/// Token types for the rule language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    OpenParen,  // (
    CloseParen, // )
    And,        // and
    Or,         // or

    /// Verbatim body of a `{...}` literal.
    MatchLiteral(String),
    /// Verbatim body of a `[...]` literal.
    ComparisonLiteral(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenParen => write!(f, "'('"),
            Token::CloseParen => write!(f, "')'"),
            Token::And => write!(f, "'and'"),
            Token::Or => write!(f, "'or'"),
            Token::MatchLiteral(text) => write!(f, "'{{{text}}}'"),
            Token::ComparisonLiteral(text) => write!(f, "'[{text}]'"),
        }
    }
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Lex a `{...}` body, closed by the first `}`.
fn lex_match(input: &mut &str) -> PResult<Token> {
    delimited('{', take_till(0.., '}'), '}')
        .map(|body: &str| Token::MatchLiteral(body.to_string()))
        .parse_next(input)
}

/// Lex a `[...]` body, closed by the first `]`.
fn lex_comparison(input: &mut &str) -> PResult<Token> {
    delimited('[', take_till(0.., ']'), ']')
        .map(|body: &str| Token::ComparisonLiteral(body.to_string()))
        .parse_next(input)
}

/// Lex a single token. Leading whitespace must already be stripped.
fn lex_token(input: &mut &str) -> PResult<Token> {
    alt((
        "(".value(Token::OpenParen),
        ")".value(Token::CloseParen),
        // Keywords are prefix matches, `andy` lexes as `and` + `y`
        "and".value(Token::And),
        "or".value(Token::Or),
        lex_match,
        lex_comparison,
    ))
    .parse_next(input)
}

/// Tokenize a whole rule expression.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut remaining = input.trim();
    let mut tokens = Vec::new();

    while let Some(first) = remaining.chars().next() {
        match lex_token(&mut remaining) {
            Ok(tok) => tokens.push(tok),
            Err(_) => {
                return Err(match first {
                    '{' | '[' => TokenizeError::Unterminated(first),
                    other => TokenizeError::UnexpectedChar(other),
                });
            }
        }
        remaining = remaining.trim_start();
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_and_literals() {
        let tokens = tokenize("and({a}or{b})").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::And,
                Token::OpenParen,
                Token::MatchLiteral("a".into()),
                Token::Or,
                Token::MatchLiteral("b".into()),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_whitespace_between_tokens_is_dropped() {
        let tokens = tokenize("  or ( [ >600 w ]  { 650 w } )  ").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Or,
                Token::OpenParen,
                Token::ComparisonLiteral(" >600 w ".into()),
                Token::MatchLiteral(" 650 w ".into()),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_literal_ends_at_first_closer() {
        let tokens = tokenize("{a{b}").unwrap();
        assert_eq!(tokens, vec![Token::MatchLiteral("a{b".into())]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(tokenize("and(x)"), Err(TokenizeError::UnexpectedChar('x')));
        assert_eq!(tokenize("andy"), Err(TokenizeError::UnexpectedChar('y')));
    }

    #[test]
    fn test_unterminated_literal() {
        assert_eq!(tokenize("{rgb"), Err(TokenizeError::Unterminated('{')));
        assert_eq!(tokenize("({a} [>5w"), Err(TokenizeError::Unterminated('[')));
    }
}
