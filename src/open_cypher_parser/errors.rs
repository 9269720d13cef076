use nom::error::{ContextError, ParseError as NomParseError};
use std::fmt;
use thiserror::Error;

/// Internal nom error type: a stack of (unconsumed input, context) pairs.
/// Each entry's input is a suffix of the original query text, which is how
/// [`ParseError`] later recovers line/column information.
#[derive(Debug, PartialEq)]
pub struct CypherParsingError<'a> {
    pub errors: Vec<(&'a str, &'static str)>,
}

impl<'a> CypherParsingError<'a> {
    pub fn new(input: &'a str, message: &'static str) -> Self {
        CypherParsingError {
            errors: vec![(input, message)],
        }
    }
}

impl<'a> NomParseError<&'a str> for CypherParsingError<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        CypherParsingError::new(input, "unexpected input")
    }

    fn append(input: &'a str, _kind: nom::error::ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, "unexpected input"));
        other
    }

    // Between alternatives, keep the error that consumed the most input; a
    // clause that failed mid-pattern reports better than one whose keyword
    // never matched.
    fn or(self, other: Self) -> Self {
        let self_progress = self
            .errors
            .iter()
            .map(|(rest, _)| rest.len())
            .min()
            .unwrap_or(usize::MAX);
        let other_progress = other
            .errors
            .iter()
            .map(|(rest, _)| rest.len())
            .min()
            .unwrap_or(usize::MAX);
        if self_progress <= other_progress {
            self
        } else {
            other
        }
    }
}

impl<'a> ContextError<&'a str> for CypherParsingError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, ctx));
        other
    }
}

impl fmt::Display for CypherParsingError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (input, ctx) in &self.errors {
            writeln!(f, "{}: {}", ctx, input)?;
        }
        Ok(())
    }
}

impl<'a> From<nom::error::Error<&'a str>> for CypherParsingError<'a> {
    fn from(err: nom::error::Error<&'a str>) -> Self {
        CypherParsingError::new(err.input, "unable to parse")
    }
}

/// Lift a plain nom error from a sub-parser into the clause-level error type.
pub(crate) fn adapt(err: nom::Err<nom::error::Error<&'_ str>>) -> nom::Err<CypherParsingError<'_>> {
    err.map(CypherParsingError::from)
}

/// Grammar rejection reported to the caller. Owns its data, so it outlives
/// the borrowed query text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line of the first unconsumed character.
    pub line: usize,
    /// 1-based column of the first unconsumed character.
    pub column: usize,
    pub message: String,
    /// Grammar contexts that were open at the failure point, innermost first.
    pub expected_tokens: Vec<String>,
}

impl ParseError {
    /// Build from the internal error stack. The deepest entry (the one whose
    /// tail is shortest, i.e. the parser that got furthest) anchors the
    /// reported position.
    pub(crate) fn from_parsing_error(input: &str, err: &CypherParsingError<'_>) -> Self {
        let tail = err
            .errors
            .iter()
            .map(|(rest, _)| *rest)
            .min_by_key(|rest| rest.len())
            .unwrap_or(input);
        let message = err
            .errors
            .first()
            .map(|(_, ctx)| (*ctx).to_string())
            .unwrap_or_else(|| "unable to parse".to_string());
        let expected_tokens = err
            .errors
            .iter()
            .map(|(_, ctx)| (*ctx).to_string())
            .collect();
        let (line, column) = position_of(input, tail);
        ParseError {
            line,
            column,
            message,
            expected_tokens,
        }
    }

    pub(crate) fn unexpected_trailing(input: &str, rest: &str) -> Self {
        let (line, column) = position_of(input, rest);
        ParseError {
            line,
            column,
            message: format!("unexpected tokens after query: {}", rest.trim()),
            expected_tokens: vec!["end of input".to_string()],
        }
    }

    pub(crate) fn empty_input() -> Self {
        ParseError {
            line: 1,
            column: 1,
            message: "empty query".to_string(),
            expected_tokens: vec!["a clause".to_string()],
        }
    }
}

/// Map an unconsumed suffix of `input` to a 1-based (line, column) pair.
fn position_of(input: &str, tail: &str) -> (usize, usize) {
    let offset = input.len().saturating_sub(tail.len());
    let consumed = &input[..offset.min(input.len())];
    let line = consumed.matches('\n').count() + 1;
    let column = match consumed.rfind('\n') {
        Some(pos) => consumed.len() - pos,
        None => consumed.len() + 1,
    };
    (line, column)
}
