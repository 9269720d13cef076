use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, char, digit1, multispace0},
    combinator::{opt, recognize},
    error::ParseError,
    multi::many0,
    sequence::{delimited, pair, terminated},
    IResult, Parser,
};

/// Reserved words (case-insensitive) that can never appear in variable
/// position. Keeps clause keywords from being swallowed as identifiers, so
/// expression parsing terminates exactly where the next clause begins.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "MATCH", "OPTIONAL", "WHERE", "RETURN", "WITH", "CREATE", "MERGE", "DELETE", "DETACH", "SET",
    "REMOVE", "UNWIND", "CALL", "YIELD", "UNION", "ORDER", "BY", "SKIP", "LIMIT", "AS", "AND",
    "OR", "XOR", "NOT", "IN", "IS", "NULL", "TRUE", "FALSE", "CASE", "WHEN", "THEN", "ELSE",
    "END", "DISTINCT", "STARTS", "ENDS", "CONTAINS", "ON", "ASC", "DESC", "ALL",
];

pub fn is_reserved_keyword(word: &str) -> bool {
    RESERVED_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(word))
}

/// Whitespace-handling combinator.
pub fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

/// Case-insensitive keyword that must end at a word boundary, so `MATCH`
/// never matches the head of `MATCHED`.
pub fn keyword<'a, E: ParseError<&'a str>>(
    kw: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = E> {
    ws(terminated(
        nom::bytes::complete::tag_no_case(kw),
        nom::combinator::not(nom::combinator::peek(alphanumeric1)),
    ))
}

// One or more alphanumerics followed by zero or more underscore-separated
// alphanumeric runs, e.g. "account", "user_id", "n1".
pub fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alphanumeric1, many0(pair(tag("_"), alphanumeric1)))).parse(input)
}

/// Numeric literal text: 123, -123, 3.14, -0.5, 1.5e10, 2E-3.
pub fn parse_numeric_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('-')),
        pair(
            alt((
                // Float: digits on both sides of the dot.
                recognize((digit1, char('.'), digit1)),
                digit1,
            )),
            opt(recognize(pair(
                alt((char('e'), char('E'))),
                pair(opt(alt((char('+'), char('-')))), digit1),
            ))),
        ),
    ))
    .parse(input)
}

/// Strip `--`, `//` and `/* */` comments, preserving the contents of single
/// quoted strings, double quoted strings, and backtick identifiers. Returns
/// an owned string, so callers strip before handing text to `parse` (the AST
/// borrows its input).
pub fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_quote: Option<char> = None;
    let mut escape_next = false;

    while let Some(ch) = chars.next() {
        if escape_next {
            result.push(ch);
            escape_next = false;
            continue;
        }
        if in_quote.is_some() && ch == '\\' {
            result.push(ch);
            escape_next = true;
            continue;
        }
        if ch == '\'' || ch == '"' || ch == '`' {
            if in_quote == Some(ch) {
                in_quote = None;
            } else if in_quote.is_none() {
                in_quote = Some(ch);
            }
            result.push(ch);
            continue;
        }
        if in_quote.is_some() {
            result.push(ch);
            continue;
        }
        // Line comments: `--` and `//`.
        if (ch == '-' && chars.peek() == Some(&'-')) || (ch == '/' && chars.peek() == Some(&'/')) {
            chars.next();
            for c in chars.by_ref() {
                if c == '\n' {
                    result.push('\n');
                    break;
                }
            }
            continue;
        }
        // Block comment: `/* ... */`.
        if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    break;
                }
            }
            continue;
        }
        result.push(ch);
    }

    result
}
