//! nom-based parser for the supported openCypher subset.
//!
//! `parse` turns query text into the typed, borrowed AST in [`ast`]. The
//! parser is deterministic (same input, same AST), case-insensitive on
//! keywords, and surfaces failures as [`ParseError`] with line/column and the
//! grammar contexts that were open at the failure point. It never recovers or
//! falls back; degraded translation strategies belong to callers.

use nom::{branch::alt, combinator::map, combinator::opt, multi::many1, IResult, Parser};

pub mod ast;
mod call_clause;
mod common;
mod create_clause;
mod delete_clause;
mod display;
pub(crate) mod errors;
mod expression;
mod match_clause;
mod merge_clause;
mod order_by_and_page_clause;
mod path_pattern;
mod remove_clause;
mod return_clause;
mod set_clause;
mod unwind_clause;
mod where_clause;
mod with_clause;

pub use common::strip_comments;
pub use errors::ParseError;

use ast::{Clause, Query, UnionBranch};
use common::keyword;
use errors::CypherParsingError;

/// Parse a complete Cypher statement into an AST borrowing from `input`.
pub fn parse(input: &str) -> Result<Query<'_>, ParseError> {
    log::debug!("parsing cypher statement ({} bytes)", input.len());

    if input.trim().is_empty() {
        return Err(ParseError::empty_input());
    }

    match parse_statement(input) {
        Ok((rest, query)) => {
            if rest.trim().is_empty() {
                Ok(query)
            } else {
                Err(ParseError::unexpected_trailing(input, rest))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(ParseError::from_parsing_error(input, &e))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::empty_input()),
    }
}

/// Statement = clause+ (UNION [ALL] clause+)* [;]
fn parse_statement(input: &'_ str) -> IResult<&'_ str, Query<'_>, CypherParsingError<'_>> {
    let (input, clauses) = many1(parse_clause).parse(input)?;
    let (input, unions) = nom::multi::many0(parse_union_branch).parse(input)?;
    let (input, _) = opt(common::ws(nom::character::complete::char(';'))).parse(input)?;

    Ok((input, Query { clauses, unions }))
}

fn parse_union_branch(
    input: &'_ str,
) -> IResult<&'_ str, UnionBranch<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("UNION").parse(input)?;
    let (input, all) = opt(keyword("ALL")).parse(input)?;
    let (input, clauses) = many1(parse_clause).parse(input)?;

    Ok((
        input,
        UnionBranch {
            all: all.is_some(),
            query: Query {
                clauses,
                unions: vec![],
            },
        },
    ))
}

fn parse_clause(input: &'_ str) -> IResult<&'_ str, Clause<'_>, CypherParsingError<'_>> {
    alt((
        map(match_clause::parse_match_clause, Clause::Match),
        map(with_clause::parse_with_clause, Clause::With),
        map(return_clause::parse_return_clause, Clause::Return),
        map(create_clause::parse_create_clause, Clause::Create),
        map(merge_clause::parse_merge_clause, Clause::Merge),
        map(unwind_clause::parse_unwind_clause, Clause::Unwind),
        map(call_clause::parse_call_clause, Clause::Call),
        map(delete_clause::parse_delete_clause, Clause::Delete),
        map(set_clause::parse_set_clause, Clause::Set),
        map(remove_clause::parse_remove_clause, Clause::Remove),
    ))
    .parse(input)
}
