use nom::{IResult, Parser};

use super::ast::CreateClause;
use super::common::keyword;
use super::errors::CypherParsingError;
use super::match_clause::parse_pattern_list;

pub fn parse_create_clause(
    input: &'_ str,
) -> IResult<&'_ str, CreateClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("CREATE").parse(input)?;
    let (input, patterns) = parse_pattern_list(input)?;
    Ok((input, CreateClause { patterns }))
}
