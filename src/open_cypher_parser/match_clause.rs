use nom::{
    character::complete::char,
    combinator::opt,
    multi::separated_list1,
    IResult, Parser,
};

use super::ast::{MatchClause, Pattern};
use super::common::{keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::path_pattern::parse_pattern;
use super::where_clause::parse_where_clause;

pub fn parse_match_clause(
    input: &'_ str,
) -> IResult<&'_ str, MatchClause<'_>, CypherParsingError<'_>> {
    let (input, optional) = opt(keyword("OPTIONAL")).parse(input)?;
    let (input, _) = keyword("MATCH").parse(input)?;

    let (input, patterns) = parse_pattern_list(input)?;
    let (input, where_clause) = opt(parse_where_clause).parse(input)?;

    Ok((
        input,
        MatchClause {
            optional: optional.is_some(),
            patterns,
            where_clause,
        },
    ))
}

pub(crate) fn parse_pattern_list(
    input: &'_ str,
) -> IResult<&'_ str, Vec<Pattern<'_>>, CypherParsingError<'_>> {
    separated_list1(ws(char(',')), parse_pattern)
        .parse(input)
        .map_err(adapt)
}
