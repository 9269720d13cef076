use nom::{IResult, Parser};

use super::ast::{MergeClause, SetItem};
use super::common::keyword;
use super::errors::{adapt, CypherParsingError};
use super::path_pattern::parse_pattern;
use super::set_clause::parse_set_clause;

// MERGE pattern (ON MATCH SET items | ON CREATE SET items)*
pub fn parse_merge_clause(
    input: &'_ str,
) -> IResult<&'_ str, MergeClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("MERGE").parse(input)?;
    let (input, pattern) = parse_pattern(input).map_err(adapt)?;

    let mut on_match: Vec<SetItem> = Vec::new();
    let mut on_create: Vec<SetItem> = Vec::new();
    let mut remaining_input = input;

    loop {
        let res = parse_on_action(remaining_input);
        match res {
            Ok((new_input, (is_match, items))) => {
                if is_match {
                    on_match.extend(items);
                } else {
                    on_create.extend(items);
                }
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((
        remaining_input,
        MergeClause {
            pattern,
            on_match,
            on_create,
        },
    ))
}

fn parse_on_action(
    input: &'_ str,
) -> IResult<&'_ str, (bool, Vec<SetItem<'_>>), CypherParsingError<'_>> {
    let (input, _) = keyword("ON").parse(input)?;
    let (input, is_match) = nom::branch::alt((
        nom::combinator::map(keyword("MATCH"), |_| true),
        nom::combinator::map(keyword("CREATE"), |_| false),
    ))
    .parse(input)?;
    let (input, set) = parse_set_clause(input)?;
    Ok((input, (is_match, set.items)))
}
