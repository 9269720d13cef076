use nom::{
    character::complete::char,
    multi::separated_list1,
    sequence::preceded,
    IResult, Parser,
};

use super::ast::{RemoveClause, RemoveItem};
use super::common::{self, keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::parse_variable_name;

pub fn parse_remove_clause(
    input: &'_ str,
) -> IResult<&'_ str, RemoveClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("REMOVE").parse(input)?;
    let (input, items) = separated_list1(ws(char(',')), parse_remove_item)
        .parse(input)
        .map_err(adapt)?;
    Ok((input, RemoveClause { items }))
}

fn parse_remove_item(input: &'_ str) -> IResult<&'_ str, RemoveItem<'_>> {
    let (input, variable) = ws(parse_variable_name).parse(input)?;
    let (input, key) = preceded(char('.'), common::parse_identifier).parse(input)?;
    Ok((input, RemoveItem { variable, key }))
}
