use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    multi::separated_list1,
    sequence::preceded,
    IResult, Parser,
};

use super::ast::{SetClause, SetItem};
use super::common::{self, keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::{parse_expression, parse_variable_name};

pub fn parse_set_clause(
    input: &'_ str,
) -> IResult<&'_ str, SetClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("SET").parse(input)?;
    let (input, items) = separated_list1(ws(char(',')), parse_set_item)
        .parse(input)
        .map_err(adapt)?;
    Ok((input, SetClause { items }))
}

// `v.k = expr`, `v += map`, or `v = expr` (whole-properties replacement).
fn parse_set_item(input: &'_ str) -> IResult<&'_ str, SetItem<'_>> {
    alt((
        |input| {
            let (input, variable) = ws(parse_variable_name).parse(input)?;
            let (input, key) = preceded(char('.'), common::parse_identifier).parse(input)?;
            let (input, _) = ws(char('=')).parse(input)?;
            let (input, value) = parse_expression(input)?;
            Ok((
                input,
                SetItem {
                    variable,
                    key: Some(key),
                    value,
                    merge: false,
                },
            ))
        },
        |input| {
            let (input, variable) = ws(parse_variable_name).parse(input)?;
            let (input, _) = ws(tag("+=")).parse(input)?;
            let (input, value) = parse_expression(input)?;
            Ok((
                input,
                SetItem {
                    variable,
                    key: None,
                    value,
                    merge: true,
                },
            ))
        },
        |input| {
            let (input, variable) = ws(parse_variable_name).parse(input)?;
            let (input, _) = ws(char('=')).parse(input)?;
            let (input, value) = parse_expression(input)?;
            Ok((
                input,
                SetItem {
                    variable,
                    key: None,
                    value,
                    merge: false,
                },
            ))
        },
    ))
    .parse(input)
}
