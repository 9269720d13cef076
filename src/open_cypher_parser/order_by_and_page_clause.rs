use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{map, opt},
    multi::separated_list1,
    IResult, Parser,
};

use super::ast::{SortItem, SortOrder};
use super::common::{keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::parse_expression;

pub fn parse_order_by(
    input: &'_ str,
) -> IResult<&'_ str, Vec<SortItem<'_>>, CypherParsingError<'_>> {
    let (input, _) = keyword("ORDER").parse(input)?;
    let (input, _) = keyword("BY").parse(input)?;
    separated_list1(ws(char(',')), parse_sort_item)
        .parse(input)
        .map_err(adapt)
}

fn parse_sort_item(input: &'_ str) -> IResult<&'_ str, SortItem<'_>> {
    let (input, expression) = parse_expression(input)?;
    let (input, order) = opt(alt((
        map(keyword("ASC"), |_| SortOrder::Asc),
        map(keyword("DESC"), |_| SortOrder::Desc),
    )))
    .parse(input)?;

    Ok((
        input,
        SortItem {
            expression,
            order: order.unwrap_or(SortOrder::Asc),
        },
    ))
}

pub fn parse_skip(input: &'_ str) -> IResult<&'_ str, i64, CypherParsingError<'_>> {
    let (input, _) = keyword("SKIP").parse(input)?;
    parse_integer(input).map_err(adapt)
}

pub fn parse_limit(input: &'_ str) -> IResult<&'_ str, i64, CypherParsingError<'_>> {
    let (input, _) = keyword("LIMIT").parse(input)?;
    parse_integer(input).map_err(adapt)
}

fn parse_integer(input: &str) -> IResult<&str, i64> {
    let (rest, digits) = ws(digit1).parse(input)?;
    match digits.parse::<i64>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}
