use nom::{IResult, Parser};

use super::ast::Expression;
use super::common::keyword;
use super::errors::{adapt, CypherParsingError};
use super::expression::parse_expression;

pub fn parse_where_clause(
    input: &'_ str,
) -> IResult<&'_ str, Expression<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("WHERE").parse(input)?;
    // Once WHERE is seen the condition is mandatory.
    match parse_expression(input) {
        Ok((rest, expr)) => Ok((rest, expr)),
        Err(nom::Err::Error(e)) => Err(nom::Err::Failure(CypherParsingError::from(e))),
        Err(e) => Err(adapt(e)),
    }
}
