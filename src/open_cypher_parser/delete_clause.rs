use nom::{
    character::complete::char,
    combinator::opt,
    multi::separated_list1,
    IResult, Parser,
};

use super::ast::DeleteClause;
use super::common::{keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::parse_variable_name;

pub fn parse_delete_clause(
    input: &'_ str,
) -> IResult<&'_ str, DeleteClause<'_>, CypherParsingError<'_>> {
    let (input, detach) = opt(keyword("DETACH")).parse(input)?;
    let (input, _) = keyword("DELETE").parse(input)?;
    let (input, variables) = separated_list1(ws(char(',')), ws(parse_variable_name))
        .parse(input)
        .map_err(adapt)?;

    Ok((
        input,
        DeleteClause {
            detach: detach.is_some(),
            variables,
        },
    ))
}
