use nom::{IResult, Parser};

use super::ast::UnwindClause;
use super::common::{keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::{parse_expression, parse_variable_name};

// Accepted by the grammar; the generator reports UNWIND as unsupported.
pub fn parse_unwind_clause(
    input: &'_ str,
) -> IResult<&'_ str, UnwindClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("UNWIND").parse(input)?;
    let (input, expression) = parse_expression(input).map_err(adapt)?;
    let (input, _) = keyword("AS").parse(input)?;
    let (input, alias) = ws(parse_variable_name).parse(input).map_err(adapt)?;

    Ok((input, UnwindClause { expression, alias }))
}
