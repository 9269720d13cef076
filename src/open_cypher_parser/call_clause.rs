use nom::{
    bytes::complete::tag,
    character::complete::char,
    combinator::{opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use super::ast::CallClause;
use super::common::{self, keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::parse_expression;

// CALL db.labels() YIELD label - accepted by the grammar, rejected by the
// generator.
pub fn parse_call_clause(
    input: &'_ str,
) -> IResult<&'_ str, CallClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("CALL").parse(input)?;
    let (input, procedure) = ws(parse_procedure_name).parse(input).map_err(adapt)?;
    let (input, arguments) = opt(delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), parse_expression),
        ws(char(')')),
    ))
    .parse(input)
    .map_err(adapt)?;
    let (input, yield_items) = opt(preceded(
        keyword("YIELD"),
        separated_list1(ws(char(',')), ws(common::parse_identifier)),
    ))
    .parse(input)
    .map_err(adapt)?;

    Ok((
        input,
        CallClause {
            procedure,
            arguments: arguments.unwrap_or_default(),
            yield_items,
        },
    ))
}

// Dotted procedure name, e.g. `db.labels` or `dbms.components`.
fn parse_procedure_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        common::parse_identifier,
        many0(pair(tag("."), common::parse_identifier)),
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_with_yield() {
        let (rem, call) = parse_call_clause("CALL db.labels() YIELD label").unwrap();
        assert_eq!(rem, "");
        assert_eq!(call.procedure, "db.labels");
        assert!(call.arguments.is_empty());
        assert_eq!(call.yield_items, Some(vec!["label"]));
    }

    #[test]
    fn test_parse_call_bare() {
        let (rem, call) = parse_call_clause("CALL dbms.components").unwrap();
        assert_eq!(rem, "");
        assert_eq!(call.procedure, "dbms.components");
        assert!(call.yield_items.is_none());
    }
}
