use nom::{
    character::complete::char,
    combinator::opt,
    multi::separated_list1,
    IResult, Parser,
};

use super::ast::{ProjectionItem, ReturnClause};
use super::common::{keyword, ws};
use super::errors::{adapt, CypherParsingError};
use super::expression::{parse_expression, parse_variable_name};
use super::order_by_and_page_clause::{parse_limit, parse_order_by, parse_skip};

pub fn parse_return_clause(
    input: &'_ str,
) -> IResult<&'_ str, ReturnClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("RETURN").parse(input)?;
    let (input, distinct) = opt(keyword("DISTINCT")).parse(input)?;

    let (input, items) = parse_projection_items(input)?;
    let (input, order_by) = opt(parse_order_by).parse(input)?;
    let (input, skip) = opt(parse_skip).parse(input)?;
    let (input, limit) = opt(parse_limit).parse(input)?;

    Ok((
        input,
        ReturnClause {
            items,
            distinct: distinct.is_some(),
            order_by: order_by.unwrap_or_default(),
            skip,
            limit,
        },
    ))
}

/// Shared by RETURN and WITH: `expr [AS alias], ...`
pub(crate) fn parse_projection_items(
    input: &'_ str,
) -> IResult<&'_ str, Vec<ProjectionItem<'_>>, CypherParsingError<'_>> {
    separated_list1(ws(char(',')), parse_projection_item)
        .parse(input)
        .map_err(adapt)
}

fn parse_projection_item(input: &'_ str) -> IResult<&'_ str, ProjectionItem<'_>> {
    let (input, expression) = parse_expression(input)?;
    let (input, alias) = opt(nom::sequence::preceded(
        keyword("AS"),
        ws(parse_variable_name),
    ))
    .parse(input)?;

    Ok((input, ProjectionItem { expression, alias }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_cypher_parser::ast::{Expression, PropertyAccess, SortOrder};

    #[test]
    fn test_parse_return_single_variable() {
        let (rem, ret) = parse_return_clause("RETURN n").unwrap();
        assert_eq!(rem, "");
        assert!(!ret.distinct);
        assert_eq!(ret.items.len(), 1);
        assert_eq!(ret.items[0].expression, Expression::Variable("n"));
        assert_eq!(ret.items[0].alias, None);
    }

    #[test]
    fn test_parse_return_with_alias() {
        let (rem, ret) = parse_return_clause("RETURN n.name AS name").unwrap();
        assert_eq!(rem, "");
        assert_eq!(
            ret.items[0].expression,
            Expression::PropertyAccess(PropertyAccess {
                base: "n",
                key: "name"
            })
        );
        assert_eq!(ret.items[0].alias, Some("name"));
    }

    #[test]
    fn test_parse_return_distinct() {
        let (rem, ret) = parse_return_clause("RETURN DISTINCT n.name").unwrap();
        assert_eq!(rem, "");
        assert!(ret.distinct);
    }

    #[test]
    fn test_parse_return_with_order_skip_limit() {
        let (rem, ret) =
            parse_return_clause("RETURN n.name ORDER BY n.name DESC SKIP 5 LIMIT 10").unwrap();
        assert_eq!(rem, "");
        assert_eq!(ret.order_by.len(), 1);
        assert_eq!(ret.order_by[0].order, SortOrder::Desc);
        assert_eq!(ret.skip, Some(5));
        assert_eq!(ret.limit, Some(10));
    }

    #[test]
    fn test_parse_return_multiple_items() {
        let (rem, ret) = parse_return_clause("RETURN a.name, b.name").unwrap();
        assert_eq!(rem, "");
        assert_eq!(ret.items.len(), 2);
    }
}
