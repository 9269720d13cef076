use nom::{combinator::opt, IResult, Parser};

use super::ast::WithClause;
use super::common::keyword;
use super::errors::CypherParsingError;
use super::order_by_and_page_clause::{parse_limit, parse_order_by, parse_skip};
use super::return_clause::parse_projection_items;
use super::where_clause::parse_where_clause;

// WITH items [ORDER BY ...] [SKIP n] [LIMIT n] [WHERE cond]
pub fn parse_with_clause(
    input: &'_ str,
) -> IResult<&'_ str, WithClause<'_>, CypherParsingError<'_>> {
    let (input, _) = keyword("WITH").parse(input)?;
    let (input, distinct) = opt(keyword("DISTINCT")).parse(input)?;

    let (input, items) = parse_projection_items(input)?;
    let (input, order_by) = opt(parse_order_by).parse(input)?;
    let (input, skip) = opt(parse_skip).parse(input)?;
    let (input, limit) = opt(parse_limit).parse(input)?;
    let (input, where_clause) = opt(parse_where_clause).parse(input)?;

    Ok((
        input,
        WithClause {
            items,
            distinct: distinct.is_some(),
            order_by: order_by.unwrap_or_default(),
            skip,
            limit,
            where_clause,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_cypher_parser::ast::{Expression, FunctionCall};

    #[test]
    fn test_parse_with_aliased_aggregate() {
        let (rem, with) = parse_with_clause("WITH c.name AS city, COUNT(p) AS population").unwrap();
        assert_eq!(rem, "");
        assert_eq!(with.items.len(), 2);
        assert_eq!(with.items[0].alias, Some("city"));
        assert_eq!(
            with.items[1].expression,
            Expression::FunctionCall(FunctionCall {
                name: "COUNT",
                distinct: false,
                args: vec![Expression::Variable("p")],
            })
        );
    }

    #[test]
    fn test_parse_with_where() {
        let (rem, with) = parse_with_clause("WITH n, count(*) AS c WHERE c > 1").unwrap();
        assert_eq!(rem, "");
        assert!(with.where_clause.is_some());
    }

    #[test]
    fn test_parse_with_distinct() {
        let (rem, with) = parse_with_clause("WITH DISTINCT n").unwrap();
        assert_eq!(rem, "");
        assert!(with.distinct);
    }

    #[test]
    fn test_with_stops_before_match() {
        let (rem, with) = parse_with_clause("WITH a MATCH (b) RETURN a, b").unwrap();
        assert_eq!(with.items.len(), 1);
        assert!(rem.trim_start().to_uppercase().starts_with("MATCH"));
    }
}
