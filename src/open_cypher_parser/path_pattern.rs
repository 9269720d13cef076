use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult, Parser,
};

use super::ast::{
    Direction, Expression, NodePattern, Pattern, RelationshipPattern, ShortestPathMode,
    VariableLengthSpec,
};
use super::common::{self, ws};
use super::expression::{self, parse_variable_name};

/// Entry point: `[p =] [shortestPath(] (a)-[r:T*1..3]->(b)... [)]`
pub fn parse_pattern(input: &'_ str) -> IResult<&'_ str, Pattern<'_>> {
    // Optional path variable binding `p = ...`.
    let (input, path_variable) =
        opt(terminated(ws(parse_variable_name), ws(char('=')))).parse(input)?;

    let (input, shortest) = opt(parse_shortest_path_keyword).parse(input)?;

    let (input, (start, hops)) = match shortest {
        Some(_) => delimited(ws(char('(')), parse_path_body, ws(char(')'))).parse(input)?,
        None => parse_path_body(input)?,
    };

    Ok((
        input,
        Pattern {
            path_variable,
            shortest_path: shortest,
            start,
            hops,
        },
    ))
}

fn parse_shortest_path_keyword(input: &'_ str) -> IResult<&'_ str, ShortestPathMode> {
    ws(alt((
        map(tag_no_case("allShortestPaths"), |_| {
            ShortestPathMode::AllShortest
        }),
        map(tag_no_case("shortestPath"), |_| ShortestPathMode::Shortest),
    )))
    .parse(input)
}

type PathBody<'a> = (
    NodePattern<'a>,
    Vec<(RelationshipPattern<'a>, NodePattern<'a>)>,
);

fn parse_path_body(input: &'_ str) -> IResult<&'_ str, PathBody<'_>> {
    let (input, start) = parse_node_pattern(input)?;

    let mut hops = Vec::new();
    let mut remaining_input = input;
    loop {
        let res = (parse_relationship_pattern, parse_node_pattern).parse(remaining_input);
        match res {
            Ok((new_input, hop)) => {
                hops.push(hop);
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((remaining_input, (start, hops)))
}

pub fn parse_node_pattern(input: &'_ str) -> IResult<&'_ str, NodePattern<'_>> {
    let (input, _) = ws(char('(')).parse(input)?;
    let (input, variable) = opt(ws(parse_variable_name)).parse(input)?;
    let (input, label) = opt(preceded(ws(char(':')), ws(common::parse_identifier))).parse(input)?;
    let (input, properties) = opt(parse_properties).parse(input)?;
    let (input, _) = ws(char(')')).parse(input)?;

    Ok((
        input,
        NodePattern {
            variable,
            label,
            properties: properties.unwrap_or_default(),
        },
    ))
}

/// All four surface shapes share one skeleton:
/// `<-[...]-`, `-[...]->`, `-[...]-`, and the bare `<--` / `-->` / `--`.
fn parse_relationship_pattern(input: &'_ str) -> IResult<&'_ str, RelationshipPattern<'_>> {
    let (input, _) = multispace0.parse(input)?;
    let (input, left_arrow) = opt(char('<')).parse(input)?;
    let (input, _) = ws(char('-')).parse(input)?;
    let (input, internals) = opt(delimited(
        char('['),
        parse_relationship_internals,
        ws(char(']')),
    ))
    .parse(input)?;
    let (input, _) = ws(char('-')).parse(input)?;
    let (input, right_arrow) = opt(char('>')).parse(input)?;

    let direction = match (left_arrow.is_some(), right_arrow.is_some()) {
        (true, false) => Direction::Incoming,
        (false, true) => Direction::Outgoing,
        (false, false) => Direction::Either,
        // `<-[..]->` is not valid openCypher.
        (true, true) => return Err(nom::Err::Failure(Error::new(input, ErrorKind::Char))),
    };

    let (variable, types, length, properties) = internals.unwrap_or((None, Vec::new(), None, None));

    Ok((
        input,
        RelationshipPattern {
            variable,
            types,
            direction,
            length,
            properties: properties.unwrap_or_default(),
        },
    ))
}

type RelInternals<'a> = (
    Option<&'a str>,
    Vec<&'a str>,
    Option<VariableLengthSpec>,
    Option<Vec<(&'a str, Expression<'a>)>>,
);

fn parse_relationship_internals(input: &'_ str) -> IResult<&'_ str, RelInternals<'_>> {
    let (input, variable) = opt(ws(parse_variable_name)).parse(input)?;
    let (input, types) = opt(preceded(
        ws(char(':')),
        separated_list1(ws(char('|')), ws(common::parse_identifier)),
    ))
    .parse(input)?;
    let (input, length) = opt(parse_variable_length).parse(input)?;
    let (input, properties) = opt(parse_properties).parse(input)?;

    Ok((
        input,
        (variable, types.unwrap_or_default(), length, properties),
    ))
}

/// `*`, `*n`, `*n..`, `*..m`, `*n..m`
fn parse_variable_length(input: &'_ str) -> IResult<&'_ str, VariableLengthSpec> {
    let (input, _) = ws(char('*')).parse(input)?;
    let (input, min) = opt(parse_hop_count).parse(input)?;
    let (input, dots) = opt(tag("..")).parse(input)?;
    let (input, max) = if dots.is_some() {
        opt(parse_hop_count).parse(input)?
    } else {
        (input, None)
    };

    let spec = match (min, dots.is_some(), max) {
        (None, false, _) => VariableLengthSpec::unbounded(),
        (Some(n), false, _) => VariableLengthSpec::fixed(n),
        (None, true, None) => VariableLengthSpec::unbounded(),
        (None, true, Some(m)) => VariableLengthSpec::max_only(m),
        (Some(n), true, None) => VariableLengthSpec::min_only(n),
        (Some(n), true, Some(m)) => VariableLengthSpec::range(n, m),
    };
    Ok((input, spec))
}

fn parse_hop_count(input: &str) -> IResult<&str, u32> {
    let (rest, digits) = digit1(input)?;
    match digits.parse::<u32>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
    }
}

/// Inline property map `{name: 'Oliver', age: 52}`; values are full
/// expressions so parameters and function calls work as property values.
pub fn parse_properties(input: &'_ str) -> IResult<&'_ str, Vec<(&'_ str, Expression<'_>)>> {
    delimited(
        ws(char('{')),
        separated_list1(
            ws(char(',')),
            separated_pair(
                ws(common::parse_identifier),
                char(':'),
                expression::parse_expression,
            ),
        ),
        ws(char('}')),
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_cypher_parser::ast::Literal;

    #[test]
    fn test_parse_empty_node() {
        let (rem, node) = parse_node_pattern("()").unwrap();
        assert_eq!(rem, "");
        assert_eq!(
            node,
            NodePattern {
                variable: None,
                label: None,
                properties: vec![],
            }
        );
    }

    #[test]
    fn test_parse_node_with_label_and_properties() {
        let (rem, node) = parse_node_pattern("(p:Person {name: 'Tom', age: 42})").unwrap();
        assert_eq!(rem, "");
        assert_eq!(node.variable, Some("p"));
        assert_eq!(node.label, Some("Person"));
        assert_eq!(node.properties.len(), 2);
        assert_eq!(node.properties[0].0, "name");
        assert_eq!(
            node.properties[0].1,
            Expression::Literal(Literal::String("Tom"))
        );
    }

    #[test]
    fn test_parse_label_only_node() {
        let (rem, node) = parse_node_pattern("(:City)").unwrap();
        assert_eq!(rem, "");
        assert_eq!(node.variable, None);
        assert_eq!(node.label, Some("City"));
    }

    #[test]
    fn test_parse_outgoing_pattern() {
        let (rem, pattern) = parse_pattern("(a)-[r:KNOWS]->(b)").unwrap();
        assert_eq!(rem, "");
        assert_eq!(pattern.start.variable, Some("a"));
        assert_eq!(pattern.hops.len(), 1);
        let (rel, end) = &pattern.hops[0];
        assert_eq!(rel.variable, Some("r"));
        assert_eq!(rel.types, vec!["KNOWS"]);
        assert_eq!(rel.direction, Direction::Outgoing);
        assert!(rel.length.is_none());
        assert_eq!(end.variable, Some("b"));
    }

    #[test]
    fn test_parse_incoming_pattern() {
        let (_, pattern) = parse_pattern("(a)<-[:DIRECTED]-(d:Person)").unwrap();
        let (rel, end) = &pattern.hops[0];
        assert_eq!(rel.direction, Direction::Incoming);
        assert_eq!(rel.types, vec!["DIRECTED"]);
        assert_eq!(end.label, Some("Person"));
    }

    #[test]
    fn test_parse_undirected_bare_pattern() {
        let (rem, pattern) = parse_pattern("(a)--(b)").unwrap();
        assert_eq!(rem, "");
        let (rel, _) = &pattern.hops[0];
        assert_eq!(rel.direction, Direction::Either);
        assert!(rel.types.is_empty());
        assert!(rel.variable.is_none());
    }

    #[test]
    fn test_parse_bare_arrow_pattern() {
        let (_, pattern) = parse_pattern("(a)-->(b)").unwrap();
        assert_eq!(pattern.hops[0].0.direction, Direction::Outgoing);

        let (_, pattern) = parse_pattern("(a)<--(b)").unwrap();
        assert_eq!(pattern.hops[0].0.direction, Direction::Incoming);
    }

    #[test]
    fn test_parse_multi_hop_chain() {
        let (rem, pattern) =
            parse_pattern("(p:Person)-[:ACTED_IN]->(m:Movie)<-[:DIRECTED]-(d)").unwrap();
        assert_eq!(rem, "");
        assert_eq!(pattern.hops.len(), 2);
        assert_eq!(pattern.hops[0].0.direction, Direction::Outgoing);
        assert_eq!(pattern.hops[1].0.direction, Direction::Incoming);
    }

    #[test]
    fn test_parse_variable_length_specs() {
        let cases = [
            ("(a)-[:KNOWS*]->(b)", VariableLengthSpec::unbounded()),
            ("(a)-[:KNOWS*2]->(b)", VariableLengthSpec::fixed(2)),
            ("(a)-[:KNOWS*1..3]->(b)", VariableLengthSpec::range(1, 3)),
            ("(a)-[:KNOWS*..5]->(b)", VariableLengthSpec::max_only(5)),
            ("(a)-[:KNOWS*2..]->(b)", VariableLengthSpec::min_only(2)),
        ];
        for (text, expected) in cases {
            let (rem, pattern) = parse_pattern(text).unwrap();
            assert_eq!(rem, "", "leftover for {}", text);
            assert_eq!(pattern.hops[0].0.length, Some(expected), "spec for {}", text);
        }
    }

    #[test]
    fn test_parse_multiple_relationship_types() {
        let (_, pattern) = parse_pattern("(a)-[:FOLLOWS|LIKES]->(b)").unwrap();
        assert_eq!(pattern.hops[0].0.types, vec!["FOLLOWS", "LIKES"]);
    }

    #[test]
    fn test_parse_named_path() {
        let (rem, pattern) = parse_pattern("p = (a)-[:KNOWS]->(b)").unwrap();
        assert_eq!(rem, "");
        assert_eq!(pattern.path_variable, Some("p"));
        assert!(pattern.shortest_path.is_none());
    }

    #[test]
    fn test_parse_shortest_path() {
        let (rem, pattern) = parse_pattern("shortestPath((a)-[:KNOWS*]-(b))").unwrap();
        assert_eq!(rem, "");
        assert_eq!(pattern.shortest_path, Some(ShortestPathMode::Shortest));
        assert_eq!(pattern.hops.len(), 1);
    }

    #[test]
    fn test_parse_relationship_with_properties() {
        let (_, pattern) = parse_pattern("(a)-[r:RATED {stars: 5}]->(m)").unwrap();
        let (rel, _) = &pattern.hops[0];
        assert_eq!(rel.properties.len(), 1);
        assert_eq!(rel.properties[0].0, "stars");
    }

    #[test]
    fn test_standalone_node_stops_before_comma() {
        let (rem, pattern) = parse_pattern("(a:Person), (b:Person)").unwrap();
        assert_eq!(pattern.start.variable, Some("a"));
        assert!(pattern.hops.is_empty());
        assert!(rem.trim_start().starts_with(','));
    }
}
