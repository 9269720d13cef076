//! MATCH pattern lowering: nodes to FROM entries, relationships to JOINs,
//! labels and inline property maps to conjunctive predicates. OPTIONAL MATCH
//! swaps JOIN for LEFT JOIN and moves the introduced predicates into the ON
//! clauses so missing matches produce NULL rows instead of disappearing.

use serde_json::Value;

use crate::open_cypher_parser::ast::{
    Direction, Expression, MatchClause, NodePattern, Pattern, RelationshipPattern,
};

use super::context::GenerationContext;
use super::errors::GenerationError;
use super::expression::{cast_hint, render_expression};
use super::schema;
use super::variable_length_cte;
use super::ClauseState;

pub fn apply_match_clause<'a>(
    clause: &MatchClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &mut ClauseState,
) -> Result<(), GenerationError> {
    for pattern in &clause.patterns {
        if pattern.shortest_path.is_some() {
            return Err(GenerationError::Unsupported("shortestPath"));
        }
    }

    for pattern in &clause.patterns {
        apply_pattern(pattern, clause.optional, ctx, state)?;
    }

    if let Some(condition) = &clause.where_clause {
        let sql = render_expression(condition, ctx)?;
        state.predicates.push(sql);
    }

    Ok(())
}

fn apply_pattern<'a>(
    pattern: &Pattern<'a>,
    optional: bool,
    ctx: &mut GenerationContext<'a>,
    state: &mut ClauseState,
) -> Result<(), GenerationError> {
    let (start_alias, created) = ctx.bind_node(pattern.start.variable);
    if created {
        let preds = node_predicates(&pattern.start, &start_alias, ctx)?;
        if optional && !state.from_tables.is_empty() {
            // An OPTIONAL MATCH introducing a fresh start node can only hang
            // off the existing row set as a LEFT JOIN.
            let on = if preds.is_empty() {
                "TRUE".to_string()
            } else {
                preds.join(" AND ")
            };
            state.joins.push(format!(
                "LEFT JOIN {} {} ON {}",
                schema::NODE_TABLE,
                start_alias,
                on
            ));
        } else {
            state
                .from_tables
                .push(format!("{} {}", schema::NODE_TABLE, start_alias));
            state.predicates.extend(preds);
        }
    }

    let mut prev_alias = start_alias;
    for (rel, node) in &pattern.hops {
        prev_alias = match rel.length {
            Some(spec) => variable_length_cte::apply_variable_length_hop(
                &prev_alias,
                rel,
                spec,
                node,
                optional,
                ctx,
                state,
            )?,
            None => apply_single_hop(&prev_alias, rel, node, optional, ctx, state)?,
        };
    }

    Ok(())
}

fn apply_single_hop<'a>(
    prev_alias: &str,
    rel: &RelationshipPattern<'a>,
    node: &NodePattern<'a>,
    optional: bool,
    ctx: &mut GenerationContext<'a>,
    state: &mut ClauseState,
) -> Result<String, GenerationError> {
    let (edge_alias, _) = ctx.bind_edge(rel.variable);
    let edge_preds = edge_predicates(rel, &edge_alias, ctx)?;
    let (end_alias, end_created) = ctx.bind_node(node.variable);
    let end_preds = if end_created {
        node_predicates(node, &end_alias, ctx)?
    } else {
        Vec::new()
    };

    let (edge_on, end_on) = match rel.direction {
        Direction::Outgoing => (
            format!("{}.source = {}.uuid", edge_alias, prev_alias),
            format!("{}.target = {}.uuid", edge_alias, end_alias),
        ),
        Direction::Incoming => (
            format!("{}.target = {}.uuid", edge_alias, prev_alias),
            format!("{}.source = {}.uuid", edge_alias, end_alias),
        ),
        Direction::Either => (
            format!(
                "({}.source = {}.uuid OR {}.target = {}.uuid)",
                edge_alias, prev_alias, edge_alias, prev_alias
            ),
            format!(
                "(({0}.source = {1}.uuid AND {0}.target = {2}.uuid) OR ({0}.target = {1}.uuid AND {0}.source = {2}.uuid))",
                edge_alias, prev_alias, end_alias
            ),
        ),
    };

    if optional {
        let mut edge_on_parts = vec![edge_on];
        edge_on_parts.extend(edge_preds);
        if !end_created {
            // Closing a cycle onto an already-bound node: the equality
            // belongs in the ON clause, not WHERE, or the LEFT JOIN loses
            // its NULL rows.
            edge_on_parts.push(end_on.clone());
        }
        state.joins.push(format!(
            "LEFT JOIN {} {} ON {}",
            schema::EDGE_TABLE,
            edge_alias,
            edge_on_parts.join(" AND ")
        ));
        if end_created {
            let mut end_on_parts = vec![end_on];
            end_on_parts.extend(end_preds);
            state.joins.push(format!(
                "LEFT JOIN {} {} ON {}",
                schema::NODE_TABLE,
                end_alias,
                end_on_parts.join(" AND ")
            ));
        }
    } else {
        state.joins.push(format!(
            "JOIN {} {} ON {}",
            schema::EDGE_TABLE,
            edge_alias,
            edge_on
        ));
        state.predicates.extend(edge_preds);
        if end_created {
            state.joins.push(format!(
                "JOIN {} {} ON {}",
                schema::NODE_TABLE,
                end_alias,
                end_on
            ));
            state.predicates.extend(end_preds);
        } else {
            state.predicates.push(end_on);
            state.predicates.extend(end_preds);
        }
    }

    Ok(end_alias)
}

pub(crate) fn node_predicates<'a>(
    node: &NodePattern<'a>,
    alias: &str,
    ctx: &mut GenerationContext<'a>,
) -> Result<Vec<String>, GenerationError> {
    let mut preds = Vec::new();
    if let Some(tenant) = ctx.tenant_predicate(alias) {
        preds.push(tenant);
    }
    if let Some(label) = node.label {
        let placeholder = ctx.add_param(Value::String(label.to_string()));
        preds.push(format!("{}.type = {}", alias, placeholder));
    }
    preds.extend(property_predicates(&node.properties, alias, true, ctx)?);
    Ok(preds)
}

fn edge_predicates<'a>(
    rel: &RelationshipPattern<'a>,
    alias: &str,
    ctx: &mut GenerationContext<'a>,
) -> Result<Vec<String>, GenerationError> {
    let mut preds = Vec::new();
    if let Some(tenant) = ctx.tenant_predicate(alias) {
        preds.push(tenant);
    }
    match rel.types.len() {
        0 => {}
        1 => {
            let placeholder = ctx.add_param(Value::String(rel.types[0].to_string()));
            preds.push(format!("{}.relation_type = {}", alias, placeholder));
        }
        _ => {
            let alternatives: Vec<String> = rel
                .types
                .iter()
                .map(|t| {
                    let placeholder = ctx.add_param(Value::String((*t).to_string()));
                    format!("{}.relation_type = {}", alias, placeholder)
                })
                .collect();
            preds.push(format!("({})", alternatives.join(" OR ")));
        }
    }
    preds.extend(property_predicates(&rel.properties, alias, false, ctx)?);
    Ok(preds)
}

/// Inline `{k: v}` maps desugar to one equality predicate per entry, with
/// the same column/JSON discrimination and literal typing as WHERE.
fn property_predicates<'a>(
    properties: &[(&'a str, Expression<'a>)],
    alias: &str,
    is_node: bool,
    ctx: &mut GenerationContext<'a>,
) -> Result<Vec<String>, GenerationError> {
    let mut preds = Vec::new();
    for (key, value) in properties {
        let is_column = if is_node {
            schema::is_node_column(key)
        } else {
            schema::is_edge_column(key)
        };
        let mut left = if is_column {
            format!("{}.{}", alias, key)
        } else {
            format!("({}.properties->>'{}')", alias, key)
        };
        if !is_column {
            if let Some(cast) = cast_hint(value, ctx) {
                left.push_str(cast);
            }
        }
        let rendered = render_expression(value, ctx)?;
        preds.push(format!("{} = {}", left, rendered));
    }
    Ok(preds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_cypher_parser::parse;
    use crate::open_cypher_parser::ast::Clause;
    use serde_json::json;
    use std::collections::HashMap;

    fn first_match<'a>(query: &'a crate::open_cypher_parser::ast::Query<'a>) -> &'a MatchClause<'a> {
        match &query.clauses[0] {
            Clause::Match(m) => m,
            other => panic!("expected MATCH, got {:?}", other),
        }
    }

    #[test]
    fn test_single_node_pattern() {
        let query = parse("MATCH (n:Person) RETURN n").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, Some("g1"));
        let mut state = ClauseState::default();
        apply_match_clause(first_match(&query), &mut ctx, &mut state).unwrap();

        assert_eq!(state.from_tables, vec!["nodes n1"]);
        assert!(state.joins.is_empty());
        assert_eq!(
            state.predicates,
            vec!["n1.group_id = $1", "n1.type = $2"]
        );
        assert_eq!(ctx.into_params(), vec![json!("g1"), json!("Person")]);
    }

    #[test]
    fn test_relationship_pattern_joins() {
        let query = parse("MATCH (a:Person)-[r:KNOWS]->(b:Person) RETURN a").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, Some("g1"));
        let mut state = ClauseState::default();
        apply_match_clause(first_match(&query), &mut ctx, &mut state).unwrap();

        assert_eq!(state.from_tables, vec!["nodes n1"]);
        assert_eq!(
            state.joins,
            vec![
                "JOIN edges e1 ON e1.source = n1.uuid",
                "JOIN nodes n2 ON e1.target = n2.uuid",
            ]
        );
        assert_eq!(
            state.predicates,
            vec![
                "n1.group_id = $1",
                "n1.type = $2",
                "e1.group_id = $1",
                "e1.relation_type = $3",
                "n2.group_id = $1",
                "n2.type = $4",
            ]
        );
        assert_eq!(
            ctx.into_params(),
            vec![json!("g1"), json!("Person"), json!("KNOWS"), json!("Person")]
        );
    }

    #[test]
    fn test_incoming_direction_swaps_columns() {
        let query = parse("MATCH (m:Movie)<-[:DIRECTED]-(d) RETURN d").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, None);
        let mut state = ClauseState::default();
        apply_match_clause(first_match(&query), &mut ctx, &mut state).unwrap();

        assert_eq!(
            state.joins,
            vec![
                "JOIN edges e1 ON e1.target = n1.uuid",
                "JOIN nodes n2 ON e1.source = n2.uuid",
            ]
        );
    }

    #[test]
    fn test_undirected_edge_is_disjunction() {
        let query = parse("MATCH (a)--(b) RETURN a").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, None);
        let mut state = ClauseState::default();
        apply_match_clause(first_match(&query), &mut ctx, &mut state).unwrap();

        assert_eq!(
            state.joins[0],
            "JOIN edges e1 ON (e1.source = n1.uuid OR e1.target = n1.uuid)"
        );
        assert!(state.joins[1].contains("e1.source = n1.uuid AND e1.target = n2.uuid"));
        assert!(state.joins[1].contains("e1.target = n1.uuid AND e1.source = n2.uuid"));
    }

    #[test]
    fn test_property_map_desugars_with_typing() {
        let query = parse("MATCH (n {name: 'Tom', age: 42}) RETURN n").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, Some("g1"));
        let mut state = ClauseState::default();
        apply_match_clause(first_match(&query), &mut ctx, &mut state).unwrap();

        // `name` is a real column, `age` routes through JSON with a cast.
        assert_eq!(
            state.predicates,
            vec![
                "n1.group_id = $1",
                "n1.name = $2",
                "(n1.properties->>'age')::numeric = $3",
            ]
        );
    }

    #[test]
    fn test_optional_match_uses_left_joins_with_on_predicates() {
        let query =
            parse("MATCH (n:Person) OPTIONAL MATCH (n)-[:LIKES]->(m:Movie) RETURN n").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, Some("g1"));
        let mut state = ClauseState::default();
        for clause in &query.clauses[..2] {
            if let Clause::Match(m) = clause {
                apply_match_clause(m, &mut ctx, &mut state).unwrap();
            }
        }

        assert_eq!(
            state.joins,
            vec![
                "LEFT JOIN edges e1 ON e1.source = n1.uuid AND e1.group_id = $1 AND e1.relation_type = $3",
                "LEFT JOIN nodes n2 ON e1.target = n2.uuid AND n2.group_id = $1 AND n2.type = $4",
            ]
        );
        // Only the non-optional predicates live in WHERE.
        assert_eq!(state.predicates, vec!["n1.group_id = $1", "n1.type = $2"]);
    }

    #[test]
    fn test_cycle_back_to_bound_node() {
        let query = parse("MATCH (a)-[:KNOWS]->(a) RETURN a").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, None);
        let mut state = ClauseState::default();
        apply_match_clause(first_match(&query), &mut ctx, &mut state).unwrap();

        assert_eq!(state.joins, vec!["JOIN edges e1 ON e1.source = n1.uuid"]);
        assert_eq!(state.predicates, vec!["e1.target = n1.uuid"]);
    }

    #[test]
    fn test_multiple_match_clauses_share_aliases() {
        let merged = parse("MATCH (a:Person)-[:KNOWS]->(b) MATCH (b)-[:LIKES]->(c) RETURN a").unwrap();
        let single = parse("MATCH (a:Person)-[:KNOWS]->(b), (b)-[:LIKES]->(c) RETURN a").unwrap();
        let bound = HashMap::new();

        let mut ctx1 = GenerationContext::new(&bound, Some("g1"));
        let mut state1 = ClauseState::default();
        for clause in &merged.clauses[..2] {
            if let Clause::Match(m) = clause {
                apply_match_clause(m, &mut ctx1, &mut state1).unwrap();
            }
        }

        let mut ctx2 = GenerationContext::new(&bound, Some("g1"));
        let mut state2 = ClauseState::default();
        apply_match_clause(first_match(&single), &mut ctx2, &mut state2).unwrap();

        assert_eq!(state1.from_tables, state2.from_tables);
        assert_eq!(state1.joins, state2.joins);
        assert_eq!(state1.predicates, state2.predicates);
    }

    #[test]
    fn test_shortest_path_is_rejected() {
        let query = parse("MATCH shortestPath((a)-[:KNOWS*]-(b)) RETURN a").unwrap();
        let bound = HashMap::new();
        let mut ctx = GenerationContext::new(&bound, None);
        let mut state = ClauseState::default();
        assert_eq!(
            apply_match_clause(first_match(&query), &mut ctx, &mut state),
            Err(GenerationError::Unsupported("shortestPath"))
        );
    }
}
