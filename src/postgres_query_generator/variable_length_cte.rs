//! Variable-length relationships compile to recursive CTEs.
//!
//! The CTE row carries the path's start, current frontier, depth, and the
//! set of edges already used (`visited`). Cycle prevention tracks edges, not
//! nodes: MATCH semantics allow revisiting a node but never reusing an edge
//! on one path. Tenant and type predicates appear in both the base case and
//! the recursive step, sharing the same parameter placeholders.

use serde_json::Value;

use crate::open_cypher_parser::ast::{
    Direction, NodePattern, RelationshipPattern, VariableLengthSpec,
};

use super::context::GenerationContext;
use super::errors::GenerationError;
use super::expression::{cast_hint, render_expression};
use super::pattern::node_predicates;
use super::schema;
use super::{ClauseState, Cte};

pub fn apply_variable_length_hop<'a>(
    prev_alias: &str,
    rel: &RelationshipPattern<'a>,
    spec: VariableLengthSpec,
    end_node: &NodePattern<'a>,
    optional: bool,
    ctx: &mut GenerationContext<'a>,
    state: &mut ClauseState,
) -> Result<String, GenerationError> {
    let cte_name = ctx.next_cte_name();

    // Predicates for the edge table, rendered twice (bare for the base case,
    // `e.`-qualified for the step) over the same placeholders.
    let mut bare_conds: Vec<String> = Vec::new();
    let mut step_conds: Vec<String> = Vec::new();

    match rel.types.len() {
        0 => {}
        1 => {
            let placeholder = ctx.add_param(Value::String(rel.types[0].to_string()));
            bare_conds.push(format!("relation_type = {}", placeholder));
            step_conds.push(format!("e.relation_type = {}", placeholder));
        }
        _ => {
            let mut bare_alt = Vec::new();
            let mut step_alt = Vec::new();
            for rel_type in &rel.types {
                let placeholder = ctx.add_param(Value::String((*rel_type).to_string()));
                bare_alt.push(format!("relation_type = {}", placeholder));
                step_alt.push(format!("e.relation_type = {}", placeholder));
            }
            bare_conds.push(format!("({})", bare_alt.join(" OR ")));
            step_conds.push(format!("({})", step_alt.join(" OR ")));
        }
    }

    for (key, value) in &rel.properties {
        let cast = if schema::is_edge_column(key) {
            None
        } else {
            cast_hint(value, ctx)
        };
        let rendered = render_expression(value, ctx)?;
        if schema::is_edge_column(key) {
            bare_conds.push(format!("{} = {}", key, rendered));
            step_conds.push(format!("e.{} = {}", key, rendered));
        } else {
            let suffix = cast.unwrap_or("");
            bare_conds.push(format!("(properties->>'{}'){} = {}", key, suffix, rendered));
            step_conds.push(format!("(e.properties->>'{}'){} = {}", key, suffix, rendered));
        }
    }

    if let Some(placeholder) = ctx.tenant_placeholder() {
        bare_conds.push(format!("group_id = {}", placeholder));
        step_conds.push(format!("e.group_id = {}", placeholder));
    }

    let bare_where = if bare_conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", bare_conds.join(" AND "))
    };

    let base = match rel.direction {
        Direction::Outgoing => format!(
            "SELECT source, target, 1 AS depth, ARRAY[uuid] AS visited FROM {}{}",
            schema::EDGE_TABLE,
            bare_where
        ),
        Direction::Incoming => format!(
            "SELECT target AS source, source AS target, 1 AS depth, ARRAY[uuid] AS visited FROM {}{}",
            schema::EDGE_TABLE,
            bare_where
        ),
        // Undirected paths start from both orientations of every edge.
        Direction::Either => format!(
            "SELECT source, target, 1 AS depth, ARRAY[uuid] AS visited FROM {0}{1} \
             UNION ALL \
             SELECT target AS source, source AS target, 1 AS depth, ARRAY[uuid] AS visited FROM {0}{1}",
            schema::EDGE_TABLE,
            bare_where
        ),
    };

    let mut bounds: Vec<String> = Vec::new();
    if let Some(max) = spec.max_hops {
        bounds.push(format!("p.depth < {}", max));
    }
    bounds.push("NOT e.uuid = ANY(p.visited)".to_string());
    bounds.extend(step_conds);
    let step_where = format!(" WHERE {}", bounds.join(" AND "));

    let step = match rel.direction {
        Direction::Outgoing => format!(
            "SELECT p.source, e.target, p.depth + 1, p.visited || e.uuid FROM {} p JOIN {} e ON p.target = e.source{}",
            cte_name,
            schema::EDGE_TABLE,
            step_where
        ),
        Direction::Incoming => format!(
            "SELECT p.source, e.source, p.depth + 1, p.visited || e.uuid FROM {} p JOIN {} e ON p.target = e.target{}",
            cte_name,
            schema::EDGE_TABLE,
            step_where
        ),
        Direction::Either => format!(
            "SELECT p.source, CASE WHEN e.source = p.target THEN e.target ELSE e.source END, p.depth + 1, p.visited || e.uuid \
             FROM {} p JOIN {} e ON (e.source = p.target OR e.target = p.target){}",
            cte_name,
            schema::EDGE_TABLE,
            step_where
        ),
    };

    state.ctes.push(Cte {
        name: cte_name.clone(),
        body: format!("{} UNION ALL {}", base, step),
        recursive: true,
    });

    let depth_predicate = match (spec.effective_min_hops(), spec.max_hops) {
        (min, Some(max)) => format!("{}.depth BETWEEN {} AND {}", cte_name, min, max),
        (min, None) => format!("{}.depth >= {}", cte_name, min),
    };

    let (end_alias, end_created) = ctx.bind_node(end_node.variable);

    if optional {
        let mut on_parts = vec![
            format!("{}.source = {}.uuid", cte_name, prev_alias),
            depth_predicate,
        ];
        if !end_created {
            on_parts.push(format!("{}.target = {}.uuid", cte_name, end_alias));
        }
        state
            .joins
            .push(format!("LEFT JOIN {} ON {}", cte_name, on_parts.join(" AND ")));
        if end_created {
            let mut end_on = vec![format!("{}.target = {}.uuid", cte_name, end_alias)];
            end_on.extend(node_predicates(end_node, &end_alias, ctx)?);
            state.joins.push(format!(
                "LEFT JOIN {} {} ON {}",
                schema::NODE_TABLE,
                end_alias,
                end_on.join(" AND ")
            ));
        }
    } else {
        state.joins.push(format!(
            "JOIN {} ON {}.source = {}.uuid",
            cte_name, cte_name, prev_alias
        ));
        state.predicates.push(depth_predicate);
        if end_created {
            state.joins.push(format!(
                "JOIN {} {} ON {}.target = {}.uuid",
                schema::NODE_TABLE,
                end_alias,
                cte_name,
                end_alias
            ));
            state
                .predicates
                .extend(node_predicates(end_node, &end_alias, ctx)?);
        } else {
            state
                .predicates
                .push(format!("{}.target = {}.uuid", cte_name, end_alias));
        }
    }

    Ok(end_alias)
}
