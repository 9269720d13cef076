//! Writing clauses: CREATE, MERGE, DELETE, SET, REMOVE.
//!
//! Inserts evaluate property maps at generation time and bind them as one
//! JSONB parameter; UUIDs come from the map when supplied, otherwise from
//! `gen_random_uuid()`. Statements that depend on matched rows scope
//! themselves with `uuid IN (SELECT alias.uuid FROM <accumulated match>)`.

use serde_json::Value;

use crate::open_cypher_parser::ast::{
    CreateClause, DeleteClause, Direction, MergeClause, NodePattern, Pattern,
    RelationshipPattern, RemoveClause, SetClause, SetItem,
};

use super::context::{Binding, GenerationContext};
use super::errors::GenerationError;
use super::expression::{literal_value, render_expression};
use super::schema;
use super::ClauseState;

pub fn render_create<'a>(
    create: &CreateClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<String, GenerationError> {
    let mut statements = Vec::new();
    for pattern in &create.patterns {
        if pattern.hops.is_empty() {
            statements.push(render_node_insert(&pattern.start, ctx)?);
        } else {
            statements.extend(render_edge_inserts(pattern, ctx, state)?);
        }
    }
    Ok(statements.join("; "))
}

fn evaluated_properties<'a>(
    properties: &[(&'a str, crate::open_cypher_parser::ast::Expression<'a>)],
    ctx: &GenerationContext<'a>,
) -> Result<serde_json::Map<String, Value>, GenerationError> {
    let mut map = serde_json::Map::new();
    for (key, value) in properties {
        map.insert((*key).to_string(), literal_value(value, ctx)?);
    }
    Ok(map)
}

fn render_node_insert<'a>(
    node: &NodePattern<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let props = evaluated_properties(&node.properties, ctx)?;

    let uuid_sql = match props.get("uuid") {
        Some(value) => ctx.add_param(value.clone()),
        None => "gen_random_uuid()".to_string(),
    };
    let name_param = ctx.add_param(
        props
            .get("name")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    let type_param = ctx.add_param(match node.label {
        Some(label) => Value::String(label.to_string()),
        None => Value::Null,
    });
    let group_sql = ctx
        .tenant_placeholder()
        .map(str::to_string)
        .unwrap_or_else(|| "NULL".to_string());
    let props_param = ctx.add_param(Value::Object(props));

    Ok(format!(
        "INSERT INTO {} (uuid, name, type, group_id, properties) VALUES ({}, {}, {}, {}, {}) \
         RETURNING uuid, name, type, properties",
        schema::NODE_TABLE,
        uuid_sql,
        name_param,
        type_param,
        group_sql,
        props_param
    ))
}

/// `CREATE (a)-[:T {..}]->(b)` inserts one edge per hop, reading the
/// endpoint uuids from the aliases the preceding MATCH bound.
fn render_edge_inserts<'a>(
    pattern: &Pattern<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<Vec<String>, GenerationError> {
    let mut statements = Vec::new();
    let mut prev_alias = resolve_node_alias(&pattern.start, ctx)?;

    for (rel, node) in &pattern.hops {
        let end_alias = resolve_node_alias(node, ctx)?;
        let (source_alias, target_alias) = match rel.direction {
            Direction::Incoming => (end_alias.clone(), prev_alias.clone()),
            _ => (prev_alias.clone(), end_alias.clone()),
        };
        statements.push(render_edge_insert(
            rel,
            &source_alias,
            &target_alias,
            ctx,
            state,
        )?);
        prev_alias = end_alias;
    }
    Ok(statements)
}

fn resolve_node_alias<'a>(
    node: &NodePattern<'a>,
    ctx: &GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let variable = node
        .variable
        .ok_or_else(|| GenerationError::UnboundVariable("(anonymous)".to_string()))?;
    match ctx.lookup(variable) {
        Some(Binding::Node { alias }) => Ok(alias.clone()),
        _ => Err(GenerationError::UnboundVariable(variable.to_string())),
    }
}

fn render_edge_insert<'a>(
    rel: &RelationshipPattern<'a>,
    source_alias: &str,
    target_alias: &str,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<String, GenerationError> {
    let type_param = ctx.add_param(match rel.types.first() {
        Some(rel_type) => Value::String((*rel_type).to_string()),
        None => Value::Null,
    });
    let group_sql = ctx
        .tenant_placeholder()
        .map(str::to_string)
        .unwrap_or_else(|| "NULL".to_string());
    let props = evaluated_properties(&rel.properties, ctx)?;
    let props_param = ctx.add_param(Value::Object(props));

    let mut sql = format!(
        "INSERT INTO {} (uuid, source, target, relation_type, group_id, properties) \
         SELECT gen_random_uuid(), {}.uuid, {}.uuid, {}, {}, {}",
        schema::EDGE_TABLE,
        source_alias,
        target_alias,
        type_param,
        group_sql,
        props_param
    );
    sql.push_str(&from_where_tail(state));
    sql.push_str(" RETURNING uuid");
    Ok(sql)
}

pub fn render_merge<'a>(
    merge: &MergeClause<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    if !merge.pattern.hops.is_empty() {
        return Err(GenerationError::Unsupported("MERGE on relationship patterns"));
    }
    let node = &merge.pattern.start;
    let mut props = evaluated_properties(&node.properties, ctx)?;

    // ON CREATE SET folds into the inserted document.
    for item in &merge.on_create {
        match item.key {
            Some(key) => {
                props.insert(key.to_string(), literal_value(&item.value, ctx)?);
            }
            None => {
                return Err(GenerationError::Unsupported(
                    "ON CREATE SET without a property key",
                ))
            }
        }
    }

    // Conflict target: the column-backed keys of the supplied map. A map
    // with only JSON properties has no reachable conflict target, which
    // would silently turn the upsert into a plain insert.
    let conflict_keys: Vec<&str> = node
        .properties
        .iter()
        .map(|(key, _)| *key)
        .filter(|key| schema::is_node_column(key))
        .collect();
    if conflict_keys.is_empty() {
        return Err(GenerationError::Unsupported(
            "MERGE keyed on non-column property",
        ));
    }

    let uuid_sql = match props.get("uuid") {
        Some(value) => ctx.add_param(value.clone()),
        None => "gen_random_uuid()".to_string(),
    };
    let name_param = ctx.add_param(
        props
            .get("name")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    let type_param = ctx.add_param(match node.label {
        Some(label) => Value::String(label.to_string()),
        None => Value::Null,
    });
    let group_sql = ctx
        .tenant_placeholder()
        .map(str::to_string)
        .unwrap_or_else(|| "NULL".to_string());
    let props_param = ctx.add_param(Value::Object(props));

    let assignments = if merge.on_match.is_empty() {
        "name = EXCLUDED.name, properties = EXCLUDED.properties, valid_at = CURRENT_TIMESTAMP"
            .to_string()
    } else {
        let mut parts = Vec::new();
        for item in &merge.on_match {
            parts.push(render_update_assignment(item, schema::NODE_TABLE, true, ctx)?);
        }
        parts.join(", ")
    };

    Ok(format!(
        "INSERT INTO {} (uuid, name, type, group_id, properties) VALUES ({}, {}, {}, {}, {}) \
         ON CONFLICT ({}) DO UPDATE SET {} RETURNING uuid, name, type",
        schema::NODE_TABLE,
        uuid_sql,
        name_param,
        type_param,
        group_sql,
        props_param,
        conflict_keys.join(", "),
        assignments
    ))
}

pub fn render_delete<'a>(
    delete: &DeleteClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<String, GenerationError> {
    let mut statements = Vec::new();
    for variable in &delete.variables {
        match ctx.lookup(variable).cloned() {
            Some(Binding::Node { alias }) => {
                let subquery = selection_subquery(&alias, state);
                if delete.detach {
                    // Detach-first form, portable to schemas without ON
                    // DELETE CASCADE on the edge endpoints.
                    statements.push(format!(
                        "DELETE FROM {} WHERE source IN ({}) OR target IN ({})",
                        schema::EDGE_TABLE,
                        subquery,
                        subquery
                    ));
                }
                statements.push(format!(
                    "DELETE FROM {} WHERE uuid IN ({})",
                    schema::NODE_TABLE,
                    subquery
                ));
            }
            Some(Binding::Edge { alias }) => {
                statements.push(format!(
                    "DELETE FROM {} WHERE uuid IN ({})",
                    schema::EDGE_TABLE,
                    selection_subquery(&alias, state)
                ));
            }
            _ => return Err(GenerationError::UnboundVariable((*variable).to_string())),
        }
    }
    Ok(statements.join("; "))
}

pub fn render_set<'a>(
    set: &SetClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<String, GenerationError> {
    let mut statements = Vec::new();
    for (variable, items) in group_by_variable(&set.items) {
        let (table, alias, is_node) = resolve_writable(variable, ctx)?;

        let mut column_assigns = Vec::new();
        let mut props_expr = "properties".to_string();
        let mut props_touched = false;
        for item in items {
            let is_column = item
                .key
                .map(|key| {
                    if is_node {
                        schema::is_node_column(key)
                    } else {
                        schema::is_edge_column(key)
                    }
                })
                .unwrap_or(false);
            match item.key {
                Some(key) if is_column => {
                    let value = render_expression(&item.value, ctx)?;
                    column_assigns.push(format!("{} = {}", key, value));
                }
                Some(key) => {
                    let value = render_expression(&item.value, ctx)?;
                    props_expr = format!("jsonb_set({}, '{{{}}}', to_jsonb({}))", props_expr, key, value);
                    props_touched = true;
                }
                None if item.merge => {
                    let value = render_expression(&item.value, ctx)?;
                    props_expr = format!("({} || {})", props_expr, value);
                    props_touched = true;
                }
                None => {
                    props_expr = render_expression(&item.value, ctx)?;
                    props_touched = true;
                }
            }
        }
        let mut assigns = column_assigns;
        if props_touched {
            assigns.push(format!("properties = {}", props_expr));
        }

        statements.push(format!(
            "UPDATE {} SET {} WHERE uuid IN ({})",
            table,
            assigns.join(", "),
            selection_subquery(&alias, state)
        ));
    }
    Ok(statements.join("; "))
}

pub fn render_remove<'a>(
    remove: &RemoveClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<String, GenerationError> {
    let mut statements = Vec::new();
    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for item in &remove.items {
        match grouped.iter_mut().find(|(variable, _)| *variable == item.variable) {
            Some((_, keys)) => keys.push(item.key),
            None => grouped.push((item.variable, vec![item.key])),
        }
    }

    for (variable, keys) in grouped {
        let (table, alias, is_node) = resolve_writable(variable, ctx)?;
        let mut assigns = Vec::new();
        let mut props_expr = "properties".to_string();
        let mut props_touched = false;
        for key in keys {
            let is_column = if is_node {
                schema::is_node_column(key)
            } else {
                schema::is_edge_column(key)
            };
            if is_column {
                assigns.push(format!("{} = NULL", key));
            } else {
                props_expr = format!("{} - '{}'", props_expr, key);
                props_touched = true;
            }
        }
        if props_touched {
            assigns.push(format!("properties = {}", props_expr));
        }
        statements.push(format!(
            "UPDATE {} SET {} WHERE uuid IN ({})",
            table,
            assigns.join(", "),
            selection_subquery(&alias, state)
        ));
    }
    Ok(statements.join("; "))
}

fn resolve_writable<'a>(
    variable: &'a str,
    ctx: &GenerationContext<'a>,
) -> Result<(&'static str, String, bool), GenerationError> {
    match ctx.lookup(variable) {
        Some(Binding::Node { alias }) => Ok((schema::NODE_TABLE, alias.clone(), true)),
        Some(Binding::Edge { alias }) => Ok((schema::EDGE_TABLE, alias.clone(), false)),
        _ => Err(GenerationError::UnboundVariable(variable.to_string())),
    }
}

fn group_by_variable<'a, 'b>(items: &'b [SetItem<'a>]) -> Vec<(&'a str, Vec<&'b SetItem<'a>>)> {
    let mut grouped: Vec<(&'a str, Vec<&'b SetItem<'a>>)> = Vec::new();
    for item in items {
        match grouped.iter_mut().find(|(variable, _)| *variable == item.variable) {
            Some((_, group)) => group.push(item),
            None => grouped.push((item.variable, vec![item])),
        }
    }
    grouped
}

fn selection_subquery(alias: &str, state: &ClauseState) -> String {
    let mut sql = format!("SELECT {}.uuid", alias);
    sql.push_str(&from_where_tail(state));
    sql
}

fn from_where_tail(state: &ClauseState) -> String {
    let mut sql = String::new();
    if !state.from_tables.is_empty() {
        sql.push_str(&format!(" FROM {}", state.from_tables.join(", ")));
        for join in &state.joins {
            sql.push(' ');
            sql.push_str(join);
        }
    }
    if !state.predicates.is_empty() {
        sql.push_str(&format!(" WHERE {}", state.predicates.join(" AND ")));
    }
    sql
}

fn render_update_assignment<'a>(
    item: &SetItem<'a>,
    table: &str,
    is_node: bool,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    match item.key {
        Some(key) => {
            let is_column = if is_node {
                schema::is_node_column(key)
            } else {
                schema::is_edge_column(key)
            };
            let value = render_expression(&item.value, ctx)?;
            if is_column {
                Ok(format!("{} = {}", key, value))
            } else {
                Ok(format!(
                    "properties = jsonb_set({}.properties, '{{{}}}', to_jsonb({}))",
                    table, key, value
                ))
            }
        }
        None if item.merge => {
            let value = render_expression(&item.value, ctx)?;
            Ok(format!("properties = {}.properties || {}", table, value))
        }
        None => {
            let value = render_expression(&item.value, ctx)?;
            Ok(format!("properties = {}", value))
        }
    }
}
