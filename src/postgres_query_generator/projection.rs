//! RETURN and WITH lowering.
//!
//! RETURN becomes the final SELECT. WITH flushes everything accumulated so
//! far into a named CTE, rebinding the scope to the CTE's output columns; a
//! trailing WHERE becomes HAVING when the projection aggregates, with output
//! aliases substituted back to their defining expressions (the engine's
//! HAVING sees expressions, not aliases).

use std::collections::HashMap;

use crate::open_cypher_parser::ast::{
    CaseExpression, Expression, FunctionCall, OperatorApplication, ProjectionItem, ReturnClause,
    SortItem, SortOrder, WithClause,
};

use super::context::{Binding, GenerationContext};
use super::errors::GenerationError;
use super::expression::{contains_aggregation, render_expression};
use super::{ClauseState, Cte};

struct RenderedItem<'a> {
    /// Full SELECT-list entry, including any `AS alias`.
    sql: String,
    /// Expression without the alias, reused verbatim for GROUP BY. `None`
    /// for bare whole-variable projections (`n1.*`).
    expr_sql: Option<String>,
    aggregating: bool,
    /// Set when the item projects a whole node or edge variable.
    whole_variable: Option<&'a str>,
    /// Output column this item contributes to a CTE scope.
    column: Option<(&'a str, bool)>,
}

fn render_projection_item<'a>(
    item: &ProjectionItem<'a>,
    for_with: bool,
    ctx: &mut GenerationContext<'a>,
) -> Result<RenderedItem<'a>, GenerationError> {
    if let Expression::Variable(name) = &item.expression {
        let name: &'a str = *name;
        if name != "*" {
            match ctx.lookup(name).cloned() {
                Some(Binding::Node { alias }) | Some(Binding::Edge { alias }) => {
                    // Whole-variable projection. A bare `RETURN n` expands
                    // the row; anything that must name an output column
                    // packs the row as JSON so later property access works.
                    let out_name = item.alias.or(if for_with { Some(name) } else { None });
                    return Ok(match out_name {
                        Some(out) => RenderedItem {
                            sql: format!("row_to_json({}.*) AS {}", alias, out),
                            expr_sql: Some(format!("row_to_json({}.*)", alias)),
                            aggregating: false,
                            whole_variable: Some(name),
                            column: Some((out, true)),
                        },
                        None => RenderedItem {
                            sql: format!("{}.*", alias),
                            expr_sql: None,
                            aggregating: false,
                            whole_variable: Some(name),
                            column: None,
                        },
                    });
                }
                Some(Binding::Column { name: column, packed }) => {
                    let out = item.alias.unwrap_or(name);
                    let sql = match item.alias {
                        Some(alias) => format!("{} AS {}", column, alias),
                        None => column.clone(),
                    };
                    return Ok(RenderedItem {
                        sql,
                        expr_sql: Some(column),
                        aggregating: false,
                        whole_variable: None,
                        column: Some((out, packed)),
                    });
                }
                None => {}
            }
        }
    }

    let rendered = render_expression(&item.expression, ctx)?;
    let aggregating = contains_aggregation(&item.expression);
    let column = match item.alias {
        Some(alias) => Some((alias, false)),
        None => match &item.expression {
            Expression::Variable(name) => Some((*name, false)),
            _ => None,
        },
    };
    let sql = match item.alias {
        Some(alias) => format!("{} AS {}", rendered, alias),
        None => rendered.clone(),
    };
    Ok(RenderedItem {
        sql,
        expr_sql: Some(rendered),
        aggregating,
        whole_variable: None,
        column,
    })
}

/// Final SELECT for a RETURN clause. Returns the SQL and the projection
/// arity (used to check UNION shape).
pub fn render_return<'a>(
    ret: &ReturnClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &ClauseState,
) -> Result<(String, usize), GenerationError> {
    let mut rendered = Vec::with_capacity(ret.items.len());
    for item in &ret.items {
        rendered.push(render_projection_item(item, false, ctx)?);
    }

    let aggregating = rendered.iter().any(|item| item.aggregating);
    if aggregating {
        if let Some(item) = rendered
            .iter()
            .find(|item| !item.aggregating && item.whole_variable.is_some())
        {
            return Err(GenerationError::WholeVariableInAggregation(
                item.whole_variable.unwrap_or_default().to_string(),
            ));
        }
    }

    let distinct = if ret.distinct { "DISTINCT " } else { "" };
    let select_list: Vec<&str> = rendered.iter().map(|item| item.sql.as_str()).collect();
    let mut sql = format!("SELECT {}{}", distinct, select_list.join(", "));

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

    if aggregating {
        let group_exprs: Vec<&str> = rendered
            .iter()
            .filter(|item| !item.aggregating)
            .filter_map(|item| item.expr_sql.as_deref())
            .collect();
        if !group_exprs.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", group_exprs.join(", ")));
        }
    }

    if !ret.order_by.is_empty() {
        // ORDER BY accepts aliases from the current projection; expand them
        // to their defining expressions the same way WITH does, so an alias
        // shadowing a pattern variable orders by the projected value.
        let substitutions: HashMap<&str, &Expression<'a>> = ret
            .items
            .iter()
            .filter_map(|item| item.alias.map(|alias| (alias, &item.expression)))
            .collect();
        sql.push_str(&render_order_by(&ret.order_by, &substitutions, ctx)?);
    }
    if let Some(limit) = ret.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(skip) = ret.skip {
        sql.push_str(&format!(" OFFSET {}", skip));
    }

    Ok((sql, ret.items.len()))
}

/// Flush the accumulated clause state into a CTE and rebind the scope to
/// its output columns.
pub fn apply_with_clause<'a>(
    with: &WithClause<'a>,
    ctx: &mut GenerationContext<'a>,
    state: &mut ClauseState,
) -> Result<(), GenerationError> {
    let mut rendered = Vec::with_capacity(with.items.len());
    for item in &with.items {
        rendered.push(render_projection_item(item, true, ctx)?);
    }

    let aggregating = rendered.iter().any(|item| item.aggregating);
    if aggregating {
        // Grouping by a whole row column would produce SQL the engine
        // rejects; fail here with a useful message instead.
        if let Some(item) = rendered
            .iter()
            .find(|item| !item.aggregating && item.whole_variable.is_some())
        {
            return Err(GenerationError::WholeVariableInAggregation(
                item.whole_variable.unwrap_or_default().to_string(),
            ));
        }
    }
    for (item, r) in with.items.iter().zip(&rendered) {
        if r.column.is_none() {
            return Err(GenerationError::MissingProjectionAlias(
                item.expression.to_string(),
            ));
        }
    }

    // Alias -> defining expression, for HAVING/ORDER BY substitution.
    let substitutions: HashMap<&str, &Expression<'a>> = with
        .items
        .iter()
        .filter_map(|item| item.alias.map(|alias| (alias, &item.expression)))
        .collect();

    let distinct = if with.distinct { "DISTINCT " } else { "" };
    let select_list: Vec<&str> = rendered.iter().map(|item| item.sql.as_str()).collect();
    let mut body = format!("SELECT {}{}", distinct, select_list.join(", "));

    if !state.from_tables.is_empty() {
        body.push_str(&format!(" FROM {}", state.from_tables.join(", ")));
        for join in &state.joins {
            body.push(' ');
            body.push_str(join);
        }
    }

    let mut where_parts = state.predicates.clone();
    let mut having = None;
    if let Some(condition) = &with.where_clause {
        let substituted = substitute_aliases(condition, &substitutions);
        let sql = render_expression(&substituted, ctx)?;
        if aggregating {
            having = Some(sql);
        } else {
            where_parts.push(sql);
        }
    }
    if !where_parts.is_empty() {
        body.push_str(&format!(" WHERE {}", where_parts.join(" AND ")));
    }

    if aggregating {
        let group_exprs: Vec<&str> = rendered
            .iter()
            .filter(|item| !item.aggregating)
            .filter_map(|item| item.expr_sql.as_deref())
            .collect();
        if !group_exprs.is_empty() {
            body.push_str(&format!(" GROUP BY {}", group_exprs.join(", ")));
        }
    }
    if let Some(having_sql) = having {
        body.push_str(&format!(" HAVING {}", having_sql));
    }
    if !with.order_by.is_empty() {
        body.push_str(&render_order_by(&with.order_by, &substitutions, ctx)?);
    }
    if let Some(limit) = with.limit {
        body.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(skip) = with.skip {
        body.push_str(&format!(" OFFSET {}", skip));
    }

    let name = ctx.next_cte_name();
    state.ctes.push(Cte {
        name: name.clone(),
        body,
        recursive: false,
    });
    state.from_tables = vec![name];
    state.joins.clear();
    state.predicates.clear();

    let columns: Vec<(&'a str, bool)> = rendered.iter().filter_map(|item| item.column).collect();
    ctx.enter_cte_scope(columns);

    Ok(())
}

fn render_order_by<'a>(
    items: &[SortItem<'a>],
    substitutions: &HashMap<&str, &Expression<'a>>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let substituted = substitute_aliases(&item.expression, substitutions);
        let sql = render_expression(&substituted, ctx)?;
        let direction = match item.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        parts.push(format!("{} {}", sql, direction));
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

/// Deep-copy `expr`, replacing variables that name projection aliases with
/// their defining expressions.
fn substitute_aliases<'a>(
    expr: &Expression<'a>,
    substitutions: &HashMap<&str, &Expression<'a>>,
) -> Expression<'a> {
    match expr {
        Expression::Variable(name) => match substitutions.get(name) {
            Some(replacement) => (*replacement).clone(),
            None => expr.clone(),
        },
        Expression::Operator(app) => Expression::Operator(OperatorApplication {
            operator: app.operator,
            operands: app
                .operands
                .iter()
                .map(|operand| substitute_aliases(operand, substitutions))
                .collect(),
        }),
        Expression::FunctionCall(call) => Expression::FunctionCall(FunctionCall {
            name: call.name,
            distinct: call.distinct,
            args: call
                .args
                .iter()
                .map(|arg| substitute_aliases(arg, substitutions))
                .collect(),
        }),
        Expression::List(items) => Expression::List(
            items
                .iter()
                .map(|item| substitute_aliases(item, substitutions))
                .collect(),
        ),
        Expression::Case(case) => Expression::Case(CaseExpression {
            subject: case
                .subject
                .as_ref()
                .map(|subject| Box::new(substitute_aliases(subject, substitutions))),
            when_then: case
                .when_then
                .iter()
                .map(|(when, then)| {
                    (
                        substitute_aliases(when, substitutions),
                        substitute_aliases(then, substitutions),
                    )
                })
                .collect(),
            else_expr: case
                .else_expr
                .as_ref()
                .map(|else_expr| Box::new(substitute_aliases(else_expr, substitutions))),
        }),
        _ => expr.clone(),
    }
}
