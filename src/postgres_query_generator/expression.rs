//! Expression lowering: AST expressions to SQL fragments.
//!
//! Value literals become positional parameters. Property access consults the
//! known-column tables and otherwise routes through JSON extraction;
//! comparisons against numeric or boolean operands cast the extracted text,
//! deriving the type from the opposite operand rather than a schema catalog.

use serde_json::Value;

use crate::open_cypher_parser::ast::{
    CaseExpression, Expression, FunctionCall, Literal, Operator, OperatorApplication,
};

use super::context::{Binding, GenerationContext};
use super::errors::GenerationError;
use super::schema;

pub fn render_expression<'a>(
    expr: &Expression<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    match expr {
        Expression::Literal(Literal::Integer(i)) => Ok(ctx.add_param(Value::from(*i))),
        Expression::Literal(Literal::Float(x)) => Ok(ctx.add_param(Value::from(*x))),
        Expression::Literal(Literal::String(s)) => {
            Ok(ctx.add_param(Value::String((*s).to_string())))
        }
        Expression::Literal(Literal::Boolean(b)) => {
            Ok(if *b { "TRUE" } else { "FALSE" }.to_string())
        }
        Expression::Literal(Literal::Null) => Ok("NULL".to_string()),
        Expression::Variable(name) => Ok(render_variable(name, ctx)),
        Expression::Parameter(name) => Ok(ctx.named_placeholder(name)),
        Expression::List(items) => {
            let rendered = items
                .iter()
                .map(|item| render_expression(item, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("ARRAY[{}]", rendered.join(", ")))
        }
        Expression::Map(_) => {
            let value = literal_value(expr, ctx)?;
            Ok(ctx.add_param(value))
        }
        Expression::FunctionCall(call) => render_function(call, ctx),
        Expression::PropertyAccess(access) => Ok(render_property_access(access.base, access.key, ctx)),
        Expression::Operator(app) => render_operator_application(app, ctx),
        Expression::Case(case) => render_case(case, ctx),
        Expression::ListComprehension(_) => Err(GenerationError::Unsupported("list comprehension")),
    }
}

/// A bare variable in expression position stands for the row's id; inside
/// aggregate arguments [`render_function`] widens it to `alias.*`.
fn render_variable(name: &str, ctx: &GenerationContext<'_>) -> String {
    match ctx.lookup(name) {
        Some(Binding::Node { alias }) | Some(Binding::Edge { alias }) => {
            format!("{}.uuid", alias)
        }
        Some(Binding::Column { name: column, .. }) => column.clone(),
        // Unbound references propagate verbatim and fail in the engine.
        None => name.to_string(),
    }
}

pub fn render_property_access(base: &str, key: &str, ctx: &GenerationContext<'_>) -> String {
    match ctx.lookup(base) {
        Some(Binding::Node { alias }) => {
            if schema::is_node_column(key) {
                format!("{}.{}", alias, key)
            } else {
                format!("({}.properties->>'{}')", alias, key)
            }
        }
        Some(Binding::Edge { alias }) => {
            if schema::is_edge_column(key) {
                format!("{}.{}", alias, key)
            } else {
                format!("({}.properties->>'{}')", alias, key)
            }
        }
        Some(Binding::Column { name, .. }) => format!("({}->>'{}')", name, key),
        None => format!("({}.properties->>'{}')", base, key),
    }
}

/// Whether the rendered form of `expr` is a text value pulled out of JSON
/// (and may therefore need a cast before a typed comparison).
pub fn is_json_extraction(expr: &Expression<'_>, ctx: &GenerationContext<'_>) -> bool {
    match expr {
        Expression::PropertyAccess(access) => match ctx.lookup(access.base) {
            Some(Binding::Node { .. }) => !schema::is_node_column(access.key),
            Some(Binding::Edge { .. }) => !schema::is_edge_column(access.key),
            Some(Binding::Column { .. }) | None => true,
        },
        _ => false,
    }
}

/// Cast the JSON-extracted side of a comparison should take, derived from
/// this (opposite) operand. Parameters use the value bound at generation
/// time, when available.
pub(crate) fn cast_hint(expr: &Expression<'_>, ctx: &GenerationContext<'_>) -> Option<&'static str> {
    match expr {
        Expression::Literal(Literal::Integer(_)) | Expression::Literal(Literal::Float(_)) => {
            Some("::numeric")
        }
        Expression::Literal(Literal::Boolean(_)) => Some("::boolean"),
        Expression::Parameter(name) => match ctx.named_value(name) {
            Some(Value::Number(_)) => Some("::numeric"),
            Some(Value::Bool(_)) => Some("::boolean"),
            _ => None,
        },
        _ => None,
    }
}

fn sql_comparison_token(op: Operator) -> &'static str {
    match op {
        Operator::Equal => "=",
        Operator::NotEqual => "!=",
        Operator::LessThan => "<",
        Operator::GreaterThan => ">",
        Operator::LessThanEqual => "<=",
        Operator::GreaterThanEqual => ">=",
        _ => unreachable!("not a comparison operator"),
    }
}

fn render_operator_application<'a>(
    app: &OperatorApplication<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let op = app.operator;
    match op {
        Operator::And | Operator::Or | Operator::Xor => {
            let token = match op {
                Operator::And => "AND",
                Operator::Or => "OR",
                _ => "XOR",
            };
            let left = render_expression(&app.operands[0], ctx)?;
            let right = render_expression(&app.operands[1], ctx)?;
            Ok(format!("({} {} {})", left, token, right))
        }
        Operator::Not => {
            let operand = render_expression(&app.operands[0], ctx)?;
            Ok(format!("NOT {}", operand))
        }
        Operator::IsNull => {
            let operand = render_expression(&app.operands[0], ctx)?;
            Ok(format!("{} IS NULL", operand))
        }
        Operator::IsNotNull => {
            let operand = render_expression(&app.operands[0], ctx)?;
            Ok(format!("{} IS NOT NULL", operand))
        }
        op if op.is_comparison() => render_comparison(op, &app.operands[0], &app.operands[1], ctx),
        Operator::RegexMatch => {
            let left = render_expression(&app.operands[0], ctx)?;
            let right = render_expression(&app.operands[1], ctx)?;
            Ok(format!("({} ~ {})", left, right))
        }
        Operator::In => render_in(false, &app.operands[0], &app.operands[1], ctx),
        Operator::NotIn => render_in(true, &app.operands[0], &app.operands[1], ctx),
        Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
            render_like(op, &app.operands[0], &app.operands[1], ctx)
        }
        Operator::Addition
        | Operator::Subtraction
        | Operator::Multiplication
        | Operator::Division
        | Operator::Modulo
        | Operator::Exponentiation => {
            let left = render_expression(&app.operands[0], ctx)?;
            let right = render_expression(&app.operands[1], ctx)?;
            Ok(format!("({} {} {})", left, op.cypher_token(), right))
        }
        _ => Err(GenerationError::Unsupported("operator")),
    }
}

fn render_comparison<'a>(
    op: Operator,
    left: &Expression<'a>,
    right: &Expression<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let mut left_sql = render_expression(left, ctx)?;
    if is_json_extraction(left, ctx) {
        if let Some(cast) = cast_hint(right, ctx) {
            left_sql.push_str(cast);
        }
    }
    let mut right_sql = render_expression(right, ctx)?;
    if is_json_extraction(right, ctx) {
        if let Some(cast) = cast_hint(left, ctx) {
            right_sql.push_str(cast);
        }
    }
    Ok(format!(
        "({} {} {})",
        left_sql,
        sql_comparison_token(op),
        right_sql
    ))
}

/// `IN` against a list literal lowers to `IN (...)`; against a bound
/// parameter it lowers to `= ANY($k)`.
fn render_in<'a>(
    negated: bool,
    left: &Expression<'a>,
    right: &Expression<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let mut left_sql = render_expression(left, ctx)?;

    match right {
        Expression::List(items) => {
            if is_json_extraction(left, ctx) {
                if let Some(cast) = items.first().and_then(|item| cast_hint(item, ctx)) {
                    left_sql.push_str(cast);
                }
            }
            let rendered = items
                .iter()
                .map(|item| render_expression(item, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            let keyword = if negated { "NOT IN" } else { "IN" };
            Ok(format!("({} {} ({}))", left_sql, keyword, rendered.join(", ")))
        }
        Expression::Parameter(name) => {
            if is_json_extraction(left, ctx) {
                if let Some(Value::Array(values)) = ctx.named_value(name) {
                    if values.first().map(Value::is_number).unwrap_or(false) {
                        left_sql.push_str("::numeric");
                    }
                }
            }
            let placeholder = ctx.named_placeholder(name);
            if negated {
                Ok(format!("(NOT {} = ANY({}))", left_sql, placeholder))
            } else {
                Ok(format!("({} = ANY({}))", left_sql, placeholder))
            }
        }
        other => {
            let right_sql = render_expression(other, ctx)?;
            let keyword = if negated { "NOT IN" } else { "IN" };
            Ok(format!("({} {} {})", left_sql, keyword, right_sql))
        }
    }
}

/// `STARTS WITH` / `ENDS WITH` / `CONTAINS` lower to LIKE. A string literal
/// operand is escaped and folded into the parameter; anything else is
/// concatenated with the wildcards in SQL.
fn render_like<'a>(
    op: Operator,
    left: &Expression<'a>,
    right: &Expression<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let left_sql = render_expression(left, ctx)?;

    if let Expression::Literal(Literal::String(s)) = right {
        let escaped = escape_like(s);
        let pattern = match op {
            Operator::StartsWith => format!("{}%", escaped),
            Operator::EndsWith => format!("%{}", escaped),
            _ => format!("%{}%", escaped),
        };
        let placeholder = ctx.add_param(Value::String(pattern));
        return Ok(format!("({} LIKE {})", left_sql, placeholder));
    }

    let right_sql = render_expression(right, ctx)?;
    Ok(match op {
        Operator::StartsWith => format!("({} LIKE {} || '%')", left_sql, right_sql),
        Operator::EndsWith => format!("({} LIKE '%' || {})", left_sql, right_sql),
        _ => format!("({} LIKE '%' || {} || '%')", left_sql, right_sql),
    })
}

/// Escape LIKE wildcards and the escape character itself inside a literal.
pub fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '%' => escaped.push_str("\\%"),
            '_' => escaped.push_str("\\_"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const AGGREGATE_FUNCTIONS: &[&str] = &["count", "sum", "avg", "min", "max", "collect"];

pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|agg| agg.eq_ignore_ascii_case(name))
}

/// Structural aggregation check used for implicit GROUP BY.
pub fn contains_aggregation(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::FunctionCall(call) => {
            is_aggregate_function(call.name) || call.args.iter().any(contains_aggregation)
        }
        Expression::Operator(app) => app.operands.iter().any(contains_aggregation),
        Expression::List(items) => items.iter().any(contains_aggregation),
        Expression::Map(entries) => entries.iter().any(|(_, value)| contains_aggregation(value)),
        Expression::Case(case) => {
            case.subject.as_deref().map(contains_aggregation).unwrap_or(false)
                || case
                    .when_then
                    .iter()
                    .any(|(when, then)| contains_aggregation(when) || contains_aggregation(then))
                || case
                    .else_expr
                    .as_deref()
                    .map(contains_aggregation)
                    .unwrap_or(false)
        }
        _ => false,
    }
}

fn render_function<'a>(
    call: &FunctionCall<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let lower = call.name.to_lowercase();
    let sql_name = match lower.as_str() {
        "count" => "COUNT",
        "sum" => "SUM",
        "avg" => "AVG",
        "min" => "MIN",
        "max" => "MAX",
        "collect" => "array_agg",
        "tolower" => "LOWER",
        "toupper" => "UPPER",
        "size" => "array_length",
        // Unknown functions pass through verbatim so user-defined scalars
        // work out of the box.
        _ => call.name,
    };

    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        args.push(render_function_argument(arg, ctx)?);
    }

    // Numeric aggregates over JSON-extracted text need the cast.
    if matches!(sql_name, "SUM" | "AVG" | "MIN" | "MAX") && call.args.len() == 1 {
        if is_json_extraction(&call.args[0], ctx) {
            args[0].push_str("::numeric");
        }
    }

    let distinct = if call.distinct { "DISTINCT " } else { "" };
    Ok(format!("{}({}{})", sql_name, distinct, args.join(", ")))
}

// `count(*)` stays a star; whole node/edge variables widen to `alias.*` so
// aggregates see the row, not just its id.
fn render_function_argument<'a>(
    arg: &Expression<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    if let Expression::Variable(name) = arg {
        if *name == "*" {
            return Ok("*".to_string());
        }
        if let Some(Binding::Node { alias }) | Some(Binding::Edge { alias }) = ctx.lookup(name) {
            return Ok(format!("{}.*", alias));
        }
    }
    render_expression(arg, ctx)
}

fn render_case<'a>(
    case: &CaseExpression<'a>,
    ctx: &mut GenerationContext<'a>,
) -> Result<String, GenerationError> {
    let mut sql = String::from("CASE");
    if let Some(subject) = &case.subject {
        sql.push(' ');
        sql.push_str(&render_expression(subject, ctx)?);
    }
    for (when, then) in &case.when_then {
        sql.push_str(" WHEN ");
        sql.push_str(&render_expression(when, ctx)?);
        sql.push_str(" THEN ");
        sql.push_str(&render_expression(then, ctx)?);
    }
    if let Some(else_expr) = &case.else_expr {
        sql.push_str(" ELSE ");
        sql.push_str(&render_expression(else_expr, ctx)?);
    }
    sql.push_str(" END");
    Ok(sql)
}

/// Evaluate a property-map value to a JSON value at generation time.
pub fn literal_value<'a>(
    expr: &Expression<'a>,
    ctx: &GenerationContext<'a>,
) -> Result<Value, GenerationError> {
    match expr {
        Expression::Literal(Literal::Integer(i)) => Ok(Value::from(*i)),
        Expression::Literal(Literal::Float(x)) => Ok(Value::from(*x)),
        Expression::Literal(Literal::String(s)) => Ok(Value::String((*s).to_string())),
        Expression::Literal(Literal::Boolean(b)) => Ok(Value::Bool(*b)),
        Expression::Literal(Literal::Null) => Ok(Value::Null),
        Expression::Parameter(name) => {
            Ok(ctx.named_value(name).cloned().unwrap_or(Value::Null))
        }
        Expression::List(items) => {
            let values = items
                .iter()
                .map(|item| literal_value(item, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(values))
        }
        Expression::Map(entries) => {
            let mut object = serde_json::Map::new();
            for (key, value) in entries {
                object.insert((*key).to_string(), literal_value(value, ctx)?);
            }
            Ok(Value::Object(object))
        }
        other => Err(GenerationError::NonLiteralPropertyValue(other.to_string())),
    }
}
