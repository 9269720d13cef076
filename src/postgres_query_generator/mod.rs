//! AST-to-SQL generation against the fixed two-table property-graph schema.
//!
//! `generate` walks the clause list once. MATCH accumulates FROM/JOIN
//! fragments and predicates; WITH flushes them into a CTE and rebinds the
//! scope; RETURN or a write clause flushes and terminates. Every literal
//! value becomes a positional parameter, named `$k` placeholders are
//! contiguous, and the tenant id (when supplied) is always `$1`.

use std::collections::HashMap;

use serde_json::Value;

use crate::open_cypher_parser::ast::{Clause, Query};

pub mod context;
pub(crate) mod errors;
mod expression;
mod pattern;
mod projection;
mod schema;
mod variable_length_cte;
mod write_clause;

pub use errors::GenerationError;

use context::GenerationContext;

/// One common table expression collected while lowering a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub body: String,
    pub recursive: bool,
}

/// FROM/JOIN fragments and predicates accumulated between scope boundaries.
#[derive(Debug, Default)]
pub struct ClauseState {
    pub from_tables: Vec<String>,
    pub joins: Vec<String>,
    pub predicates: Vec<String>,
    pub ctes: Vec<Cte>,
}

/// Lower a parsed query to `(sql, positional parameters)`.
///
/// `parameters` supplies values for `$name` references; `tenant_id`, when
/// present, is bound as `$1` and enforced on every node and edge alias.
pub fn generate<'a>(
    query: &Query<'a>,
    parameters: &'a HashMap<String, Value>,
    tenant_id: Option<&str>,
) -> Result<(String, Vec<Value>), GenerationError> {
    log::debug!(
        "generating sql for {} clause(s), {} union branch(es)",
        query.clauses.len(),
        query.unions.len()
    );

    let mut ctx = GenerationContext::new(parameters, tenant_id);
    let (sql, arity) = generate_single(&query.clauses, &mut ctx)?;

    if query.unions.is_empty() {
        return Ok((sql, ctx.into_params()));
    }

    let mut combined = format!("({})", sql);
    for branch in &query.unions {
        ctx.reset_scope();
        let (branch_sql, branch_arity) = generate_single(&branch.query.clauses, &mut ctx)?;
        if branch_arity != arity {
            return Err(GenerationError::UnionShapeMismatch {
                first: arity,
                other: branch_arity,
            });
        }
        combined.push_str(if branch.all { " UNION ALL " } else { " UNION " });
        combined.push_str(&format!("({})", branch_sql));
    }
    Ok((combined, ctx.into_params()))
}

/// Walk one clause sequence (the main query or a UNION branch). Returns the
/// SQL and the projection arity.
fn generate_single<'a>(
    clauses: &[Clause<'a>],
    ctx: &mut GenerationContext<'a>,
) -> Result<(String, usize), GenerationError> {
    let mut state = ClauseState::default();

    for clause in clauses {
        match clause {
            Clause::Match(m) => pattern::apply_match_clause(m, ctx, &mut state)?,
            Clause::With(w) => projection::apply_with_clause(w, ctx, &mut state)?,
            Clause::Return(r) => {
                let (select, arity) = projection::render_return(r, ctx, &state)?;
                return Ok((prefix_ctes(&state.ctes, select), arity));
            }
            Clause::Create(c) => {
                let sql = write_clause::render_create(c, ctx, &state)?;
                return Ok((prefix_ctes(&state.ctes, sql), 0));
            }
            Clause::Merge(m) => {
                let sql = write_clause::render_merge(m, ctx)?;
                return Ok((prefix_ctes(&state.ctes, sql), 0));
            }
            Clause::Delete(d) => {
                let sql = write_clause::render_delete(d, ctx, &state)?;
                return Ok((prefix_ctes(&state.ctes, sql), 0));
            }
            Clause::Set(s) => {
                let sql = write_clause::render_set(s, ctx, &state)?;
                return Ok((prefix_ctes(&state.ctes, sql), 0));
            }
            Clause::Remove(r) => {
                let sql = write_clause::render_remove(r, ctx, &state)?;
                return Ok((prefix_ctes(&state.ctes, sql), 0));
            }
            Clause::Unwind(_) => return Err(GenerationError::Unsupported("UNWIND")),
            Clause::Call(_) => return Err(GenerationError::Unsupported("CALL")),
        }
    }

    Err(GenerationError::MissingReturn)
}

fn prefix_ctes(ctes: &[Cte], tail: String) -> String {
    if ctes.is_empty() {
        return tail;
    }
    let recursive = ctes.iter().any(|cte| cte.recursive);
    let definitions: Vec<String> = ctes
        .iter()
        .map(|cte| format!("{} AS ({})", cte.name, cte.body))
        .collect();
    format!(
        "WITH {}{} {}",
        if recursive { "RECURSIVE " } else { "" },
        definitions.join(", "),
        tail
    )
}
