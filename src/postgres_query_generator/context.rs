//! Mutable state threaded through one `generate` call: alias counters,
//! the positional parameter accumulator, the named-parameter intern table,
//! the tenant placeholder, and the variable scope. Owned exclusively by a
//! single generation and discarded on return.

use std::collections::HashMap;

use serde_json::Value;

/// What a Cypher variable currently resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A row of the node table, e.g. `n1`.
    Node { alias: String },
    /// A row of the edge table, e.g. `e1`.
    Edge { alias: String },
    /// An output column of the CTE produced by a preceding WITH. `packed`
    /// marks whole-variable projections stored as `row_to_json` documents,
    /// whose property access lowers to `->>`.
    Column { name: String, packed: bool },
}

pub struct GenerationContext<'a> {
    bound: &'a HashMap<String, Value>,
    params: Vec<Value>,
    named: HashMap<&'a str, usize>,
    tenant: Option<String>,
    variables: HashMap<&'a str, Binding>,
    node_counter: usize,
    edge_counter: usize,
    cte_counter: usize,
}

impl<'a> GenerationContext<'a> {
    /// The tenant id, when supplied, is interned immediately so it always
    /// occupies positional index 1.
    pub fn new(bound: &'a HashMap<String, Value>, tenant_id: Option<&str>) -> Self {
        let mut ctx = GenerationContext {
            bound,
            params: Vec::new(),
            named: HashMap::new(),
            tenant: None,
            variables: HashMap::new(),
            node_counter: 0,
            edge_counter: 0,
            cte_counter: 0,
        };
        if let Some(tenant) = tenant_id {
            let placeholder = ctx.add_param(Value::String(tenant.to_string()));
            ctx.tenant = Some(placeholder);
        }
        ctx
    }

    /// Append a positional parameter and return its `$k` placeholder.
    pub fn add_param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    /// Intern a `$name` parameter: repeated occurrences share one index.
    pub fn named_placeholder(&mut self, name: &'a str) -> String {
        if let Some(index) = self.named.get(name) {
            return format!("${}", index);
        }
        let value = self.bound.get(name).cloned().unwrap_or(Value::Null);
        let placeholder = self.add_param(value);
        self.named.insert(name, self.params.len());
        placeholder
    }

    /// The value the caller bound for `$name`, used for comparison typing.
    pub fn named_value(&self, name: &str) -> Option<&Value> {
        self.bound.get(name)
    }

    /// `alias.group_id = $1` when a tenant id was supplied.
    pub fn tenant_predicate(&self, alias: &str) -> Option<String> {
        self.tenant
            .as_ref()
            .map(|placeholder| format!("{}.group_id = {}", alias, placeholder))
    }

    /// Tenant placeholder (`$1`) without a column qualifier, for CTE bodies
    /// and INSERT value lists.
    pub fn tenant_placeholder(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Resolve `var` to a node alias, creating `n{k}` on first mention.
    /// Returns the alias and whether it was newly created.
    pub fn bind_node(&mut self, var: Option<&'a str>) -> (String, bool) {
        if let Some(name) = var {
            if let Some(Binding::Node { alias }) = self.variables.get(name) {
                return (alias.clone(), false);
            }
        }
        self.node_counter += 1;
        let alias = format!("n{}", self.node_counter);
        if let Some(name) = var {
            self.variables
                .insert(name, Binding::Node { alias: alias.clone() });
        }
        (alias, true)
    }

    /// Resolve `var` to an edge alias, creating `e{k}` on first mention.
    pub fn bind_edge(&mut self, var: Option<&'a str>) -> (String, bool) {
        if let Some(name) = var {
            if let Some(Binding::Edge { alias }) = self.variables.get(name) {
                return (alias.clone(), false);
            }
        }
        self.edge_counter += 1;
        let alias = format!("e{}", self.edge_counter);
        if let Some(name) = var {
            self.variables
                .insert(name, Binding::Edge { alias: alias.clone() });
        }
        (alias, true)
    }

    pub fn next_cte_name(&mut self) -> String {
        self.cte_counter += 1;
        format!("cte_{}", self.cte_counter)
    }

    pub fn lookup(&self, var: &str) -> Option<&Binding> {
        self.variables.get(var)
    }

    /// A WITH boundary: every prior binding is replaced by the CTE's output
    /// columns.
    pub fn enter_cte_scope(&mut self, columns: Vec<(&'a str, bool)>) {
        self.variables.clear();
        for (name, packed) in columns {
            self.variables.insert(
                name,
                Binding::Column {
                    name: name.to_string(),
                    packed,
                },
            );
        }
    }

    /// A UNION boundary: bindings reset, parameters and counters persist so
    /// placeholders stay contiguous across branches.
    pub fn reset_scope(&mut self) {
        self.variables.clear();
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}
