//! Canonical-text rendering of the AST.
//!
//! The output is valid Cypher: parsing the rendered text yields a
//! structurally equal AST. Operator applications are always parenthesized so
//! precedence survives the round trip.

use std::fmt;

use super::ast::*;

fn write_clauses(f: &mut fmt::Formatter<'_>, clauses: &[Clause<'_>]) -> fmt::Result {
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", clause)?;
    }
    Ok(())
}

impl fmt::Display for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_clauses(f, &self.clauses)?;
        for branch in &self.unions {
            if branch.all {
                write!(f, " UNION ALL ")?;
            } else {
                write!(f, " UNION ")?;
            }
            write_clauses(f, &branch.query.clauses)?;
        }
        Ok(())
    }
}

impl fmt::Display for Clause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Match(m) => write!(f, "{}", m),
            Clause::With(w) => write!(f, "{}", w),
            Clause::Return(r) => write!(f, "{}", r),
            Clause::Create(c) => write!(f, "{}", c),
            Clause::Merge(m) => write!(f, "{}", m),
            Clause::Delete(d) => write!(f, "{}", d),
            Clause::Set(s) => write!(f, "{}", s),
            Clause::Remove(r) => write!(f, "{}", r),
            Clause::Unwind(u) => write!(f, "{}", u),
            Clause::Call(c) => write!(f, "{}", c),
        }
    }
}

fn write_comma_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for MatchClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "OPTIONAL ")?;
        }
        write!(f, "MATCH ")?;
        write_comma_separated(f, &self.patterns)?;
        if let Some(cond) = &self.where_clause {
            write!(f, " WHERE {}", cond)?;
        }
        Ok(())
    }
}

fn write_projection_tail(
    f: &mut fmt::Formatter<'_>,
    order_by: &[SortItem<'_>],
    skip: Option<i64>,
    limit: Option<i64>,
) -> fmt::Result {
    if !order_by.is_empty() {
        write!(f, " ORDER BY ")?;
        write_comma_separated(f, order_by)?;
    }
    if let Some(n) = skip {
        write!(f, " SKIP {}", n)?;
    }
    if let Some(n) = limit {
        write!(f, " LIMIT {}", n)?;
    }
    Ok(())
}

impl fmt::Display for WithClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WITH ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_comma_separated(f, &self.items)?;
        write_projection_tail(f, &self.order_by, self.skip, self.limit)?;
        if let Some(cond) = &self.where_clause {
            write!(f, " WHERE {}", cond)?;
        }
        Ok(())
    }
}

impl fmt::Display for ReturnClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RETURN ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_comma_separated(f, &self.items)?;
        write_projection_tail(f, &self.order_by, self.skip, self.limit)
    }
}

impl fmt::Display for CreateClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE ")?;
        write_comma_separated(f, &self.patterns)
    }
}

impl fmt::Display for MergeClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MERGE {}", self.pattern)?;
        if !self.on_create.is_empty() {
            write!(f, " ON CREATE SET ")?;
            write_comma_separated(f, &self.on_create)?;
        }
        if !self.on_match.is_empty() {
            write!(f, " ON MATCH SET ")?;
            write_comma_separated(f, &self.on_match)?;
        }
        Ok(())
    }
}

impl fmt::Display for DeleteClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detach {
            write!(f, "DETACH ")?;
        }
        write!(f, "DELETE ")?;
        for (i, var) in self.variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", var)?;
        }
        Ok(())
    }
}

impl fmt::Display for SetClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SET ")?;
        write_comma_separated(f, &self.items)
    }
}

impl fmt::Display for SetItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.key, self.merge) {
            (Some(key), _) => write!(f, "{}.{} = {}", self.variable, key, self.value),
            (None, true) => write!(f, "{} += {}", self.variable, self.value),
            (None, false) => write!(f, "{} = {}", self.variable, self.value),
        }
    }
}

impl fmt::Display for RemoveClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REMOVE ")?;
        write_comma_separated(f, &self.items)
    }
}

impl fmt::Display for RemoveItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.variable, self.key)
    }
}

impl fmt::Display for UnwindClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UNWIND {} AS {}", self.expression, self.alias)
    }
}

impl fmt::Display for CallClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CALL {}(", self.procedure)?;
        write_comma_separated(f, &self.arguments)?;
        write!(f, ")")?;
        if let Some(items) = &self.yield_items {
            write!(f, " YIELD ")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ProjectionItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)?;
        if let Some(alias) = self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for SortItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        write!(f, "{} {}", self.expression, order)
    }
}

impl fmt::Display for Pattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(var) = self.path_variable {
            write!(f, "{} = ", var)?;
        }
        match self.shortest_path {
            Some(ShortestPathMode::Shortest) => write!(f, "shortestPath(")?,
            Some(ShortestPathMode::AllShortest) => write!(f, "allShortestPaths(")?,
            None => {}
        }
        write!(f, "{}", self.start)?;
        for (rel, node) in &self.hops {
            write!(f, "{}{}", rel, node)?;
        }
        if self.shortest_path.is_some() {
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn write_property_map(
    f: &mut fmt::Formatter<'_>,
    properties: &[(&str, Expression<'_>)],
) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in properties.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", key, value)?;
    }
    write!(f, "}}")
}

impl fmt::Display for NodePattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        if let Some(var) = self.variable {
            write!(f, "{}", var)?;
        }
        if let Some(label) = self.label {
            write!(f, ":{}", label)?;
        }
        if !self.properties.is_empty() {
            if self.variable.is_some() || self.label.is_some() {
                write!(f, " ")?;
            }
            write_property_map(f, &self.properties)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for RelationshipPattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == Direction::Incoming {
            write!(f, "<-")?;
        } else {
            write!(f, "-")?;
        }
        write!(f, "[")?;
        if let Some(var) = self.variable {
            write!(f, "{}", var)?;
        }
        if !self.types.is_empty() {
            write!(f, ":{}", self.types.join("|"))?;
        }
        if let Some(spec) = &self.length {
            write!(f, "{}", spec)?;
        }
        if !self.properties.is_empty() {
            write!(f, " ")?;
            write_property_map(f, &self.properties)?;
        }
        write!(f, "]")?;
        if self.direction == Direction::Outgoing {
            write!(f, "->")
        } else {
            write!(f, "-")
        }
    }
}

impl fmt::Display for VariableLengthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min_hops, self.max_hops) {
            (Some(min), Some(max)) if min == max => write!(f, "*{}", min),
            (Some(min), Some(max)) => write!(f, "*{}..{}", min, max),
            (Some(1), None) | (None, None) => write!(f, "*"),
            (Some(min), None) => write!(f, "*{}..", min),
            (None, Some(max)) => write!(f, "*..{}", max),
        }
    }
}

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Boolean(true) => write!(f, "true"),
            Literal::Boolean(false) => write!(f, "false"),
            Literal::String(s) => write!(f, "'{}'", s),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Parameter(name) => write!(f, "${}", name),
            Expression::List(items) => {
                write!(f, "[")?;
                write_comma_separated(f, items)?;
                write!(f, "]")
            }
            Expression::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Expression::FunctionCall(call) => write!(f, "{}", call),
            Expression::PropertyAccess(access) => write!(f, "{}.{}", access.base, access.key),
            Expression::Operator(app) => write!(f, "{}", app),
            Expression::Case(case) => write!(f, "{}", case),
            Expression::ListComprehension(comp) => {
                write!(f, "[{} IN {}", comp.variable, comp.list)?;
                if let Some(filter) = &comp.filter {
                    write!(f, " WHERE {}", filter)?;
                }
                if let Some(projection) = &comp.projection {
                    write!(f, " | {}", projection)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for FunctionCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_comma_separated(f, &self.args)?;
        write!(f, ")")
    }
}

impl fmt::Display for OperatorApplication<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Not => write!(f, "NOT {}", self.operands[0]),
            Operator::IsNull | Operator::IsNotNull => {
                write!(f, "{} {}", self.operands[0], self.operator.cypher_token())
            }
            _ => write!(
                f,
                "({} {} {})",
                self.operands[0],
                self.operator.cypher_token(),
                self.operands[1]
            ),
        }
    }
}

impl fmt::Display for CaseExpression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE")?;
        if let Some(subject) = &self.subject {
            write!(f, " {}", subject)?;
        }
        for (when, then) in &self.when_then {
            write!(f, " WHEN {} THEN {}", when, then)?;
        }
        if let Some(else_expr) = &self.else_expr {
            write!(f, " ELSE {}", else_expr)?;
        }
        write!(f, " END")
    }
}
