//! Typed AST for the supported openCypher subset.
//!
//! Every identifier, label, property key, and string literal borrows from the
//! query text (`&'a str`), so source positions stay recoverable and no
//! allocation happens during parsing. Each subtree has a single owner; the
//! generator walks the tree by reference.

/// A parsed statement: a clause sequence plus any `UNION [ALL]` branches.
#[derive(Debug, PartialEq, Clone)]
pub struct Query<'a> {
    /// Top-level clauses in source order.
    pub clauses: Vec<Clause<'a>>,
    /// `UNION` branches; each nested query carries no further unions.
    pub unions: Vec<UnionBranch<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct UnionBranch<'a> {
    /// `UNION ALL` keeps duplicates, plain `UNION` removes them.
    pub all: bool,
    pub query: Query<'a>,
}

/// One top-level clause. The parser preserves source order; the generator
/// gives the sequence its meaning.
#[derive(Debug, PartialEq, Clone)]
pub enum Clause<'a> {
    Match(MatchClause<'a>),
    With(WithClause<'a>),
    Return(ReturnClause<'a>),
    Create(CreateClause<'a>),
    Merge(MergeClause<'a>),
    Delete(DeleteClause<'a>),
    Set(SetClause<'a>),
    Remove(RemoveClause<'a>),
    /// Parsed but rejected by the generator.
    Unwind(UnwindClause<'a>),
    /// Parsed but rejected by the generator.
    Call(CallClause<'a>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct MatchClause<'a> {
    pub optional: bool,
    pub patterns: Vec<Pattern<'a>>,
    pub where_clause: Option<Expression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct WithClause<'a> {
    pub items: Vec<ProjectionItem<'a>>,
    pub distinct: bool,
    pub order_by: Vec<SortItem<'a>>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Filters the projected rows; becomes HAVING when the projection
    /// aggregates.
    pub where_clause: Option<Expression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ReturnClause<'a> {
    pub items: Vec<ProjectionItem<'a>>,
    pub distinct: bool,
    pub order_by: Vec<SortItem<'a>>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CreateClause<'a> {
    pub patterns: Vec<Pattern<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MergeClause<'a> {
    pub pattern: Pattern<'a>,
    pub on_match: Vec<SetItem<'a>>,
    pub on_create: Vec<SetItem<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct DeleteClause<'a> {
    pub detach: bool,
    pub variables: Vec<&'a str>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SetClause<'a> {
    pub items: Vec<SetItem<'a>>,
}

/// `v.k = expr`, or `v += map` when `merge` is set (no `key`).
#[derive(Debug, PartialEq, Clone)]
pub struct SetItem<'a> {
    pub variable: &'a str,
    pub key: Option<&'a str>,
    pub value: Expression<'a>,
    pub merge: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RemoveClause<'a> {
    pub items: Vec<RemoveItem<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RemoveItem<'a> {
    pub variable: &'a str,
    pub key: &'a str,
}

/// `UNWIND expr AS alias` - accepted by the grammar so the generator can
/// report it as unsupported instead of failing with a parse error.
#[derive(Debug, PartialEq, Clone)]
pub struct UnwindClause<'a> {
    pub expression: Expression<'a>,
    pub alias: &'a str,
}

/// `CALL proc.name(args) [YIELD a, b]` - accepted by the grammar, rejected
/// by the generator.
#[derive(Debug, PartialEq, Clone)]
pub struct CallClause<'a> {
    pub procedure: &'a str,
    pub arguments: Vec<Expression<'a>>,
    pub yield_items: Option<Vec<&'a str>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ProjectionItem<'a> {
    pub expression: Expression<'a>,
    pub alias: Option<&'a str>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SortItem<'a> {
    pub expression: Expression<'a>,
    pub order: SortOrder,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A path: a start node followed by zero or more (relationship, node) hops.
/// `p = (a)-[:T]->(b)` binds `p` as the path variable; `shortestPath(...)`
/// wrappers are recorded so the generator can reject them explicitly.
#[derive(Debug, PartialEq, Clone)]
pub struct Pattern<'a> {
    pub path_variable: Option<&'a str>,
    pub shortest_path: Option<ShortestPathMode>,
    pub start: NodePattern<'a>,
    pub hops: Vec<(RelationshipPattern<'a>, NodePattern<'a>)>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ShortestPathMode {
    Shortest,
    AllShortest,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NodePattern<'a> {
    pub variable: Option<&'a str>,
    pub label: Option<&'a str>,
    /// Inline `{k: v, ...}` map, desugared to conjunctive predicates.
    pub properties: Vec<(&'a str, Expression<'a>)>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RelationshipPattern<'a> {
    pub variable: Option<&'a str>,
    /// Alternatives from `:A|B|C`; empty means any type.
    pub types: Vec<&'a str>,
    pub direction: Direction,
    /// `Some` for `*`, `*n`, `*n..`, `*..m`, `*n..m`; `None` for a single hop.
    pub length: Option<VariableLengthSpec>,
    pub properties: Vec<(&'a str, Expression<'a>)>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Direction {
    /// `->`
    Outgoing,
    /// `<-`
    Incoming,
    /// `-` (undirected)
    Either,
}

/// Hop bounds for a variable-length relationship. `min_hops` defaults to 1;
/// `max_hops == None` means unbounded.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct VariableLengthSpec {
    pub min_hops: Option<u32>,
    pub max_hops: Option<u32>,
}

impl VariableLengthSpec {
    /// `*2` becomes min=2, max=2
    pub fn fixed(hops: u32) -> Self {
        Self {
            min_hops: Some(hops),
            max_hops: Some(hops),
        }
    }

    /// `*1..3` becomes min=1, max=3
    pub fn range(min: u32, max: u32) -> Self {
        Self {
            min_hops: Some(min),
            max_hops: Some(max),
        }
    }

    /// `*..5` becomes min=1, max=5
    pub fn max_only(max: u32) -> Self {
        Self {
            min_hops: Some(1),
            max_hops: Some(max),
        }
    }

    /// `*2..` becomes min=2, unbounded
    pub fn min_only(min: u32) -> Self {
        Self {
            min_hops: Some(min),
            max_hops: None,
        }
    }

    /// `*` becomes min=1, unbounded
    pub fn unbounded() -> Self {
        Self {
            min_hops: Some(1),
            max_hops: None,
        }
    }

    pub fn effective_min_hops(&self) -> u32 {
        self.min_hops.unwrap_or(1)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal<'a> {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(&'a str),
    Null,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Operator {
    // binary
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    Exponentiation,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    /// `=~`
    RegexMatch,
    And,
    Or,
    Xor,
    In,
    NotIn,
    // string predicates
    StartsWith,
    EndsWith,
    Contains,
    // unary prefix
    Not,
    // unary postfix
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Surface spelling, used by the pretty-printer.
    pub fn cypher_token(&self) -> &'static str {
        match self {
            Operator::Addition => "+",
            Operator::Subtraction => "-",
            Operator::Multiplication => "*",
            Operator::Division => "/",
            Operator::Modulo => "%",
            Operator::Exponentiation => "^",
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThanEqual => ">=",
            Operator::RegexMatch => "=~",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Xor => "XOR",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::Contains => "CONTAINS",
            Operator::Not => "NOT",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operators whose comparison typing depends on the right-hand operand.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::GreaterThan
                | Operator::LessThanEqual
                | Operator::GreaterThanEqual
        )
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct OperatorApplication<'a> {
    pub operator: Operator,
    pub operands: Vec<Expression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct PropertyAccess<'a> {
    pub base: &'a str,
    pub key: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionCall<'a> {
    pub name: &'a str,
    pub distinct: bool,
    pub args: Vec<Expression<'a>>,
}

/// `CASE [subject] WHEN .. THEN .. [ELSE ..] END`; `subject` present for the
/// simple form, absent for the searched form.
#[derive(Debug, PartialEq, Clone)]
pub struct CaseExpression<'a> {
    pub subject: Option<Box<Expression<'a>>>,
    pub when_then: Vec<(Expression<'a>, Expression<'a>)>,
    pub else_expr: Option<Box<Expression<'a>>>,
}

/// `[x IN list WHERE cond | expr]` - accepted by the grammar, rejected by
/// the generator.
#[derive(Debug, PartialEq, Clone)]
pub struct ListComprehension<'a> {
    pub variable: &'a str,
    pub list: Expression<'a>,
    pub filter: Option<Expression<'a>>,
    pub projection: Option<Expression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression<'a> {
    Literal(Literal<'a>),
    /// A variable reference, including the pseudo-variable `*` in `count(*)`.
    Variable(&'a str),
    /// `$name`
    Parameter(&'a str),
    List(Vec<Expression<'a>>),
    Map(Vec<(&'a str, Expression<'a>)>),
    FunctionCall(FunctionCall<'a>),
    PropertyAccess(PropertyAccess<'a>),
    Operator(OperatorApplication<'a>),
    Case(CaseExpression<'a>),
    ListComprehension(Box<ListComprehension<'a>>),
}
