use thiserror::Error;

/// Structurally valid AST that the generator cannot lower to SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("unsupported construct: {0} cannot be translated to SQL")]
    Unsupported(&'static str),
    #[error("variable `{0}` is not bound by a preceding MATCH")]
    UnboundVariable(String),
    #[error("UNION branches must project the same number of columns ({first} vs {other})")]
    UnionShapeMismatch { first: usize, other: usize },
    #[error(
        "cannot project whole variable `{0}` through an aggregating projection; \
         project individual properties instead"
    )]
    WholeVariableInAggregation(String),
    #[error("projection expression `{0}` requires an alias in WITH")]
    MissingProjectionAlias(String),
    #[error("query has no RETURN or write clause to terminate it")]
    MissingReturn,
    #[error("property map values must be literals or parameters, found `{0}`")]
    NonLiteralPropertyValue(String),
}
