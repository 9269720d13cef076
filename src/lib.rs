//! cypherpg - openCypher to PostgreSQL translation for property graphs
//! stored in two JSONB-backed tables (`nodes` and `edges`) partitioned by a
//! multi-tenant `group_id`.
//!
//! The crate exposes two pure functions:
//! - [`parse`] turns Cypher text into a typed AST, or a [`ParseError`] with
//!   line/column information.
//! - [`generate`] lowers the AST to a SQL string plus a positional parameter
//!   list ready for prepared-statement execution, or a [`GenerationError`].
//!
//! Both are deterministic, hold no shared state, and are safe to call from
//! concurrent callers. Connection pooling, execution, and transport live in
//! consuming layers.

pub mod open_cypher_parser;
pub mod postgres_query_generator;

pub use open_cypher_parser::{parse, strip_comments, ParseError};
pub use postgres_query_generator::{generate, GenerationError};
