//! Fixed relational schema the generator targets: one node table and one
//! edge table, both with a JSONB `properties` column and a multi-tenant
//! `group_id` column. Property access on any name outside these lists routes
//! through JSON extraction.

pub const NODE_TABLE: &str = "nodes";
pub const EDGE_TABLE: &str = "edges";

pub const NODE_COLUMNS: &[&str] = &[
    "uuid",
    "name",
    "type",
    "group_id",
    "summary",
    "properties",
    "created_at",
    "valid_at",
    "invalid_at",
];

pub const EDGE_COLUMNS: &[&str] = &[
    "uuid",
    "source",
    "target",
    "relation_type",
    "group_id",
    "properties",
    "fact",
    "episodes",
    "created_at",
    "valid_at",
    "invalid_at",
];

pub fn is_node_column(name: &str) -> bool {
    NODE_COLUMNS.contains(&name)
}

pub fn is_edge_column(name: &str) -> bool {
    EDGE_COLUMNS.contains(&name)
}
