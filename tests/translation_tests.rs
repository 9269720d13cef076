//! End-to-end translation scenarios: Cypher text in, SQL plus positional
//! parameters out. The tenant id is always `g1` and is bound as `$1`.

use std::collections::HashMap;

use cypherpg::{generate, parse, GenerationError};
use serde_json::{json, Value};

fn translate(text: &str) -> (String, Vec<Value>) {
    translate_with(text, &HashMap::new())
}

fn translate_with(text: &str, params: &HashMap<String, Value>) -> (String, Vec<Value>) {
    let query = parse(text).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", text, e));
    generate(&query, params, Some("g1"))
        .unwrap_or_else(|e| panic!("generation failed for {:?}: {}", text, e))
}

fn translate_err(text: &str) -> GenerationError {
    let query = parse(text).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", text, e));
    generate(&query, &HashMap::new(), Some("g1"))
        .expect_err("expected a generation error")
}

/// Largest `$k` placeholder appearing in the SQL.
fn max_placeholder(sql: &str) -> usize {
    let mut max = 0;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 {
                let n: usize = sql[i + 1..j].parse().unwrap();
                max = max.max(n);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    max
}

#[test]
fn scenario_property_filter_on_labeled_node() {
    let (sql, params) = translate("MATCH (n:Person) WHERE n.age > 25 RETURN n.name");
    assert_eq!(
        sql,
        "SELECT n1.name FROM nodes n1 WHERE n1.group_id = $1 AND n1.type = $2 \
         AND ((n1.properties->>'age')::numeric > $3)"
    );
    assert_eq!(params, vec![json!("g1"), json!("Person"), json!(25)]);
}

#[test]
fn scenario_relationship_join() {
    let (sql, params) = translate("MATCH (a:Person)-[r:KNOWS]->(b:Person) RETURN a.name, b.name");
    assert_eq!(
        sql,
        "SELECT n1.name, n2.name FROM nodes n1 \
         JOIN edges e1 ON e1.source = n1.uuid \
         JOIN nodes n2 ON e1.target = n2.uuid \
         WHERE n1.group_id = $1 AND n1.type = $2 AND e1.group_id = $1 \
         AND e1.relation_type = $3 AND n2.group_id = $1 AND n2.type = $4"
    );
    assert_eq!(
        params,
        vec![json!("g1"), json!("Person"), json!("KNOWS"), json!("Person")]
    );
}

#[test]
fn scenario_variable_length_path() {
    let (sql, params) = translate("MATCH (a)-[:KNOWS*1..3]->(b) RETURN a, b");
    assert!(sql.starts_with("WITH RECURSIVE cte_1 AS ("));
    // Base case filters on the relationship type and tenant.
    assert!(sql.contains(
        "SELECT source, target, 1 AS depth, ARRAY[uuid] AS visited FROM edges \
         WHERE relation_type = $2 AND group_id = $1"
    ));
    // Recursive step bounds the depth and excludes visited edges.
    assert!(sql.contains("p.depth < 3"));
    assert!(sql.contains("NOT e.uuid = ANY(p.visited)"));
    assert!(sql.contains("p.visited || e.uuid"));
    // Outer query joins both endpoints and constrains the depth window.
    assert!(sql.contains("JOIN cte_1 ON cte_1.source = n1.uuid"));
    assert!(sql.contains("JOIN nodes n2 ON cte_1.target = n2.uuid"));
    assert!(sql.contains("cte_1.depth BETWEEN 1 AND 3"));
    assert!(sql.contains("SELECT n1.*, n2.*"));
    assert_eq!(params, vec![json!("g1"), json!("KNOWS")]);
}

#[test]
fn scenario_aggregating_with_becomes_cte_with_having() {
    let (sql, params) = translate(
        "MATCH (p:Person)-[:LIVES_IN]->(c:City) \
         WITH c.name AS city, COUNT(p) AS population WHERE population > 1000 \
         RETURN city, population ORDER BY population DESC",
    );
    assert!(sql.starts_with("WITH cte_1 AS (SELECT n2.name AS city, COUNT(n1.*) AS population"));
    assert!(sql.contains("GROUP BY n2.name"));
    // HAVING sees the aggregate expression, not the output alias.
    assert!(sql.contains("HAVING (COUNT(n1.*) > $5)"));
    assert!(sql.ends_with("SELECT city, population FROM cte_1 ORDER BY population DESC"));
    assert_eq!(
        params,
        vec![
            json!("g1"),
            json!("Person"),
            json!("LIVES_IN"),
            json!("City"),
            json!(1000)
        ]
    );
}

#[test]
fn scenario_starts_with_is_escaped_like() {
    let (sql, params) = translate("MATCH (n:Person) WHERE n.name STARTS WITH 'A' RETURN n");
    assert_eq!(
        sql,
        "SELECT n1.* FROM nodes n1 WHERE n1.group_id = $1 AND n1.type = $2 AND (n1.name LIKE $3)"
    );
    assert_eq!(params, vec![json!("g1"), json!("Person"), json!("A%")]);
}

#[test]
fn like_literals_escape_wildcard_characters() {
    let (_, params) = translate("MATCH (n) WHERE n.code CONTAINS '50%_x\\' RETURN n.code");
    assert_eq!(params[1], json!("%50\\%\\_x\\\\%"));
}

#[test]
fn scenario_optional_match_left_joins() {
    let (sql, params) =
        translate("MATCH (n:Person) OPTIONAL MATCH (n)-[:LIKES]->(m:Movie) RETURN n.name, m.title");
    assert_eq!(
        sql,
        "SELECT n1.name, (n2.properties->>'title') FROM nodes n1 \
         LEFT JOIN edges e1 ON e1.source = n1.uuid AND e1.group_id = $1 AND e1.relation_type = $3 \
         LEFT JOIN nodes n2 ON e1.target = n2.uuid AND n2.group_id = $1 AND n2.type = $4 \
         WHERE n1.group_id = $1 AND n1.type = $2"
    );
    assert_eq!(
        params,
        vec![json!("g1"), json!("Person"), json!("LIKES"), json!("Movie")]
    );
}

#[test]
fn parameters_are_contiguous_with_no_gaps() {
    let cases = [
        "MATCH (n:Person) WHERE n.age > 25 RETURN n.name",
        "MATCH (a:Person)-[r:KNOWS]->(b:Person) RETURN a.name, b.name",
        "MATCH (a)-[:KNOWS*1..3]->(b) RETURN a, b",
        "MATCH (n:Person) WHERE n.name IN ['Ann', 'Bob'] RETURN n ORDER BY n.name LIMIT 2",
        "MATCH (n {name: 'X', age: 4}) RETURN n.age",
    ];
    for text in cases {
        let (sql, params) = translate(text);
        assert_eq!(
            max_placeholder(&sql),
            params.len(),
            "placeholder/parameter mismatch for {:?}: {}",
            text,
            sql
        );
        for index in 1..=params.len() {
            assert!(
                sql.contains(&format!("${}", index)),
                "missing ${} for {:?}: {}",
                index,
                text,
                sql
            );
        }
    }
}

#[test]
fn repeated_named_parameter_binds_once() {
    let mut bound = HashMap::new();
    bound.insert("min".to_string(), json!(10));
    let (sql, params) = translate_with(
        "MATCH (n:Person) WHERE n.age > $min AND n.score > $min RETURN n.name",
        &bound,
    );
    assert_eq!(params, vec![json!("g1"), json!("Person"), json!(10)]);
    assert_eq!(sql.matches("$3").count(), 2);
}

#[test]
fn every_alias_is_tenant_scoped() {
    let (sql, _) = translate("MATCH (a:Person)-[:KNOWS]->(b)-[:LIKES]->(c) RETURN a.name");
    for alias in ["n1", "e1", "n2", "e2", "n3"] {
        assert!(
            sql.contains(&format!("{}.group_id = $1", alias)),
            "alias {} missing tenant predicate in {}",
            alias,
            sql
        );
    }
}

#[test]
fn no_tenant_means_no_group_predicates() {
    let query = parse("MATCH (n:Person) RETURN n.name").unwrap();
    let params = HashMap::new();
    let (sql, values) = generate(&query, &params, None).unwrap();
    assert!(!sql.contains("group_id"));
    assert_eq!(values, vec![json!("Person")]);
}

#[test]
fn group_by_appears_iff_projection_aggregates() {
    let (sql, _) = translate("MATCH (n:Person) RETURN n.city, count(*)");
    assert!(sql.contains("GROUP BY (n1.properties->>'city')"));

    let (sql, _) = translate("MATCH (n:Person) RETURN n.city");
    assert!(!sql.contains("GROUP BY"));

    // Aggregate-only projections group over the whole result.
    let (sql, _) = translate("MATCH (n:Person) RETURN count(*)");
    assert!(!sql.contains("GROUP BY"));

    for aggregate in ["sum", "avg", "min", "max", "collect"] {
        let (sql, _) = translate(&format!(
            "MATCH (n:Person) RETURN n.city, {}(n.score)",
            aggregate
        ));
        assert!(
            sql.contains("GROUP BY (n1.properties->>'city')"),
            "missing GROUP BY for {}",
            aggregate
        );
    }
}

#[test]
fn keyword_case_and_whitespace_do_not_change_sql() {
    let (sql_a, params_a) = translate("MATCH (n:Person) WHERE n.age > 25 RETURN n.name");
    let (sql_b, params_b) = translate("match (n:Person)\n  where n.age > 25\n  return n.name");
    assert_eq!(sql_a, sql_b);
    assert_eq!(params_a, params_b);
}

#[test]
fn concatenated_matches_equal_single_match() {
    let (sql_a, params_a) =
        translate("MATCH (a:Person)-[:KNOWS]->(b) MATCH (b)-[:LIKES]->(c) RETURN a.name");
    let (sql_b, params_b) =
        translate("MATCH (a:Person)-[:KNOWS]->(b), (b)-[:LIKES]->(c) RETURN a.name");
    assert_eq!(sql_a, sql_b);
    assert_eq!(params_a, params_b);
}

#[test]
fn collect_lowers_to_array_agg() {
    let (sql, _) = translate("MATCH (n:Person) RETURN n.city, collect(n.name)");
    assert!(sql.contains("array_agg(n1.name)"));
}

#[test]
fn in_parameter_lowers_to_any() {
    let mut bound = HashMap::new();
    bound.insert("names".to_string(), json!(["Ann", "Bob"]));
    let (sql, params) =
        translate_with("MATCH (n:Person) WHERE n.nick IN $names RETURN n.name", &bound);
    assert!(sql.contains("(n1.properties->>'nick') = ANY($3)"));
    assert_eq!(params[2], json!(["Ann", "Bob"]));
}

#[test]
fn union_composes_and_checks_shape() {
    let (sql, params) =
        translate("MATCH (a:Person) RETURN a.name UNION MATCH (b:Company) RETURN b.name");
    assert!(sql.contains(") UNION (SELECT"));
    assert_eq!(params, vec![json!("g1"), json!("Person"), json!("Company")]);

    assert_eq!(
        translate_err("MATCH (a) RETURN a.x, a.y UNION MATCH (b) RETURN b.x"),
        GenerationError::UnionShapeMismatch { first: 2, other: 1 }
    );
}

#[test]
fn create_node_inserts_with_generated_uuid() {
    let (sql, params) = translate("CREATE (n:Person {name: 'Alice', age: 30})");
    assert_eq!(
        sql,
        "INSERT INTO nodes (uuid, name, type, group_id, properties) \
         VALUES (gen_random_uuid(), $2, $3, $1, $4) \
         RETURNING uuid, name, type, properties"
    );
    assert_eq!(params[3], json!({"age": 30, "name": "Alice"}));
}

#[test]
fn create_edge_uses_matched_aliases() {
    let (sql, _) = translate(
        "MATCH (a:Person), (b:Person) WHERE a.name = 'A' AND b.name = 'B' \
         CREATE (a)-[:KNOWS]->(b)",
    );
    assert!(sql.contains("INSERT INTO edges (uuid, source, target, relation_type, group_id, properties)"));
    assert!(sql.contains("SELECT gen_random_uuid(), n1.uuid, n2.uuid,"));
    assert!(sql.contains("FROM nodes n1, nodes n2 WHERE"));
}

#[test]
fn merge_upserts_with_conditional_update() {
    let (sql, _) = translate(
        "MERGE (n:Person {name: 'Alice'}) ON CREATE SET n.created = 1 ON MATCH SET n.seen = 2",
    );
    assert!(sql.contains("ON CONFLICT (name) DO UPDATE SET"));
    assert!(sql.contains("jsonb_set(nodes.properties, '{seen}'"));
}

#[test]
fn merge_on_non_column_key_is_rejected() {
    // A JSON-only key map has no reachable ON CONFLICT target; refusing
    // beats emitting an insert dressed up as an upsert.
    assert_eq!(
        translate_err("MERGE (n:Person {email: 'a@x.com'})"),
        GenerationError::Unsupported("MERGE keyed on non-column property")
    );
}

#[test]
fn arithmetic_precedence_survives_translation() {
    let (sql, params) = translate("MATCH (n:Person) WHERE n.score > n.bonus + 1 RETURN n.name");
    // The comparison takes the whole sum as its right operand.
    assert!(sql.contains(
        "((n1.properties->>'score') > ((n1.properties->>'bonus') + $3))"
    ));
    assert_eq!(params[2], json!(1));

    let (sql, _) = translate("MATCH (n) RETURN n.base + n.rate * 8 AS pay");
    assert!(sql.contains(
        "((n1.properties->>'base') + ((n1.properties->>'rate') * $2)) AS pay"
    ));
}

#[test]
fn detach_delete_removes_edges_first() {
    let (sql, _) = translate("MATCH (n {name: 'Andres'}) DETACH DELETE n");
    let first_semicolon = sql.find("; ").expect("expected two statements");
    let (edges_stmt, nodes_stmt) = sql.split_at(first_semicolon);
    assert!(edges_stmt.starts_with("DELETE FROM edges WHERE source IN"));
    assert!(nodes_stmt.contains("DELETE FROM nodes WHERE uuid IN"));
}

#[test]
fn set_writes_json_and_columns() {
    let (sql, _) = translate("MATCH (n {name: 'A'}) SET n.age = 30");
    assert!(sql.contains("UPDATE nodes SET properties = jsonb_set(properties, '{age}', to_jsonb($"));
}

#[test]
fn remove_strips_json_key() {
    let (sql, _) = translate("MATCH (n {name: 'A'}) REMOVE n.age");
    assert!(sql.contains("UPDATE nodes SET properties = properties - 'age'"));
}

#[test]
fn unsupported_constructs_raise_generation_errors() {
    assert_eq!(
        translate_err("UNWIND [1, 2, 3] AS x RETURN x"),
        GenerationError::Unsupported("UNWIND")
    );
    assert_eq!(
        translate_err("CALL db.labels() YIELD label RETURN label"),
        GenerationError::Unsupported("CALL")
    );
    assert_eq!(
        translate_err("MATCH (n) RETURN [x IN n.tags | x]"),
        GenerationError::Unsupported("list comprehension")
    );
    assert_eq!(
        translate_err("MATCH shortestPath((a)-[:KNOWS*]-(b)) RETURN a"),
        GenerationError::Unsupported("shortestPath")
    );
}

#[test]
fn generation_errors_carry_descriptive_messages() {
    let message = translate_err("UNWIND [1] AS x RETURN x").to_string();
    assert!(message.contains("UNWIND"));

    let message = translate_err("MATCH (n) SET m.age = 1").to_string();
    assert!(message.contains("`m`"));
}

#[test]
fn whole_variable_through_aggregating_with_is_an_error() {
    assert_eq!(
        translate_err("MATCH (n:Person) WITH n, count(*) AS c RETURN c"),
        GenerationError::WholeVariableInAggregation("n".to_string())
    );
}

#[test]
fn with_boundary_rebinds_scope_to_cte_columns() {
    let (sql, _) = translate(
        "MATCH (n:Person) WITH n.age AS age WHERE age > 30 RETURN age ORDER BY age DESC",
    );
    assert!(sql.starts_with("WITH cte_1 AS (SELECT (n1.properties->>'age') AS age"));
    // The WITH-level filter compiles inside the CTE (no aggregation, so
    // WHERE rather than HAVING), and the outer query reads the CTE column.
    assert!(sql.contains("((n1.properties->>'age')::numeric > $3)"));
    assert!(sql.ends_with("SELECT age FROM cte_1 ORDER BY age DESC"));
}

#[test]
fn parse_errors_carry_position_and_expectations() {
    let err = parse("MATCH (n:Person RETURN n").unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.column > 1);
    assert!(!err.expected_tokens.is_empty());

    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn undirected_single_hop_is_a_disjunction() {
    let (sql, _) = translate("MATCH (a)-[:KNOWS]-(b) RETURN a.name");
    assert!(sql.contains("ON (e1.source = n1.uuid OR e1.target = n1.uuid)"));
    assert!(sql.contains("(e1.source = n1.uuid AND e1.target = n2.uuid)"));
    assert!(sql.contains("(e1.target = n1.uuid AND e1.source = n2.uuid)"));
}

#[test]
fn unbounded_variable_length_path_omits_upper_bound() {
    let (sql, _) = translate("MATCH (a)-[:KNOWS*]->(b) RETURN a, b");
    assert!(!sql.contains("p.depth <"));
    assert!(sql.contains("cte_1.depth >= 1"));
}
