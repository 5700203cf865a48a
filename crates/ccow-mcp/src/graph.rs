//! Graph query support.
//!
//! Two independent operations: grounding a question in the graph schema
//! ([`GraphQueryTranslator::resolve_schema`]) and running a caller-written
//! query ([`GraphQueryTranslator::run_query`]). Queries are checked locally
//! and only read-only, well-formed ones are sent to the backend. No query
//! is ever generated here.

use crate::error::ToolError;
use ccow_backend::{BackendClient, endpoints};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static READ_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(OPTIONAL\s+MATCH|MATCH|WITH|UNWIND|CALL|RETURN)\b")
        .expect("read clause pattern")
});

static WRITE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|DELETE|DETACH|SET|REMOVE|DROP)\b")
        .expect("write clause pattern")
});

/// `CALL` of a named procedure; captures the dotted name.
static PROCEDURE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bCALL\s+([A-Za-z_][A-Za-z0-9_]*(?:\s*\.\s*[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("procedure pattern")
});

/// Procedures that only read the graph or its schema.
const READ_PROCEDURES: [&str; 5] = [
    "db.labels",
    "db.relationshiptypes",
    "db.propertykeys",
    "db.indexes",
    "db.constraints",
];

/// Namespaces whose procedures only read.
const READ_PROCEDURE_NAMESPACES: [&str; 2] = ["db.schema.", "apoc.meta."];

fn is_read_procedure(name: &str) -> bool {
    READ_PROCEDURES.contains(&name)
        || READ_PROCEDURE_NAMESPACES
            .iter()
            .any(|namespace| name.starts_with(namespace))
}

/// `.property` accesses, including function namespaces like `apoc.text`.
static PROPERTY_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\s*[A-Za-z_][A-Za-z0-9_]*").expect("property pattern")
});

/// `:Label` and `:REL_TYPE` names.
static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*[A-Za-z_][A-Za-z0-9_]*").expect("label pattern"));

/// Graph nodes, property samples and schema relevant to a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaContext {
    pub node_names: Vec<String>,
    pub unique_property_values: Value,
    pub schema_description: Value,
}

/// Result of a query, rendered for reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// The backend already rendered the result as text.
    Text { text: String },
    /// Flat rows, one line each.
    Rows {
        #[serde(rename = "rowCount")]
        row_count: usize,
        text: String,
    },
    /// A result that does not flatten into rows.
    Raw { result: Value },
}

/// Check that a query is non-empty, balanced and read-only.
pub fn validate_query(query: &str) -> Result<(), ToolError> {
    if query.trim().is_empty() {
        return Err(ToolError::validation("query must not be empty"));
    }
    let stripped = strip_literals(query)?;
    if !READ_CLAUSE.is_match(query) {
        return Err(ToolError::validation(
            "query must start with a read clause (MATCH, OPTIONAL MATCH, WITH, UNWIND, CALL or RETURN)",
        ));
    }

    for call in PROCEDURE_CALL.captures_iter(&stripped) {
        let name = call[1]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if !is_read_procedure(&name) {
            return Err(ToolError::validation(format!(
                "query must be read-only; procedure {} is not allowed",
                name
            )));
        }
    }

    let without_names = PROPERTY_ACCESS.replace_all(&stripped, " ");
    let without_names = LABEL.replace_all(&without_names, " ");
    if let Some(found) = WRITE_CLAUSE.find(&without_names) {
        return Err(ToolError::validation(format!(
            "query must be read-only; found {}",
            found.as_str().to_ascii_uppercase()
        )));
    }
    Ok(())
}

/// Blank out string literals and backtick-quoted names, checking that
/// quotes and brackets are balanced along the way.
fn strip_literals(query: &str) -> Result<String, ToolError> {
    let mut out = String::with_capacity(query.len());
    let mut brackets: Vec<char> = Vec::new();
    let mut chars = query.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == '\\' && c != '`' {
                        chars.next();
                        continue;
                    }
                    if inner == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ToolError::validation(format!("unterminated {} quote", c)));
                }
                out.push(' ');
            }
            '(' | '[' | '{' => {
                brackets.push(c);
                out.push(c);
            }
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if brackets.pop() != Some(expected) {
                    return Err(ToolError::validation(format!("unbalanced '{}'", c)));
                }
                out.push(c);
            }
            other => out.push(other),
        }
    }

    if let Some(open) = brackets.pop() {
        return Err(ToolError::validation(format!("unclosed '{}'", open)));
    }
    Ok(out)
}

/// Render the backend's `result` for reading.
pub fn render_result(result: Value) -> QueryOutput {
    match result {
        Value::String(text) => QueryOutput::Text { text },
        Value::Array(rows) if rows.is_empty() => QueryOutput::Rows {
            row_count: 0,
            text: "No rows returned.".to_string(),
        },
        Value::Array(rows) => match render_rows(&rows) {
            Some(text) => QueryOutput::Rows {
                row_count: rows.len(),
                text,
            },
            None => QueryOutput::Raw {
                result: Value::Array(rows),
            },
        },
        other => QueryOutput::Raw { result: other },
    }
}

fn render_rows(rows: &[Value]) -> Option<String> {
    let mut lines = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let line = match row {
            Value::Object(fields) => {
                let mut parts = Vec::with_capacity(fields.len());
                for (key, value) in fields {
                    parts.push(format!("{}: {}", key, scalar(value)?));
                }
                parts.join(", ")
            }
            other => scalar(other)?,
        };
        lines.push(format!("{}. {}", i + 1, line));
    }
    Some(lines.join("\n"))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Schema grounding and read-only query execution against the graph.
#[derive(Clone)]
pub struct GraphQueryTranslator {
    backend: Arc<dyn BackendClient>,
}

impl GraphQueryTranslator {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Node names, property samples and schema relevant to `question`.
    pub async fn resolve_schema(&self, question: &str) -> Result<SchemaContext, ToolError> {
        if question.trim().is_empty() {
            return Err(ToolError::validation("question must not be empty"));
        }
        let raw = self
            .backend
            .post(
                endpoints::RETRIEVE_UNIQUE_NODE_DATA_AND_SCHEMA,
                &json!({ "user_question": question }),
            )
            .await?;

        let node_names = raw
            .get("node_names")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(SchemaContext {
            node_names,
            unique_property_values: raw
                .get("unique_property_values")
                .cloned()
                .unwrap_or(Value::Null),
            schema_description: raw.get("neo4j_schema").cloned().unwrap_or(Value::Null),
        })
    }

    /// Validate and execute a read-only query.
    pub async fn run_query(&self, query: &str) -> Result<QueryOutput, ToolError> {
        validate_query(query)?;
        debug!(query, "Executing graph query");
        let raw = self
            .backend
            .post(endpoints::EXECUTE_CYPHER_QUERY, &json!({ "query": query }))
            .await?;
        let result = match raw {
            Value::Object(mut map) => map.remove("result").unwrap_or(Value::Null),
            other => other,
        };
        Ok(render_result(result))
    }

    /// The graph schema with the relationship guide for writing queries.
    pub async fn describe_schema(&self) -> Result<Value, ToolError> {
        let schema = self
            .backend
            .post(endpoints::RETRIEVE_GRAPH_SCHEMA_RELATIONSHIP, &json!({}))
            .await?;
        Ok(json!({
            "schema": schema,
            "guidance": {
                "controlStatusValues": {
                    "status": ["Completed", "In Progress", "Pending", "Unassigned"],
                    "complianceStatus": ["COMPLIANT", "NON_COMPLIANT", "NOT_DETERMINED"],
                    "priority": ["Low", "Medium", "High"],
                    "overdue": "due_date < current date while status is In Progress or Pending"
                },
                "commonPatterns": {
                    "findRoots": "MATCH (c:Control) WHERE NOT ()-[:HAS_CHILD]->(c)",
                    "findLeaves": "MATCH (c:Control) WHERE NOT (c)-[:HAS_CHILD]->()",
                    "fullHierarchy": "MATCH (root)-[:HAS_CHILD*]->(descendant)",
                    "evidenceWithControls": "MATCH (c:Control)-[:HAS_EVIDENCE]->(e:Evidence) WHERE NOT (c)-[:HAS_CHILD]->()"
                },
                "notes": [
                    "Evidence exists only on leaf controls",
                    "Use LIMIT and aggregation for large result sets"
                ]
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;

    #[test]
    fn test_accepts_read_queries() {
        for query in [
            "MATCH (c:Control) RETURN c.name LIMIT 5",
            "optional match (c:Control)-[:HAS_EVIDENCE]->(e) return c, e",
            "  WITH 1 AS x RETURN x",
            "UNWIND [1, 2] AS n RETURN n",
            "CALL db.labels()",
            "CALL db.schema.visualization()",
            "call apoc.meta.schema() YIELD value RETURN value",
            "MATCH (c) CALL { WITH c MATCH (c)-->(e) RETURN e } RETURN c, e",
            "MATCH (c:Control {name: 'Set up MFA'}) RETURN c",
            "MATCH (c:Control) WHERE c.name CONTAINS \"create \\\"x\\\"\" RETURN c",
            "MATCH (c:Control) RETURN c.set, c.`delete`",
            "MATCH (n:SetOfRules) RETURN n",
        ] {
            assert!(validate_query(query).is_ok(), "{}", query);
        }
    }

    #[test]
    fn test_rejects_write_queries() {
        for query in [
            "MATCH (c) DETACH DELETE c",
            "MATCH (c:Control) SET c.status = 'Completed'",
            "MATCH (c) WITH c MERGE (d:Control {id: c.id})",
            "MATCH (c) REMOVE c.alias",
            "MATCH (c) create (d)",
            "CALL apoc.create.node(['Control'], {name: 'x'})",
            "CALL apoc.refactor.rename.label('Control', 'Ctrl')",
            "CALL apoc.cypher.doIt('CREATE (n)', {})",
            "MATCH (c) CALL apoc.periodic.iterate('MATCH (n) RETURN n', 'DELETE n', {}) RETURN c",
        ] {
            let err = validate_query(query).unwrap_err();
            assert_eq!(err.kind(), "validation", "{}", query);
        }
    }

    #[test]
    fn test_rejects_malformed_queries() {
        for query in [
            "",
            "   ",
            "MATCH (c:Control RETURN c",
            "MATCH (c:Control)) RETURN c",
            "MATCH (c) WHERE c.name = 'open RETURN c",
            "MATCH [c) RETURN c",
            "DELETE everything",
            "SHOW DATABASES",
        ] {
            assert!(validate_query(query).is_err(), "{}", query);
        }
    }

    #[test]
    fn test_render_rows() {
        let output = render_result(json!([
            {"name": "Access review", "score": 80},
            {"name": "MFA", "score": null}
        ]));
        assert_eq!(
            output,
            QueryOutput::Rows {
                row_count: 2,
                text: "1. name: Access review, score: 80\n2. name: MFA, score: null".to_string()
            }
        );
    }

    #[test]
    fn test_render_empty_and_nested() {
        assert_eq!(
            render_result(json!([])),
            QueryOutput::Rows {
                row_count: 0,
                text: "No rows returned.".to_string()
            }
        );
        let nested = json!([{"c": {"name": "x"}}]);
        assert_eq!(
            render_result(nested.clone()),
            QueryOutput::Raw { result: nested }
        );
        assert_eq!(
            render_result(json!("already text")),
            QueryOutput::Text {
                text: "already text".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::new());
        let graph = GraphQueryTranslator::new(backend.clone());

        let err = graph.run_query("MATCH (n) DELETE n").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_query_zero_rows() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(endpoints::EXECUTE_CYPHER_QUERY, Ok(json!({"result": []})));
        let graph = GraphQueryTranslator::new(backend.clone());

        let output = graph.run_query("MATCH (n:Control) RETURN n").await.unwrap();
        assert_eq!(serde_json::to_value(output).unwrap()["rowCount"], 0);
        assert_eq!(
            backend.calls(endpoints::EXECUTE_CYPHER_QUERY)[0]["query"],
            "MATCH (n:Control) RETURN n"
        );
    }

    #[tokio::test]
    async fn test_resolve_schema_maps_fields() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::RETRIEVE_UNIQUE_NODE_DATA_AND_SCHEMA,
            Ok(json!({
                "node_names": ["Control", "Evidence"],
                "unique_property_values": {"Control": {"status": ["Pending"]}},
                "neo4j_schema": "(:Control)-[:HAS_EVIDENCE]->(:Evidence)"
            })),
        );
        let graph = GraphQueryTranslator::new(backend.clone());

        let context = graph.resolve_schema("which controls lack evidence?").await.unwrap();
        assert_eq!(context.node_names, vec!["Control", "Evidence"]);
        assert_eq!(
            backend.calls(endpoints::RETRIEVE_UNIQUE_NODE_DATA_AND_SCHEMA)[0]["user_question"],
            "which controls lack evidence?"
        );
        assert!(graph.resolve_schema(" ").await.is_err());
    }
}
