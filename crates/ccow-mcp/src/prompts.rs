//! Prompt templates served through `prompts/list` and `prompts/get`.
//!
//! Prompts never touch the backend. Each one renders its arguments into a
//! single user message.

use crate::error::McpError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const GENERATE_CYPHER_QUERY_FOR_CONTROL: &str = "generate_cypher_query_for_control";
pub const LIST_AS_TABLE: &str = "list_as_table_prompt";
pub const GENERATE_CHART: &str = "generate_chart_prompt";

/// How to write a graph query that finds a control, shared with the
/// `fetch_controls` tool.
pub const CYPHER_GUIDANCE: &str = "Write a query for execute_cypher_query that matches the \
    control and its children (HAS_CHILD) using CONTAINS on the name properties, returning \
    control_name, displayable_alias and assessment_name when available. If it returns no \
    rows, target the child controls.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

/// One entry of `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: Some(description.to_string()),
        required,
    }
}

pub fn all_prompts() -> Vec<PromptDefinition> {
    vec![
        PromptDefinition {
            name: GENERATE_CYPHER_QUERY_FOR_CONTROL.to_string(),
            description: Some(
                "Guide the writing of a graph query for a control and its child controls"
                    .to_string(),
            ),
            arguments: vec![
                argument("control_name", "Control name or part of it", false),
                argument(
                    "unique_nodes",
                    "Unique property values from fetch_unique_node_data_and_schema",
                    false,
                ),
                argument("schema", "Graph schema description", false),
            ],
        },
        PromptDefinition {
            name: LIST_AS_TABLE.to_string(),
            description: Some("Render a list of dashboard controls as a table".to_string()),
            arguments: vec![argument("response", "Tool output to tabulate", true)],
        },
        PromptDefinition {
            name: GENERATE_CHART.to_string(),
            description: Some(
                "Chart the compliance overview of the latest quarter's dashboard".to_string(),
            ),
            arguments: Vec::new(),
        },
    ]
}

/// Text of an argument; JSON values other than strings are inlined as JSON.
fn text(arguments: &Map<String, Value>, name: &str) -> String {
    match arguments.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render a prompt into its `prompts/get` result.
pub fn render(name: &str, arguments: &Map<String, Value>) -> Result<Value, McpError> {
    let definition = all_prompts()
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| McpError::PromptNotFound {
            name: name.to_string(),
        })?;

    let missing: Vec<&str> = definition
        .arguments
        .iter()
        .filter(|a| a.required && text(arguments, &a.name).trim().is_empty())
        .map(|a| a.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(McpError::InvalidPromptArguments {
            name: name.to_string(),
            missing: missing.join(", "),
        });
    }

    let body = match name {
        GENERATE_CYPHER_QUERY_FOR_CONTROL => format!(
            "{}\n\nInputs:\n- control_name: {}\n- unique_nodes: {}\n- schema: {}",
            CYPHER_GUIDANCE,
            text(arguments, "control_name"),
            text(arguments, "unique_nodes"),
            text(arguments, "schema"),
        ),
        LIST_AS_TABLE => format!(
            "Return the data as a table with these columns:\n\
             - Name: controlName\n\
             - Assigned To: email in lastAssignedTo, if available\n\
             - Assignment Status: status, if available\n\
             - Compliance Status: complianceStatus\n\
             - Due Date: dueDate\n\
             - Score: score\n\
             - Priority: priority\n\n\
             DATA: {}",
            text(arguments, "response"),
        ),
        _ => "Fetch the dashboard data for the latest quarter and chart it: a compliance \
              overview with the total number of controls and a count per control status, and \
              a progress bar for controlAssignmentStatus."
            .to_string(),
    };

    Ok(json!({
        "description": definition.description,
        "messages": [{
            "role": "user",
            "content": {"type": "text", "text": body}
        }]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_cypher_prompt_includes_inputs() {
        let rendered = render(
            GENERATE_CYPHER_QUERY_FOR_CONTROL,
            &args(json!({"control_name": "MFA", "schema": {"labels": ["Control"]}})),
        )
        .unwrap();

        let text = rendered["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.starts_with(CYPHER_GUIDANCE));
        assert!(text.contains("- control_name: MFA"));
        assert!(text.contains(r#"{"labels":["Control"]}"#));
        assert_eq!(rendered["messages"][0]["role"], "user");
    }

    #[test]
    fn test_table_prompt_requires_response() {
        let err = render(LIST_AS_TABLE, &Map::new()).unwrap_err();
        assert!(err.to_string().contains("response"));

        let rendered = render(LIST_AS_TABLE, &args(json!({"response": "[]"}))).unwrap();
        let text = rendered["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.ends_with("DATA: []"));
    }

    #[test]
    fn test_unknown_prompt() {
        let err = render("summarize_everything", &Map::new()).unwrap_err();
        assert!(matches!(err, McpError::PromptNotFound { .. }));
    }

    #[test]
    fn test_every_prompt_renders() {
        for prompt in all_prompts() {
            let arguments: Map<String, Value> = prompt
                .arguments
                .iter()
                .map(|a| (a.name.clone(), json!("x")))
                .collect();
            assert!(render(&prompt.name, &arguments).is_ok(), "{}", prompt.name);
        }
    }
}
