//! Argument validation for MCP tool calls.
//!
//! Each tool's input schema is compiled once and every call is checked
//! against it before any backend request is made. Handlers then read the
//! validated arguments through [`Args`].

use crate::error::{McpError, ToolError};
use crate::protocol::ToolDefinition;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Compiled input schemas, keyed by tool name.
pub struct ArgumentValidator {
    validators: HashMap<String, jsonschema::Validator>,
}

impl std::fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentValidator")
            .field("tools", &self.validators.len())
            .finish()
    }
}

impl ArgumentValidator {
    /// Compile the input schema of every tool.
    pub fn new<'a>(tools: impl IntoIterator<Item = &'a ToolDefinition>) -> Result<Self, McpError> {
        let mut validators = HashMap::new();
        for tool in tools {
            let validator = jsonschema::validator_for(&tool.input_schema).map_err(|e| {
                McpError::InvalidSchema {
                    tool: tool.name.clone(),
                    reason: e.to_string(),
                }
            })?;
            validators.insert(tool.name.clone(), validator);
        }
        Ok(Self { validators })
    }

    /// Validate `arguments` for `tool`. Missing arguments count as `{}`.
    pub fn validate(&self, tool: &str, arguments: &Value) -> Result<(), ToolError> {
        let Some(validator) = self.validators.get(tool) else {
            return Err(ToolError::validation(format!("unknown tool: {}", tool)));
        };

        let empty = Value::Object(Map::new());
        let instance = if arguments.is_null() { &empty } else { arguments };

        let messages: Vec<String> = validator
            .iter_errors(instance)
            .map(|error| {
                let path = error.instance_path().to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{}: {}", path, error)
                }
            })
            .collect();

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ToolError::Validation(format!(
                "invalid arguments for {}: {}",
                tool,
                messages.join("; ")
            )))
        }
    }
}

/// Read access to the arguments of a validated call.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    value: &'a Value,
}

impl<'a> Args<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// A string argument. Blank strings count as absent.
    pub fn str(&self, name: &str) -> Option<&'a str> {
        self.value
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn required_str(&self, name: &str) -> Result<&'a str, ToolError> {
        self.str(name)
            .ok_or_else(|| ToolError::validation(format!("'{}' is required", name)))
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        self.value.get(name).and_then(Value::as_u64)
    }

    pub fn bool(&self, name: &str) -> bool {
        self.value
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A list of non-blank strings; absent lists are empty.
    pub fn str_list(&self, name: &str) -> Vec<String> {
        self.value
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, names};
    use serde_json::json;

    fn validator() -> ArgumentValidator {
        ArgumentValidator::new(catalog::all_tools().iter()).unwrap()
    }

    #[test]
    fn test_every_catalog_schema_compiles() {
        let tools = catalog::all_tools();
        assert!(ArgumentValidator::new(tools.iter()).is_ok());
    }

    #[test]
    fn test_missing_required_argument() {
        let err = validator()
            .validate(names::FETCH_CHECKS, &json!({"id": "run-1"}))
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("resourceType"));
    }

    #[test]
    fn test_page_zero_rejected() {
        let err = validator()
            .validate(
                names::FETCH_ASSESSMENT_RUNS,
                &json!({"id": "a-1", "page": 0}),
            )
            .unwrap_err();
        assert!(err.to_string().contains("/page"));
    }

    #[test]
    fn test_period_pattern() {
        let v = validator();
        assert!(
            v.validate(names::GET_DASHBOARD_DATA, &json!({"period": "Q2 2024"}))
                .is_ok()
        );
        assert!(
            v.validate(names::GET_DASHBOARD_DATA, &json!({"period": "Q5 2024"}))
                .is_err()
        );
    }

    #[test]
    fn test_null_arguments_are_empty_object() {
        assert!(validator().validate(names::LIST_ASSETS, &Value::Null).is_ok());
        assert!(
            validator()
                .validate(names::FETCH_EVIDENCE_RECORDS, &Value::Null)
                .is_err()
        );
    }

    #[test]
    fn test_args_accessors() {
        let value = json!({
            "name": "  ctrl ",
            "blank": "  ",
            "page": 3,
            "summaryOnly": true,
            "ids": ["a", " ", "b"]
        });
        let args = Args::new(&value);
        assert_eq!(args.str("name"), Some("ctrl"));
        assert_eq!(args.str("blank"), None);
        assert!(args.required_str("missing").is_err());
        assert_eq!(args.u64("page"), Some(3));
        assert!(args.bool("summaryOnly"));
        assert!(!args.bool("other"));
        assert_eq!(args.str_list("ids"), vec!["a", "b"]);
        assert!(args.str_list("missing").is_empty());
    }
}
