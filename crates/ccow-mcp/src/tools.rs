//! The set of tools a server advertises.
//!
//! Definitions come from the `catalog` module; the registry orders them by
//! name for `tools/list` and answers lookups by name.

use crate::catalog;
use crate::protocol::ToolDefinition;
use std::collections::BTreeMap;

/// Tool definitions, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn from_tools(tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// The full ComplianceCow catalogue.
    pub fn catalog() -> Self {
        Self::from_tools(catalog::all_tools())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.tools.values().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether calling `name` only reads from the backend.
    ///
    /// Unknown tools and tools without annotations are not read-only.
    pub fn is_read_only(&self, name: &str) -> bool {
        self.get(name)
            .and_then(|t| t.annotations.as_ref())
            .and_then(|a| a.read_only)
            .unwrap_or(false)
    }

    /// Names of the tools that change backend state.
    pub fn side_effecting(&self) -> Vec<&str> {
        self.tools
            .keys()
            .map(String::as_str)
            .filter(|name| !self.is_read_only(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::names;
    use crate::protocol::ToolAnnotations;
    use serde_json::json;

    fn tool(name: &str, annotations: Option<ToolAnnotations>) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
            annotations,
        }
    }

    #[test]
    fn test_list_is_ordered_by_name() {
        let registry = ToolRegistry::from_tools([
            tool("list_assets", None),
            tool("execute_action", None),
            tool("fetch_checks", None),
        ]);

        let names: Vec<_> = registry.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["execute_action", "fetch_checks", "list_assets"]);
    }

    #[test]
    fn test_missing_annotations_are_not_read_only() {
        let registry = ToolRegistry::from_tools([
            tool("plain", None),
            tool("reader", Some(ToolAnnotations::read_only())),
        ]);

        assert!(!registry.is_read_only("plain"));
        assert!(registry.is_read_only("reader"));
        assert!(!registry.is_read_only("missing"));
        assert_eq!(registry.side_effecting(), vec!["plain"]);
    }

    #[test]
    fn test_catalog_has_one_action_tool() {
        let registry = ToolRegistry::catalog();
        assert!(registry.contains(names::FETCH_CHECKS));
        assert_eq!(registry.side_effecting(), vec![names::EXECUTE_ACTION]);
    }
}
