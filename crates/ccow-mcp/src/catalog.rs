//! The tool catalogue.
//!
//! Every tool the server advertises, with its JSON input schema. Schemas
//! are enforced by the `validator` module before a tool runs.
//!
//! | Group | Tools |
//! |-------|-------|
//! | Assessments | categories, assessments, automated controls |
//! | Runs | recent/paginated runs, leaf controls, control metadata, evidence, evidence records |
//! | Actions | discovery per scope, `execute_action` |
//! | Assets | assets, run summary, resource types, checks, resources, summaries |
//! | Dashboard | review periods, framework summary, framework/common/top controls |
//! | Graph | schema grounding, query execution, schema guide |

use crate::protocol::{ToolAnnotations, ToolDefinition};
use ccow_core::ListingKind;
use serde_json::{Map, Value, json};

/// Tool names.
pub mod names {
    pub const LIST_ASSESSMENT_CATEGORIES: &str = "list_all_assessment_categories";
    pub const LIST_ASSESSMENTS: &str = "list_assessments";
    pub const FETCH_AUTOMATED_CONTROLS: &str = "fetch_automated_controls_of_an_assessment";

    pub const FETCH_RECENT_ASSESSMENT_RUNS: &str = "fetch_recent_assessment_runs";
    pub const FETCH_ASSESSMENT_RUNS: &str = "fetch_assessment_runs";
    pub const FETCH_ASSESSMENT_RUN_DETAILS: &str = "fetch_assessment_run_details";
    pub const FETCH_ASSESSMENT_RUN_LEAF_CONTROLS: &str = "fetch_assessment_run_leaf_controls";
    pub const FETCH_RUN_CONTROLS: &str = "fetch_run_controls";
    pub const FETCH_RUN_CONTROL_META_DATA: &str = "fetch_run_control_meta_data";
    pub const FETCH_LEAF_CONTROL_EVIDENCE: &str = "fetch_assessment_run_leaf_control_evidence";
    pub const FETCH_EVIDENCE_RECORDS: &str = "fetch_evidence_records";
    pub const FETCH_CONTROLS: &str = "fetch_controls";

    pub const FETCH_ASSESSMENT_AVAILABLE_ACTIONS: &str = "fetch_assessment_available_actions";
    pub const FETCH_CONTROL_AVAILABLE_ACTIONS: &str = "fetch_available_control_actions";
    pub const FETCH_EVIDENCE_AVAILABLE_ACTIONS: &str = "fetch_evidence_available_actions";
    pub const EXECUTE_ACTION: &str = "execute_action";

    pub const LIST_ASSETS: &str = "list_assets";
    pub const FETCH_ASSETS_SUMMARY: &str = "fetch_assets_summary";
    pub const FETCH_RESOURCE_TYPES: &str = "fetch_resource_types";
    pub const FETCH_CHECKS: &str = "fetch_checks";
    pub const FETCH_RESOURCES: &str = "fetch_resources";
    pub const FETCH_RESOURCES_BY_CHECK: &str = "fetch_resources_by_check_name";
    pub const FETCH_CHECKS_SUMMARY: &str = "fetch_checks_summary";
    pub const FETCH_RESOURCES_SUMMARY: &str = "fetch_resources_summary";
    pub const FETCH_RESOURCES_BY_CHECK_SUMMARY: &str = "fetch_resources_by_check_name_summary";
    pub const FETCH_RESOURCE_TYPES_SUMMARY: &str = "fetch_resource_types_summary";

    pub const GET_DASHBOARD_REVIEW_PERIODS: &str = "get_dashboard_review_periods";
    pub const GET_DASHBOARD_DATA: &str = "get_dashboard_data";
    pub const FETCH_DASHBOARD_FRAMEWORK_CONTROLS: &str = "fetch_dashboard_framework_controls";
    pub const FETCH_DASHBOARD_FRAMEWORK_SUMMARY: &str = "fetch_dashboard_framework_summary";
    pub const GET_DASHBOARD_COMMON_CONTROLS: &str = "get_dashboard_common_controls_details";
    pub const GET_TOP_OVERDUE_CONTROLS: &str = "get_top_over_due_controls_detail";
    pub const GET_TOP_NON_COMPLIANT_CONTROLS: &str = "get_top_non_compliant_controls_detail";

    pub const FETCH_UNIQUE_NODE_DATA_AND_SCHEMA: &str = "fetch_unique_node_data_and_schema";
    pub const EXECUTE_CYPHER_QUERY: &str = "execute_cypher_query";
    pub const FETCH_GRAPH_SCHEMA_RELATIONSHIP: &str = "fetch_graph_schema_relationship";
}

/// Regex every review period argument must match.
pub const PERIOD_PATTERN: &str = "^Q[1-4] [0-9]{4}$";

/// Build the full tool catalogue.
pub fn all_tools() -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    tools.extend(assessment_tools());
    tools.extend(run_tools());
    tools.extend(action_tools());
    tools.extend(asset_tools());
    tools.extend(dashboard_tools());
    tools.extend(graph_tools());
    tools
}

fn assessment_tools() -> Vec<ToolDefinition> {
    vec![
        read_only(
            names::LIST_ASSESSMENT_CATEGORIES,
            "List all assessment categories. Returns `categories` with id and name.",
            object(vec![], &[]),
        ),
        read_only(
            names::LIST_ASSESSMENTS,
            "List assessments, optionally filtered by category id or a category name fragment. \
             Returns `assessments` with id, name and categoryName.",
            object(
                vec![
                    ("categoryId", string("Assessment category id")),
                    ("categoryName", string("Text contained in the category name")),
                ],
                &[],
            ),
        ),
        read_only(
            names::FETCH_AUTOMATED_CONTROLS,
            "Fetch the automated controls of an assessment. Returns `controls` with id, name, \
             controlNumber, alias and isLeaf.",
            object(vec![("assessmentId", id("Assessment id"))], &["assessmentId"]),
        ),
    ]
}

fn run_tools() -> Vec<ToolDefinition> {
    vec![
        read_only(
            names::FETCH_RECENT_ASSESSMENT_RUNS,
            "Fetch the ten most recent runs of an assessment.",
            object(vec![("id", id("Assessment id"))], &["id"]),
        ),
        read_only(
            names::FETCH_ASSESSMENT_RUNS,
            "Fetch one page of runs of an assessment. Returns {items, page, pageSize, totalPages, \
             totalItems}. On timeout the server retries with the next larger page size; \
             iterate page = 1..totalPages to read everything.",
            paged(
                ListingKind::AssessmentRuns,
                vec![("id", id("Assessment id"))],
                &["id"],
            ),
        ),
        read_only(
            names::FETCH_ASSESSMENT_RUN_DETAILS,
            "Fetch every leaf control of an assessment run as the backend reports it. The \
             output can be large; prefer `fetch_assessment_run_leaf_controls` for an overview.",
            object(vec![("id", id("Assessment run id"))], &["id"]),
        ),
        read_only(
            names::FETCH_ASSESSMENT_RUN_LEAF_CONTROLS,
            "Fetch the leaf controls of an assessment run with their number, alias, priority, \
             status, due date and compliance status.",
            object(vec![("id", id("Assessment run id"))], &["id"]),
        ),
        read_only(
            names::FETCH_RUN_CONTROLS,
            "Find run controls whose name contains the given text (first 50 matches).",
            object(vec![("name", id("Text contained in the control name"))], &["name"]),
        ),
        read_only(
            names::FETCH_RUN_CONTROL_META_DATA,
            "Fetch the assessment and run metadata of a run control.",
            object(vec![("id", id("Assessment run control id"))], &["id"]),
        ),
        read_only(
            names::FETCH_LEAF_CONTROL_EVIDENCE,
            "Fetch the completed evidence (with files) collected for a leaf run control.",
            object(vec![("id", id("Assessment run control id"))], &["id"]),
        ),
        read_only(
            names::FETCH_EVIDENCE_RECORDS,
            "Fetch the first 100 records of an evidence file with id, ResourceID, ResourceName, \
             ResourceType and ComplianceStatus.",
            object(vec![("id", id("Evidence id"))], &["id"]),
        ),
        read_only(
            names::FETCH_CONTROLS,
            "Ground a control lookup: returns graph node names, property samples and the schema \
             for the control name, to be used when writing a query for `execute_cypher_query`.",
            object(vec![("controlName", id("Control name"))], &["controlName"]),
        ),
    ]
}

fn action_tools() -> Vec<ToolDefinition> {
    let assessment_name = ("assessmentName", id("Assessment name"));
    let control_number = ("controlNumber", id("Control number"));
    let control_alias = ("controlAlias", id("Control alias"));

    vec![
        read_only(
            names::FETCH_ASSESSMENT_AVAILABLE_ACTIONS,
            "List the actions available on an assessment. The returned binding ids can be \
             passed to `execute_action`.",
            object(vec![assessment_name.clone()], &["assessmentName"]),
        ),
        read_only(
            names::FETCH_CONTROL_AVAILABLE_ACTIONS,
            "List the actions available on a control of an assessment.",
            object(
                vec![
                    assessment_name.clone(),
                    control_number.clone(),
                    control_alias.clone(),
                ],
                &["assessmentName", "controlNumber", "controlAlias"],
            ),
        ),
        read_only(
            names::FETCH_EVIDENCE_AVAILABLE_ACTIONS,
            "List the actions available on an evidence of a control.",
            object(
                vec![
                    assessment_name,
                    control_number,
                    control_alias,
                    ("evidenceName", id("Evidence name")),
                ],
                &["assessmentName", "controlNumber", "controlAlias", "evidenceName"],
            ),
        ),
        ToolDefinition {
            name: names::EXECUTE_ACTION.to_string(),
            description: Some(
                "Execute exactly one action. Only run after the user explicitly confirms. \
                 The scope is chosen from the ids given: evidence ids select evidence scope, \
                 a run control id selects control scope, otherwise assessment scope. \
                 `actionBindingId` must come from a discovery tool for the same scope. \
                 A second action on a scope whose action is still running is rejected."
                    .to_string(),
            ),
            input_schema: object(
                vec![
                    ("assessmentId", id("Assessment id")),
                    ("assessmentRunId", id("Assessment run id")),
                    ("actionBindingId", id("Action binding id from discovery")),
                    (
                        "assessmentRunControlId",
                        string("Run control id (control scope; optional for evidence)"),
                    ),
                    (
                        "assessmentRunControlEvidenceId",
                        string("Assessment run control evidence id (evidence scope)"),
                    ),
                    (
                        "evidenceRecordIds",
                        json!({
                            "type": "array",
                            "items": {"type": "string", "minLength": 1},
                            "description": "Evidence record ids (evidence scope)"
                        }),
                    ),
                ],
                &["assessmentId", "assessmentRunId", "actionBindingId"],
            ),
            annotations: Some(ToolAnnotations::side_effecting()),
        },
    ]
}

fn asset_tools() -> Vec<ToolDefinition> {
    let run_id = || ("id", id("Asset (integration) run id"));
    let resource_type = || ("resourceType", id("Resource type"));
    let summary_only = || {
        (
            "summaryOnly",
            json!({
                "type": "boolean",
                "description": "Return compliance counts instead of the listing"
            }),
        )
    };

    vec![
        read_only(
            names::LIST_ASSETS,
            "List all assets with id and name.",
            object(vec![], &[]),
        ),
        read_only(
            names::FETCH_ASSETS_SUMMARY,
            "Fetch the latest run summary of an asset, including its integration run id.",
            object(vec![("id", id("Asset id"))], &["id"]),
        ),
        read_only(
            names::FETCH_RESOURCE_TYPES,
            "Fetch one page of resource types of an asset run with their resource counts.",
            paged(ListingKind::ResourceTypes, vec![run_id()], &["id"]),
        ),
        read_only(
            names::FETCH_CHECKS,
            "Fetch one page of checks for an asset run and resource type. Large listings \
             requested without a page are answered with a compliance summary instead.",
            paged(
                ListingKind::Checks,
                vec![run_id(), resource_type(), compliance_status(), summary_only()],
                &["id", "resourceType"],
            ),
        ),
        read_only(
            names::FETCH_RESOURCES,
            "Fetch one page of resources (with their checks) for an asset run and resource type. \
             Large listings requested without a page are answered with a compliance summary.",
            paged(
                ListingKind::Resources,
                vec![run_id(), resource_type(), compliance_status(), summary_only()],
                &["id", "resourceType"],
            ),
        ),
        read_only(
            names::FETCH_RESOURCES_BY_CHECK,
            "Fetch one page of resources evaluated by a check. Large listings requested \
             without a page are answered with a compliance summary.",
            paged(
                ListingKind::ResourcesByCheck,
                vec![
                    run_id(),
                    ("check", id("Check name")),
                    ("resourceType", string("Resource type")),
                    summary_only(),
                ],
                &["id", "check"],
            ),
        ),
        read_only(
            names::FETCH_CHECKS_SUMMARY,
            "Compliance counts of the checks for an asset run and resource type.",
            object(vec![run_id(), resource_type()], &["id", "resourceType"]),
        ),
        read_only(
            names::FETCH_RESOURCES_SUMMARY,
            "Compliance counts of the resources for an asset run and resource type.",
            object(vec![run_id(), resource_type()], &["id", "resourceType"]),
        ),
        read_only(
            names::FETCH_RESOURCES_BY_CHECK_SUMMARY,
            "Compliance counts of the resources evaluated by a check.",
            object(
                vec![run_id(), resource_type(), ("check", id("Check name"))],
                &["id", "resourceType", "check"],
            ),
        ),
        read_only(
            names::FETCH_RESOURCE_TYPES_SUMMARY,
            "All resource types of an asset run in one object, with the total resource count.",
            object(vec![run_id()], &["id"]),
        ),
    ]
}

fn dashboard_tools() -> Vec<ToolDefinition> {
    let framework = || ("frameworkName", id("Common control framework name"));

    vec![
        read_only(
            names::GET_DASHBOARD_REVIEW_PERIODS,
            "List the review periods available on the compliance dashboard.",
            object(vec![], &[]),
        ),
        read_only(
            names::GET_DASHBOARD_DATA,
            "Fetch the common control framework dashboard summary for a review period: overall \
             control status, per-category summary and per-framework compliance.",
            object(vec![period()], &["period"]),
        ),
        read_only(
            names::FETCH_DASHBOARD_FRAMEWORK_CONTROLS,
            "Fetch the leaf controls of a framework for a review period.",
            paged(
                ListingKind::DashboardControls,
                vec![period(), framework()],
                &["period", "frameworkName"],
            ),
        ),
        read_only(
            names::FETCH_DASHBOARD_FRAMEWORK_SUMMARY,
            "Fetch the control-level dashboard of a framework for a review period.",
            object(vec![period(), framework()], &["period", "frameworkName"]),
        ),
        read_only(
            names::GET_DASHBOARD_COMMON_CONTROLS,
            "Fetch one page of common controls for a review period with optional filters.",
            paged(
                ListingKind::DashboardControls,
                vec![
                    period(),
                    compliance_status(),
                    (
                        "controlStatus",
                        json!({
                            "type": "string",
                            "enum": ["Pending", "InProgress", "Completed", "Unassigned", "Overdue"]
                        }),
                    ),
                    (
                        "priority",
                        json!({"type": "string", "enum": ["High", "Medium", "Low"]}),
                    ),
                    ("controlCategoryName", string("Control category name")),
                ],
                &["period"],
            ),
        ),
        read_only(
            names::GET_TOP_OVERDUE_CONTROLS,
            "Fetch the most overdue controls for a review period.",
            object(vec![period(), count()], &["period"]),
        ),
        read_only(
            names::GET_TOP_NON_COMPLIANT_CONTROLS,
            "Fetch the lowest-scoring non-compliant controls for a review period.",
            object(
                vec![
                    period(),
                    count(),
                    ("page", json!({"type": "integer", "minimum": 1})),
                ],
                &["period"],
            ),
        ),
    ]
}

fn graph_tools() -> Vec<ToolDefinition> {
    vec![
        read_only(
            names::FETCH_UNIQUE_NODE_DATA_AND_SCHEMA,
            "Ground a natural-language question in the compliance graph: returns the relevant \
             node names, sample property values and the schema description.",
            object(vec![("question", id("The user's question"))], &["question"]),
        ),
        read_only(
            names::EXECUTE_CYPHER_QUERY,
            "Execute a read-only Cypher query and return the rows in readable form. Queries that \
             write to the graph or are malformed are rejected without being executed.",
            object(vec![("query", id("Cypher query"))], &["query"]),
        ),
        read_only(
            names::FETCH_GRAPH_SCHEMA_RELATIONSHIP,
            "Fetch the graph schema and relationship guide (node labels, HAS_CHILD hierarchy).",
            object(vec![], &[]),
        ),
    ]
}

// =============================================================================
// SCHEMA HELPERS
// =============================================================================

fn read_only(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
        annotations: Some(ToolAnnotations::read_only()),
    }
}

fn object(properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Object schema with `page` and `pageSize` bounded by the listing's ladder.
fn paged(kind: ListingKind, mut properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let defaults = ccow_core::PaginationConfig::default();
    let ladder = defaults.ladder(kind);
    properties.push((
        "page",
        json!({
            "type": "integer",
            "minimum": 1,
            "description": "Page number, starting at 1"
        }),
    ));
    properties.push((
        "pageSize",
        json!({
            "type": "integer",
            "minimum": 1,
            "description": format!(
                "Items per page (default {}, page sizes tried on timeout: {:?})",
                ladder.default_page_size, ladder.ladder
            )
        }),
    ));
    object(properties, required)
}

fn id(description: &str) -> Value {
    json!({"type": "string", "minLength": 1, "description": description})
}

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn period() -> (&'static str, Value) {
    (
        "period",
        json!({
            "type": "string",
            "pattern": PERIOD_PATTERN,
            "description": "Review period, e.g. 'Q1 2024'"
        }),
    )
}

fn count() -> (&'static str, Value) {
    (
        "count",
        json!({"type": "integer", "minimum": 1, "description": "Number of controls (default 10)"}),
    )
}

fn compliance_status() -> (&'static str, Value) {
    (
        "complianceStatus",
        json!({
            "type": "string",
            "enum": ["COMPLIANT", "NON_COMPLIANT", "NOT_DETERMINED"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = all_tools();
        let unique: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(unique.len(), tools.len());
    }

    #[test]
    fn test_required_fields_are_declared() {
        for tool in all_tools() {
            let props = tool.input_schema["properties"].as_object().unwrap();
            for required in tool.input_schema["required"].as_array().unwrap() {
                let field = required.as_str().unwrap();
                assert!(props.contains_key(field), "{}: {}", tool.name, field);
            }
        }
    }

    #[test]
    fn test_only_execute_action_has_side_effects() {
        let side_effecting: Vec<_> = all_tools()
            .into_iter()
            .filter(|t| t.annotations.as_ref().and_then(|a| a.read_only) == Some(false))
            .map(|t| t.name)
            .collect();
        assert_eq!(side_effecting, vec![names::EXECUTE_ACTION.to_string()]);
    }

    #[test]
    fn test_paged_tools_expose_page_arguments() {
        let tools = all_tools();
        let checks = tools.iter().find(|t| t.name == names::FETCH_CHECKS).unwrap();
        assert!(checks.input_schema["properties"]["pageSize"].is_object());
        assert_eq!(checks.input_schema["properties"]["page"]["minimum"], 1);
    }
}
