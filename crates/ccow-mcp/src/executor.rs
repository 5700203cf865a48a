//! Tool execution engine.
//!
//! Every call is validated against the tool's input schema first; only
//! valid calls reach a handler. Handlers live in the `handlers` module,
//! grouped by tool family, and return either a JSON value or a
//! [`ToolError`]. Both are turned into an [`ExecutionResult`] here.

use crate::actions::ActionDispatcher;
use crate::catalog::{self, names};
use crate::error::{McpError, ToolError};
use crate::graph::GraphQueryTranslator;
use crate::pagination::PaginatedFetcher;
use crate::protocol::{CallToolResponse, ResourceDefinition, ToolContent, ToolDefinition};
use crate::summary::SummaryAggregator;
use crate::validator::{ArgumentValidator, Args};
use ccow_backend::BackendClient;
use ccow_core::CcowConfig;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// URI of the graph schema resource.
pub const GRAPH_SCHEMA_URI: &str = "graphschema://node";

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Whether the execution was successful.
    pub success: bool,
    /// The result content.
    pub content: Vec<ToolContent>,
}

impl ExecutionResult {
    /// Create a successful result with JSON content.
    pub fn success_json(value: Value) -> Self {
        Self {
            success: true,
            content: vec![ToolContent::Json { json: value }],
        }
    }

    /// Create a failed result: the structured error plus a readable line.
    pub fn failure(error: &ToolError) -> Self {
        Self {
            success: false,
            content: vec![
                ToolContent::Json {
                    json: error.to_json(),
                },
                ToolContent::Text {
                    text: format!("{} error: {}", error.kind(), error),
                },
            ],
        }
    }

    pub fn from_result(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => Self::success_json(value),
            Err(error) => Self::failure(&error),
        }
    }

    /// The structured error, if this result is a failure.
    pub fn error(&self) -> Option<&Value> {
        if self.success {
            return None;
        }
        self.content.iter().find_map(|c| match c {
            ToolContent::Json { json } => json.get("error"),
            ToolContent::Text { .. } => None,
        })
    }
}

impl From<ExecutionResult> for CallToolResponse {
    fn from(result: ExecutionResult) -> Self {
        CallToolResponse {
            content: result.content,
            is_error: !result.success,
        }
    }
}

/// Serialize a handler's output.
pub(crate) fn to_value<T: Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::upstream(format!("failed to encode result: {}", e)))
}

/// Runs tools against the backend.
pub struct ToolExecutor {
    pub(crate) backend: Arc<dyn BackendClient>,
    pub(crate) fetcher: PaginatedFetcher,
    pub(crate) summaries: SummaryAggregator,
    pub(crate) graph: GraphQueryTranslator,
    pub(crate) actions: ActionDispatcher,
    validator: ArgumentValidator,
    tools: Vec<ToolDefinition>,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl ToolExecutor {
    /// Create an executor serving the full tool catalogue.
    pub fn new(backend: Arc<dyn BackendClient>, config: &CcowConfig) -> Result<Self, McpError> {
        let tools = catalog::all_tools();
        let validator = ArgumentValidator::new(tools.iter())?;
        let fetcher = PaginatedFetcher::new(backend.clone(), Arc::new(config.pagination.clone()));
        let summaries = SummaryAggregator::new(backend.clone(), fetcher.clone());
        let graph = GraphQueryTranslator::new(backend.clone());
        let binding_ttl = chrono::Duration::try_minutes(config.actions.binding_ttl_minutes)
            .ok_or_else(|| {
                McpError::InvalidConfig(format!(
                    "actions.binding_ttl_minutes out of range: {}",
                    config.actions.binding_ttl_minutes
                ))
            })?;
        let actions = ActionDispatcher::new(backend.clone(), binding_ttl);

        Ok(Self {
            backend,
            fetcher,
            summaries,
            graph,
            actions,
            validator,
            tools,
        })
    }

    /// Definitions of every tool this executor runs.
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn actions(&self) -> &ActionDispatcher {
        &self.actions
    }

    /// Execute a tool call.
    pub async fn execute(&self, name: &str, arguments: &Value) -> ExecutionResult {
        if let Err(e) = self.validator.validate(name, arguments) {
            debug!(tool = name, error = %e, "Rejected tool arguments");
            return ExecutionResult::failure(&e);
        }

        let result = self.dispatch(name, Args::new(arguments)).await;
        match &result {
            Err(e @ ToolError::Upstream { .. }) => {
                error!(tool = name, error = %e, "Backend rejected tool call");
            }
            Err(e) => warn!(tool = name, kind = e.kind(), error = %e, "Tool call failed"),
            Ok(_) => debug!(tool = name, "Tool call succeeded"),
        }
        ExecutionResult::from_result(result)
    }

    async fn dispatch(&self, name: &str, args: Args<'_>) -> Result<Value, ToolError> {
        match name {
            names::LIST_ASSESSMENT_CATEGORIES => self.list_assessment_categories().await,
            names::LIST_ASSESSMENTS => self.list_assessments(args).await,
            names::FETCH_AUTOMATED_CONTROLS => self.fetch_automated_controls(args).await,

            names::FETCH_RECENT_ASSESSMENT_RUNS => self.fetch_recent_assessment_runs(args).await,
            names::FETCH_ASSESSMENT_RUNS => self.fetch_assessment_runs(args).await,
            names::FETCH_ASSESSMENT_RUN_DETAILS => self.fetch_assessment_run_details(args).await,
            names::FETCH_ASSESSMENT_RUN_LEAF_CONTROLS => {
                self.fetch_assessment_run_leaf_controls(args).await
            }
            names::FETCH_RUN_CONTROLS => self.fetch_run_controls(args).await,
            names::FETCH_RUN_CONTROL_META_DATA => self.fetch_run_control_meta_data(args).await,
            names::FETCH_LEAF_CONTROL_EVIDENCE => self.fetch_leaf_control_evidence(args).await,
            names::FETCH_EVIDENCE_RECORDS => self.fetch_evidence_records(args).await,
            names::FETCH_CONTROLS => self.fetch_controls(args).await,

            names::FETCH_ASSESSMENT_AVAILABLE_ACTIONS
            | names::FETCH_CONTROL_AVAILABLE_ACTIONS
            | names::FETCH_EVIDENCE_AVAILABLE_ACTIONS => {
                self.fetch_available_actions(name, args).await
            }
            names::EXECUTE_ACTION => self.execute_action(args).await,

            names::LIST_ASSETS => self.list_assets().await,
            names::FETCH_ASSETS_SUMMARY => self.fetch_assets_summary(args).await,
            names::FETCH_RESOURCE_TYPES => self.fetch_resource_types(args).await,
            names::FETCH_CHECKS => self.fetch_checks(args).await,
            names::FETCH_RESOURCES => self.fetch_resources(args).await,
            names::FETCH_RESOURCES_BY_CHECK => self.fetch_resources_by_check(args).await,
            names::FETCH_CHECKS_SUMMARY => self.fetch_checks_summary(args).await,
            names::FETCH_RESOURCES_SUMMARY => self.fetch_resources_summary(args).await,
            names::FETCH_RESOURCES_BY_CHECK_SUMMARY => {
                self.fetch_resources_by_check_summary(args).await
            }
            names::FETCH_RESOURCE_TYPES_SUMMARY => self.fetch_resource_types_summary(args).await,

            names::GET_DASHBOARD_REVIEW_PERIODS => self.get_dashboard_review_periods().await,
            names::GET_DASHBOARD_DATA => self.get_dashboard_data(args).await,
            names::FETCH_DASHBOARD_FRAMEWORK_CONTROLS => {
                self.fetch_dashboard_framework_controls(args).await
            }
            names::FETCH_DASHBOARD_FRAMEWORK_SUMMARY => {
                self.fetch_dashboard_framework_summary(args).await
            }
            names::GET_DASHBOARD_COMMON_CONTROLS => self.get_dashboard_common_controls(args).await,
            names::GET_TOP_OVERDUE_CONTROLS => self.get_top_overdue_controls(args).await,
            names::GET_TOP_NON_COMPLIANT_CONTROLS => {
                self.get_top_non_compliant_controls(args).await
            }

            names::FETCH_UNIQUE_NODE_DATA_AND_SCHEMA => {
                let question = args.required_str("question")?;
                to_value(self.graph.resolve_schema(question).await?)
            }
            names::EXECUTE_CYPHER_QUERY => {
                let query = args.required_str("query")?;
                to_value(self.graph.run_query(query).await?)
            }
            names::FETCH_GRAPH_SCHEMA_RELATIONSHIP => self.graph.describe_schema().await,

            other => Err(ToolError::validation(format!("unknown tool: {}", other))),
        }
    }

    /// Resources served through `resources/read`.
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        vec![ResourceDefinition {
            uri: GRAPH_SCHEMA_URI.to_string(),
            name: "Graph schema and relationships".to_string(),
            description: Some(
                "Node labels, relationships and query patterns of the compliance graph"
                    .to_string(),
            ),
            mime_type: "application/json".to_string(),
        }]
    }

    /// Read a resource by URI. Unknown URIs are `None`.
    pub async fn read_resource(&self, uri: &str) -> Option<Result<Value, ToolError>> {
        match uri {
            GRAPH_SCHEMA_URI => Some(self.graph.describe_schema().await),
            _ => None,
        }
    }
}
