//! Backend endpoint paths.

use urlencoding::encode;

// Dashboard
pub const CCF_DASHBOARD_CONTROL_DETAILS: &str = "/v2/aggregator/ccf-dashboard-control-details";
pub const CCF_DASHBOARD_FRAMEWORK_SUMMARY: &str = "/v2/aggregator/ccf-dashboard-framework-summary";
pub const CCF_DASHBOARD_REVIEW_PERIODS: &str = "/v2/aggregator/fetch-ccf-dashboard-review-periods";

// Assessments
pub const ASSESSMENT_CATEGORIES: &str = "/v1/assessment-categories";
pub const PLANS: &str = "/v1/plans";
pub const PLAN_CONTROLS: &str = "/v1/plan-controls";
pub const PLAN_INSTANCES: &str = "/v1/plan-instances";
pub const PLAN_INSTANCE_CONTROLS: &str = "/v1/plan-instance-controls";
pub const PLAN_INSTANCE_EVIDENCES: &str = "/v1/plan-instance-evidences";
pub const DATAHANDLER_FETCH_DATA: &str = "/v1/datahandler/fetch-data";

// Actions
pub const FETCH_AVAILABLE_ACTIONS: &str = "/v1/actions/fetch-available-actions";
pub const ACTIONS_EXECUTIONS: &str = "/v1/actions/executions";

// Graph
pub const RETRIEVE_UNIQUE_NODE_DATA_AND_SCHEMA: &str = "/v1/llm/retrieve_unique_node_data_and_schema";
pub const EXECUTE_CYPHER_QUERY: &str = "/v1/llm/execute_cypher_query";
pub const RETRIEVE_GRAPH_SCHEMA_RELATIONSHIP: &str = "/v1/llm/retrieve_schema_and_relationship";

// Assets
pub const ASSETS: &str = "/v1/plans?fields=basic&type=integration";
pub const FETCH_RESOURCES: &str = "/v1/plan-instances/fetch-resources";
pub const FETCH_RESOURCE_TYPES: &str = "/v1/plan-instances/fetch-resource-types";
pub const FETCH_ASSETS_DETAIL_SUMMARY: &str = "/v1/plan-instances/fetch-integration-detail-summary";
pub const FETCH_ASSETS_SUMMARY: &str = "/v1/plan-instances/integration-summary";
pub const FETCH_CHECKS: &str = "/v1/plan-instances/fetch-checks";

/// Assessments, optionally filtered by category id or category name.
pub fn plans(category_id: Option<&str>, category_name: Option<&str>) -> String {
    format!(
        "{}?fields=basic&category_id={}&category_name_contains={}",
        PLANS,
        encode(category_id.unwrap_or_default()),
        encode(category_name.unwrap_or_default())
    )
}

/// Automated controls of an assessment.
pub fn automated_plan_controls(assessment_id: &str) -> String {
    format!(
        "{}?is_automated=true&fields=basic&skip_prereq_ctrl_priv_check=false&page=1&page_size=100&plan_id={}",
        PLAN_CONTROLS,
        encode(assessment_id)
    )
}

/// One page of runs of an assessment.
pub fn plan_instances(assessment_id: &str, page: u64, page_size: u64) -> String {
    format!(
        "{}?fields=basic&page={}&page_size={}&plan_id={}",
        PLAN_INSTANCES,
        page,
        page_size,
        encode(assessment_id)
    )
}

/// Leaf controls of one assessment run.
pub fn run_leaf_controls(run_id: &str) -> String {
    format!(
        "{}?fields=basic&is_leaf_control=true&plan_instance_id={}",
        PLAN_INSTANCE_CONTROLS,
        encode(run_id)
    )
}

/// Run controls whose name contains the given text.
pub fn run_controls_by_name(name: &str) -> String {
    format!(
        "{}?fields=basic&is_leaf_control=true&control_name_contains={}&page=1&page_size=50",
        PLAN_INSTANCE_CONTROLS,
        encode(name)
    )
}

/// Assessment and run metadata of a run control.
pub fn run_control_plan_data(run_control_id: &str) -> String {
    format!("{}/{}/plan-data", PLAN_INSTANCE_CONTROLS, encode(run_control_id))
}

/// Evidence collected for a run control.
pub fn run_control_evidences(run_control_id: &str) -> String {
    format!(
        "{}?plan_instance_control_id={}",
        PLAN_INSTANCE_EVIDENCES,
        encode(run_control_id)
    )
}
