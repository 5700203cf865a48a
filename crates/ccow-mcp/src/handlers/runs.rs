//! Assessment run, control and evidence tools.

use super::{items, parse_items, shape_items};
use crate::error::ToolError;
use crate::executor::{ToolExecutor, to_value};
use crate::pagination::ListingQuery;
use crate::prompts;
use crate::validator::Args;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ccow_backend::endpoints;
use ccow_core::model::{AssessmentRun, ControlRunInstance, Evidence, EvidenceRecord};
use serde_json::{Value, json};
use tracing::debug;

const RECENT_RUNS: u64 = 10;
const MAX_EVIDENCE_RECORDS: usize = 100;
const MISSING_FILE: &str = "CANNOT_FIND_THE_FILE";

impl ToolExecutor {
    pub(crate) async fn fetch_recent_assessment_runs(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        let raw = self
            .backend
            .get(&endpoints::plan_instances(id, 1, RECENT_RUNS))
            .await?;
        let runs: Vec<AssessmentRun> = shape_items(&raw, &["planId", "id"]);
        Ok(json!({ "runs": to_value(runs)? }))
    }

    pub(crate) async fn fetch_assessment_runs(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let query = ListingQuery::AssessmentRuns {
            assessment_id: args.required_str("id")?.to_string(),
        };
        let page = self
            .fetcher
            .fetch(&query, args.u64("page"), args.u64("pageSize"))
            .await?;
        to_value(page)
    }

    pub(crate) async fn fetch_assessment_run_details(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        let raw = self.backend.get(&endpoints::run_leaf_controls(id)).await?;
        Ok(json!({ "controls": items(&raw) }))
    }

    pub(crate) async fn fetch_assessment_run_leaf_controls(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        let raw = self.backend.get(&endpoints::run_leaf_controls(id)).await?;
        let controls: Vec<ControlRunInstance> = shape_items(&raw, &["id", "name"]);
        Ok(json!({ "controls": to_value(controls)? }))
    }

    pub(crate) async fn fetch_run_controls(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let name = args.required_str("name")?;
        let raw = self.backend.get(&endpoints::run_controls_by_name(name)).await?;
        let controls: Vec<ControlRunInstance> = shape_items(&raw, &["id", "name"]);
        Ok(json!({ "controls": to_value(controls)? }))
    }

    pub(crate) async fn fetch_run_control_meta_data(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        Ok(self
            .backend
            .get(&endpoints::run_control_plan_data(id))
            .await?)
    }

    /// Completed evidence of a leaf control that has files attached.
    pub(crate) async fn fetch_leaf_control_evidence(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        let raw = self.backend.get(&endpoints::run_control_evidences(id)).await?;

        let completed = items(&raw)
            .iter()
            .filter(|item| item.get("id").is_some() && item.get("name").is_some())
            .filter(|item| item.get("status").and_then(Value::as_str) == Some("Completed"))
            .filter(|item| {
                item.get("evidenceFileInfos")
                    .and_then(Value::as_array)
                    .is_some_and(|files| !files.is_empty())
            });
        let evidences: Vec<Evidence> = parse_items(completed).collect();
        Ok(json!({ "evidences": to_value(evidences)? }))
    }

    /// First records of an evidence file.
    pub(crate) async fn fetch_evidence_records(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        let body = json!({
            "evidenceID": id,
            "templateType": "evidence",
            "status": ["active"],
            "returnFormat": "json",
            "isSrcFetchCall": true,
            "isUserPriority": true,
            "considerFileSizeRestriction": true,
            "viewEvidenceFlow": true,
        });
        let raw = self
            .backend
            .post(endpoints::DATAHANDLER_FETCH_DATA, &body)
            .await?;

        if raw.get("Message").and_then(Value::as_str) == Some(MISSING_FILE) {
            return Ok(json!({ "records": [], "message": "No data available to display" }));
        }

        let encoded = raw
            .get("fileBytes")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::upstream("evidence response carries no file"))?;
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| ToolError::upstream(format!("evidence file is not valid base64: {}", e)))?;
        let rows: Vec<Value> = serde_json::from_slice(&decoded)
            .map_err(|e| ToolError::upstream(format!("evidence file is not a JSON list: {}", e)))?;

        let with_id = rows.iter().filter(|row| row.get("id").is_some());
        let records: Vec<EvidenceRecord> =
            parse_items(with_id).take(MAX_EVIDENCE_RECORDS).collect();
        debug!(evidence_id = id, records = records.len(), "Decoded evidence records");
        Ok(json!({ "records": to_value(records)? }))
    }

    /// Grounding material for looking a control up by name.
    pub(crate) async fn fetch_controls(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let control_name = args.required_str("controlName")?;
        let context = self.graph.resolve_schema(control_name).await?;
        Ok(json!({
            "controlName": control_name,
            "nodeNames": context.node_names,
            "uniquePropertyValues": context.unique_property_values,
            "schemaDescription": context.schema_description,
            "guidance": prompts::CYPHER_GUIDANCE,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::names;
    use crate::test_support::{ScriptedBackend, executor, json_content};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use ccow_backend::endpoints;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_controls_carries_query_guidance() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::RETRIEVE_UNIQUE_NODE_DATA_AND_SCHEMA,
            Ok(json!({"node_names": ["Control"], "neo4j_schema": "HAS_CHILD"})),
        );

        let result = executor(&backend)
            .execute(names::FETCH_CONTROLS, &json!({"controlName": "Access Review"}))
            .await;

        let output = json_content(&result);
        assert_eq!(output["nodeNames"], json!(["Control"]));
        assert_eq!(output["guidance"], crate::prompts::CYPHER_GUIDANCE);
        let body = &backend.calls(endpoints::RETRIEVE_UNIQUE_NODE_DATA_AND_SCHEMA)[0];
        assert_eq!(body["user_question"], "Access Review");
    }

    #[tokio::test]
    async fn test_recent_runs_use_fixed_window() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            &endpoints::plan_instances("p1", 1, 10),
            Ok(json!({"items": [{"id": "r1", "planId": "p1", "status": "Completed"}]})),
        );

        let result = executor(&backend)
            .execute(names::FETCH_RECENT_ASSESSMENT_RUNS, &json!({"id": "p1"}))
            .await;

        assert_eq!(json_content(&result)["runs"][0]["assessmentId"], "p1");
    }

    #[tokio::test]
    async fn test_evidence_keeps_completed_with_files() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            &endpoints::run_control_evidences("ctl-1"),
            Ok(json!({"items": [
                {"id": "e1", "name": "Users", "status": "Completed", "evidenceFileInfos": [{"f": 1}]},
                {"id": "e2", "name": "Empty", "status": "Completed", "evidenceFileInfos": []},
                {"id": "e3", "name": "Running", "status": "Pending", "evidenceFileInfos": [{"f": 1}]}
            ]})),
        );

        let result = executor(&backend)
            .execute(names::FETCH_LEAF_CONTROL_EVIDENCE, &json!({"id": "ctl-1"}))
            .await;

        let evidences = json_content(&result)["evidences"].as_array().unwrap().clone();
        assert_eq!(evidences.len(), 1);
        assert_eq!(evidences[0]["id"], "e1");
    }

    #[tokio::test]
    async fn test_evidence_records_decoded() {
        let rows = json!([
            {"id": "1", "ResourceID": "arn:1", "ResourceName": "bucket", "ComplianceStatus": "COMPLIANT", "Extra": "x"},
            {"ResourceID": "no-id"},
            {"id": "2", "ResourceName": 42}
        ]);
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::DATAHANDLER_FETCH_DATA,
            Ok(json!({"fileBytes": STANDARD.encode(rows.to_string())})),
        );

        let result = executor(&backend)
            .execute(names::FETCH_EVIDENCE_RECORDS, &json!({"id": "ev-1"}))
            .await;

        let records = &json_content(&result)["records"];
        assert_eq!(records.as_array().unwrap().len(), 1);
        assert_eq!(records[0]["ResourceName"], "bucket");
        assert!(records[0].get("Extra").is_none());
        assert_eq!(
            backend.calls(endpoints::DATAHANDLER_FETCH_DATA)[0]["evidenceID"],
            "ev-1"
        );
    }

    #[tokio::test]
    async fn test_leaf_controls_shaped_and_details_raw() {
        let backend = Arc::new(ScriptedBackend::new());
        let leaf = json!({"items": [
            {"id": "c1", "name": "MFA", "displayable": "1.1", "status": "Completed", "extra": 1},
            {"id": "c2"}
        ]});
        backend.respond(&endpoints::run_leaf_controls("run-1"), Ok(leaf.clone()));
        backend.respond(&endpoints::run_leaf_controls("run-1"), Ok(leaf));
        let executor = executor(&backend);

        let shaped = executor
            .execute(names::FETCH_ASSESSMENT_RUN_LEAF_CONTROLS, &json!({"id": "run-1"}))
            .await;
        let controls = &json_content(&shaped)["controls"];
        assert_eq!(controls.as_array().unwrap().len(), 1);
        assert_eq!(controls[0]["controlNumber"], "1.1");
        assert!(controls[0].get("extra").is_none());

        let details = executor
            .execute(names::FETCH_ASSESSMENT_RUN_DETAILS, &json!({"id": "run-1"}))
            .await;
        let controls = &json_content(&details)["controls"];
        assert_eq!(controls.as_array().unwrap().len(), 2);
        assert_eq!(controls[0]["extra"], 1);
    }

    #[tokio::test]
    async fn test_evidence_records_missing_file() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::DATAHANDLER_FETCH_DATA,
            Ok(json!({"Message": "CANNOT_FIND_THE_FILE"})),
        );

        let result = executor(&backend)
            .execute(names::FETCH_EVIDENCE_RECORDS, &json!({"id": "ev-1"}))
            .await;

        assert!(result.success);
        assert_eq!(
            json_content(&result)["message"],
            "No data available to display"
        );
    }

    #[tokio::test]
    async fn test_paged_runs_reject_oversize_page() {
        let backend = Arc::new(ScriptedBackend::new());
        let result = executor(&backend)
            .execute(
                names::FETCH_ASSESSMENT_RUNS,
                &json!({"id": "p1", "pageSize": 50}),
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.error().unwrap()["kind"], "validation");
        assert_eq!(backend.total_calls(), 0);
    }
}
