//! Action discovery and execution.
//!
//! Actions are the only side-effecting operations the server exposes.
//! A binding id must first be returned by a discovery call for the same
//! scope kind; execution then runs under an in-flight marker so that a
//! second action on the same scope instance is rejected until the first
//! one finishes.

use crate::error::ToolError;
use crate::validator::Args;
use ccow_backend::{BackendClient, endpoints};
use ccow_core::ScopeKind;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Fields a discovered action may carry its binding id in.
const BINDING_ID_FIELDS: [&str; 4] = ["id", "actionBindingId", "actionBindingID", "bindingId"];

/// Identifiers passed to `execute_action`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionIds {
    pub assessment_id: Option<String>,
    pub assessment_run_id: Option<String>,
    pub action_binding_id: Option<String>,
    pub assessment_run_control_id: Option<String>,
    pub assessment_run_control_evidence_id: Option<String>,
    pub evidence_record_ids: Vec<String>,
}

impl ActionIds {
    pub fn from_args(args: &Args<'_>) -> Self {
        let owned = |name: &str| args.str(name).map(str::to_string);
        Self {
            assessment_id: owned("assessmentId"),
            assessment_run_id: owned("assessmentRunId"),
            action_binding_id: owned("actionBindingId"),
            assessment_run_control_id: owned("assessmentRunControlId"),
            assessment_run_control_evidence_id: owned("assessmentRunControlEvidenceId"),
            evidence_record_ids: args.str_list("evidenceRecordIds"),
        }
    }

    /// The scope these identifiers address.
    ///
    /// Any evidence-level identifier selects evidence scope, otherwise a run
    /// control id selects control scope, otherwise assessment scope.
    pub fn scope_kind(&self) -> ScopeKind {
        if self.assessment_run_control_evidence_id.is_some() || !self.evidence_record_ids.is_empty()
        {
            ScopeKind::Evidence
        } else if self.assessment_run_control_id.is_some() {
            ScopeKind::Control
        } else {
            ScopeKind::Assessment
        }
    }

    /// Resolve the scope, failing on the first missing identifier.
    pub fn resolve(&self) -> Result<ActionScope, ToolError> {
        fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ToolError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ToolError::validation(format!("'{}' is required", name)))
        }

        let kind = self.scope_kind();
        let assessment_id = required(&self.assessment_id, "assessmentId")?.to_string();
        let run_id = required(&self.assessment_run_id, "assessmentRunId")?.to_string();
        let binding_id = required(&self.action_binding_id, "actionBindingId")?.to_string();

        let target = match kind {
            ScopeKind::Assessment => ActionTarget::Assessment,
            ScopeKind::Control => ActionTarget::Control {
                control_id: required(&self.assessment_run_control_id, "assessmentRunControlId")?
                    .to_string(),
            },
            ScopeKind::Evidence => {
                let control_id = self
                    .assessment_run_control_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                let evidence_id = required(
                    &self.assessment_run_control_evidence_id,
                    "assessmentRunControlEvidenceId",
                )?
                .to_string();
                if self.evidence_record_ids.is_empty() {
                    return Err(ToolError::validation(
                        "'evidenceRecordIds' must list at least one record for an evidence action",
                    ));
                }
                ActionTarget::Evidence {
                    control_id,
                    evidence_id,
                    record_ids: self.evidence_record_ids.clone(),
                }
            }
        };

        Ok(ActionScope {
            assessment_id,
            run_id,
            binding_id,
            target,
        })
    }
}

/// The part of a scope below the assessment run.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTarget {
    Assessment,
    Control {
        control_id: String,
    },
    /// The evidence id is unique on its own; the control id is optional.
    Evidence {
        control_id: Option<String>,
        evidence_id: String,
        record_ids: Vec<String>,
    },
}

/// A fully identified execution scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionScope {
    pub assessment_id: String,
    pub run_id: String,
    pub binding_id: String,
    pub target: ActionTarget,
}

impl ActionScope {
    pub fn kind(&self) -> ScopeKind {
        match self.target {
            ActionTarget::Assessment => ScopeKind::Assessment,
            ActionTarget::Control { .. } => ScopeKind::Control,
            ActionTarget::Evidence { .. } => ScopeKind::Evidence,
        }
    }

    /// Identifies the scope instance for the in-flight marker.
    pub fn key(&self) -> String {
        match &self.target {
            ActionTarget::Assessment => self.run_id.clone(),
            ActionTarget::Control { control_id } => format!("{}/{}", self.run_id, control_id),
            ActionTarget::Evidence {
                control_id: Some(control_id),
                evidence_id,
                ..
            } => format!("{}/{}/{}", self.run_id, control_id, evidence_id),
            ActionTarget::Evidence { evidence_id, .. } => {
                format!("{}/{}", self.run_id, evidence_id)
            }
        }
    }

    fn body(&self) -> Value {
        let (control_id, evidence_id, record_ids) = match &self.target {
            ActionTarget::Assessment => ("", "", Vec::new()),
            ActionTarget::Control { control_id } => (control_id.as_str(), "", Vec::new()),
            ActionTarget::Evidence {
                control_id,
                evidence_id,
                record_ids,
            } => (
                control_id.as_deref().unwrap_or_default(),
                evidence_id.as_str(),
                record_ids.clone(),
            ),
        };
        json!({
            "actionBindingID": self.binding_id,
            "planInstanceID": self.run_id,
            "planID": self.assessment_id,
            "planInstanceControlID": control_id,
            "planInstanceControlEvidenceID": evidence_id,
            "recordIDs": record_ids,
            "rules": [],
        })
    }
}

/// The scope a discovery call lists actions for, named as the user knows it.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryScope {
    Assessment {
        assessment_name: String,
    },
    Control {
        assessment_name: String,
        control_number: String,
        control_alias: String,
    },
    Evidence {
        assessment_name: String,
        control_number: String,
        control_alias: String,
        evidence_name: String,
    },
}

impl DiscoveryScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            DiscoveryScope::Assessment { .. } => ScopeKind::Assessment,
            DiscoveryScope::Control { .. } => ScopeKind::Control,
            DiscoveryScope::Evidence { .. } => ScopeKind::Evidence,
        }
    }

    pub fn key(&self) -> String {
        match self {
            DiscoveryScope::Assessment { assessment_name } => assessment_name.clone(),
            DiscoveryScope::Control {
                assessment_name,
                control_number,
                control_alias,
            } => format!("{}/{}/{}", assessment_name, control_number, control_alias),
            DiscoveryScope::Evidence {
                assessment_name,
                control_number,
                control_alias,
                evidence_name,
            } => format!(
                "{}/{}/{}/{}",
                assessment_name, control_number, control_alias, evidence_name
            ),
        }
    }

    fn body(&self) -> Value {
        let (assessment, number, alias, evidence) = match self {
            DiscoveryScope::Assessment { assessment_name } => (assessment_name, None, None, None),
            DiscoveryScope::Control {
                assessment_name,
                control_number,
                control_alias,
            } => (
                assessment_name,
                Some(control_number),
                Some(control_alias),
                None,
            ),
            DiscoveryScope::Evidence {
                assessment_name,
                control_number,
                control_alias,
                evidence_name,
            } => (
                assessment_name,
                Some(control_number),
                Some(control_alias),
                Some(evidence_name),
            ),
        };
        let mut body = json!({
            "actionType": "action",
            "assessmentName": assessment,
            "isRulesReq": true,
            "triggerType": "userAction",
        });
        if let Some(number) = number {
            body["controlNumber"] = json!(number);
        }
        if let Some(alias) = alias {
            body["controlAlias"] = json!(alias);
        }
        if let Some(evidence) = evidence {
            body["evidenceName"] = json!(evidence);
        }
        body
    }
}

/// A binding id returned by discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub scope_kind: ScopeKind,
    pub scope_key: String,
    pub discovered_at: DateTime<Utc>,
}

/// Binding ids seen in discovery responses, with their discovery time.
#[derive(Debug)]
pub struct BindingRegistry {
    bindings: RwLock<HashMap<String, Binding>>,
    ttl: Duration,
}

impl BindingRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn record(&self, binding_id: &str, scope_kind: ScopeKind, scope_key: &str) {
        self.record_at(binding_id, scope_kind, scope_key, Utc::now());
    }

    pub fn record_at(
        &self,
        binding_id: &str,
        scope_kind: ScopeKind,
        scope_key: &str,
        now: DateTime<Utc>,
    ) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        bindings.retain(|_, binding| now - binding.discovered_at < self.ttl);
        bindings.insert(
            binding_id.to_string(),
            Binding {
                scope_kind,
                scope_key: scope_key.to_string(),
                discovered_at: now,
            },
        );
    }

    /// The binding, if it was discovered less than the TTL ago.
    pub fn lookup(&self, binding_id: &str) -> Option<Binding> {
        self.lookup_at(binding_id, Utc::now())
    }

    pub fn lookup_at(&self, binding_id: &str, now: DateTime<Utc>) -> Option<Binding> {
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        bindings
            .get(binding_id)
            .filter(|binding| now - binding.discovered_at < self.ttl)
            .cloned()
    }
}

type ScopeMarker = (ScopeKind, String);

/// Scopes with an action currently running.
#[derive(Debug, Default)]
struct InFlight {
    scopes: Mutex<HashSet<ScopeMarker>>,
}

impl InFlight {
    /// Mark a scope busy, or `None` when it already is.
    fn acquire(self: &Arc<Self>, marker: ScopeMarker) -> Option<InFlightGuard> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        if !scopes.insert(marker.clone()) {
            return None;
        }
        Some(InFlightGuard {
            owner: Arc::clone(self),
            marker,
        })
    }
}

/// Clears the in-flight marker when the execution ends, however it ends.
struct InFlightGuard {
    owner: Arc<InFlight>,
    marker: ScopeMarker,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner
            .scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.marker);
    }
}

/// Outcome of an executed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_payload: Option<Value>,
}

impl ActionResult {
    fn from_backend(output: Value) -> Self {
        let text = |key: &str| {
            output
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            status: text("status").unwrap_or_else(|| "triggered".to_string()),
            message: text("message")
                .unwrap_or_else(|| "Action execution was triggered".to_string()),
            result_payload: (!output.is_null()).then_some(output),
        }
    }
}

/// Discovers and executes actions.
#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn BackendClient>,
    bindings: Arc<BindingRegistry>,
    in_flight: Arc<InFlight>,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn BackendClient>, binding_ttl: Duration) -> Self {
        Self {
            backend,
            bindings: Arc::new(BindingRegistry::new(binding_ttl)),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// List the actions available on a scope and remember their binding ids.
    pub async fn list_available_actions(
        &self,
        scope: &DiscoveryScope,
    ) -> Result<Vec<Value>, ToolError> {
        let output = self
            .backend
            .post(endpoints::FETCH_AVAILABLE_ACTIONS, &scope.body())
            .await?;

        let mut actions = match output {
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let kind = scope.kind();
        let key = scope.key();
        for action in &mut actions {
            if let Some(fields) = action.as_object_mut() {
                fields.remove("rules");
            }
            match binding_id(action) {
                Some(id) => self.bindings.record(id, kind, &key),
                None => warn!(scope = %kind, "Discovered action without a binding id"),
            }
        }

        debug!(scope = %kind, count = actions.len(), "Discovered actions");
        Ok(actions)
    }

    /// Execute one action.
    ///
    /// Fails with a validation error when an identifier is missing or the
    /// binding was not discovered for this scope kind within the TTL, and
    /// with a conflict when an action is already running on the scope.
    pub async fn execute(&self, ids: &ActionIds) -> Result<ActionResult, ToolError> {
        let scope = ids.resolve()?;
        let kind = scope.kind();

        let binding = self.bindings.lookup(&scope.binding_id).ok_or_else(|| {
            ToolError::validation(format!(
                "action binding '{}' is unknown or expired; list the available actions for this {} first",
                scope.binding_id, kind
            ))
        })?;
        if binding.scope_kind != kind {
            return Err(ToolError::validation(format!(
                "action binding '{}' belongs to {} scope, not {} scope",
                scope.binding_id, binding.scope_kind, kind
            )));
        }

        let key = scope.key();
        let _guard = self
            .in_flight
            .acquire((kind, key.clone()))
            .ok_or_else(|| {
                ToolError::Conflict(format!(
                    "an action is already running for {} '{}'",
                    kind, key
                ))
            })?;

        info!(scope = %kind, key = %key, binding = %scope.binding_id, "Executing action");
        let output = self
            .backend
            .post(endpoints::ACTIONS_EXECUTIONS, &scope.body())
            .await?;
        Ok(ActionResult::from_backend(output))
    }
}

fn binding_id(action: &Value) -> Option<&str> {
    BINDING_ID_FIELDS
        .iter()
        .find_map(|field| action.get(*field).and_then(Value::as_str))
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;

    fn assessment_ids(binding: &str) -> ActionIds {
        ActionIds {
            assessment_id: Some("plan-1".to_string()),
            assessment_run_id: Some("run-1".to_string()),
            action_binding_id: Some(binding.to_string()),
            ..Default::default()
        }
    }

    fn dispatcher(backend: &Arc<ScriptedBackend>) -> ActionDispatcher {
        ActionDispatcher::new(backend.clone(), Duration::minutes(30))
    }

    #[test]
    fn test_scope_resolution() {
        let mut ids = assessment_ids("b");
        assert_eq!(ids.scope_kind(), ScopeKind::Assessment);

        ids.assessment_run_control_id = Some("ctrl".to_string());
        assert_eq!(ids.scope_kind(), ScopeKind::Control);

        ids.evidence_record_ids = vec!["rec".to_string()];
        assert_eq!(ids.scope_kind(), ScopeKind::Evidence);

        let evidence_only = ActionIds {
            assessment_run_control_evidence_id: Some("ev".to_string()),
            ..Default::default()
        };
        assert_eq!(evidence_only.scope_kind(), ScopeKind::Evidence);
    }

    #[test]
    fn test_evidence_scope_requires_evidence_and_records() {
        let ids = ActionIds {
            assessment_run_control_id: Some("ctrl".to_string()),
            assessment_run_control_evidence_id: Some("ev".to_string()),
            ..assessment_ids("b")
        };
        let err = ids.resolve().unwrap_err();
        assert!(err.to_string().contains("evidenceRecordIds"));

        let ids = ActionIds {
            evidence_record_ids: vec!["r1".to_string()],
            ..assessment_ids("b")
        };
        let err = ids.resolve().unwrap_err();
        assert!(err.to_string().contains("assessmentRunControlEvidenceId"));
    }

    #[test]
    fn test_evidence_scope_without_control_id() {
        let ids = ActionIds {
            assessment_run_control_evidence_id: Some("ev".to_string()),
            evidence_record_ids: vec!["r1".to_string(), "r2".to_string()],
            ..assessment_ids("b")
        };
        let scope = ids.resolve().unwrap();

        assert_eq!(scope.kind(), ScopeKind::Evidence);
        assert_eq!(scope.key(), "run-1/ev");
        let body = scope.body();
        assert_eq!(body["planInstanceControlID"], "");
        assert_eq!(body["planInstanceControlEvidenceID"], "ev");
        assert_eq!(body["recordIDs"], json!(["r1", "r2"]));
    }

    #[test]
    fn test_scope_keys() {
        let ids = ActionIds {
            assessment_run_control_id: Some("ctrl".to_string()),
            assessment_run_control_evidence_id: Some("ev".to_string()),
            evidence_record_ids: vec!["r1".to_string()],
            ..assessment_ids("b")
        };
        let scope = ids.resolve().unwrap();
        assert_eq!(scope.kind(), ScopeKind::Evidence);
        assert_eq!(scope.key(), "run-1/ctrl/ev");
        assert_eq!(scope.body()["recordIDs"], json!(["r1"]));
    }

    #[test]
    fn test_binding_expires() {
        let registry = BindingRegistry::new(Duration::minutes(30));
        let t0 = Utc::now();
        registry.record_at("b1", ScopeKind::Control, "a/1/x", t0);

        assert!(registry.lookup_at("b1", t0 + Duration::minutes(29)).is_some());
        assert!(registry.lookup_at("b1", t0 + Duration::minutes(30)).is_none());
        assert!(registry.lookup_at("other", t0).is_none());
    }

    #[tokio::test]
    async fn test_discovery_records_bindings_and_strips_rules() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::FETCH_AVAILABLE_ACTIONS,
            Ok(json!({"items": [
                {"id": "bind-1", "name": "Create ticket", "rules": [{"x": 1}]},
                {"actionBindingId": "bind-2", "name": "Notify"}
            ]})),
        );
        let dispatcher = dispatcher(&backend);

        let actions = dispatcher
            .list_available_actions(&DiscoveryScope::Assessment {
                assessment_name: "SOC 2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(actions.len(), 2);
        assert!(actions[0].get("rules").is_none());
        let binding = dispatcher.bindings().lookup("bind-2").unwrap();
        assert_eq!(binding.scope_kind, ScopeKind::Assessment);
        assert_eq!(binding.scope_key, "SOC 2");

        let body = &backend.calls(endpoints::FETCH_AVAILABLE_ACTIONS)[0];
        assert_eq!(body["triggerType"], "userAction");
        assert!(body.get("controlNumber").is_none());
    }

    #[tokio::test]
    async fn test_unknown_binding_rejected_before_backend() {
        let backend = Arc::new(ScriptedBackend::new());
        let err = dispatcher(&backend)
            .execute(&assessment_ids("never-seen"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_binding_scope_kind_must_match() {
        let backend = Arc::new(ScriptedBackend::new());
        let dispatcher = dispatcher(&backend);
        dispatcher
            .bindings()
            .record("bind-1", ScopeKind::Control, "SOC 2/CC1.1/a");

        let err = dispatcher.execute(&assessment_ids("bind-1")).await.unwrap_err();
        assert!(err.to_string().contains("control scope"));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_execute_shapes_result() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::ACTIONS_EXECUTIONS,
            Ok(json!({"status": "QUEUED", "executionId": "ex-1"})),
        );
        let dispatcher = dispatcher(&backend);
        dispatcher
            .bindings()
            .record("bind-1", ScopeKind::Assessment, "SOC 2");

        let result = dispatcher.execute(&assessment_ids("bind-1")).await.unwrap();
        assert_eq!(result.status, "QUEUED");
        assert_eq!(result.message, "Action execution was triggered");
        assert_eq!(result.result_payload.unwrap()["executionId"], "ex-1");

        let body = &backend.calls(endpoints::ACTIONS_EXECUTIONS)[0];
        assert_eq!(body["planID"], "plan-1");
        assert_eq!(body["planInstanceID"], "run-1");
        assert_eq!(body["planInstanceControlID"], "");
    }

    #[tokio::test]
    async fn test_overlapping_execute_conflicts() {
        let backend = Arc::new(
            ScriptedBackend::new().with_delay(std::time::Duration::from_millis(100)),
        );
        backend.respond(endpoints::ACTIONS_EXECUTIONS, Ok(json!({"status": "done"})));
        backend.respond(endpoints::ACTIONS_EXECUTIONS, Ok(json!({"status": "done"})));
        let dispatcher = dispatcher(&backend);
        dispatcher
            .bindings()
            .record("bind-1", ScopeKind::Assessment, "SOC 2");

        let ids = assessment_ids("bind-1");
        let (first, second) = tokio::join!(dispatcher.execute(&ids), dispatcher.execute(&ids));

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err().kind(), "conflict");
        assert_eq!(backend.calls(endpoints::ACTIONS_EXECUTIONS).len(), 1);

        // released once the first call completes
        assert!(dispatcher.execute(&ids).await.is_ok());
    }

    #[tokio::test]
    async fn test_marker_released_when_cancelled() {
        let backend = Arc::new(
            ScriptedBackend::new().with_delay(std::time::Duration::from_millis(200)),
        );
        backend.respond(endpoints::ACTIONS_EXECUTIONS, Ok(json!({})));
        backend.respond(endpoints::ACTIONS_EXECUTIONS, Ok(json!({})));
        let dispatcher = dispatcher(&backend);
        dispatcher
            .bindings()
            .record("bind-1", ScopeKind::Assessment, "SOC 2");
        let ids = assessment_ids("bind-1");

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            dispatcher.execute(&ids),
        )
        .await;
        assert!(cancelled.is_err());

        let result = dispatcher.execute(&ids).await.unwrap();
        assert_eq!(result.status, "triggered");
    }
}
