//! Common control framework dashboard tools.

use super::{items, shape_items};
use crate::error::ToolError;
use crate::executor::{ToolExecutor, to_value};
use crate::pagination::{ControlFilters, ListingQuery, framework_controls_body};
use crate::validator::Args;
use ccow_backend::endpoints;
use ccow_core::ReviewPeriod;
use ccow_core::model::DashboardControl;
use serde_json::{Value, json};

const NO_RECENT_RUN: &str = "No recent run for ccf plans";
const DEFAULT_TOP_COUNT: u64 = 10;

fn period(args: &Args<'_>) -> Result<ReviewPeriod, ToolError> {
    args.required_str("period")?
        .parse()
        .map_err(ToolError::Validation)
}

/// Replace the backend's "no recent run" failure with a readable message.
fn for_period(period: &ReviewPeriod) -> impl Fn(ToolError) -> ToolError + '_ {
    move |error| match error {
        ToolError::Upstream { status, message } if message.contains(NO_RECENT_RUN) => {
            ToolError::Upstream {
                status,
                message: format!("There is no data found for the review period: {}", period),
            }
        }
        other => other,
    }
}

/// Controls of a dashboard response with the backend's pagination fields.
fn control_list(raw: &Value) -> Result<Value, ToolError> {
    let controls: Vec<DashboardControl> = shape_items(raw, &["controlName"]);
    let number = |lower: &str, upper: &str| {
        raw.get(upper)
            .or_else(|| raw.get(lower))
            .and_then(Value::as_u64)
    };
    Ok(json!({
        "controls": to_value(controls)?,
        "page": number("page", "Page"),
        "totalPage": number("totalPage", "TotalPage"),
        "totalItems": number("totalItems", "TotalItems"),
    }))
}

impl ToolExecutor {
    pub(crate) async fn get_dashboard_review_periods(&self) -> Result<Value, ToolError> {
        let raw = self
            .backend
            .post(endpoints::CCF_DASHBOARD_REVIEW_PERIODS, &json!({}))
            .await?;
        let periods: Vec<Value> = items(&raw).to_vec();
        Ok(json!({ "items": periods }))
    }

    pub(crate) async fn get_dashboard_data(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let period = period(&args)?;
        let body = json!({
            "ccfPeriod": period.to_string(),
            "includeCompliancePerformance": true,
            "includeControlSummary": true,
            "includeFrameworkCompliance": true,
        });
        self.backend
            .post(endpoints::CCF_DASHBOARD_FRAMEWORK_SUMMARY, &body)
            .await
            .map_err(ToolError::from)
            .map_err(for_period(&period))
    }

    pub(crate) async fn fetch_dashboard_framework_controls(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let period = period(&args)?;
        let query = ListingQuery::FrameworkControls {
            period,
            framework: args.required_str("frameworkName")?.to_string(),
        };
        let page = self
            .fetcher
            .fetch(&query, args.u64("page"), args.u64("pageSize"))
            .await
            .map_err(for_period(&period))?;
        to_value(page)
    }

    /// Control-level detail of a framework, as the dashboard reports it.
    pub(crate) async fn fetch_dashboard_framework_summary(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let period = period(&args)?;
        let body = framework_controls_body(&period, args.required_str("frameworkName")?);
        self.backend
            .post(endpoints::CCF_DASHBOARD_CONTROL_DETAILS, &body)
            .await
            .map_err(ToolError::from)
            .map_err(for_period(&period))
    }

    pub(crate) async fn get_dashboard_common_controls(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let period = period(&args)?;
        let owned = |name: &str| args.str(name).map(str::to_string);
        let query = ListingQuery::DashboardControls {
            period,
            filters: ControlFilters {
                compliance_status: owned("complianceStatus"),
                control_status: owned("controlStatus"),
                priority: owned("priority"),
                control_category_name: owned("controlCategoryName"),
            },
        };
        let page = self
            .fetcher
            .fetch(&query, args.u64("page"), args.u64("pageSize"))
            .await
            .map_err(for_period(&period))?;
        to_value(page)
    }

    pub(crate) async fn get_top_overdue_controls(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let period = period(&args)?;
        let body = json!({
            "ccfPeriod": period.to_string(),
            "includeOverDueControls": true,
            "page": 1,
            "pageSize": args.u64("count").unwrap_or(DEFAULT_TOP_COUNT),
        });
        let raw = self
            .backend
            .post(endpoints::CCF_DASHBOARD_CONTROL_DETAILS, &body)
            .await
            .map_err(ToolError::from)
            .map_err(for_period(&period))?;
        control_list(&raw)
    }

    pub(crate) async fn get_top_non_compliant_controls(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let period = period(&args)?;
        let body = json!({
            "ccfPeriod": period.to_string(),
            "includeNonCompliantControls": true,
            "page": args.u64("page").unwrap_or(1),
            "pageSize": args.u64("count").unwrap_or(DEFAULT_TOP_COUNT),
        });
        let raw = self
            .backend
            .post(endpoints::CCF_DASHBOARD_CONTROL_DETAILS, &body)
            .await
            .map_err(ToolError::from)
            .map_err(for_period(&period))?;
        control_list(&raw)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::names;
    use crate::test_support::{ScriptedBackend, executor, json_content};
    use ccow_backend::{BackendError, endpoints};
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_no_recent_run_names_the_period() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::CCF_DASHBOARD_FRAMEWORK_SUMMARY,
            Err(BackendError::Status {
                status: 400,
                message: "No recent run for ccf plans".to_string(),
            }),
        );

        let result = executor(&backend)
            .execute(names::GET_DASHBOARD_DATA, &json!({"period": "Q2 2024"}))
            .await;

        let error = result.error().unwrap();
        assert_eq!(error["kind"], "upstream");
        assert_eq!(
            error["message"],
            "There is no data found for the review period: Q2 2024"
        );
    }

    #[tokio::test]
    async fn test_other_upstream_errors_pass_through() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::CCF_DASHBOARD_FRAMEWORK_SUMMARY,
            Err(BackendError::Status {
                status: 500,
                message: "database unavailable".to_string(),
            }),
        );

        let result = executor(&backend)
            .execute(names::GET_DASHBOARD_DATA, &json!({"period": "Q2 2024"}))
            .await;

        assert_eq!(result.error().unwrap()["message"], "database unavailable");
        assert_eq!(result.error().unwrap()["status"], 500);
    }

    #[tokio::test]
    async fn test_malformed_period_rejected() {
        let backend = Arc::new(ScriptedBackend::new());
        let result = executor(&backend)
            .execute(names::GET_DASHBOARD_DATA, &json!({"period": "2024-Q1"}))
            .await;

        assert_eq!(result.error().unwrap()["kind"], "validation");
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_framework_controls_keep_named_controls() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::CCF_DASHBOARD_CONTROL_DETAILS,
            Ok(json!({
                "items": [{"controlName": "Access review", "score": 40.0}, {"score": 1.0}],
                "Page": 1,
                "TotalPage": 1,
                "TotalItems": 1
            })),
        );

        let result = executor(&backend)
            .execute(
                names::FETCH_DASHBOARD_FRAMEWORK_CONTROLS,
                &json!({"period": "Q1 2024", "frameworkName": "SOC 2"}),
            )
            .await;

        let content = json_content(&result);
        assert_eq!(content["items"].as_array().unwrap().len(), 1);
        assert_eq!(content["items"][0]["controlName"], "Access review");
        assert_eq!(content["totalItems"], 1);
        let body = &backend.calls(endpoints::CCF_DASHBOARD_CONTROL_DETAILS)[0];
        assert_eq!(body["authorityDocumentName"], "SOC 2");
        assert_eq!(body["page"], 1);
        assert_eq!(body["pageSize"], 50);
    }

    #[tokio::test]
    async fn test_framework_controls_escalate_on_timeout() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::CCF_DASHBOARD_CONTROL_DETAILS,
            Err(ScriptedBackend::timeout()),
        );
        backend.respond(
            endpoints::CCF_DASHBOARD_CONTROL_DETAILS,
            Ok(json!({"items": [{"controlName": "Access review"}], "TotalItems": 1})),
        );

        let result = executor(&backend)
            .execute(
                names::FETCH_DASHBOARD_FRAMEWORK_CONTROLS,
                &json!({"period": "Q1 2024", "frameworkName": "SOC 2", "page": 2}),
            )
            .await;

        let content = json_content(&result);
        assert_eq!(content["pageSize"], 100);
        let sizes: Vec<Value> = backend
            .calls(endpoints::CCF_DASHBOARD_CONTROL_DETAILS)
            .iter()
            .map(|body| body["pageSize"].clone())
            .collect();
        assert_eq!(sizes, vec![json!(50), json!(100)]);
    }

    #[tokio::test]
    async fn test_framework_controls_reject_oversized_page() {
        let backend = Arc::new(ScriptedBackend::new());

        let result = executor(&backend)
            .execute(
                names::FETCH_DASHBOARD_FRAMEWORK_CONTROLS,
                &json!({"period": "Q1 2024", "frameworkName": "SOC 2", "pageSize": 500}),
            )
            .await;

        assert_eq!(json_content(&result)["error"]["kind"], "validation");
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_common_controls_non_compliant_flag() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::CCF_DASHBOARD_CONTROL_DETAILS,
            Ok(json!({"items": [], "TotalItems": 0})),
        );

        let result = executor(&backend)
            .execute(
                names::GET_DASHBOARD_COMMON_CONTROLS,
                &json!({
                    "period": "Q1 2024",
                    "complianceStatus": "NON_COMPLIANT",
                    "priority": "High"
                }),
            )
            .await;

        assert!(result.success);
        let body = &backend.calls(endpoints::CCF_DASHBOARD_CONTROL_DETAILS)[0];
        assert_eq!(body["includeNonCompliantControls"], true);
        assert_eq!(body["complianceStatus"], "");
        assert_eq!(body["priority"], "High");
    }

    #[tokio::test]
    async fn test_top_overdue_uses_count() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::CCF_DASHBOARD_CONTROL_DETAILS,
            Ok(json!({"items": [{"controlName": "Backups", "status": "Overdue"}]})),
        );

        let result = executor(&backend)
            .execute(
                names::GET_TOP_OVERDUE_CONTROLS,
                &json!({"period": "Q3 2024", "count": 3}),
            )
            .await;

        assert_eq!(json_content(&result)["controls"][0]["controlName"], "Backups");
        let body = &backend.calls(endpoints::CCF_DASHBOARD_CONTROL_DETAILS)[0];
        assert_eq!(body["pageSize"], 3);
        assert_eq!(body["includeOverDueControls"], true);
    }
}
