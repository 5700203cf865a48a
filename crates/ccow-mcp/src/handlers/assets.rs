//! Asset, resource and check tools.
//!
//! Check and resource listings hand off to a compliance summary when the
//! caller asks for one, or when an unpaged request turns out to exceed the
//! listing's summary threshold.

use super::shape_items;
use crate::error::ToolError;
use crate::executor::{ToolExecutor, to_value};
use crate::pagination::ListingQuery;
use crate::summary::SummaryScope;
use crate::validator::Args;
use ccow_backend::endpoints;
use ccow_core::model::{Asset, AssetRunSummary};
use serde_json::{Value, json};
use tracing::info;

impl ToolExecutor {
    pub(crate) async fn list_assets(&self) -> Result<Value, ToolError> {
        let raw = self.backend.get(endpoints::ASSETS).await?;
        let assets: Vec<Asset> = shape_items(&raw, &["name"]);
        Ok(json!({ "assets": to_value(assets)? }))
    }

    pub(crate) async fn fetch_assets_summary(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let id = args.required_str("id")?;
        let raw = self
            .backend
            .post(endpoints::FETCH_ASSETS_SUMMARY, &json!({ "planID": id }))
            .await?;
        let summary: AssetRunSummary = serde_json::from_value(raw)
            .map_err(|e| ToolError::upstream(format!("unexpected asset summary: {}", e)))?;
        to_value(summary)
    }

    pub(crate) async fn fetch_resource_types(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let query = ListingQuery::ResourceTypes {
            run_id: args.required_str("id")?.to_string(),
        };
        self.list_or_summarize(&query, args).await
    }

    pub(crate) async fn fetch_checks(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let query = ListingQuery::Checks {
            run_id: args.required_str("id")?.to_string(),
            resource_type: args.required_str("resourceType")?.to_string(),
            compliance_status: args.str("complianceStatus").map(str::to_string),
        };
        self.list_or_summarize(&query, args).await
    }

    pub(crate) async fn fetch_resources(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let query = ListingQuery::Resources {
            run_id: args.required_str("id")?.to_string(),
            resource_type: args.required_str("resourceType")?.to_string(),
            compliance_status: args.str("complianceStatus").map(str::to_string),
        };
        self.list_or_summarize(&query, args).await
    }

    pub(crate) async fn fetch_resources_by_check(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let query = ListingQuery::ResourcesByCheck {
            run_id: args.required_str("id")?.to_string(),
            check: args.required_str("check")?.to_string(),
        };
        self.list_or_summarize(&query, args).await
    }

    pub(crate) async fn fetch_checks_summary(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let scope = SummaryScope::Checks {
            run_id: args.required_str("id")?.to_string(),
            resource_type: args.required_str("resourceType")?.to_string(),
        };
        to_value(self.summaries.summarize(&scope).await?)
    }

    pub(crate) async fn fetch_resources_summary(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let scope = SummaryScope::Resources {
            run_id: args.required_str("id")?.to_string(),
            resource_type: args.required_str("resourceType")?.to_string(),
        };
        to_value(self.summaries.summarize(&scope).await?)
    }

    pub(crate) async fn fetch_resources_by_check_summary(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let scope = SummaryScope::ResourcesByCheck {
            run_id: args.required_str("id")?.to_string(),
            resource_type: args.str("resourceType").map(str::to_string),
            check: args.required_str("check")?.to_string(),
        };
        to_value(self.summaries.summarize(&scope).await?)
    }

    pub(crate) async fn fetch_resource_types_summary(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let run_id = args.required_str("id")?;
        to_value(self.summaries.summarize_resource_types(run_id).await?)
    }

    /// One page of a listing, or its compliance summary when it is too large.
    async fn list_or_summarize(
        &self,
        query: &ListingQuery,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let kind = query.kind();
        let summary_scope = SummaryScope::for_listing(query).map(|scope| match scope {
            SummaryScope::ResourcesByCheck { run_id, check, .. } => {
                SummaryScope::ResourcesByCheck {
                    run_id,
                    resource_type: args.str("resourceType").map(str::to_string),
                    check,
                }
            }
            other => other,
        });

        if args.bool("summaryOnly") {
            let Some(scope) = &summary_scope else {
                return Err(ToolError::validation(format!(
                    "{} has no summary form",
                    kind
                )));
            };
            return to_value(self.summaries.summarize(scope).await?);
        }

        let requested_page = args.u64("page");
        let page = self
            .fetcher
            .fetch(query, requested_page, args.u64("pageSize"))
            .await?;

        if let (None, Some(scope), Some(total)) = (requested_page, &summary_scope, page.total_items)
        {
            let threshold = self.fetcher.config().ladder(kind).summary_threshold;
            if total > threshold {
                info!(listing = %kind, total, threshold, "Listing too large, returning summary");
                return to_value(self.summaries.summarize(scope).await?);
            }
        }

        to_value(page)
    }
}
