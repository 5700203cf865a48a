//! Compliance summaries in place of large listings.

use crate::error::ToolError;
use crate::pagination::{ListingQuery, PaginatedFetcher};
use ccow_backend::{BackendClient, endpoints};
use ccow_core::model::ResourceTypeCount;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on resource-type pages drained for one summary.
const MAX_RESOURCE_TYPE_PAGES: u64 = 100;

/// What a summary counts.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryScope {
    Checks {
        run_id: String,
        resource_type: String,
    },
    Resources {
        run_id: String,
        resource_type: String,
    },
    ResourcesByCheck {
        run_id: String,
        resource_type: Option<String>,
        check: String,
    },
}

impl SummaryScope {
    /// The summary counterpart of a listing, if it has one.
    pub fn for_listing(query: &ListingQuery) -> Option<Self> {
        match query {
            ListingQuery::Checks {
                run_id,
                resource_type,
                ..
            } => Some(SummaryScope::Checks {
                run_id: run_id.clone(),
                resource_type: resource_type.clone(),
            }),
            ListingQuery::Resources {
                run_id,
                resource_type,
                ..
            } => Some(SummaryScope::Resources {
                run_id: run_id.clone(),
                resource_type: resource_type.clone(),
            }),
            ListingQuery::ResourcesByCheck { run_id, check } => {
                Some(SummaryScope::ResourcesByCheck {
                    run_id: run_id.clone(),
                    resource_type: None,
                    check: check.clone(),
                })
            }
            _ => None,
        }
    }

    fn body(&self) -> Value {
        match self {
            SummaryScope::Checks {
                run_id,
                resource_type,
            } => json!({
                "planRunID": run_id,
                "resourceType": resource_type,
                "summaryType": "checks",
            }),
            SummaryScope::Resources {
                run_id,
                resource_type,
            } => json!({
                "planRunID": run_id,
                "resourceType": resource_type,
                "summaryType": "resources",
            }),
            SummaryScope::ResourcesByCheck {
                run_id,
                resource_type,
                check,
            } => json!({
                "planRunID": run_id,
                "resourceType": resource_type.as_deref().unwrap_or_default(),
                "checkName": check,
                "summaryType": "resources",
            }),
        }
    }
}

/// Compliance counts of one scope.
///
/// `compliant_count + non_compliant_count <= total_count`, and statuses with
/// a zero count are left out of `breakdown`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub total_count: u64,
    pub compliant_count: u64,
    pub non_compliant_count: u64,
    pub breakdown: BTreeMap<String, u64>,
}

impl ComplianceSummary {
    /// Build a summary from the backend's `complianceSummary`.
    ///
    /// Accepts a status-to-count map or a list of `{status, count}` entries.
    /// Keys starting with `total` report the total; every other key is a
    /// status, normalised to upper snake case.
    pub fn from_backend(raw: &Value) -> Self {
        let source = raw.get("complianceSummary").unwrap_or(raw);

        let mut reported_total = 0;
        let mut breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut add = |key: &str, count: u64| {
            if key.to_ascii_lowercase().starts_with("total") {
                reported_total = reported_total.max(count);
            } else if count > 0 {
                *breakdown.entry(upper_snake(key)).or_default() += count;
            }
        };

        match source {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(count) = count_of(value) {
                        add(key, count);
                    }
                }
            }
            Value::Array(entries) => {
                for entry in entries {
                    let status = entry.get("status").and_then(Value::as_str);
                    let count = entry.get("count").and_then(count_of);
                    if let (Some(status), Some(count)) = (status, count) {
                        add(status, count);
                    }
                }
            }
            _ => {}
        }

        let sum: u64 = breakdown.values().sum();
        Self {
            total_count: reported_total.max(sum),
            compliant_count: breakdown.get("COMPLIANT").copied().unwrap_or_default(),
            non_compliant_count: breakdown.get("NON_COMPLIANT").copied().unwrap_or_default(),
            breakdown,
        }
    }
}

fn count_of(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// `nonCompliant`, `non-compliant` and `NON_COMPLIANT` all become `NON_COMPLIANT`.
fn upper_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c);
            prev_lower = false;
        } else {
            out.push(c.to_ascii_uppercase());
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Every resource type of a run, gathered into one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeSummary {
    pub total_resource_types: u64,
    pub total_resources: u64,
    pub resource_types: Vec<ResourceTypeCount>,
}

/// Produces compliance summaries.
#[derive(Clone)]
pub struct SummaryAggregator {
    backend: Arc<dyn BackendClient>,
    fetcher: PaginatedFetcher,
}

impl SummaryAggregator {
    pub fn new(backend: Arc<dyn BackendClient>, fetcher: PaginatedFetcher) -> Self {
        Self { backend, fetcher }
    }

    /// Compliance counts of a check or resource scope, in one backend call.
    pub async fn summarize(&self, scope: &SummaryScope) -> Result<ComplianceSummary, ToolError> {
        let raw = self
            .backend
            .post(endpoints::FETCH_ASSETS_DETAIL_SUMMARY, &scope.body())
            .await?;
        let summary = ComplianceSummary::from_backend(&raw);
        debug!(total = summary.total_count, "Built compliance summary");
        Ok(summary)
    }

    /// Drain every resource-type page of a run.
    pub async fn summarize_resource_types(
        &self,
        run_id: &str,
    ) -> Result<ResourceTypeSummary, ToolError> {
        let query = ListingQuery::ResourceTypes {
            run_id: run_id.to_string(),
        };

        let mut resource_types: Vec<ResourceTypeCount> = Vec::new();
        let mut page = 1;
        // every page after the first is requested at the size that worked
        let mut page_size = None;
        loop {
            let fetched = self.fetcher.fetch(&query, Some(page), page_size).await?;
            if page_size.is_some_and(|size| size != fetched.page_size) {
                // page numbers shift with the size, so start over at the larger one
                debug!(run_id, page_size = fetched.page_size, "Restarting resource type drain");
                resource_types.clear();
                page = 1;
                page_size = Some(fetched.page_size);
                continue;
            }
            page_size = Some(fetched.page_size);
            let short = (fetched.items.len() as u64) < fetched.page_size;
            for item in fetched.items {
                match serde_json::from_value(item) {
                    Ok(count) => resource_types.push(count),
                    Err(e) => warn!(error = %e, "Skipping malformed resource type"),
                }
            }
            if page >= fetched.total_pages || short {
                break;
            }
            if page >= MAX_RESOURCE_TYPE_PAGES {
                warn!(run_id, pages = page, "Stopped draining resource types");
                break;
            }
            page += 1;
        }

        Ok(ResourceTypeSummary {
            total_resource_types: resource_types.len() as u64,
            total_resources: resource_types
                .iter()
                .filter_map(|t| t.total_resources)
                .sum(),
            resource_types,
        })
    }
}
