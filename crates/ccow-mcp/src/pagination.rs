//! Paginated retrieval with page-size escalation.
//!
//! A [`ListingQuery`] names one listing and its filters. The
//! [`PaginatedFetcher`] requests it at the caller's page size and, when the
//! backend times out, retries at each larger rung of the listing's ladder.
//! Any other failure is returned at once. The items of a successful page are
//! reduced to their documented fields.

use crate::error::ToolError;
use ccow_backend::{BackendClient, BackendError, endpoints};
use ccow_core::model::{
    AssessmentRun, Check, DashboardControl, Resource, ResourceTypeCount,
};
use ccow_core::{ListingKind, PaginationConfig, ReviewPeriod};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Filters of the common controls listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlFilters {
    pub compliance_status: Option<String>,
    pub control_status: Option<String>,
    pub priority: Option<String>,
    pub control_category_name: Option<String>,
}

/// One listing and the filters that select its items.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingQuery {
    AssessmentRuns {
        assessment_id: String,
    },
    ResourceTypes {
        run_id: String,
    },
    Checks {
        run_id: String,
        resource_type: String,
        compliance_status: Option<String>,
    },
    Resources {
        run_id: String,
        resource_type: String,
        compliance_status: Option<String>,
    },
    ResourcesByCheck {
        run_id: String,
        check: String,
    },
    DashboardControls {
        period: ReviewPeriod,
        filters: ControlFilters,
    },
    /// Leaf controls of one framework; shares the dashboard ladder.
    FrameworkControls {
        period: ReviewPeriod,
        framework: String,
    },
}

impl ListingQuery {
    pub fn kind(&self) -> ListingKind {
        match self {
            ListingQuery::AssessmentRuns { .. } => ListingKind::AssessmentRuns,
            ListingQuery::ResourceTypes { .. } => ListingKind::ResourceTypes,
            ListingQuery::Checks { .. } => ListingKind::Checks,
            ListingQuery::Resources { .. } => ListingKind::Resources,
            ListingQuery::ResourcesByCheck { .. } => ListingKind::ResourcesByCheck,
            ListingQuery::DashboardControls { .. } | ListingQuery::FrameworkControls { .. } => {
                ListingKind::DashboardControls
            }
        }
    }

    /// Issue the backend request for one page.
    async fn request(
        &self,
        backend: &dyn BackendClient,
        page: u64,
        page_size: u64,
    ) -> Result<Value, BackendError> {
        match self {
            ListingQuery::AssessmentRuns { assessment_id } => {
                backend
                    .get(&endpoints::plan_instances(assessment_id, page, page_size))
                    .await
            }
            ListingQuery::ResourceTypes { run_id } => {
                let body = json!({
                    "planRunID": run_id,
                    "page": page,
                    "pageSize": page_size,
                });
                backend.post(endpoints::FETCH_RESOURCE_TYPES, &body).await
            }
            ListingQuery::Checks {
                run_id,
                resource_type,
                compliance_status,
            } => {
                let body = json!({
                    "planRunID": run_id,
                    "resourceType": resource_type,
                    "page": page,
                    "pageSize": page_size,
                    "complianceStatus": compliance_status.as_deref().unwrap_or_default(),
                });
                backend.post(endpoints::FETCH_CHECKS, &body).await
            }
            ListingQuery::Resources {
                run_id,
                resource_type,
                compliance_status,
            } => {
                let body = json!({
                    "planRunID": run_id,
                    "resourceType": resource_type,
                    "page": page,
                    "pageSize": page_size,
                    "complianceStatus": compliance_status.as_deref().unwrap_or_default(),
                });
                backend.post(endpoints::FETCH_RESOURCES, &body).await
            }
            ListingQuery::ResourcesByCheck { run_id, check } => {
                let body = json!({
                    "planRunID": run_id,
                    "checkName": check,
                    "page": page,
                    "pageSize": page_size,
                });
                backend.post(endpoints::FETCH_RESOURCES, &body).await
            }
            ListingQuery::DashboardControls { period, filters } => {
                backend
                    .post(
                        endpoints::CCF_DASHBOARD_CONTROL_DETAILS,
                        &common_controls_body(period, filters, page, page_size),
                    )
                    .await
            }
            ListingQuery::FrameworkControls { period, framework } => {
                let mut body = framework_controls_body(period, framework);
                body["page"] = json!(page);
                body["pageSize"] = json!(page_size);
                backend
                    .post(endpoints::CCF_DASHBOARD_CONTROL_DETAILS, &body)
                    .await
            }
        }
    }

    /// Reduce raw backend items to their documented fields.
    fn shape_items(&self, raw: &[Value]) -> Vec<Value> {
        match self {
            ListingQuery::AssessmentRuns { .. } => raw
                .iter()
                .filter(|item| item.get("planId").is_some() && item.get("id").is_some())
                .filter_map(shape::<AssessmentRun>)
                .collect(),
            ListingQuery::ResourceTypes { .. } => {
                raw.iter().filter_map(shape::<ResourceTypeCount>).collect()
            }
            ListingQuery::Checks { .. } => raw.iter().filter_map(shape::<Check>).collect(),
            ListingQuery::Resources { .. } => raw.iter().filter_map(shape::<Resource>).collect(),
            ListingQuery::ResourcesByCheck { .. } => raw
                .iter()
                .filter_map(|item| {
                    let mut resource: Resource = parse(item)?;
                    resource.checks = None;
                    serde_json::to_value(resource).ok()
                })
                .collect(),
            ListingQuery::DashboardControls { .. } | ListingQuery::FrameworkControls { .. } => raw
                .iter()
                .filter(|item| item.get("controlName").is_some())
                .filter_map(shape::<DashboardControl>)
                .collect(),
        }
    }
}

/// Request body of the common controls dashboard listing.
///
/// The overdue and non-compliant selections are flags of their own; when
/// one is set the matching free-text filter is sent empty.
pub(crate) fn common_controls_body(
    period: &ReviewPeriod,
    filters: &ControlFilters,
    page: u64,
    page_size: u64,
) -> Value {
    let overdue = filters.control_status.as_deref() == Some("Overdue");
    let non_compliant = filters.compliance_status.as_deref() == Some("NON_COMPLIANT");
    json!({
        "ccfPeriod": period.to_string(),
        "includeOverDueControls": overdue,
        "includeNonCompliantControls": non_compliant,
        "fetchleafControls": true,
        "status": if overdue { "" } else { filters.control_status.as_deref().unwrap_or_default() },
        "complianceStatus": if non_compliant {
            ""
        } else {
            filters.compliance_status.as_deref().unwrap_or_default()
        },
        "controlCategoryName": filters.control_category_name.as_deref().unwrap_or_default(),
        "priority": filters.priority.as_deref().unwrap_or_default(),
        "page": page,
        "pageSize": page_size,
    })
}

/// Request body of a framework's leaf controls, without pagination.
pub(crate) fn framework_controls_body(period: &ReviewPeriod, framework: &str) -> Value {
    json!({
        "ccfPeriod": period.to_string(),
        "includeOverDueControls": false,
        "includeNonCompliantControls": false,
        "fetchleafControls": true,
        "authorityDocumentName": framework,
    })
}

fn parse<T: DeserializeOwned>(item: &Value) -> Option<T> {
    match serde_json::from_value(item.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(error = %e, "Skipping malformed item");
            None
        }
    }
}

fn shape<T: DeserializeOwned + Serialize>(item: &Value) -> Option<Value> {
    parse::<T>(item).and_then(|parsed| serde_json::to_value(parsed).ok())
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Value>,
    pub page: u64,
    /// Page size that actually succeeded.
    pub page_size: u64,
    pub total_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
}

/// Pagination fields of a backend listing response.
///
/// The dashboard reports them capitalized, the other listings in camelCase.
#[derive(Debug, Default)]
struct RawPage<'a> {
    items: &'a [Value],
    total_pages: Option<u64>,
    total_items: Option<u64>,
}

impl<'a> RawPage<'a> {
    fn parse(raw: &'a Value) -> Self {
        let items = raw
            .get("items")
            .or_else(|| raw.get("Items"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .or_else(|| raw.as_array().map(Vec::as_slice))
            .unwrap_or_default();
        let number = |lower: &str, upper: &str| {
            raw.get(lower)
                .or_else(|| raw.get(upper))
                .and_then(Value::as_u64)
        };
        Self {
            items,
            total_pages: number("totalPage", "TotalPage")
                .or_else(|| number("totalPages", "TotalPages")),
            total_items: number("totalItems", "TotalItems"),
        }
    }
}

/// Fetches listing pages, escalating the page size on timeout.
#[derive(Clone)]
pub struct PaginatedFetcher {
    backend: Arc<dyn BackendClient>,
    config: Arc<PaginationConfig>,
}

impl std::fmt::Debug for PaginatedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaginatedFetcher {
    pub fn new(backend: Arc<dyn BackendClient>, config: Arc<PaginationConfig>) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Fetch one page.
    ///
    /// `page` defaults to 1 and `page_size` to the listing's default. The
    /// requested size is tried first, then every larger ladder rung. Only
    /// timeout-class failures move to the next rung.
    pub async fn fetch(
        &self,
        query: &ListingQuery,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Page, ToolError> {
        let kind = query.kind();
        let ladder = self.config.ladder(kind);

        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ToolError::validation("page must be at least 1"));
        }
        let requested = page_size.unwrap_or(ladder.default_page_size);
        let attempts = ladder.attempts(requested).ok_or_else(|| {
            ToolError::validation(format!(
                "pageSize must be between 1 and {} for {}",
                ladder.max_page_size(),
                kind
            ))
        })?;

        let mut tried = Vec::with_capacity(attempts.len());
        for size in attempts {
            tried.push(size);
            match query.request(self.backend.as_ref(), page, size).await {
                Ok(raw) => {
                    debug!(listing = %kind, page, page_size = size, "Fetched page");
                    return Ok(self.build_page(query, &raw, page, size));
                }
                Err(e) if e.is_timeout_class() => {
                    warn!(
                        listing = %kind,
                        page,
                        page_size = size,
                        error = %e,
                        "Listing timed out, escalating page size"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ToolError::ladder_exhausted(tried))
    }

    fn build_page(&self, query: &ListingQuery, raw: &Value, page: u64, page_size: u64) -> Page {
        let parsed = RawPage::parse(raw);
        let returned = parsed.items.len() as u64;

        let total_pages = match (parsed.total_items, parsed.total_pages) {
            (Some(total), _) => total.div_ceil(page_size),
            (None, Some(pages)) => pages,
            (None, None) if returned >= page_size => page + 1,
            (None, None) if returned > 0 => page,
            (None, None) => page - 1,
        };

        let items = if page > total_pages {
            Vec::new()
        } else {
            let mut items = query.shape_items(parsed.items);
            items.truncate(page_size as usize);
            items
        };

        Page {
            items,
            page,
            page_size,
            total_pages,
            total_items: parsed.total_items,
        }
    }
}
