//! Page-size ladders for listing tools.
//!
//! Each listing kind owns a fixed, strictly increasing ladder of page sizes.
//! A listing starts at the requested size and, on a timeout-class failure,
//! moves to the next larger rung until the ladder is exhausted.

use serde::{Deserialize, Serialize};

/// The listing tools that share the paginated retrieval protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    AssessmentRuns,
    ResourceTypes,
    Checks,
    Resources,
    ResourcesByCheck,
    DashboardControls,
}

impl ListingKind {
    pub const ALL: [ListingKind; 6] = [
        ListingKind::AssessmentRuns,
        ListingKind::ResourceTypes,
        ListingKind::Checks,
        ListingKind::Resources,
        ListingKind::ResourcesByCheck,
        ListingKind::DashboardControls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::AssessmentRuns => "assessment_runs",
            ListingKind::ResourceTypes => "resource_types",
            ListingKind::Checks => "checks",
            ListingKind::Resources => "resources",
            ListingKind::ResourcesByCheck => "resources_by_check",
            ListingKind::DashboardControls => "dashboard_controls",
        }
    }

    /// Whether a compliance summary can stand in for this listing.
    pub fn has_summary(&self) -> bool {
        matches!(
            self,
            ListingKind::Checks | ListingKind::Resources | ListingKind::ResourcesByCheck
        )
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ladder settings for one listing kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Page size used when the caller does not pass one. Must be a rung.
    pub default_page_size: u64,

    /// Strictly increasing page sizes tried on timeout.
    pub ladder: Vec<u64>,

    /// Item count above which an unpaged request is answered with a summary.
    /// Only consulted for kinds with a summary counterpart.
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: u64,
}

impl LadderConfig {
    pub fn new(default_page_size: u64, ladder: &[u64]) -> Self {
        Self {
            default_page_size,
            ladder: ladder.to_vec(),
            summary_threshold: default_summary_threshold(),
        }
    }

    /// Largest page size this listing accepts.
    pub fn max_page_size(&self) -> u64 {
        self.ladder.last().copied().unwrap_or(self.default_page_size)
    }

    /// Page sizes to try, in order, for a requested size.
    ///
    /// The requested size comes first, followed by every rung strictly
    /// larger than it. Returns `None` when the request exceeds the ladder.
    pub fn attempts(&self, requested: u64) -> Option<Vec<u64>> {
        if requested == 0 || requested > self.max_page_size() {
            return None;
        }
        let mut sizes = vec![requested];
        sizes.extend(self.ladder.iter().copied().filter(|&size| size > requested));
        Some(sizes)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ladder.is_empty() {
            return Err("ladder must not be empty".to_string());
        }
        if self.ladder[0] == 0 {
            return Err("ladder values must be positive".to_string());
        }
        if self.ladder.windows(2).any(|w| w[0] >= w[1]) {
            return Err(format!("ladder {:?} must be strictly increasing", self.ladder));
        }
        if !self.ladder.contains(&self.default_page_size) {
            return Err(format!(
                "default page size {} is not a ladder value {:?}",
                self.default_page_size, self.ladder
            ));
        }
        Ok(())
    }
}

/// Ladder settings for every listing kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_assessment_runs")]
    pub assessment_runs: LadderConfig,

    #[serde(default = "default_resource_types")]
    pub resource_types: LadderConfig,

    #[serde(default = "default_checks")]
    pub checks: LadderConfig,

    #[serde(default = "default_resources")]
    pub resources: LadderConfig,

    #[serde(default = "default_resources_by_check")]
    pub resources_by_check: LadderConfig,

    #[serde(default = "default_dashboard_controls")]
    pub dashboard_controls: LadderConfig,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            assessment_runs: default_assessment_runs(),
            resource_types: default_resource_types(),
            checks: default_checks(),
            resources: default_resources(),
            resources_by_check: default_resources_by_check(),
            dashboard_controls: default_dashboard_controls(),
        }
    }
}

impl PaginationConfig {
    pub fn ladder(&self, kind: ListingKind) -> &LadderConfig {
        match kind {
            ListingKind::AssessmentRuns => &self.assessment_runs,
            ListingKind::ResourceTypes => &self.resource_types,
            ListingKind::Checks => &self.checks,
            ListingKind::Resources => &self.resources,
            ListingKind::ResourcesByCheck => &self.resources_by_check,
            ListingKind::DashboardControls => &self.dashboard_controls,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for kind in ListingKind::ALL {
            self.ladder(kind)
                .validate()
                .map_err(|e| format!("pagination.{}: {}", kind, e))?;
        }
        Ok(())
    }
}

fn default_summary_threshold() -> u64 {
    100
}

fn default_assessment_runs() -> LadderConfig {
    LadderConfig::new(5, &[5, 10])
}

fn default_resource_types() -> LadderConfig {
    LadderConfig::new(50, &[50, 100])
}

fn default_checks() -> LadderConfig {
    LadderConfig::new(5, &[5, 10])
}

fn default_resources() -> LadderConfig {
    LadderConfig::new(5, &[5, 10])
}

fn default_resources_by_check() -> LadderConfig {
    LadderConfig::new(10, &[10, 50])
}

fn default_dashboard_controls() -> LadderConfig {
    LadderConfig::new(50, &[50, 100])
}
