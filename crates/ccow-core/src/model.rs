//! Read-only snapshots of compliance backend entities.
//!
//! Every type here is shaped from a raw backend item: unknown fields are
//! dropped, backend names are mapped to the names agents see
//! (`planId` becomes `assessmentId`, `displayable` becomes `controlNumber`,
//! and so on). Nothing in this module is persisted or mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compliance status of a control, check or resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    NotDetermined,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 3] = [
        ComplianceStatus::Compliant,
        ComplianceStatus::NonCompliant,
        ComplianceStatus::NotDetermined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "COMPLIANT",
            ComplianceStatus::NonCompliant => "NON_COMPLIANT",
            ComplianceStatus::NotDetermined => "NOT_DETERMINED",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplianceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "invalid compliance status '{}', expected one of COMPLIANT, NON_COMPLIANT, NOT_DETERMINED",
                    s
                )
            })
    }
}

/// A dashboard review period such as `Q1 2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPeriod {
    pub quarter: u8,
    pub year: u16,
}

impl fmt::Display for ReviewPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.quarter, self.year)
    }
}

impl FromStr for ReviewPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid review period '{}', expected format 'Q<1-4> <year>'", s);

        let (quarter, year) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let quarter = quarter
            .strip_prefix('Q')
            .and_then(|q| q.parse::<u8>().ok())
            .filter(|q| (1..=4).contains(q))
            .ok_or_else(invalid)?;
        let year = year
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|y| (1000..=9999).contains(y))
            .ok_or_else(invalid)?;

        Ok(ReviewPeriod { quarter, year })
    }
}

/// Granularity an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Assessment,
    Control,
    Evidence,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Assessment => "assessment",
            ScopeKind::Control => "control",
            ScopeKind::Evidence => "evidence",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ASSESSMENTS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentCategory {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assessment {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category_name: Option<String>,
}

/// An automated control of an assessment plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Control {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename(serialize = "controlNumber", deserialize = "displayable"))]
    pub control_number: Option<String>,
    pub alias: Option<String>,
    #[serde(rename = "isLeaf")]
    pub is_leaf: Option<bool>,
}

// =============================================================================
// RUNS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentRun {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename(serialize = "assessmentId", deserialize = "planId"))]
    pub assessment_id: Option<String>,
    #[serde(rename = "applicationType")]
    pub application_type: Option<String>,
    #[serde(rename = "configId")]
    pub config_id: Option<String>,
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
    pub started: Option<String>,
    pub ended: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "computedScore")]
    pub computed_score: Option<f64>,
    #[serde(rename = "computedWeight")]
    pub computed_weight: Option<f64>,
    #[serde(rename = "complianceStatus")]
    pub compliance_status: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

/// A leaf control within one assessment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlRunInstance {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename(serialize = "controlNumber", deserialize = "displayable"))]
    pub control_number: Option<String>,
    pub alias: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
    #[serde(rename = "complianceStatus")]
    pub compliance_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Evidence {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
}

/// One row of an evidence file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceRecord {
    pub id: Option<String>,
    #[serde(rename = "ResourceID")]
    pub resource_id: Option<String>,
    #[serde(rename = "ResourceName")]
    pub resource_name: Option<String>,
    #[serde(rename = "ResourceType")]
    pub resource_type: Option<String>,
    #[serde(rename = "ComplianceStatus")]
    pub compliance_status: Option<String>,
}

// =============================================================================
// ASSETS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckCounts {
    #[serde(rename = "COMPLIANT")]
    pub compliant: Option<u64>,
    #[serde(rename = "NON_COMPLIANT")]
    pub non_compliant: Option<u64>,
}

/// Latest integration run of an asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRunSummary {
    #[serde(rename(serialize = "integrationRunId", deserialize = "planRunID"))]
    pub integration_run_id: Option<String>,
    #[serde(rename = "assessmentName")]
    pub assessment_name: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "numberOfResources")]
    pub number_of_resources: Option<u64>,
    #[serde(rename = "numberOfChecks")]
    pub number_of_checks: Option<CheckCounts>,
    #[serde(rename = "dataStatus")]
    pub data_status: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceTypeCount {
    pub resource_type: Option<String>,
    pub total_resources: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    #[serde(rename = "type")]
    pub rule_type: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Check {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rule: Option<Rule>,
    pub activation_status: Option<String>,
    pub priority: Option<String>,
    pub compliance_status: Option<String>,
    #[serde(rename = "compliancePCT")]
    pub compliance_pct: Option<f64>,
}

/// A check as evaluated against one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCheck {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename(serialize = "complianceStatus", deserialize = "resourceComplianceStatus"))]
    pub compliance_status: Option<String>,
    #[serde(rename = "controlName")]
    pub control_name: Option<String>,
    pub rule: Option<Rule>,
    #[serde(rename = "activationStatus")]
    pub activation_status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Resource {
    pub name: Option<String>,
    pub resource_type: Option<String>,
    pub compliance_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<ResourceCheck>>,
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// A control row of the common control framework dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardControl {
    pub id: Option<String>,
    #[serde(rename = "planInstanceID")]
    pub plan_instance_id: Option<String>,
    pub alias: Option<String>,
    pub displayable: Option<String>,
    pub control_name: Option<String>,
    pub due_date: Option<String>,
    pub score: Option<f64>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub compliance_status: Option<String>,
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compliance_status_round_trip() {
        assert_eq!(
            "NON_COMPLIANT".parse::<ComplianceStatus>().unwrap(),
            ComplianceStatus::NonCompliant
        );
        assert!("compliant".parse::<ComplianceStatus>().is_err());
        assert_eq!(
            serde_json::to_value(ComplianceStatus::NotDetermined).unwrap(),
            json!("NOT_DETERMINED")
        );
    }

    #[test]
    fn test_review_period_parse() {
        let period: ReviewPeriod = "Q3 2024".parse().unwrap();
        assert_eq!(period, ReviewPeriod { quarter: 3, year: 2024 });
        assert_eq!(period.to_string(), "Q3 2024");
    }

    #[test]
    fn test_review_period_rejects_malformed() {
        for bad in ["Q5 2024", "Q0 2024", "2024 Q1", "Q1", "Q1-2024", "q1 2024", "Q1 24"] {
            assert!(bad.parse::<ReviewPeriod>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_assessment_run_maps_backend_names() {
        let raw = json!({
            "id": "run-1",
            "name": "Weekly",
            "planId": "plan-9",
            "computedScore": 87.5,
            "internalField": "dropped"
        });
        let run: AssessmentRun = serde_json::from_value(raw).unwrap();
        let shaped = serde_json::to_value(&run).unwrap();
        assert_eq!(shaped["assessmentId"], "plan-9");
        assert_eq!(shaped["computedScore"], 87.5);
        assert!(shaped.get("planId").is_none());
        assert!(shaped.get("internalField").is_none());
    }

    #[test]
    fn test_resource_check_uses_resource_status() {
        let raw = json!({
            "name": "mfa-enabled",
            "complianceStatus": "COMPLIANT",
            "resourceComplianceStatus": "NON_COMPLIANT"
        });
        let check: ResourceCheck = serde_json::from_value(raw).unwrap();
        assert_eq!(check.compliance_status.as_deref(), Some("NON_COMPLIANT"));
        let shaped = serde_json::to_value(&check).unwrap();
        assert_eq!(shaped["complianceStatus"], "NON_COMPLIANT");
    }

    #[test]
    fn test_asset_summary_maps_run_id() {
        let raw = json!({
            "planRunID": "ir-1",
            "numberOfChecks": {"COMPLIANT": 4, "NON_COMPLIANT": 2}
        });
        let summary: AssetRunSummary = serde_json::from_value(raw).unwrap();
        assert_eq!(summary.integration_run_id.as_deref(), Some("ir-1"));
        assert_eq!(summary.number_of_checks.unwrap().non_compliant, Some(2));
    }
}
