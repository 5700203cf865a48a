//! Action discovery and execution tools.

use crate::actions::{ActionIds, DiscoveryScope};
use crate::catalog::names;
use crate::error::ToolError;
use crate::executor::{ToolExecutor, to_value};
use crate::validator::Args;
use serde_json::{Value, json};

impl ToolExecutor {
    pub(crate) async fn fetch_available_actions(
        &self,
        tool: &str,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let owned = |name: &str| args.required_str(name).map(str::to_string);
        let scope = match tool {
            names::FETCH_ASSESSMENT_AVAILABLE_ACTIONS => DiscoveryScope::Assessment {
                assessment_name: owned("assessmentName")?,
            },
            names::FETCH_CONTROL_AVAILABLE_ACTIONS => DiscoveryScope::Control {
                assessment_name: owned("assessmentName")?,
                control_number: owned("controlNumber")?,
                control_alias: owned("controlAlias")?,
            },
            _ => DiscoveryScope::Evidence {
                assessment_name: owned("assessmentName")?,
                control_number: owned("controlNumber")?,
                control_alias: owned("controlAlias")?,
                evidence_name: owned("evidenceName")?,
            },
        };

        let actions = self.actions.list_available_actions(&scope).await?;
        Ok(json!({
            "scope": scope.kind(),
            "actions": actions,
        }))
    }

    pub(crate) async fn execute_action(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let ids = ActionIds::from_args(&args);
        to_value(self.actions.execute(&ids).await?)
    }
}
