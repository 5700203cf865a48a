//! Assessment configuration tools.

use super::shape_items;
use crate::error::ToolError;
use crate::executor::{ToolExecutor, to_value};
use crate::validator::Args;
use ccow_backend::endpoints;
use ccow_core::model::{Assessment, AssessmentCategory, Control};
use serde_json::{Value, json};

impl ToolExecutor {
    pub(crate) async fn list_assessment_categories(&self) -> Result<Value, ToolError> {
        let raw = self.backend.get(endpoints::ASSESSMENT_CATEGORIES).await?;
        let categories: Vec<AssessmentCategory> = shape_items(&raw, &["name"]);
        Ok(json!({ "categories": to_value(categories)? }))
    }

    pub(crate) async fn list_assessments(&self, args: Args<'_>) -> Result<Value, ToolError> {
        let path = endpoints::plans(args.str("categoryId"), args.str("categoryName"));
        let raw = self.backend.get(&path).await?;
        let assessments: Vec<Assessment> = shape_items(&raw, &["name", "categoryName"]);
        Ok(json!({ "assessments": to_value(assessments)? }))
    }

    pub(crate) async fn fetch_automated_controls(
        &self,
        args: Args<'_>,
    ) -> Result<Value, ToolError> {
        let assessment_id = args.required_str("assessmentId")?;
        let raw = self
            .backend
            .get(&endpoints::automated_plan_controls(assessment_id))
            .await?;
        let controls: Vec<Control> = shape_items(&raw, &["id"]);
        Ok(json!({ "controls": to_value(controls)? }))
    }
}
