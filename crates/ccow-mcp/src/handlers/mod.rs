//! Tool handlers, grouped by tool family.
//!
//! Each submodule adds methods to [`ToolExecutor`](crate::executor::ToolExecutor).

mod actions;
mod assessments;
mod assets;
mod dashboard;
mod runs;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// The item array of a backend response: `{items: [...]}` or a bare array.
pub(crate) fn items(raw: &Value) -> &[Value] {
    raw.get("items")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Parse each item, logging and skipping the ones that do not fit `T`.
pub(crate) fn parse_items<'a, T: DeserializeOwned>(
    raw: impl IntoIterator<Item = &'a Value>,
) -> impl Iterator<Item = T> {
    raw.into_iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "Skipping malformed item");
                None
            }
        })
}

/// Parse the items that carry every field in `present`.
pub(crate) fn shape_items<T: DeserializeOwned>(raw: &Value, present: &[&str]) -> Vec<T> {
    parse_items(
        items(raw)
            .iter()
            .filter(|item| present.iter().all(|field| item.get(*field).is_some())),
    )
    .collect()
}
