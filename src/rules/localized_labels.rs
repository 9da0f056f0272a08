use async_trait::async_trait;
use serde_json::{json, Value};

use super::{str_field, Rule, RunContext};
use crate::errors::{FixError, Result};
use crate::jsonpath::find;
use crate::operation::{add, Patch};

/// English periods without an English localized label get their main label.
pub struct MissingLocalizedLabels;

#[async_trait]
impl Rule for MissingLocalizedLabels {
    fn name(&self) -> &'static str {
        "add-missing-localized-labels"
    }

    fn description(&self) -> &'static str {
        "copy the label of English periods into localizedLabels.en"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let mut patch = Patch::new();
        for node in find("$.authorities[*].periods[*]", doc)? {
            if str_field(node.value, "languageTag") != Some("en") {
                continue;
            }
            let localized = node.value.get("localizedLabels");
            if localized.and_then(|l| l.get("en")).is_some() {
                continue;
            }
            let label = str_field(node.value, "label")
                .ok_or_else(|| FixError::unexpected("period without label", &node.path))?;
            let labels_path = node.path.child("localizedLabels");
            // Other languages already present are kept.
            patch.push(match localized {
                Some(Value::Object(_)) => add(&labels_path.child("en"), json!([label])),
                _ => add(&labels_path, json!({"en": [label]})),
            });
        }
        Ok(patch)
    }
}
