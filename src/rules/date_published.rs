use async_trait::async_trait;
use serde_json::{json, Value};

use super::{context_term, Rule, RunContext};
use crate::errors::{FixError, Result};
use crate::jsonpath::find;
use crate::operation::{add, move_to, remove, Patch};

/// `yearPublished` on authority sources becomes a free-form `datePublished`.
pub struct DatePublished;

#[async_trait]
impl Rule for DatePublished {
    fn name(&self) -> &'static str {
        "date-published"
    }

    fn description(&self) -> &'static str {
        "replace source yearPublished with datePublished"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let mut patch = Patch::new();
        for node in find("$.authorities[*]", doc)? {
            let source = node.path.child("source");
            if node.value.pointer("/source/yearPublished").is_none() {
                return Err(FixError::unexpected(
                    format!("source without yearPublished at {source}"),
                    node.value.get("source").unwrap_or(&Value::Null),
                ));
            }
            patch.push(move_to(
                &source.child("datePublished"),
                &source.child("yearPublished"),
            ));
        }

        patch.push(remove(&context_term("yearPublished")));
        patch.push(add(
            &context_term("datePublished"),
            json!({"@id": "dcterms:issued", "@type": "xsd:string"}),
        ));
        Ok(patch)
    }
}
