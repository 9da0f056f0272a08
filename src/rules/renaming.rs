use async_trait::async_trait;
use serde_json::Value;

use super::{context_term, Rule, RunContext};
use crate::errors::Result;
use crate::jsonpath::find;
use crate::operation::{move_to, replace, Patch};
use crate::pointer::Location;
use crate::validate::ValidationMode;

// (new term, old term)
const CONTEXT_RENAMES: [(&str, &str); 5] = [
    ("Authority", "PeriodCollection"),
    ("Period", "PeriodDefinition"),
    ("authorities", "periodCollections"),
    ("periods", "definitions"),
    ("authority", "collection"),
];

/// Period collections become authorities, period definitions become periods.
pub struct Renaming;

#[async_trait]
impl Rule for Renaming {
    fn name(&self) -> &'static str {
        "renaming"
    }

    fn description(&self) -> &'static str {
        "rename period collections to authorities and definitions to periods"
    }

    // Every `replace` and `move` below assumes the old names are present.
    fn validation(&self) -> ValidationMode {
        ValidationMode::Structural
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let mut patch = vec![replace(&Location::at(["id"]), "p0d/#authorities")];

        for node in find("$.periodCollections[*].definitions[*]", doc)? {
            patch.push(replace(&node.path.child("type"), "Period"));
            patch.push(move_to(&node.path.child("authority"), &node.path.child("collection")));
        }

        for node in find("$.periodCollections[*]", doc)? {
            patch.push(replace(&node.path.child("type"), "Authority"));
            patch.push(move_to(&node.path.child("periods"), &node.path.child("definitions")));
        }

        patch.push(move_to(
            &Location::at(["authorities"]),
            &Location::at(["periodCollections"]),
        ));
        patch.extend(
            CONTEXT_RENAMES
                .iter()
                .map(|(new, old)| move_to(&context_term(new), &context_term(old))),
        );
        Ok(patch)
    }
}
