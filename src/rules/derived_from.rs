use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::{context_term, str_field, Rule, RunContext};
use crate::errors::Result;
use crate::jsonpath::find;
use crate::operation::{add, remove, Patch};
use crate::pointer::Step;

// Derived from FASTI, but nothing in the 2004 dataset to point at.
const UNMATCHED_FASTI: [&str; 2] = ["p0qhb66ns52", "p0qhb66596k"];
const UNMATCHED_FASTI_NOTE: &str =
    "Derived from FASTI (http://n2t.net/ark:/99152/p06v8w4),\n but no match in 2004 dataset.";

/// Editorial notes of the form `Derived from <uri>` become `derivedFrom` links.
pub struct DerivedFrom;

#[async_trait]
impl Rule for DerivedFrom {
    fn name(&self) -> &'static str {
        "derived-from"
    }

    fn description(&self) -> &'static str {
        "turn 'Derived from <uri>' editorial notes into derivedFrom links"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let derived = Regex::new(r"^Derived from (http.*)$")?;
        let mut patch = Patch::new();

        for node in find("$.periodCollections[*].definitions[*]", doc)? {
            let note_path = node.path.child("editorialNote");
            let unmatched = matches!(node.path.last(), Some(Step::Key(id)) if UNMATCHED_FASTI.contains(&id.as_str()));
            // `add` overwrites, and also covers a definition with no note yet.
            if unmatched {
                patch.push(add(&note_path, UNMATCHED_FASTI_NOTE));
                continue;
            }
            let note = str_field(node.value, "editorialNote").unwrap_or_default();
            if let Some(caps) = derived.captures(note) {
                patch.push(add(&node.path.child("derivedFrom"), &caps[1]));
                patch.push(remove(&note_path));
            }
        }

        patch.push(add(
            &context_term("derivedFrom"),
            json!({"@id": "http://www.w3.org/ns/prov#wasDerivedFrom", "@type": "@id"}),
        ));
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn notes_become_links() {
        let doc = json!({
            "@context": {},
            "periodCollections": {"p0c": {"definitions": {
                "p0c1": {"editorialNote": "Derived from http://n2t.net/ark:/99152/p0abc"},
                "p0c2": {"editorialNote": "Keep me"},
                "p0qhb66ns52": {"editorialNote": "Derived from FASTI"}
            }}}
        });
        let patch = DerivedFrom.create_patch(&doc, &mut RunContext::default()).await.unwrap();
        let out = apply(&doc, &patch).unwrap();
        let defs = &out["periodCollections"]["p0c"]["definitions"];
        assert_eq!(defs["p0c1"], json!({"derivedFrom": "http://n2t.net/ark:/99152/p0abc"}));
        assert_eq!(defs["p0c2"], json!({"editorialNote": "Keep me"}));
        assert_eq!(defs["p0qhb66ns52"]["editorialNote"], json!(UNMATCHED_FASTI_NOTE));
        assert_eq!(out["@context"]["derivedFrom"]["@type"], json!("@id"));
    }

    #[tokio::test]
    async fn unmatched_fasti_without_note_still_applies() {
        let doc = json!({
            "@context": {},
            "periodCollections": {"p0c": {"definitions": {"p0qhb66596k": {"label": "x"}}}}
        });
        let patch = DerivedFrom.create_patch(&doc, &mut RunContext::default()).await.unwrap();
        let out = apply(&doc, &patch).unwrap();
        assert_eq!(
            out["periodCollections"]["p0c"]["definitions"]["p0qhb66596k"]["editorialNote"],
            json!(UNMATCHED_FASTI_NOTE)
        );
    }

    #[tokio::test]
    async fn context_term_is_last() {
        let doc = json!({"periodCollections": {}});
        let patch = DerivedFrom.create_patch(&doc, &mut RunContext::default()).await.unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch[0].path, "/@context/derivedFrom");
    }
}
