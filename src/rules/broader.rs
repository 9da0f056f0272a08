//! `Parent period: A, B` editorial notes become `broader` links.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use super::{all_labels, context_term, str_field, Rule, RunContext};
use crate::errors::{FixError, Result};
use crate::jsonpath::{find, Node};
use crate::operation::{add, Operation, Patch};

const DEFINITIONS: &str = "$.periodCollections[*].definitions[*]";

fn broader_term() -> Operation {
    add(
        &context_term("broader"),
        json!({"@id": "http://www.w3.org/2004/02/skos/core#broader", "@type": "@id"}),
    )
}

fn parent_note() -> Result<Regex> {
    Ok(Regex::new(r"^Parent period: (.*)$")?)
}

/// First listed parent that `lookup` knows, as an `add broader` operation.
fn link_parent<'a>(
    node: &Node<'_>,
    note: &Regex,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> Option<Operation> {
    let text = str_field(node.value, "editorialNote").unwrap_or_default();
    let caps = note.captures(text)?;
    let parent = caps[1].split(", ").find_map(|label| lookup(label));
    if parent.is_none() {
        warn!(
            period = str_field(node.value, "id").unwrap_or("?"),
            "could not find parent period"
        );
    }
    parent.map(|id| add(&node.path.child("broader"), id))
}

/// Parent labels are resolved within the period's own collection. A label
/// ending in " Period" also matches without that suffix.
pub struct Broader;

#[async_trait]
impl Rule for Broader {
    fn name(&self) -> &'static str {
        "broader"
    }

    fn description(&self) -> &'static str {
        "link periods to parents named in their editorial notes (per collection)"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let definitions = find(DEFINITIONS, doc)?;

        // collection id -> label -> definition id
        let mut index: HashMap<&str, HashMap<&str, &str>> = HashMap::new();
        for node in &definitions {
            let (Some(collection), Some(definition)) = (node.path.key_at(2), node.path.key_at(4)) else {
                continue;
            };
            let labels = index.entry(collection).or_default();
            for label in all_labels(node.value) {
                labels.insert(label, definition);
                if let Some(short) = label.strip_suffix(" Period") {
                    labels.insert(short, definition);
                }
            }
        }

        let note = parent_note()?;
        let mut patch: Patch = definitions
            .iter()
            .filter_map(|node| {
                let labels = node.path.key_at(2).and_then(|c| index.get(c));
                link_parent(node, &note, |label| labels.and_then(|l| l.get(label).copied()))
            })
            .collect();
        patch.push(broader_term());
        Ok(patch)
    }
}

/// Parent labels are resolved across the whole dataset and linked by the
/// parent's `id`.
pub struct BroaderNarrower;

#[async_trait]
impl Rule for BroaderNarrower {
    fn name(&self) -> &'static str {
        "broader-narrower"
    }

    fn description(&self) -> &'static str {
        "link periods to parents named in their editorial notes (dataset-wide)"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let definitions = find(DEFINITIONS, doc)?;

        let mut index: HashMap<&str, &str> = HashMap::new();
        for node in &definitions {
            let id = str_field(node.value, "id")
                .ok_or_else(|| FixError::unexpected("period without id", &node.path))?;
            for label in all_labels(node.value) {
                index.insert(label, id);
            }
        }

        let note = parent_note()?;
        let mut patch: Patch = definitions
            .iter()
            .filter_map(|node| link_parent(node, &note, |label| index.get(label).copied()))
            .collect();
        patch.push(broader_term());
        patch.push(add(
            &context_term("narrower"),
            json!({"@id": "http://www.w3.org/2004/02/skos/core#narrower", "@type": "@id"}),
        ));
        Ok(patch)
    }
}
