use async_trait::async_trait;
use serde_json::{json, Value};

use super::{context_term, Rule, RunContext};
use crate::errors::{FixError, Result};
use crate::jsonpath::find;
use crate::operation::{add, replace, Patch};

fn language_uri(subtag: &str) -> Option<String> {
    match subtag.len() {
        2 => Some(format!("http://lexvo.org/id/iso639-1/{subtag}")),
        3 => Some(format!("http://lexvo.org/id/iso639-3/{subtag}")),
        _ => None,
    }
}

fn script_uri(subtag: &str) -> String {
    let mut chars = subtag.chars();
    let capitalized: String = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default();
    format!("http://lexvo.org/id/script/{capitalized}")
}

/// Language tags on periods become lexvo language and script URIs; the
/// original tag is kept under `languageTag`.
pub struct LexvoUris;

#[async_trait]
impl Rule for LexvoUris {
    fn name(&self) -> &'static str {
        "use-lexvo-uris"
    }

    fn description(&self) -> &'static str {
        "replace language tags with lexvo language and script URIs"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let mut patch = Patch::new();
        for node in find("$.periodCollections[*].definitions[*]", doc)? {
            let tag = node
                .value
                .get("language")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    FixError::unexpected(
                        format!("language at {}", node.path),
                        node.value.get("language").unwrap_or(&Value::Null),
                    )
                })?;
            let mut subtags = tag.split('-');
            let language = subtags.next().unwrap_or_default();
            let uri = language_uri(language)
                .ok_or_else(|| FixError::unexpected(format!("language subtag at {}", node.path), tag))?;

            patch.push(replace(&node.path.child("language"), uri));
            patch.push(add(&node.path.child("languageTag"), tag));
            if let Some(script) = subtags.next() {
                patch.push(add(&node.path.child("script"), script_uri(script)));
            }
        }

        patch.push(replace(
            &context_term("language"),
            json!({"@id": "http://purl.org/dc/terms/language", "@type": "@id"}),
        ));
        patch.push(add(
            &context_term("script"),
            json!({"@id": "http://lexvo.org/ontology#inScript", "@type": "@id"}),
        ));
        patch.push(add(
            &context_term("languageTag"),
            "http://purl.org/dc/elements/1.1/language",
        ));
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uris_by_subtag_length() {
        assert_eq!(language_uri("en").unwrap(), "http://lexvo.org/id/iso639-1/en");
        assert_eq!(language_uri("grc").unwrap(), "http://lexvo.org/id/iso639-3/grc");
        assert_eq!(language_uri("abcd"), None);
        assert_eq!(script_uri("latn"), "http://lexvo.org/id/script/Latn");
    }

    #[tokio::test]
    async fn script_subtag_adds_script() {
        let doc = json!({"periodCollections": {"p0a": {"definitions": {
            "p1": {"language": "en"},
            "p2": {"language": "ell-grek"}
        }}}});
        let patch = LexvoUris.create_patch(&doc, &mut RunContext::default()).await.unwrap();
        let ops: Vec<(&str, Option<&Value>)> = patch
            .iter()
            .take(5)
            .map(|op| (op.path.as_str(), op.value.as_ref()))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("/periodCollections/p0a/definitions/p1/language", Some(&json!("http://lexvo.org/id/iso639-1/en"))),
                ("/periodCollections/p0a/definitions/p1/languageTag", Some(&json!("en"))),
                ("/periodCollections/p0a/definitions/p2/language", Some(&json!("http://lexvo.org/id/iso639-3/ell"))),
                ("/periodCollections/p0a/definitions/p2/languageTag", Some(&json!("ell-grek"))),
                ("/periodCollections/p0a/definitions/p2/script", Some(&json!("http://lexvo.org/id/script/Grek"))),
            ]
        );
        assert_eq!(patch.len(), 8);
    }

    #[tokio::test]
    async fn missing_language_is_unexpected() {
        let doc = json!({"periodCollections": {"p0a": {"definitions": {"p1": {"language": 7}}}}});
        let err = LexvoUris.create_patch(&doc, &mut RunContext::default()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected language at /periodCollections/p0a/definitions/p1: 7"
        );
    }
}
