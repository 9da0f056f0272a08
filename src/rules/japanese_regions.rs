use async_trait::async_trait;
use serde_json::{json, Value};

use super::{str_field, Rule, RunContext};
use crate::errors::{FixError, Result};
use crate::jsonpath::find;
use crate::operation::{add, Patch};

const HOKKAIDO: (&str, &str) = ("http://www.wikidata.org/entity/Q35581", "Hokkaidō");
const HONSHU: (&str, &str) = ("http://www.wikidata.org/entity/Q13989", "Honshu");
const KYUSHU: (&str, &str) = ("http://www.wikidata.org/entity/Q13987", "Kyushu");
const OKINAWA: (&str, &str) = ("http://www.wikidata.org/entity/Q697589", "Okinawa Islands");
const SHIKOKU: (&str, &str) = ("http://www.wikidata.org/entity/Q13991", "Shikoku");

fn regions(description: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let regions: &'static [(&str, &str)] = match description {
        "本州・四国・九州" => &[HONSHU, SHIKOKU, KYUSHU],
        "沖縄" => &[OKINAWA],
        "北海道" => &[HOKKAIDO],
        "本州・四国・九州・北海道" => &[HONSHU, SHIKOKU, KYUSHU, HOKKAIDO],
        _ => return None,
    };
    Some(regions)
}

/// Spatial coverage for the Japanese periods authority, from its
/// Japanese-language coverage descriptions.
pub struct JapaneseRegions;

#[async_trait]
impl Rule for JapaneseRegions {
    fn name(&self) -> &'static str {
        "japanese-regions"
    }

    fn description(&self) -> &'static str {
        "derive spatialCoverage of Japanese periods from their descriptions"
    }

    async fn create_patch(&self, doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let mut patch = Patch::new();
        for node in find("$.authorities.p0g8mw8.periods[*]", doc)? {
            let description = str_field(node.value, "spatialCoverageDescription").unwrap_or_default();
            let entities: Vec<Value> = regions(description)
                .ok_or_else(|| {
                    FixError::unexpected(
                        format!("spatial coverage description at {}", node.path),
                        format!("{description:?}"),
                    )
                })?
                .iter()
                .map(|(id, label)| json!({"id": id, "label": label}))
                .collect();
            patch.push(add(&node.path.child("spatialCoverage"), entities));
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn descriptions_map_to_regions() {
        let doc = json!({"authorities": {
            "p0g8mw8": {"periods": {"p1": {"spatialCoverageDescription": "沖縄"}}},
            "p0other": {"periods": {"p2": {"spatialCoverageDescription": "沖縄"}}}
        }});
        let patch = JapaneseRegions.create_patch(&doc, &mut RunContext::default()).await.unwrap();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([{
                "op": "add",
                "path": "/authorities/p0g8mw8/periods/p1/spatialCoverage",
                "value": [{"id": "http://www.wikidata.org/entity/Q697589", "label": "Okinawa Islands"}]
            }])
        );
    }

    #[tokio::test]
    async fn unknown_description_aborts() {
        let doc = json!({"authorities": {"p0g8mw8": {"periods": {"p1": {"spatialCoverageDescription": "九州"}}}}});
        let err = JapaneseRegions.create_patch(&doc, &mut RunContext::default()).await.unwrap_err();
        assert!(matches!(err, FixError::UnexpectedValue { .. }));
        assert_eq!(
            err.to_string(),
            "unexpected spatial coverage description at /authorities/p0g8mw8/periods/p1: \"九州\""
        );
    }
}
