use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{Rule, RunContext};
use crate::errors::{FixError, Result};
use crate::jsonpath::find;
use crate::lookup::{resolve_sequentially, Lookup};
use crate::operation::{replace, Patch};

/// DBpedia and GeoNames place ids in spatial coverage are swapped for the
/// equivalent Wikidata entities.
pub struct WikidataSpatialCoverage {
    lookup: Arc<dyn Lookup>,
}

impl WikidataSpatialCoverage {
    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Rule for WikidataSpatialCoverage {
    fn name(&self) -> &'static str {
        "use-wikidata-for-spatial-coverage"
    }

    fn description(&self) -> &'static str {
        "replace DBpedia/GeoNames spatial coverage ids with Wikidata ids"
    }

    async fn create_patch(&self, doc: &Value, run: &mut RunContext) -> Result<Patch> {
        let nodes = find("$.periodCollections[*].definitions[*].spatialCoverage[*].id", doc)?;
        let ids = nodes
            .iter()
            .map(|node| {
                node.value
                    .as_str()
                    .ok_or_else(|| FixError::unexpected(format!("place id at {}", node.path), node.value))
            })
            .collect::<Result<Vec<&str>>>()?;

        info!(places = ids.len(), cached = run.ids.len(), "resolving place ids");
        let resolved =
            resolve_sequentially(self.lookup.as_ref(), ids, &mut run.ids, run.throttle).await?;

        Ok(nodes
            .iter()
            .zip(resolved)
            .map(|(node, id)| replace(&node.path, id))
            .collect())
    }
}
