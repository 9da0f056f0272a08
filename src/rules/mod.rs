use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;

use crate::errors::{FixError, Result};
use crate::lookup::{IdCache, Lookup, SparqlLookup, Throttle};
use crate::operation::Patch;
use crate::pointer::Location;
use crate::validate::ValidationMode;

mod broader;
mod date_published;
mod derived_from;
mod expanded_context;
mod japanese_regions;
mod lexvo;
mod localized_labels;
mod renaming;
mod wikidata;

pub use broader::{Broader, BroaderNarrower};
pub use date_published::DatePublished;
pub use derived_from::DerivedFrom;
pub use expanded_context::ExpandedContext;
pub use japanese_regions::JapaneseRegions;
pub use lexvo::LexvoUris;
pub use localized_labels::MissingLocalizedLabels;
pub use renaming::Renaming;
pub use wikidata::WikidataSpatialCoverage;

/// State owned by one pipeline run and handed to the rule.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub ids: IdCache,
    pub throttle: Throttle,
}

impl RunContext {
    pub fn new(throttle: Throttle) -> Self {
        Self {
            ids: IdCache::seeded(),
            throttle,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Throttle::default())
    }
}

/// A fix: turns the current dataset into an ordered patch.
///
/// Rules without remote lookups simply never await.
#[async_trait]
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Validation the produced patch needs before it may be applied.
    fn validation(&self) -> ValidationMode {
        ValidationMode::Syntactic
    }
    async fn create_patch(&self, doc: &Value, run: &mut RunContext) -> Result<Patch>;
}

/// Rules by identifier.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<BTreeMap<&'static str, Arc<dyn Rule>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in rules, with remote lookups going to the public SPARQL endpoints.
    pub fn with_builtins() -> Result<Self> {
        Ok(Self::with_builtins_using(Arc::new(SparqlLookup::new()?)))
    }

    pub fn with_builtins_using(lookup: Arc<dyn Lookup>) -> Self {
        let mut reg = Self::new();
        reg.register(Renaming);
        reg.register(DatePublished);
        reg.register(DerivedFrom);
        reg.register(Broader);
        reg.register(BroaderNarrower);
        reg.register(MissingLocalizedLabels);
        reg.register(LexvoUris);
        reg.register(JapaneseRegions);
        reg.register(ExpandedContext);
        reg.register(WikidataSpatialCoverage::new(lookup));
        reg
    }

    pub fn register<R: Rule + 'static>(&mut self, rule: R) {
        let map = Arc::make_mut(&mut self.inner);
        map.insert(rule.name(), Arc::new(rule));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Rule>> {
        self.inner.get(name).cloned()
    }

    /// Like [`Registry::get`], but an unknown name is an error listing the known ones.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Rule>> {
        self.get(name).ok_or_else(|| FixError::UnknownRule {
            name: name.to_string(),
            known: self.names().join(", "),
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.inner.keys().copied().collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.inner.values()
    }
}

/// `/@context/<term>`
pub(crate) fn context_term(term: &str) -> Location {
    Location::at(["@context", term])
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Label plus every localized label, in document order, without repeats.
pub(crate) fn all_labels(period: &Value) -> Vec<&str> {
    let localized = period
        .get("localizedLabels")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|m| m.values())
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str);
    str_field(period, "label")
        .into_iter()
        .chain(localized)
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::IdCache;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct NoLookup;

    #[async_trait]
    impl Lookup for NoLookup {
        async fn resolve(&self, legacy_id: &str) -> Result<String> {
            Err(FixError::LookupFailed {
                id: legacy_id.to_string(),
                reason: "offline".into(),
            })
        }
    }

    #[test]
    fn builtins_are_listed_by_name() {
        let reg = Registry::with_builtins_using(Arc::new(NoLookup));
        assert_eq!(
            reg.names(),
            vec![
                "add-missing-localized-labels",
                "broader",
                "broader-narrower",
                "date-published",
                "derived-from",
                "expanded-context",
                "japanese-regions",
                "renaming",
                "use-lexvo-uris",
                "use-wikidata-for-spatial-coverage",
            ]
        );
    }

    #[test]
    fn unknown_rule_names_the_alternatives() {
        let reg = Registry::with_builtins_using(Arc::new(NoLookup));
        let err = reg.resolve("fix-everything").err().unwrap();
        match err {
            FixError::UnknownRule { name, known } => {
                assert_eq!(name, "fix-everything");
                assert!(known.contains("renaming"));
            }
            other => panic!("expected UnknownRule, got {other:?}"),
        }
    }

    #[test]
    fn run_context_starts_with_seeded_cache() {
        let run = RunContext::default();
        assert_eq!(run.ids.len(), IdCache::seeded().len());
        assert_eq!(run.throttle, Throttle::default());
    }

    #[test]
    fn labels_include_localized_without_repeats() {
        let period = json!({
            "label": "Jomon",
            "localizedLabels": {"en": ["Jomon", "Jōmon"], "ja": ["縄文時代"]}
        });
        assert_eq!(all_labels(&period), vec!["Jomon", "Jōmon", "縄文時代"]);
    }
}
