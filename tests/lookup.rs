use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use periodo_fix as pf;
use pf::lookup::{resolve_sequentially, IdCache, Lookup, Throttle};
use pf::rules::WikidataSpatialCoverage;
use pf::{FixError, Fetch, Output, Pipeline, Rule, RunContext, Source};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::time::Instant;

/// Answers slowly for short names and quickly for long ones, and records
/// how many lookups were in flight at once.
#[derive(Default)]
struct Jittery {
    in_flight: Mutex<usize>,
    max_in_flight: Mutex<usize>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Lookup for Jittery {
    async fn resolve(&self, legacy_id: &str) -> pf::Result<String> {
        {
            let mut n = self.in_flight.lock().unwrap();
            *n += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(*n);
        }
        self.calls.lock().unwrap().push(legacy_id.to_string());
        let name = legacy_id.rsplit('/').next().unwrap_or_default().to_string();
        let delay = 30u64.saturating_sub(5 * name.len() as u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        *self.in_flight.lock().unwrap() -= 1;
        if name == "Atlantis" {
            return Err(FixError::LookupFailed {
                id: legacy_id.to_string(),
                reason: "no bindings".into(),
            });
        }
        Ok(format!("http://www.wikidata.org/entity/{name}"))
    }
}

struct Fixed(Value);

#[async_trait]
impl Fetch for Fixed {
    async fn fetch(&self, _source: &Source, _params: &[(String, String)]) -> pf::Result<Value> {
        Ok(self.0.clone())
    }
}

fn dataset(places: &[&str]) -> Value {
    let coverage: Vec<Value> = places
        .iter()
        .map(|p| json!({"id": format!("http://dbpedia.org/resource/{p}"), "label": p}))
        .collect();
    json!({"periodCollections": {"p0a": {"definitions": {"p0a1": {"spatialCoverage": coverage}}}}})
}

#[tokio::test]
async fn test_patch_order_follows_match_order() {
    let places = ["A", "Bbbbb", "Cc", "Dddd"];
    let lookup = Arc::new(Jittery::default());
    let rule = WikidataSpatialCoverage::new(lookup.clone());
    let mut run = RunContext::new(Throttle::new(Duration::from_millis(1)));

    let patch = rule.create_patch(&dataset(&places), &mut run).await.unwrap();

    let targets: Vec<(String, Value)> = patch
        .iter()
        .map(|op| (op.path.clone(), op.value.clone().unwrap()))
        .collect();
    let expected: Vec<(String, Value)> = places
        .iter()
        .enumerate()
        .map(|(i, p)| {
            (
                format!("/periodCollections/p0a/definitions/p0a1/spatialCoverage/{i}/id"),
                json!(format!("http://www.wikidata.org/entity/{p}")),
            )
        })
        .collect();
    assert_eq!(targets, expected);
    assert_eq!(*lookup.max_in_flight.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_lookups_are_spaced() {
    let lookup = Jittery::default();
    let mut cache = IdCache::new();
    let interval = Duration::from_millis(20);
    let ids = ["http://x/Aaaaaa", "http://x/Bbbbbb", "http://x/Cccccc"];

    let started = Instant::now();
    let out = resolve_sequentially(&lookup, ids, &mut cache, Throttle::new(interval))
        .await
        .unwrap();

    assert!(started.elapsed() >= interval * 3);
    assert_eq!(out.len(), 3);
    assert_eq!(cache.len(), 3);
}

#[tokio::test]
async fn test_cached_ids_skip_lookup() {
    let lookup = Jittery::default();
    let mut cache = IdCache::new();
    cache.insert("http://x/Known", "http://www.wikidata.org/entity/Q1");

    let out = resolve_sequentially(
        &lookup,
        ["http://x/Known", "http://x/New", "http://x/New"],
        &mut cache,
        Throttle::new(Duration::from_millis(1)),
    )
    .await
    .unwrap();

    assert_eq!(
        out,
        vec![
            "http://www.wikidata.org/entity/Q1",
            "http://www.wikidata.org/entity/New",
            "http://www.wikidata.org/entity/New",
        ]
    );
    assert_eq!(*lookup.calls.lock().unwrap(), vec!["http://x/New"]);
}

#[tokio::test]
async fn test_failed_lookup_aborts_the_run() {
    let lookup = Arc::new(Jittery::default());
    let pipeline = Pipeline::builder()
        .fetcher(Fixed(dataset(&["Ur", "Atlantis", "Uruk"])))
        .lookup_interval(Duration::from_millis(1))
        .build()
        .unwrap();

    let rule = WikidataSpatialCoverage::new(lookup.clone());
    let err = pipeline.run(&rule).await.unwrap_err();

    assert!(matches!(err, FixError::LookupFailed { ref id, .. } if id.ends_with("Atlantis")));
    // Nothing after the failure is looked up.
    assert_eq!(lookup.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_registry_rule_through_pipeline() {
    let registry = pf::Registry::with_builtins_using(Arc::new(Jittery::default()));
    let rule = registry.resolve("use-wikidata-for-spatial-coverage").unwrap();
    let pipeline = Pipeline::builder()
        .apply(true)
        .fetcher(Fixed(dataset(&["Ur"])))
        .lookup_interval(Duration::from_millis(1))
        .build()
        .unwrap();

    let out = pipeline.run(rule.as_ref()).await.unwrap();
    let Output::Document(doc) = out else {
        panic!("expected a document");
    };
    assert_eq!(
        doc["periodCollections"]["p0a"]["definitions"]["p0a1"]["spatialCoverage"][0],
        json!({"id": "http://www.wikidata.org/entity/Ur", "label": "Ur"})
    );
}
