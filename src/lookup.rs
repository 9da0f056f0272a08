//! Resolving legacy place identifiers (DBpedia, GeoNames) to Wikidata.
//!
//! Lookups are strictly sequential: a remote call is always followed by a
//! pause before the next one starts, and answers are memoized for the
//! duration of a single run.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::{FixError, Result};

/// Extra attempts after a timeout, connection error, 429 or 5xx.
const MAX_RETRIES: u32 = 3;

const USER_AGENT: &str = concat!("periodo-fix/", env!("CARGO_PKG_VERSION"), " (http://perio.do/)");

pub const DBPEDIA_SPARQL: &str = "http://dbpedia.org/sparql";
pub const WIKIDATA_SPARQL: &str = "https://query.wikidata.org/sparql";

/// External reference service mapping a legacy id to its Wikidata entity.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn resolve(&self, legacy_id: &str) -> Result<String>;
}

/// Identifiers already known for this run. Not shared across runs.
#[derive(Debug, Clone, Default)]
pub struct IdCache {
    ids: HashMap<String, String>,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-loaded with ids the remote services get wrong or do not know.
    pub fn seeded() -> Self {
        let mut cache = Self::new();
        for (legacy, wikidata) in [
            ("http://dbpedia.org/resource/Palestine", "http://www.wikidata.org/entity/Q219060"),
            ("http://dbpedia.org/resource/Carthage", "http://www.wikidata.org/entity/Q2429397"),
            ("http://dbpedia.org/resource/Burma", "http://www.wikidata.org/entity/Q836"),
            ("http://dbpedia.org/resource/Messenia", "http://www.wikidata.org/entity/Q1247159"),
        ] {
            cache.insert(legacy, wikidata);
        }
        cache
    }

    pub fn get(&self, legacy_id: &str) -> Option<&str> {
        self.ids.get(legacy_id).map(String::as_str)
    }

    pub fn insert(&mut self, legacy_id: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(legacy_id.into(), id.into());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Minimum spacing after each remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    interval: Duration,
}

impl Throttle {
    /// 20 requests per second.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

/// Resolve `ids` one after another, in order. Cached ids skip the remote
/// call and the pause. The first failure aborts the whole batch.
pub async fn resolve_sequentially<'a, I>(
    lookup: &dyn Lookup,
    ids: I,
    cache: &mut IdCache,
    throttle: Throttle,
) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    for id in ids {
        if let Some(known) = cache.get(id) {
            out.push(known.to_string());
            continue;
        }
        let resolved = lookup.resolve(id).await?;
        throttle.pause().await;
        debug!(legacy = id, wikidata = %resolved, "resolved identifier");
        cache.insert(id, resolved.clone());
        out.push(resolved);
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    id: Term,
}

#[derive(Debug, Deserialize)]
struct Term {
    value: String,
}

/// Looks DBpedia ids up via `owl:sameAs` on DBpedia, everything else as a
/// GeoNames id (`wdt:P1566`) on Wikidata.
pub struct SparqlLookup {
    client: reqwest::Client,
    dbpedia: String,
    wikidata: String,
}

impl SparqlLookup {
    pub fn new() -> Result<Self> {
        Self::with_endpoints(DBPEDIA_SPARQL, WIKIDATA_SPARQL)
    }

    pub fn with_endpoints(dbpedia: impl Into<String>, wikidata: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FixError::Fetch(format!("HTTP client error: {e}")))?;
        Ok(Self {
            client,
            dbpedia: dbpedia.into(),
            wikidata: wikidata.into(),
        })
    }

    fn query_for(&self, legacy_id: &str) -> Result<(&str, String)> {
        if legacy_id.starts_with("http://dbpedia.org/") {
            let query = format!(
                "PREFIX owl: <http://www.w3.org/2002/07/owl#>\n\
                 SELECT DISTINCT ?id WHERE {{\n  <{legacy_id}> owl:sameAs ?id .\n  \
                 FILTER (STRSTARTS(STR(?id), \"http://www.wikidata.org/entity/\"))\n}}"
            );
            return Ok((self.dbpedia.as_str(), query));
        }
        let geonames_id = geonames_id(legacy_id).ok_or_else(|| FixError::LookupFailed {
            id: legacy_id.to_string(),
            reason: "not a DBpedia or GeoNames identifier".into(),
        })?;
        let query = format!(
            "PREFIX wdt: <http://www.wikidata.org/prop/direct/>\n\
             SELECT DISTINCT ?id WHERE {{\n  ?id wdt:P1566 \"{geonames_id}\" .\n}}"
        );
        Ok((self.wikidata.as_str(), query))
    }
}

// `http://sws.geonames.org/<id>/...`
fn geonames_id(legacy_id: &str) -> Option<&str> {
    legacy_id.split('/').nth(3).filter(|s| !s.is_empty())
}

#[async_trait]
impl Lookup for SparqlLookup {
    async fn resolve(&self, legacy_id: &str) -> Result<String> {
        let (endpoint, query) = self.query_for(legacy_id)?;
        let failed = |reason: String| FixError::LookupFailed {
            id: legacy_id.to_string(),
            reason,
        };
        info!(endpoint, legacy = legacy_id, "querying");

        let mut attempt = 0;
        let response = loop {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(500 << attempt)).await;
            }
            let sent = self
                .client
                .get(endpoint)
                .query(&[("query", query.as_str())])
                .header(reqwest::header::ACCEPT, "application/sparql-results+json")
                .send()
                .await;
            let transient = match &sent {
                Ok(r) => r.status().is_server_error() || r.status() == reqwest::StatusCode::TOO_MANY_REQUESTS,
                Err(e) => e.is_timeout() || e.is_connect(),
            };
            if transient && attempt < MAX_RETRIES {
                attempt += 1;
                warn!(legacy = legacy_id, attempt, "lookup failed, retrying");
                continue;
            }
            break sent.map_err(|e| failed(format!("request failed: {e}")))?;
        };
        if !response.status().is_success() {
            return Err(failed(format!("endpoint returned HTTP {}", response.status())));
        }
        let body: SparqlResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable SPARQL results: {e}")))?;

        match body.results.bindings.as_slice() {
            [only] => Ok(only.id.value.clone()),
            bindings => Err(failed(format!(
                "expected exactly one Wikidata equivalent, found {}",
                bindings.len()
            ))),
        }
    }
}
