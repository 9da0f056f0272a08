use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::config::Source;
use crate::errors::{FixError, Result};

/// Produces the dataset a run starts from.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, source: &Source, params: &[(String, String)]) -> Result<Value>;
}

/// GETs URLs with `reqwest`, reads files from disk.
pub struct DatasetFetcher {
    client: reqwest::Client,
}

impl DatasetFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| FixError::Fetch(format!("HTTP client error: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for DatasetFetcher {
    async fn fetch(&self, source: &Source, params: &[(String, String)]) -> Result<Value> {
        match source {
            Source::Url(url) => {
                info!(url = %url, "fetching dataset");
                let response = self
                    .client
                    .get(url)
                    .query(params)
                    .send()
                    .await
                    .map_err(|e| FixError::Fetch(format!("request to {url} failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(FixError::Fetch(format!(
                        "{url} returned HTTP {}",
                        response.status()
                    )));
                }
                response
                    .json()
                    .await
                    .map_err(|e| FixError::Fetch(format!("{url} did not return JSON: {e}")))
            }
            Source::File(path) => {
                info!(path = %path.display(), "reading dataset");
                let text = tokio::fs::read_to_string(path).await?;
                Ok(serde_json::from_str(&text)?)
            }
        }
    }
}
