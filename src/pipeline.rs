use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::apply::apply;
use crate::config::{PipelineConfig, Source};
use crate::errors::Result;
use crate::fetch::{DatasetFetcher, Fetch};
use crate::lookup::Throttle;
use crate::operation::Patch;
use crate::rules::{Rule, RunContext};
use crate::validate::{validate, ValidationMode};

/// What a run produces: the validated patch, or the dataset with the
/// patch applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Patch(Patch),
    Document(Value),
}

impl Output {
    pub fn to_pretty(&self) -> Result<String> {
        let text = match self {
            Output::Patch(patch) => serde_json::to_string_pretty(patch)?,
            Output::Document(doc) => serde_json::to_string_pretty(doc)?,
        };
        Ok(text)
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", self.to_pretty()?)?;
        Ok(())
    }
}

/// fetch -> create patch -> validate -> (apply)
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetch>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub async fn run(&self, rule: &dyn Rule) -> Result<Output> {
        let doc = self
            .fetcher
            .fetch(&self.config.source, &self.config.params)
            .await?;
        self.run_on(rule, doc).await
    }

    /// Same as [`Pipeline::run`] on a dataset already in hand.
    pub async fn run_on(&self, rule: &dyn Rule, doc: Value) -> Result<Output> {
        let mut run = RunContext::new(Throttle::new(self.config.lookup_interval));
        info!(rule = rule.name(), "creating patch");
        let patch = rule.create_patch(&doc, &mut run).await?;
        debug!(operations = patch.len(), "patch created");

        let mode = self.config.validation.unwrap_or_else(|| rule.validation());
        let patch = match mode {
            ValidationMode::Syntactic => validate(patch, None)?,
            ValidationMode::Structural => validate(patch, Some(&doc))?,
        };

        if !self.config.apply {
            return Ok(Output::Patch(patch));
        }
        info!(operations = patch.len(), "applying patch");
        Ok(Output::Document(apply(&doc, &patch)?))
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    fetcher: Option<Arc<dyn Fetch>>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn apply(mut self, apply: bool) -> Self {
        self.config.apply = apply;
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.config.source = source;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.params.push((key.into(), value.into()));
        self
    }

    pub fn lookup_interval(mut self, interval: Duration) -> Self {
        self.config.lookup_interval = interval;
        self
    }

    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.config.validation = Some(mode);
        self
    }

    pub fn fetcher(mut self, fetcher: impl Fetch + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Falls back to [`DatasetFetcher`] when no fetcher was given.
    pub fn build(self) -> Result<Pipeline> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(DatasetFetcher::new()?),
        };
        Ok(Pipeline {
            config: self.config,
            fetcher,
        })
    }
}
