//! Generate JSON patches that fix the PeriodO dataset, check them, and
//! optionally apply them.
//!
//! A [`Rule`] inspects the dataset and returns a [`Patch`]; the [`Pipeline`]
//! fetches the dataset, runs one rule, validates its patch and either emits
//! it or applies it.

pub mod apply;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod jsonpath;
pub mod lookup;
pub mod operation;
pub mod pipeline;
pub mod pointer;
pub mod rules;
pub mod validate;
mod parser;

pub use apply::apply;
pub use config::{PipelineConfig, Source, DEFAULT_DATASET_URL};
pub use errors::{FixError, Result};
pub use fetch::{DatasetFetcher, Fetch};
pub use jsonpath::{find, Node, Query};
pub use operation::{OpKind, Operation, Patch, Payload};
pub use pipeline::{Output, Pipeline, PipelineBuilder};
pub use pointer::{Location, Step};
pub use rules::{Registry, Rule, RunContext};
pub use validate::{validate, ValidationMode, Violation};

/// Convenience: run the built-in rule `name` through `pipeline`.
pub async fn run_rule(name: &str, pipeline: &Pipeline) -> Result<Output> {
    let registry = Registry::with_builtins()?;
    let rule = registry.resolve(name)?;
    pipeline.run(rule.as_ref()).await
}
