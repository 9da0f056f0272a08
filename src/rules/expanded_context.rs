use async_trait::async_trait;
use serde_json::Value;

use super::{Rule, RunContext};
use crate::errors::Result;
use crate::operation::{add, Patch};
use crate::pointer::Location;

const EXPANDED_CONTEXT: &str = include_str!("expanded_context.json");

/// Replaces `@context` with the full, prefix-based context.
pub struct ExpandedContext;

#[async_trait]
impl Rule for ExpandedContext {
    fn name(&self) -> &'static str {
        "expanded-context"
    }

    fn description(&self) -> &'static str {
        "replace @context with the expanded JSON-LD context"
    }

    async fn create_patch(&self, _doc: &Value, _run: &mut RunContext) -> Result<Patch> {
        let context: Value = serde_json::from_str(EXPANDED_CONTEXT)?;
        Ok(vec![add(&Location::at(["@context"]), context)])
    }
}
