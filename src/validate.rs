use std::fmt;

use serde_json::Value;
use tracing::error;

use crate::apply::apply_operation;
use crate::errors::{FixError, Result};
use crate::operation::{OpKind, Operation, Patch};
use crate::pointer::is_valid_pointer;

/// One reason a patch was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub index: usize,
    pub op: OpKind,
    pub message: String,
}

impl Violation {
    pub fn new(index: usize, op: OpKind, message: impl Into<String>) -> Self {
        Self {
            index,
            op,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation {} ({}): {}", self.index, self.op.as_str(), self.message)
    }
}

/// How much the validator checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Fields and pointer syntax only.
    #[default]
    Syntactic,
    /// Also replays the patch on a copy of the document, so that `remove`,
    /// `replace` and `move` sources must resolve when their turn comes.
    Structural,
}

/// Return `patch` unchanged if it is valid. Passing a document switches on
/// structural checks. Every violation is logged before the error is returned.
pub fn validate(patch: Patch, doc: Option<&Value>) -> Result<Patch> {
    let violations = violations(&patch, doc);
    if violations.is_empty() {
        return Ok(patch);
    }
    for v in &violations {
        error!(index = v.index, op = v.op.as_str(), "{}", v.message);
    }
    Err(FixError::InvalidPatch { violations })
}

/// All violations in `patch`, in operation order.
pub fn violations(patch: &[Operation], doc: Option<&Value>) -> Vec<Violation> {
    let mut working = doc.cloned();
    let mut out = Vec::new();
    for (index, op) in patch.iter().enumerate() {
        let found = check_fields(index, op);
        let well_formed = found.is_empty();
        out.extend(found);
        // Only well-formed operations are replayed; a broken one would just
        // report its field problem a second time.
        if !well_formed {
            continue;
        }
        let Some(current) = working.as_mut() else {
            continue;
        };
        if let Err(e) = apply_operation(current, index, op) {
            out.push(Violation::new(index, op.op, e.to_string()));
            // A failed operation may have half-applied (a `move` whose source
            // was taken), so later operations are only checked for fields.
            working = None;
        }
    }
    out
}

fn check_fields(index: usize, op: &Operation) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut flag = |msg: String| out.push(Violation::new(index, op.op, msg));

    if !is_valid_pointer(&op.path) {
        flag(format!("`path` is not a valid JSON pointer: {:?}", op.path));
    }
    match (op.op.takes_value(), op.value.is_some()) {
        (true, false) => flag("missing `value`".into()),
        (false, true) => flag("unexpected `value`".into()),
        _ => {}
    }
    match (op.op.takes_from(), op.from.as_deref()) {
        (true, None) => flag("missing `from`".into()),
        (true, Some(from)) if !is_valid_pointer(from) => {
            flag(format!("`from` is not a valid JSON pointer: {from:?}"))
        }
        (false, Some(_)) => flag("unexpected `from`".into()),
        _ => {}
    }
    out
}
