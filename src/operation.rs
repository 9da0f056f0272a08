use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::pointer::Location;

/// JSON Patch operation kinds, spelled as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
            OpKind::Move => "move",
            OpKind::Copy => "copy",
            OpKind::Test => "test",
        }
    }

    pub fn takes_value(&self) -> bool {
        matches!(self, OpKind::Add | OpKind::Replace | OpKind::Test)
    }

    pub fn takes_from(&self) -> bool {
        matches!(self, OpKind::Move | OpKind::Copy)
    }
}

/// A single patch operation in wire shape: `{op, path, value?, from?}`.
///
/// `value` and `from` are optional so that a hand-written or deserialized
/// patch can be carried as-is to the validator, which decides whether the
/// fields match the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op: OpKind,
    pub path: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Ordered; later operations see the effect of earlier ones.
pub type Patch = Vec<Operation>;

// `"value": null` is a present value, not a missing one.
fn present<'de, D>(de: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(de).map(Some)
}

/// What goes in the operation besides `op` and `path`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Stored verbatim under `value`.
    Value(Value),
    /// Converted to a pointer and stored under `from`.
    From(Location),
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Value(v)
    }
}

impl From<Location> for Payload {
    fn from(loc: Location) -> Self {
        Payload::From(loc)
    }
}

/// Build an operation of any kind. The kind/payload pairing is not checked
/// here; the validator rejects e.g. a `move` carrying a value.
pub fn operation(op: OpKind, path: &Location, payload: impl Into<Payload>) -> Operation {
    let (value, from) = match payload.into() {
        Payload::Value(v) => (Some(v), None),
        Payload::From(loc) => (None, Some(loc.to_pointer())),
    };
    Operation {
        op,
        path: path.to_pointer(),
        value,
        from,
    }
}

pub fn add(path: &Location, value: impl Into<Value>) -> Operation {
    operation(OpKind::Add, path, Payload::Value(value.into()))
}

pub fn replace(path: &Location, value: impl Into<Value>) -> Operation {
    operation(OpKind::Replace, path, Payload::Value(value.into()))
}

pub fn test(path: &Location, value: impl Into<Value>) -> Operation {
    operation(OpKind::Test, path, Payload::Value(value.into()))
}

/// `move` the node at `from` to `path`.
pub fn move_to(path: &Location, from: &Location) -> Operation {
    operation(OpKind::Move, path, Payload::From(from.clone()))
}

pub fn copy_to(path: &Location, from: &Location) -> Operation {
    operation(OpKind::Copy, path, Payload::From(from.clone()))
}

pub fn remove(path: &Location) -> Operation {
    Operation {
        op: OpKind::Remove,
        path: path.to_pointer(),
        value: None,
        from: None,
    }
}
