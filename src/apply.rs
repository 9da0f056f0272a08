use serde_json::Value;
use tracing::{debug, error};

use crate::errors::{FixError, Result};
use crate::operation::{OpKind, Operation};
use crate::pointer::{overlaps, parse_pointer};
use crate::validate::Violation;

/// Apply `patch` to a copy of `doc`, one operation at a time.
///
/// The input is never touched; on error nothing is returned, so a partially
/// patched document cannot leak out.
pub fn apply(doc: &Value, patch: &[Operation]) -> Result<Value> {
    let mut out = doc.clone();
    for (index, op) in patch.iter().enumerate() {
        if let Err(e) = apply_operation(&mut out, index, op) {
            error!(index, op = op.op.as_str(), path = %op.path, "patch application failed: {e}");
            return Err(e);
        }
    }
    debug!(operations = patch.len(), "patch applied");
    Ok(out)
}

pub(crate) fn apply_operation(doc: &mut Value, index: usize, op: &Operation) -> Result<()> {
    let path = parse_pointer(&op.path)?;
    match op.op {
        OpKind::Add => add(doc, &op.path, &path, required_value(index, op)?),
        OpKind::Replace => {
            *get_mut(doc, &op.path, &path)? = required_value(index, op)?;
            Ok(())
        }
        OpKind::Remove => take(doc, &op.path, &path).map(drop),
        OpKind::Move => {
            let from_ptr = required_from(index, op)?;
            let from = parse_pointer(from_ptr)?;
            if overlaps(&from, &path) {
                return Err(FixError::OverlappingMove {
                    from: from_ptr.to_string(),
                    path: op.path.clone(),
                });
            }
            let value = take(doc, from_ptr, &from)?;
            add(doc, &op.path, &path, value)
        }
        OpKind::Copy => {
            let from_ptr = required_from(index, op)?;
            let value = get(doc, from_ptr, &parse_pointer(from_ptr)?)?.clone();
            add(doc, &op.path, &path, value)
        }
        OpKind::Test => {
            let expected = required_value(index, op)?;
            if *get(doc, &op.path, &path)? != expected {
                return Err(FixError::TestFailed {
                    path: op.path.clone(),
                });
            }
            Ok(())
        }
    }
}

fn required_value(index: usize, op: &Operation) -> Result<Value> {
    op.value.clone().ok_or_else(|| FixError::InvalidPatch {
        violations: vec![Violation::new(index, op.op, "missing `value`")],
    })
}

fn required_from(index: usize, op: &Operation) -> Result<&str> {
    op.from.as_deref().ok_or_else(|| FixError::InvalidPatch {
        violations: vec![Violation::new(index, op.op, "missing `from`")],
    })
}

fn not_found(ptr: &str) -> FixError {
    FixError::PathNotFound {
        path: ptr.to_string(),
    }
}

// Sequence index per RFC 6901: digits only, no leading zeros. `-` is the
// element past the end and never exists.
fn array_index(ptr: &str, token: &str) -> Result<usize> {
    if token == "-" {
        return Err(not_found(ptr));
    }
    let well_formed = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if !well_formed {
        return Err(FixError::TypeMismatch {
            path: ptr.to_string(),
            reason: format!("`{token}` is not a sequence index"),
        });
    }
    token.parse::<usize>().map_err(|_| not_found(ptr))
}

fn scalar(ptr: &str, token: &str) -> FixError {
    FixError::TypeMismatch {
        path: ptr.to_string(),
        reason: format!("cannot address `{token}` inside a scalar"),
    }
}

fn get<'a>(doc: &'a Value, ptr: &str, tokens: &[String]) -> Result<&'a Value> {
    let mut cur = doc;
    for tok in tokens {
        cur = match cur {
            Value::Object(m) => m.get(tok).ok_or_else(|| not_found(ptr))?,
            Value::Array(a) => a.get(array_index(ptr, tok)?).ok_or_else(|| not_found(ptr))?,
            _ => return Err(scalar(ptr, tok)),
        };
    }
    Ok(cur)
}

fn get_mut<'a>(doc: &'a mut Value, ptr: &str, tokens: &[String]) -> Result<&'a mut Value> {
    let mut cur = doc;
    for tok in tokens {
        cur = match cur {
            Value::Object(m) => m.get_mut(tok).ok_or_else(|| not_found(ptr))?,
            Value::Array(a) => {
                let idx = array_index(ptr, tok)?;
                a.get_mut(idx).ok_or_else(|| not_found(ptr))?
            }
            _ => return Err(scalar(ptr, tok)),
        };
    }
    Ok(cur)
}

fn add(doc: &mut Value, ptr: &str, tokens: &[String], value: Value) -> Result<()> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };
    match get_mut(doc, ptr, parent_tokens)? {
        Value::Object(m) => {
            m.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(a) => {
            if last == "-" {
                a.push(value);
                return Ok(());
            }
            let idx = array_index(ptr, last)?;
            if idx > a.len() {
                return Err(not_found(ptr));
            }
            a.insert(idx, value);
            Ok(())
        }
        _ => Err(scalar(ptr, last)),
    }
}

// Remove and return the node at `tokens`.
fn take(doc: &mut Value, ptr: &str, tokens: &[String]) -> Result<Value> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        return Err(FixError::RemoveRoot);
    };
    match get_mut(doc, ptr, parent_tokens)? {
        Value::Object(m) => m.shift_remove(last).ok_or_else(|| not_found(ptr)),
        Value::Array(a) => {
            let idx = array_index(ptr, last)?;
            if idx >= a.len() {
                return Err(not_found(ptr));
            }
            Ok(a.remove(idx))
        }
        _ => Err(scalar(ptr, last)),
    }
}
