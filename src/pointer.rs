//! Structural locations inside a document and their JSON Pointer encoding.

use std::fmt;

use itertools::Itertools;

use crate::errors::{FixError, Result};

/// One traversal step. `Root` is the `$` sentinel a query starts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Root,
    Key(String),
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Root => f.write_str("$"),
            Step::Key(k) => f.write_str(k),
            Step::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Step {
    fn from(key: &str) -> Self {
        Step::Key(key.to_string())
    }
}

impl From<String> for Step {
    fn from(key: String) -> Self {
        Step::Key(key)
    }
}

impl From<usize> for Step {
    fn from(index: usize) -> Self {
        Step::Index(index)
    }
}

/// Path to a node, as produced by a query: `[$, "authorities", "p0abc", ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    steps: Vec<Step>,
}

impl Default for Location {
    fn default() -> Self {
        Self::root()
    }
}

impl Location {
    pub fn root() -> Self {
        Self {
            steps: vec![Step::Root],
        }
    }

    /// Location from steps below the root, e.g. `Location::at(["@context", "broader"])`.
    pub fn at<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let mut loc = Self::root();
        loc.steps.extend(steps.into_iter().map(Into::into));
        loc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn push(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    /// A new location one step below this one.
    pub fn child(&self, step: impl Into<Step>) -> Self {
        let mut loc = self.clone();
        loc.push(step);
        loc
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Key at position `n` (counting the root sentinel as 0), if that step is a key.
    pub fn key_at(&self, n: usize) -> Option<&str> {
        match self.steps.get(n) {
            Some(Step::Key(k)) => Some(k),
            _ => None,
        }
    }

    pub fn to_pointer(&self) -> String {
        to_pointer(&self.steps)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pointer())
    }
}

/// Encode a path as a JSON Pointer. The root sentinel is dropped and the
/// root itself maps to the empty string.
pub fn to_pointer(path: &[Step]) -> String {
    let tokens = path
        .iter()
        .filter(|step| !matches!(step, Step::Root))
        .map(|step| escape(&step.to_string()))
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        String::new()
    } else {
        format!("/{}", tokens.iter().join("/"))
    }
}

/// Escape a single reference token. `~` goes first so `/` -> `~1` is not re-escaped.
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`]. Fails on a `~` not followed by `0` or `1`.
pub fn unescape(token: &str) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(FixError::InvalidPointer(token.to_string())),
        }
    }
    Ok(out)
}

/// Split a pointer into unescaped reference tokens. `""` is the whole document.
pub fn parse_pointer(ptr: &str) -> Result<Vec<String>> {
    if ptr.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = ptr.strip_prefix('/') else {
        return Err(FixError::InvalidPointer(ptr.to_string()));
    };
    rest.split('/')
        .map(|raw| unescape(raw).map_err(|_| FixError::InvalidPointer(ptr.to_string())))
        .collect()
}

pub fn is_valid_pointer(ptr: &str) -> bool {
    parse_pointer(ptr).is_ok()
}

/// True when `a` equals `b` or one contains the other, token-wise.
pub(crate) fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}
