//! JSONPath-style node selection that reports where each match lives.
//!
//! Supported syntax: `$`, `.name`, `['name']`, `.*`, `[*]`, `[n]`
//! (negative counts from the end), unions such as `['a',"b"]` or `[0,2]`,
//! slices `[start:end:step]` and recursive descent `..`.

use serde_json::Value;

use crate::errors::{FixError, Result};
use crate::parser::{ParseError, Parser};
use crate::pointer::{Location, Step};

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Key(String),
    Index(i64),
    Wildcard,
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Child(Vec<Selector>),      // .foo, ['a','b'], [0]
    Descendant(Vec<Selector>), // ..foo, ..[*]
}

/// A matched node together with the path used to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    pub path: Location,
    pub value: &'a Value,
}

/// A parsed node-selection expression.
#[derive(Debug, Clone)]
pub struct Query {
    segments: Vec<Segment>,
}

impl Query {
    pub fn parse(input: &str) -> Result<Self> {
        let segments = parse_segments(input).map_err(|ParseError::InvalidSyntax(reason)| {
            FixError::InvalidQuery {
                query: input.to_string(),
                reason,
            }
        })?;
        Ok(Self { segments })
    }

    /// Every matching node in document order. Never mutates `doc`.
    pub fn find<'a>(&self, doc: &'a Value) -> Vec<Node<'a>> {
        let mut current = vec![Node {
            path: Location::root(),
            value: doc,
        }];
        for seg in &self.segments {
            current = match seg {
                Segment::Child(selectors) => current
                    .iter()
                    .flat_map(|node| select_all(node, selectors))
                    .collect(),
                Segment::Descendant(selectors) => current
                    .iter()
                    .flat_map(|node| {
                        let mut out = Vec::new();
                        descendants(node.clone(), &mut out);
                        out
                    })
                    .flat_map(|node| select_all(&node, selectors))
                    .collect(),
            };
        }
        current
    }
}

/// Parse `query` and evaluate it against `doc`.
pub fn find<'a>(query: &str, doc: &'a Value) -> Result<Vec<Node<'a>>> {
    Ok(Query::parse(query)?.find(doc))
}

fn parse_segments(input: &str) -> std::result::Result<Vec<Segment>, ParseError> {
    let mut p = Parser::new(input);
    let mut segments = Vec::new();
    p.skip_ws();
    if !p.consume_char('$') {
        return Err(ParseError::InvalidSyntax("query must start with `$`".into()));
    }

    loop {
        p.skip_ws();
        if p.eof() {
            break;
        }
        if p.consume_str("..") {
            let selectors = if p.consume_char('*') {
                vec![Selector::Wildcard]
            } else if p.peek_char() == Some('[') {
                parse_bracket(&mut p)?
            } else {
                vec![Selector::Key(p.parse_identifier()?)]
            };
            segments.push(Segment::Descendant(selectors));
            continue;
        }
        if p.consume_char('.') {
            if p.consume_char('*') {
                segments.push(Segment::Child(vec![Selector::Wildcard]));
            } else {
                segments.push(Segment::Child(vec![Selector::Key(p.parse_identifier()?)]));
            }
            continue;
        }
        if p.peek_char() == Some('[') {
            segments.push(Segment::Child(parse_bracket(&mut p)?));
            continue;
        }
        return Err(ParseError::InvalidSyntax(format!(
            "unexpected character at {}",
            p.position()
        )));
    }
    Ok(segments)
}

fn parse_bracket(p: &mut Parser) -> std::result::Result<Vec<Selector>, ParseError> {
    p.expect('[')?;
    let mut selectors = Vec::new();
    loop {
        p.skip_ws();
        selectors.push(parse_selector(p)?);
        p.skip_ws();
        if p.consume_char(',') {
            continue;
        }
        p.expect(']')?;
        return Ok(selectors);
    }
}

fn parse_selector(p: &mut Parser) -> std::result::Result<Selector, ParseError> {
    if p.consume_char('*') {
        return Ok(Selector::Wildcard);
    }
    if matches!(p.peek_char(), Some('\'' | '"')) {
        return Ok(Selector::Key(p.parse_quoted_string()?));
    }
    let start = p.parse_int()?;
    p.skip_ws();
    if p.consume_char(':') {
        p.skip_ws();
        let end = p.parse_int()?;
        p.skip_ws();
        let step = if p.consume_char(':') {
            p.skip_ws();
            p.parse_int()?
        } else {
            None
        };
        return Ok(Selector::Slice { start, end, step });
    }
    start
        .map(Selector::Index)
        .ok_or_else(|| ParseError::InvalidSyntax(format!("invalid selector at {}", p.position())))
}

fn select_all<'a>(node: &Node<'a>, selectors: &[Selector]) -> Vec<Node<'a>> {
    selectors
        .iter()
        .flat_map(|sel| select(node, sel))
        .collect()
}

fn select<'a>(node: &Node<'a>, sel: &Selector) -> Vec<Node<'a>> {
    let child = |step: Step, value: &'a Value| Node {
        path: node.path.child(step),
        value,
    };
    match (sel, node.value) {
        (Selector::Key(k), Value::Object(map)) => map
            .get(k)
            .map(|v| child(Step::Key(k.clone()), v))
            .into_iter()
            .collect(),
        (Selector::Index(i), Value::Array(arr)) => resolve_index(*i, arr.len())
            .map(|idx| child(Step::Index(idx), &arr[idx]))
            .into_iter()
            .collect(),
        (Selector::Wildcard, Value::Array(arr)) => arr
            .iter()
            .enumerate()
            .map(|(idx, v)| child(Step::Index(idx), v))
            .collect(),
        (Selector::Wildcard, Value::Object(map)) => map
            .iter()
            .map(|(k, v)| child(Step::Key(k.clone()), v))
            .collect(),
        (Selector::Slice { start, end, step }, Value::Array(arr)) => {
            slice_indices(arr.len(), *start, *end, *step)
                .into_iter()
                .map(|idx| child(Step::Index(idx), &arr[idx]))
                .collect()
        }
        _ => Vec::new(),
    }
}

fn resolve_index(i: i64, len: usize) -> Option<usize> {
    let n = len as i64;
    let idx = if i < 0 { n + i } else { i };
    (0..n).contains(&idx).then_some(idx as usize)
}

fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: Option<i64>) -> Vec<usize> {
    let n = len as i64;
    let step = step.unwrap_or(1);
    if step == 0 || n == 0 {
        return Vec::new();
    }
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (n + i).clamp(0, n)
        } else {
            i.clamp(0, n)
        }
    };
    let lo = norm(start.unwrap_or(0));
    let hi = norm(end.unwrap_or(n));
    let mut out = Vec::new();
    let mut i = if step > 0 { lo } else { hi - 1 };
    while (lo..hi).contains(&i) {
        out.push(i as usize);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    out
}

// Pre-order: the node itself, then its children in document order.
fn descendants<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    let children: Vec<Node<'a>> = match node.value {
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(idx, v)| Node {
                path: node.path.child(idx),
                value: v,
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Node {
                path: node.path.child(k.as_str()),
                value: v,
            })
            .collect(),
        _ => Vec::new(),
    };
    out.push(node);
    for c in children {
        descendants(c, out);
    }
}
