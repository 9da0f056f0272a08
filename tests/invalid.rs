use periodo_fix as pf;
use pf::{FixError, OpKind, Patch, Violation};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn patch(ops: Value) -> Patch {
    serde_json::from_value(ops).unwrap()
}

// Slice bounds must be integers; the error names the offending query.
#[test]
fn test_invalid_query_slice_bad_number() {
    let err = pf::find("$.a[1:x]", &json!({"a": [0, 1, 2]})).unwrap_err();
    match err {
        FixError::InvalidQuery { query, .. } => assert_eq!(query, "$.a[1:x]"),
        other => panic!("expected InvalidQuery, got {other:?}"),
    }
}

#[test]
fn test_invalid_query_shapes() {
    let doc = json!({"items": {}});
    for q in ["items", "$.items[", "$.items[*", "$..", "$.items trailing", "$['items"] {
        let err = pf::find(q, &doc).unwrap_err();
        assert!(matches!(err, FixError::InvalidQuery { .. }), "{q}: {err:?}");
    }
}

#[test]
fn test_replace_without_value_is_invalid_patch() {
    let err = pf::validate(patch(json!([{"op": "replace", "path": "/x"}])), None).unwrap_err();
    assert!(matches!(err, FixError::InvalidPatch { .. }));
}

// Every violation is reported, not only the first.
#[test]
fn test_invalid_patch_keeps_all_violations() {
    let err = pf::validate(
        patch(json!([
            {"op": "move", "path": "/b", "value": 1},
            {"op": "add", "path": "/ok", "value": 1},
            {"op": "remove", "path": "no-slash"}
        ])),
        None,
    )
    .unwrap_err();
    let FixError::InvalidPatch { violations } = err else {
        panic!("expected InvalidPatch");
    };
    assert_eq!(
        violations,
        vec![
            Violation::new(0, OpKind::Move, "unexpected `value`"),
            Violation::new(0, OpKind::Move, "missing `from`"),
            Violation::new(2, OpKind::Remove, "`path` is not a valid JSON pointer: \"no-slash\""),
        ]
    );
}

#[test]
fn test_structural_validation_needs_existing_targets() {
    let doc = json!({"a": 1});
    let ok = patch(json!([{"op": "replace", "path": "/a", "value": 2}]));
    assert_eq!(pf::validate(ok.clone(), Some(&doc)).unwrap(), ok);

    let missing = patch(json!([{"op": "remove", "path": "/b"}]));
    assert!(pf::validate(missing.clone(), None).is_ok());
    assert!(matches!(
        pf::validate(missing, Some(&doc)).unwrap_err(),
        FixError::InvalidPatch { .. }
    ));
}

fn apply_err(ops: Value) -> FixError {
    let doc = json!({"a": {"b": [1, 2]}, "s": "text"});
    pf::apply(&doc, &patch(ops)).unwrap_err()
}

#[test]
fn test_apply_errors() {
    assert!(matches!(
        apply_err(json!([{"op": "replace", "path": "/missing", "value": 1}])),
        FixError::PathNotFound { .. }
    ));
    assert!(matches!(
        apply_err(json!([{"op": "add", "path": "/a/b/9", "value": 1}])),
        FixError::PathNotFound { .. }
    ));
    assert!(matches!(
        apply_err(json!([{"op": "add", "path": "/s/x", "value": 1}])),
        FixError::TypeMismatch { .. }
    ));
    assert!(matches!(
        apply_err(json!([{"op": "move", "from": "/a", "path": "/a/c"}])),
        FixError::OverlappingMove { .. }
    ));
    assert!(matches!(
        apply_err(json!([{"op": "remove", "path": ""}])),
        FixError::RemoveRoot
    ));
    assert!(matches!(
        apply_err(json!([{"op": "test", "path": "/s", "value": "other"}])),
        FixError::TestFailed { .. }
    ));
    assert!(matches!(
        apply_err(json!([{"op": "add", "path": "a", "value": 1}])),
        FixError::InvalidPointer(_)
    ));
}

// A failing operation leaves the caller's document untouched.
#[test]
fn test_failed_apply_does_not_mutate_input() {
    let doc = json!({"a": 1});
    let p = patch(json!([
        {"op": "add", "path": "/b", "value": 2},
        {"op": "remove", "path": "/missing"}
    ]));
    assert!(pf::apply(&doc, &p).is_err());
    assert_eq!(doc, json!({"a": 1}));
}

#[test]
fn test_unknown_rule() {
    let err = pf::Registry::new().resolve("no-such-fix").err().unwrap();
    assert!(matches!(err, FixError::UnknownRule { .. }));
    assert_eq!(err.to_string(), "unknown rule `no-such-fix` (known rules: )");
}
