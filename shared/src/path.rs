//! Dotted-path updates over JSON-shaped screen state.
//!
//! Every feature screen binds its form fields to paths such as
//! `"travel.budget.dailyAmount"`. [`update`] produces a new state tree with
//! the addressed leaf replaced, leaving the input untouched, and refreshes
//! the top-level timestamp field the screens use for change tracking.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::UnixTimeMs;

/// Top-level keys treated as "last modified" stamps.
pub const TIMESTAMP_FIELDS: [&str; 2] = ["updatedAt", "lastUpdated"];

/// Stamp inserted when a state object carries neither of [`TIMESTAMP_FIELDS`].
pub const DEFAULT_TIMESTAMP_FIELD: &str = "updatedAt";

/// Marker used in errors when the failing node is the state root.
pub const ROOT_SEGMENT: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFailure {
    Missing,
    NotAnObject { found: JsonKind },
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("segment does not exist"),
            Self::NotAnObject { found } => write!(f, "expected object, found {found}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path `{path}` does not resolve at `{segment}`: {reason}")]
    Invalid {
        path: String,
        segment: String,
        reason: PathFailure,
    },
}

impl PathError {
    #[must_use]
    pub fn failure(&self) -> Option<PathFailure> {
        match self {
            Self::Empty => None,
            Self::Invalid { reason, .. } => Some(*reason),
        }
    }
}

/// A parsed, non-empty dot-delimited path.
///
/// Segments are split on `.` verbatim, so `"a..b"` addresses the key `""`
/// inside `a`, the same key a JSON object would accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        Ok(Self {
            raw: raw.to_owned(),
            segments: raw.split('.').map(str::to_owned).collect(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// A single-segment write to one of the timestamp keys.
    #[must_use]
    pub fn is_timestamp_write(&self) -> bool {
        self.segments.len() == 1 && TIMESTAMP_FIELDS.contains(&self.leaf())
    }

    fn invalid(&self, segment: &str, reason: PathFailure) -> PathError {
        PathError::Invalid {
            path: self.raw.clone(),
            segment: segment.to_owned(),
            reason,
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Reads the value at `path`, or `None` when any segment fails to resolve.
#[must_use]
pub fn get<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Replaces the value at `path`, stamping the result with the current time.
pub fn update(root: &Value, path: &str, value: Value) -> Result<Value, PathError> {
    update_at(root, path, value, UnixTimeMs::now())
}

pub fn update_at(
    root: &Value,
    path: &str,
    value: Value,
    now: UnixTimeMs,
) -> Result<Value, PathError> {
    let path = FieldPath::parse(path)?;
    set(root, &path, value, now)
}

/// Copy-on-write write of `value` at an already parsed path.
///
/// Every object on the way down is rebuilt, so the returned tree shares
/// nothing with `root`. Either the whole new tree is returned or an error;
/// there is no partially updated state.
pub fn set(root: &Value, path: &FieldPath, value: Value, now: UnixTimeMs) -> Result<Value, PathError> {
    let mut next = write(root, path, 0, value)?;
    if !path.is_timestamp_write() {
        refresh_timestamp(&mut next, now);
    }
    Ok(next)
}

fn write(node: &Value, path: &FieldPath, depth: usize, value: Value) -> Result<Value, PathError> {
    let Some(object) = node.as_object() else {
        let at = if depth == 0 {
            ROOT_SEGMENT
        } else {
            path.segments[depth - 1].as_str()
        };
        return Err(path.invalid(
            at,
            PathFailure::NotAnObject {
                found: JsonKind::of(node),
            },
        ));
    };

    let key = &path.segments[depth];
    let replacement = if depth + 1 == path.segments.len() {
        value
    } else {
        let child = object
            .get(key)
            .ok_or_else(|| path.invalid(key, PathFailure::Missing))?;
        write(child, path, depth + 1, value)?
    };

    let mut copy: Map<String, Value> = object
        .iter()
        .filter(|(k, _)| *k != key)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    copy.insert(key.clone(), replacement);

    Ok(Value::Object(copy))
}

/// Sets every existing timestamp key on the root object to `now`, inserting
/// [`DEFAULT_TIMESTAMP_FIELD`] when none is present. Non-objects are left alone.
pub fn refresh_timestamp(state: &mut Value, now: UnixTimeMs) {
    let Some(object) = state.as_object_mut() else {
        return;
    };

    let mut touched = false;
    for field in TIMESTAMP_FIELDS {
        if let Some(slot) = object.get_mut(field) {
            *slot = Value::from(now.as_millis());
            touched = true;
        }
    }

    if !touched {
        object.insert(
            DEFAULT_TIMESTAMP_FIELD.to_owned(),
            Value::from(now.as_millis()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const NOW: UnixTimeMs = UnixTimeMs(1_700_000_000_000);

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_empty_path_rejected() {
            assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
            assert_eq!(update_at(&json!({}), "", json!(1), NOW), Err(PathError::Empty));
        }

        #[test]
        fn test_segments_split_on_dots() {
            let p = path("travel.budget.dailyAmount");
            assert_eq!(p.segments(), ["travel", "budget", "dailyAmount"]);
            assert_eq!(p.leaf(), "dailyAmount");
            assert_eq!(p.len(), 3);
        }

        #[test]
        fn test_empty_segments_are_literal_keys() {
            let p = path("a..b");
            assert_eq!(p.segments(), ["a", "", "b"]);
        }

        #[test]
        fn test_timestamp_write_detection() {
            assert!(path("updatedAt").is_timestamp_write());
            assert!(path("lastUpdated").is_timestamp_write());
            assert!(!path("meta.updatedAt").is_timestamp_write());
        }
    }

    mod update_tests {
        use super::*;

        #[test]
        fn test_replaces_leaf_and_stamps() {
            let next = update_at(&json!({"a": {"b": 1}}), "a.b", json!(2), NOW).unwrap();
            assert_eq!(next, json!({"a": {"b": 2}, "updatedAt": NOW.as_millis()}));
        }

        #[test]
        fn test_missing_intermediate_fails() {
            let err = update_at(&json!({"a": {"b": 1}}), "a.c.d", json!(5), NOW).unwrap_err();
            assert_eq!(
                err,
                PathError::Invalid {
                    path: "a.c.d".into(),
                    segment: "c".into(),
                    reason: PathFailure::Missing,
                }
            );
        }

        #[test]
        fn test_primitive_intermediate_fails() {
            let err = update_at(&json!({"a": {"b": 1}}), "a.b.c", json!(5), NOW).unwrap_err();
            assert_eq!(
                err.failure(),
                Some(PathFailure::NotAnObject {
                    found: JsonKind::Number
                })
            );
            assert!(err.to_string().contains("`b`"));
        }

        #[test]
        fn test_array_intermediate_fails() {
            let state = json!({"days": [{"title": "Arrival"}]});
            let err = update_at(&state, "days.0.title", json!("x"), NOW).unwrap_err();
            assert_eq!(
                err.failure(),
                Some(PathFailure::NotAnObject {
                    found: JsonKind::Array
                })
            );
        }

        #[test]
        fn test_non_object_root_fails() {
            let err = update_at(&json!([1, 2]), "a", json!(1), NOW).unwrap_err();
            match err {
                PathError::Invalid { segment, .. } => assert_eq!(segment, ROOT_SEGMENT),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn test_new_leaf_created_under_existing_object() {
            let next = update_at(&json!({"a": {}}), "a.fresh", json!(true), NOW).unwrap();
            assert_eq!(next["a"]["fresh"], json!(true));
        }

        #[test]
        fn test_siblings_preserved() {
            let state = json!({
                "travel": {"budget": {"dailyAmount": 100, "currency": "EUR"}, "pace": "relaxed"},
                "dining": {"cuisines": ["thai"]}
            });
            let next = update_at(&state, "travel.budget.dailyAmount", json!(150), NOW).unwrap();
            assert_eq!(next["travel"]["budget"]["currency"], json!("EUR"));
            assert_eq!(next["travel"]["pace"], json!("relaxed"));
            assert_eq!(next["dining"], state["dining"]);
            assert_eq!(next["travel"]["budget"]["dailyAmount"], json!(150));
        }

        #[test]
        fn test_last_updated_refreshed_instead_of_inserting() {
            let state = json!({"lastUpdated": 0, "pace": "slow"});
            let next = update_at(&state, "pace", json!("fast"), NOW).unwrap();
            assert_eq!(next["lastUpdated"], json!(NOW.as_millis()));
            assert!(next.get("updatedAt").is_none());
        }

        #[test]
        fn test_explicit_timestamp_write_is_kept() {
            let next = update_at(&json!({"updatedAt": 1}), "updatedAt", json!(42), NOW).unwrap();
            assert_eq!(next["updatedAt"], json!(42));
        }

        #[test]
        fn test_input_untouched_on_failure() {
            let state = json!({"a": {"b": 1}});
            let before = state.clone();
            assert!(update_at(&state, "a.c.d", json!(5), NOW).is_err());
            assert_eq!(state, before);
        }
    }

    mod get_tests {
        use super::*;

        #[test]
        fn test_get_nested() {
            let state = json!({"a": {"b": {"c": "deep"}}});
            assert_eq!(get(&state, &path("a.b.c")), Some(&json!("deep")));
            assert_eq!(get(&state, &path("a.x")), None);
            assert_eq!(get(&state, &path("a.b.c.d")), None);
        }
    }

    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z ]{0,8}".prop_map(Value::from),
        ]
    }

    fn arb_state() -> impl Strategy<Value = Value> {
        let node = arb_leaf().prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-z]{1,3}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        });
        prop::collection::btree_map("[a-z]{1,3}", node, 1..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    fn collect_paths(node: &Value, prefix: &str, out: &mut Vec<String>) {
        if let Some(object) = node.as_object() {
            for (key, child) in object {
                let p = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                out.push(p.clone());
                collect_paths(child, &p, out);
            }
        }
    }

    fn arb_state_with_path() -> impl Strategy<Value = (Value, String)> {
        arb_state().prop_flat_map(|state| {
            let mut paths = Vec::new();
            collect_paths(&state, "", &mut paths);
            (Just(state), prop::sample::select(paths))
        })
    }

    proptest! {
        #[test]
        fn path_round_trip((state, p) in arb_state_with_path(), v in arb_leaf()) {
            prop_assume!(!FieldPath::parse(&p).unwrap().is_timestamp_write());
            let next = update_at(&state, &p, v.clone(), NOW).unwrap();
            prop_assert_eq!(get(&next, &FieldPath::parse(&p).unwrap()), Some(&v));
        }

        #[test]
        fn noop_update_only_moves_timestamp((state, p) in arb_state_with_path()) {
            let parsed = FieldPath::parse(&p).unwrap();
            prop_assume!(!parsed.is_timestamp_write());
            let current = get(&state, &parsed).cloned().unwrap();
            let mut next = update_at(&state, &p, current, NOW).unwrap();
            let mut expected = state.clone();
            refresh_timestamp(&mut expected, NOW);
            prop_assert_eq!(&next, &expected);

            next.as_object_mut().unwrap().remove(DEFAULT_TIMESTAMP_FIELD);
            let mut original = state.clone();
            original.as_object_mut().unwrap().remove(DEFAULT_TIMESTAMP_FIELD);
            prop_assert_eq!(next, original);
        }

        #[test]
        fn input_never_mutated((state, p) in arb_state_with_path(), v in arb_leaf()) {
            let before = state.clone();
            let _ = update_at(&state, &p, v, NOW);
            let _ = update_at(&state, &format!("{p}.zz.yy"), Value::Null, NOW);
            prop_assert_eq!(state, before);
        }
    }
}
