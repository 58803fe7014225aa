//! The selector subset understood by the bundled query engines.
//!
//! Accepted form:
//!
//! ```text
//! {"selector": {"<path>": <scalar> | {"$eq": <scalar>}, ...}, "use_index": ...}
//! ```
//!
//! - Conditions are combined with AND
//! - A path is a dotted field path into the record (`u_ids.alice`)
//! - Scalars are strings, numbers, or booleans
//! - `use_index` is an index hint and is ignored
//!
//! Anything else is rejected with `StoreError::Query`. A production ledger
//! brings its own engine; this one exists so the gateway runs end to end.

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

const SELECTOR: &str = "selector";
const USE_INDEX: &str = "use_index";
const EQ: &str = "$eq";

/// A comparable JSON scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Scalar::String(s.clone())),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Scalar::Integer(i)),
                None => n
                    .as_f64()
                    .map(Scalar::Float)
                    .ok_or_else(|| StoreError::Query(format!("unsupported number {}", n))),
            },
            other => Err(StoreError::Query(format!(
                "unsupported selector value {}",
                other
            ))),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Scalar::String(s) => value.as_str() == Some(s.as_str()),
            Scalar::Integer(i) => match value.as_i64() {
                Some(v) => v == *i,
                None => value.as_f64() == Some(*i as f64),
            },
            Scalar::Float(f) => value.as_f64() == Some(*f),
            Scalar::Bool(b) => value.as_bool() == Some(*b),
        }
    }
}

/// One equality condition on a field path.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: Vec<String>,
    pub value: Scalar,
}

impl Condition {
    /// The path as a SQLite JSON path, e.g. `$."u_ids"."alice"`.
    pub fn json_path(&self) -> String {
        let mut path = String::from("$");
        for segment in &self.path {
            path.push_str(".\"");
            path.push_str(segment);
            path.push('"');
        }
        path
    }

    fn matches(&self, record: &Value) -> bool {
        let mut current = record;
        for segment in &self.path {
            match current.get(segment) {
                Some(next) => current = next,
                None => return false,
            }
        }
        self.value.matches(current)
    }
}

/// A parsed selector: a conjunction of equality conditions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    pub conditions: Vec<Condition>,
}

impl Selector {
    /// Parse a query string.
    pub fn parse(query: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(query)
            .map_err(|e| StoreError::Query(format!("malformed query: {}", e)))?;
        let root = root
            .as_object()
            .ok_or_else(|| StoreError::Query("query must be a JSON object".into()))?;

        if let Some(key) = root.keys().find(|k| *k != SELECTOR && *k != USE_INDEX) {
            return Err(StoreError::Query(format!("unsupported query clause {:?}", key)));
        }

        let fields = match root.get(SELECTOR) {
            Some(Value::Object(fields)) => fields,
            Some(_) => return Err(StoreError::Query("selector must be an object".into())),
            None => return Err(StoreError::Query("query has no selector".into())),
        };

        let conditions = fields
            .iter()
            .map(|(path, value)| parse_condition(path, value))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { conditions })
    }

    /// Whether the record bytes satisfy every condition.
    ///
    /// Values that are not JSON never match.
    pub fn matches(&self, record: &[u8]) -> bool {
        match serde_json::from_slice::<Value>(record) {
            Ok(value) => self.conditions.iter().all(|c| c.matches(&value)),
            Err(_) => false,
        }
    }
}

fn parse_condition(path: &str, value: &Value) -> Result<Condition> {
    let segments: Vec<String> = path.split('.').map(String::from).collect();
    if segments.iter().any(|s| s.is_empty() || s.contains('"')) {
        return Err(StoreError::Query(format!("invalid field path {:?}", path)));
    }

    let scalar = match value {
        Value::Object(ops) => parse_operator(path, ops)?,
        other => Scalar::from_json(other)?,
    };

    Ok(Condition {
        path: segments,
        value: scalar,
    })
}

fn parse_operator(path: &str, ops: &Map<String, Value>) -> Result<Scalar> {
    match (ops.len(), ops.get(EQ)) {
        (1, Some(operand)) => Scalar::from_json(operand),
        _ => Err(StoreError::Query(format!(
            "unsupported operator on {:?}: only $eq is accepted",
            path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANT: &[u8] =
        br#"{"docType":"consentGrant","c_id":"cola","r_id":"r1","u_ids":{"alice":1}}"#;

    #[test]
    fn test_empty_selector_matches_all_json() {
        let selector = Selector::parse(r#"{"selector":{}}"#).unwrap();
        assert!(selector.matches(GRANT));
        assert!(!selector.matches(b"not json"));
    }

    #[test]
    fn test_equality_and_eq_operator() {
        let selector =
            Selector::parse(r#"{"selector":{"docType":"consentGrant","r_id":{"$eq":"r1"}}}"#)
                .unwrap();
        assert_eq!(selector.conditions.len(), 2);
        assert!(selector.matches(GRANT));

        let other = Selector::parse(r#"{"selector":{"r_id":"r2"}}"#).unwrap();
        assert!(!other.matches(GRANT));
    }

    #[test]
    fn test_nested_path() {
        let selector = Selector::parse(r#"{"selector":{"u_ids.alice":1}}"#).unwrap();
        assert!(selector.matches(GRANT));
        assert_eq!(selector.conditions[0].json_path(), r#"$."u_ids"."alice""#);

        let missing = Selector::parse(r#"{"selector":{"u_ids.bob":1}}"#).unwrap();
        assert!(!missing.matches(GRANT));
    }

    #[test]
    fn test_use_index_is_ignored() {
        let selector = Selector::parse(
            r#"{"selector":{"c_id":"cola"},"use_index":["_design/indexDoc","indexName"]}"#,
        )
        .unwrap();
        assert!(selector.matches(GRANT));
    }

    #[test]
    fn test_rejections() {
        for query in [
            "not json",
            "[]",
            r#"{"fields":["c_id"]}"#,
            r#"{"selector":{"c_id":"cola"},"sort":[{"c_id":"asc"}]}"#,
            r#"{"selector":{"size":{"$gt":0}}}"#,
            r#"{"selector":{"u_ids":{}}}"#,
            r#"{"selector":{"c_id":null}}"#,
            r#"{"selector":{"a..b":1}}"#,
        ] {
            assert!(
                matches!(Selector::parse(query), Err(StoreError::Query(_))),
                "accepted {}",
                query
            );
        }
    }

    proptest::proptest! {
        #[test]
        fn test_equality_matches_only_its_own_value(
            field in "[a-z_]{1,8}",
            value in "[a-zA-Z0-9 |]{0,12}",
            other in "[a-zA-Z0-9 |]{0,12}",
        ) {
            let object = |v: &str| {
                let mut map = Map::new();
                map.insert(field.clone(), Value::String(v.to_string()));
                Value::Object(map)
            };
            let mut query = Map::new();
            query.insert("selector".to_string(), object(&value));
            let selector = Selector::parse(&Value::Object(query).to_string()).unwrap();

            let record = object(&value).to_string();
            proptest::prop_assert!(selector.matches(record.as_bytes()));

            let record = object(&other).to_string();
            proptest::prop_assert_eq!(selector.matches(record.as_bytes()), value == other);
        }
    }
}
