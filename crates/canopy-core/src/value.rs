//! The nested data model carried by resource options.
//!
//! `Value` is a superset of the JSON data model with one extra variant:
//! [`Value::Deferred`] holds a [`Token`] standing in for a value not yet
//! known at construction time. Tokens are consumed during render; a
//! canonical document never contains one.

use crate::token::Token;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Deferred(Token),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// Whether any deferred token remains anywhere in this value.
    pub fn contains_deferred(&self) -> bool {
        match self {
            Value::Deferred(_) => true,
            Value::List(items) => items.iter().any(Value::contains_deferred),
            Value::Map(entries) => entries.values().any(Value::contains_deferred),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(v.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON representation and become `Null`,
    /// matching serde_json.
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        Value::Deferred(token)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_from_json() {
        let v = Value::from(json!({
            "kind": "ConfigMap",
            "data": { "replicas": 3, "enabled": false },
            "list": [1, "two", null],
        }));

        let map = v.as_map().unwrap();
        assert_eq!(map.get("kind").unwrap().as_str(), Some("ConfigMap"));
        let data = map.get("data").unwrap().as_map().unwrap();
        assert_eq!(data.get("enabled"), Some(&Value::Bool(false)));
        assert_eq!(
            map.get("list"),
            Some(&Value::List(vec![
                Value::from(1i64),
                Value::from("two"),
                Value::Null
            ]))
        );
    }

    #[test]
    fn detects_nested_deferred() {
        let token = Token::new("name of db", || Ok(Value::from("db-1234")));
        let v: Value = [
            ("plain".to_owned(), Value::from("x")),
            (
                "nested".to_owned(),
                Value::List(vec![Value::Deferred(token)]),
            ),
        ]
        .into_iter()
        .collect();

        assert!(v.contains_deferred());
        assert!(!Value::from(json!({"a": [1, 2]})).contains_deferred());
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(Value::from(f64::NAN), Value::Null);
        assert_eq!(Value::from(1.5), Value::Number(
            serde_json::Number::from_f64(1.5).unwrap()
        ));
    }
}
