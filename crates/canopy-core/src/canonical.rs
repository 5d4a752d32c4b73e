//! Canonicalization of resolved values into diff-stable documents.
//!
//! The canonical form is a `serde_json::Value` holding only primitives,
//! arrays, and objects with lexicographically ordered keys (serde_json's
//! default object map is a `BTreeMap`). Absence-like values — `null`, empty
//! maps, empty lists — are pruned recursively to a fixed point: a container
//! that becomes empty once its own children are pruned is itself pruned.
//! `false`, `0`, and `""` are data and survive.

use crate::value::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("unresolved deferred token at {path} (token: {hint})")]
    UnresolvedToken { path: String, hint: String },
    #[error("canonical encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Canonicalize a resolved value.
///
/// Returns `Ok(None)` when the value is absence-like and would be pruned
/// from any enclosing container. A [`Value::Deferred`] leaf is a programming
/// error: resolution must run first.
pub fn canonicalize(value: &Value) -> Result<Option<serde_json::Value>, CanonicalError> {
    clean(value, &mut Vec::new())
}

/// Canonicalize and encode as a compact JSON string.
///
/// Two structurally equal values always produce byte-identical output,
/// regardless of how or where they were built. A fully pruned value encodes
/// as an empty object.
pub fn canonical_json(value: &Value) -> Result<String, CanonicalError> {
    let doc = canonicalize(value)?
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
    Ok(serde_json::to_string(&doc)?)
}

fn clean(
    value: &Value,
    path: &mut Vec<String>,
) -> Result<Option<serde_json::Value>, CanonicalError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(serde_json::Value::Bool(*b))),
        Value::Number(n) => Ok(Some(serde_json::Value::Number(n.clone()))),
        Value::String(s) => Ok(Some(serde_json::Value::String(s.clone()))),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(format!("[{index}]"));
                let cleaned = clean(item, path);
                path.pop();
                if let Some(kept) = cleaned? {
                    out.push(kept);
                }
            }
            if out.is_empty() {
                Ok(None)
            } else {
                Ok(Some(serde_json::Value::Array(out)))
            }
        }
        Value::Map(entries) => {
            let mut out = serde_json::Map::new();
            for (key, entry) in entries {
                path.push(format!(".{key}"));
                let cleaned = clean(entry, path);
                path.pop();
                if let Some(kept) = cleaned? {
                    out.insert(key.clone(), kept);
                }
            }
            if out.is_empty() {
                Ok(None)
            } else {
                Ok(Some(serde_json::Value::Object(out)))
            }
        }
        Value::Deferred(token) => Err(CanonicalError::UnresolvedToken {
            path: format!("${}", path.concat()),
            hint: token.hint().to_owned(),
        }),
    }
}
