//! Deferred-token resolution over nested values.
//!
//! Resolution walks the value depth-first, replacing every [`Value::Deferred`]
//! leaf with its produced value and then resolving that value in turn, to a
//! fixed point where no token remains. A token re-entered while its own
//! expansion is still in flight is a cycle; a non-cyclic chain deeper than
//! [`MAX_RESOLVE_DEPTH`] is rejected as well.
//!
//! There is no cache shared between branches. The only memoization is the
//! per-instance memo inside [`Token`], so independent subtrees resolve
//! identically regardless of visitation order, and repeated renders are
//! idempotent.

use crate::token::Token;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Upper bound on the length of a token expansion chain.
pub const MAX_RESOLVE_DEPTH: usize = 128;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("token cycle detected at {path} (token: {hint})")]
    Cycle { path: String, hint: String },
    #[error("token chain at {path} exceeds depth {max} (token: {hint})")]
    DepthExceeded {
        path: String,
        hint: String,
        max: usize,
    },
    #[error("token producer failed at {path} (token: {hint}): {message}")]
    Producer {
        path: String,
        hint: String,
        message: String,
    },
}

/// Resolve every deferred token in `value`, returning a token-free copy.
///
/// All-or-nothing: any failure aborts the whole pass, no partial value is
/// returned.
pub fn resolve(value: &Value) -> Result<Value, ResolveError> {
    let mut state = ResolveState::default();
    state.visit(value)
}

enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, ".{k}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

#[derive(Default)]
struct ResolveState {
    path: Vec<PathSegment>,
    /// Addresses of tokens whose expansion is currently in flight.
    in_flight: Vec<usize>,
}

impl ResolveState {
    fn visit(&mut self, value: &Value) -> Result<Value, ResolveError> {
        match value {
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.path.push(PathSegment::Index(index));
                    let resolved = self.visit(item);
                    self.path.pop();
                    out.push(resolved?);
                }
                Ok(Value::List(out))
            }
            Value::Map(entries) => {
                let mut out = BTreeMap::new();
                for (key, entry) in entries {
                    self.path.push(PathSegment::Key(key.clone()));
                    let resolved = self.visit(entry);
                    self.path.pop();
                    out.insert(key.clone(), resolved?);
                }
                Ok(Value::Map(out))
            }
            Value::Deferred(token) => self.expand(token),
            other => Ok(other.clone()),
        }
    }

    fn expand(&mut self, token: &Token) -> Result<Value, ResolveError> {
        let addr = token.addr();
        if self.in_flight.contains(&addr) {
            return Err(ResolveError::Cycle {
                path: self.path_string(),
                hint: token.hint().to_owned(),
            });
        }
        if self.in_flight.len() >= MAX_RESOLVE_DEPTH {
            return Err(ResolveError::DepthExceeded {
                path: self.path_string(),
                hint: token.hint().to_owned(),
                max: MAX_RESOLVE_DEPTH,
            });
        }

        trace!(hint = token.hint(), path = %self.path_string(), "expanding deferred token");
        let produced = token.produce().map_err(|message| ResolveError::Producer {
            path: self.path_string(),
            hint: token.hint().to_owned(),
            message,
        })?;

        // Guard the recursive resolution of the produced value: meeting this
        // token again before the expansion completes is a cycle.
        self.in_flight.push(addr);
        let resolved = self.visit(&produced);
        self.in_flight.pop();
        resolved
    }

    fn path_string(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            out.push_str(&segment.to_string());
        }
        out
    }
}
