//! Deferred references, resolved lazily during render.

use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A placeholder for a value not yet known at construction time, typically
/// an attribute of another resource (a generated name, a port number).
///
/// The producer is invoked lazily during a render pass, never at
/// construction, so forward references work as long as the referenced
/// attribute exists by render time. Its result is memoized: the producer
/// runs at most once per token instance, which makes repeated renders
/// idempotent even for non-pure producers.
///
/// Tokens are cheap to clone; clones share the same instance (and memo).
#[derive(Clone)]
pub struct Token(Rc<TokenInner>);

struct TokenInner {
    hint: String,
    produce: Box<dyn Fn() -> Result<Value, String>>,
    memo: RefCell<Option<Value>>,
}

impl Token {
    /// Create a token with a display hint used in error messages.
    pub fn new(hint: impl Into<String>, produce: impl Fn() -> Result<Value, String> + 'static) -> Self {
        Token(Rc::new(TokenInner {
            hint: hint.into(),
            produce: Box::new(produce),
            memo: RefCell::new(None),
        }))
    }

    pub fn hint(&self) -> &str {
        &self.0.hint
    }

    /// Invoke the producer, or return the memoized result of a previous
    /// invocation. Produced values may themselves contain further tokens;
    /// chasing those is the resolver's job.
    pub(crate) fn produce(&self) -> Result<Value, String> {
        if let Some(cached) = self.0.memo.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let value = (self.0.produce)()?;
        *self.0.memo.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// Stable per-instance address, used for cycle detection.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<u8>() as usize
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("hint", &self.0.hint).finish()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn producer_runs_at_most_once() {
        let calls = Rc::new(Cell::new(0u32));
        let counted = calls.clone();
        let token = Token::new("counted", move || {
            counted.set(counted.get() + 1);
            Ok(Value::from("v"))
        });

        assert_eq!(token.produce().unwrap(), Value::from("v"));
        assert_eq!(token.produce().unwrap(), Value::from("v"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failures_are_not_memoized() {
        let calls = Rc::new(Cell::new(0u32));
        let counted = calls.clone();
        let token = Token::new("flaky", move || {
            counted.set(counted.get() + 1);
            Err("not ready".to_owned())
        });

        assert!(token.produce().is_err());
        assert!(token.produce().is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn clones_share_identity() {
        let token = Token::new("shared", || Ok(Value::Null));
        let copy = token.clone();
        assert_eq!(token, copy);
        assert_eq!(token.addr(), copy.addr());

        let other = Token::new("shared", || Ok(Value::Null));
        assert_ne!(token, other);
    }
}
