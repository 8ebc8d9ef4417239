//! # Contextual Environment
//!
//! An immutable key/value mapping that travels alongside a subscription.
//!
//! ## Overview
//!
//! A [`Context`] is handed to a Source when a Sink subscribes to it. Stages may derive
//! a new context from the one they received, but a context is never mutated in place:
//! every write returns a new [`Context`] and leaves the original untouched. Clones are
//! cheap (a single `Arc` increment), so passing contexts around never copies entries.
//!
//! ## Identity
//!
//! Stages decide whether to re-announce a context by comparing identities with
//! [`Context::ptr_eq`], not contents. All empty contexts share one identity, and an
//! operation that changes nothing (deleting a missing key, merging an empty context)
//! returns a context identical to its receiver.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A value stored in a [`Context`].
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Immutable, structurally shared key/value mapping.
#[derive(Clone, Default)]
pub struct Context {
  entries: Option<Arc<BTreeMap<String, ContextValue>>>,
}

impl Context {
  /// Returns the distinguished zero-entry context.
  #[must_use]
  pub fn empty() -> Self {
    Self { entries: None }
  }

  /// Creates a context holding a single entry.
  pub fn of<V>(key: impl Into<String>, value: V) -> Self
  where
    V: Any + Send + Sync,
  {
    Self::empty().put(key, value)
  }

  /// Returns the value for `key` if present and of type `V`.
  pub fn get<V>(&self, key: &str) -> Option<&V>
  where
    V: Any + Send + Sync,
  {
    self.get_raw(key)?.downcast_ref::<V>()
  }

  /// Returns the type-erased value for `key`.
  pub fn get_raw(&self, key: &str) -> Option<&ContextValue> {
    self.entries.as_ref()?.get(key)
  }

  /// Returns `true` if `key` is present.
  #[must_use]
  pub fn has_key(&self, key: &str) -> bool {
    self.get_raw(key).is_some()
  }

  /// Returns a new context with `key` bound to `value`.
  pub fn put<V>(&self, key: impl Into<String>, value: V) -> Self
  where
    V: Any + Send + Sync,
  {
    self.put_raw(key, Arc::new(value))
  }

  /// Returns a new context with `key` bound to an already shared value.
  pub fn put_raw(&self, key: impl Into<String>, value: ContextValue) -> Self {
    let mut entries = self.snapshot();
    entries.insert(key.into(), value);
    Self {
      entries: Some(Arc::new(entries)),
    }
  }

  /// Returns a new context containing the entries of both, `other` winning on
  /// conflicting keys.
  pub fn put_all(&self, other: &Context) -> Self {
    match (&self.entries, &other.entries) {
      (_, None) => self.clone(),
      (None, Some(_)) => other.clone(),
      (Some(_), Some(theirs)) => {
        let mut entries = self.snapshot();
        for (key, value) in theirs.iter() {
          entries.insert(key.clone(), Arc::clone(value));
        }
        Self {
          entries: Some(Arc::new(entries)),
        }
      }
    }
  }

  /// Returns a context without `key`. Returns an identical context when `key` is absent.
  pub fn delete(&self, key: &str) -> Self {
    if !self.has_key(key) {
      return self.clone();
    }
    let mut entries = self.snapshot();
    entries.remove(key);
    if entries.is_empty() {
      Self::empty()
    } else {
      Self {
        entries: Some(Arc::new(entries)),
      }
    }
  }

  /// Number of entries.
  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.as_ref().map_or(0, |entries| entries.len())
  }

  /// Returns `true` when the context has no entries.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Iterates over the keys in sorted order.
  pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
    self
      .entries
      .iter()
      .flat_map(|entries| entries.keys().map(String::as_str))
  }

  /// Identity comparison: `true` when both handles refer to the same mapping.
  #[must_use]
  pub fn ptr_eq(&self, other: &Context) -> bool {
    match (&self.entries, &other.entries) {
      (None, None) => true,
      (Some(a), Some(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }

  fn snapshot(&self) -> BTreeMap<String, ContextValue> {
    self
      .entries
      .as_ref()
      .map(|entries| (**entries).clone())
      .unwrap_or_default()
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Context")
      .field("keys", &self.keys().collect::<Vec<_>>())
      .finish()
  }
}
