//! Sources that emit no values: [`EmptySource`], [`ErrorSource`] and [`NeverSource`].

use crate::context::Context;
use crate::error::FlowError;
use crate::operators;
use crate::traits::{SinkRef, Source, SubscriptionRef};
use std::marker::PhantomData;

/// Completes every Sink right after subscription.
pub struct EmptySource<T> {
  _marker: PhantomData<fn() -> T>,
}

impl<T> EmptySource<T> {
  /// Creates an empty source.
  #[must_use]
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }
}

impl<T> Default for EmptySource<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Source<T> for EmptySource<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, _context: Context) {
    operators::complete(sink.as_ref());
  }
}

/// Fails every Sink with the same error right after subscription.
pub struct ErrorSource<T> {
  error: FlowError,
  _marker: PhantomData<fn() -> T>,
}

impl<T> ErrorSource<T> {
  /// Creates a source that fails with `error`.
  pub fn new(error: impl Into<FlowError>) -> Self {
    Self {
      error: error.into(),
      _marker: PhantomData,
    }
  }
}

impl<T> Source<T> for ErrorSource<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, _context: Context) {
    operators::error(sink.as_ref(), self.error.clone());
  }
}

/// Subscribes every Sink and then never signals again.
pub struct NeverSource<T> {
  _marker: PhantomData<fn() -> T>,
}

impl<T> NeverSource<T> {
  /// Creates a source that never terminates.
  #[must_use]
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }
}

impl<T> Default for NeverSource<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Source<T> for NeverSource<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, _context: Context) {
    sink.on_subscribe(SubscriptionRef::empty());
  }
}
