//! Callback consumer.
//!
//! [`LambdaSink`] requests unbounded demand on subscription and hands every signal to
//! a closure. A panicking value callback cancels the upstream and is routed to the
//! error callback. An error without an error callback is logged.

use crate::arbiter::SubscriptionSlot;
use crate::demand::UNBOUNDED;
use crate::error::FlowError;
use crate::hooks;
use crate::operators;
use crate::traits::{Sink, SubscriptionRef};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

type NextFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(FlowError) + Send + Sync>;
type CompleteFn = Box<dyn Fn() + Send + Sync>;

/// Sink that invokes closures for each signal.
pub struct LambdaSink<T> {
  on_next: NextFn<T>,
  on_error: Option<ErrorFn>,
  on_complete: Option<CompleteFn>,
  upstream: SubscriptionSlot<T>,
  done: AtomicBool,
}

impl<T> LambdaSink<T> {
  /// Creates a sink calling `on_next` for every value.
  pub fn new<F>(on_next: F) -> Self
  where
    F: Fn(T) + Send + Sync + 'static,
  {
    Self {
      on_next: Box::new(on_next),
      on_error: None,
      on_complete: None,
      upstream: SubscriptionSlot::new(),
      done: AtomicBool::new(false),
    }
  }

  /// Sets the callback for the error terminal signal.
  pub fn with_error<F>(mut self, on_error: F) -> Self
  where
    F: Fn(FlowError) + Send + Sync + 'static,
  {
    self.on_error = Some(Box::new(on_error));
    self
  }

  /// Sets the callback for the completion terminal signal.
  pub fn with_complete<F>(mut self, on_complete: F) -> Self
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.on_complete = Some(Box::new(on_complete));
    self
  }

  /// Wraps the sink for subscription.
  #[must_use]
  pub fn into_ref(self) -> Arc<Self> {
    Arc::new(self)
  }

  /// Cancels the upstream subscription.
  pub fn cancel(&self) {
    self.upstream.cancel();
  }

  /// Returns `true` once a terminal signal has been handled.
  #[must_use]
  pub fn is_terminated(&self) -> bool {
    self.done.load(Ordering::Acquire)
  }

  /// Returns `true` once the sink cancelled its subscription.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.upstream.is_cancelled()
  }
}

impl<T: Send> Sink<T> for LambdaSink<T> {
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    if self.upstream.set(subscription) {
      self.upstream.request(UNBOUNDED);
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::next_dropped(value);
      return;
    }
    let callback = &self.on_next;
    if let Err(error) = operators::guard("the value callback", || {
      callback(value);
      Ok(Some(()))
    }) {
      self.upstream.cancel();
      self.on_error(error);
    }
  }

  fn on_error(&self, error: FlowError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::error_dropped(error);
      return;
    }
    match &self.on_error {
      Some(callback) => callback(error),
      None => warn!(%error, "error signal without an error callback"),
    }
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::complete_dropped();
      return;
    }
    if let Some(callback) = &self.on_complete {
      callback();
    }
  }
}
