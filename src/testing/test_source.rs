//! Manually driven Source for tests.

use crate::context::Context;
use crate::demand;
use crate::error::FlowError;
use crate::traits::{Sink, SinkRef, Source, Subscription, SubscriptionRef};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::trace;

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Source whose signals are emitted by the test, from any thread.
///
/// Every subscription receives a handle right away. The source records subscribed
/// contexts, the total amount requested and every cancel call, and emits to the most
/// recent Sink whether or not it requested anything, so tests can also play a
/// misbehaving Source.
pub struct TestSource<T> {
  inner: Arc<TestSourceInner<T>>,
}

impl<T> Clone for TestSource<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

struct TestSourceInner<T> {
  sinks: Mutex<Vec<Weak<dyn Sink<T>>>>,
  contexts: Mutex<Vec<Context>>,
  requested: AtomicU64,
  cancels: AtomicUsize,
}

struct TestSubscription<T> {
  source: Arc<TestSourceInner<T>>,
}

impl<T: Send> Subscription for TestSubscription<T> {
  fn request(&self, n: u64) {
    if demand::validate(n) {
      demand::add_cap(&self.source.requested, n);
    }
  }

  fn cancel(&self) {
    trace!("test source cancelled");
    self.source.cancels.fetch_add(1, Ordering::SeqCst);
  }
}

impl<T: Send + 'static> Default for TestSource<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> TestSource<T> {
  /// Creates a source with no subscribers.
  #[must_use]
  pub fn new() -> Self {
    Self {
      inner: Arc::new(TestSourceInner {
        sinks: Mutex::new(Vec::new()),
        contexts: Mutex::new(Vec::new()),
        requested: AtomicU64::new(0),
        cancels: AtomicUsize::new(0),
      }),
    }
  }

  fn sink(&self) -> Option<SinkRef<T>> {
    lock(&self.inner.sinks).last().and_then(Weak::upgrade)
  }

  /// Emits `value` to the current Sink.
  pub fn next(&self, value: T) {
    if let Some(sink) = self.sink() {
      sink.on_next(value);
    }
  }

  /// Completes the current Sink.
  pub fn complete(&self) {
    if let Some(sink) = self.sink() {
      sink.on_complete();
    }
  }

  /// Errors the current Sink.
  pub fn error(&self, error: impl Into<FlowError>) {
    if let Some(sink) = self.sink() {
      sink.on_error(error.into());
    }
  }

  /// Announces `context` to the current Sink.
  pub fn announce_context(&self, context: Context) {
    if let Some(sink) = self.sink() {
      sink.on_context(context);
    }
  }

  /// Number of subscriptions so far.
  #[must_use]
  pub fn subscription_count(&self) -> usize {
    lock(&self.inner.sinks).len()
  }

  /// Returns `true` if a subscribed Sink is still alive.
  #[must_use]
  pub fn has_sink(&self) -> bool {
    self.sink().is_some()
  }

  /// Contexts the source was subscribed with, in order.
  pub fn contexts(&self) -> Vec<Context> {
    lock(&self.inner.contexts).clone()
  }

  /// Total amount requested across all subscriptions, saturating at unbounded.
  #[must_use]
  pub fn requested(&self) -> u64 {
    self.inner.requested.load(Ordering::SeqCst)
  }

  /// Number of `cancel` calls that reached the source.
  #[must_use]
  pub fn cancel_count(&self) -> usize {
    self.inner.cancels.load(Ordering::SeqCst)
  }

  /// Returns `true` once any subscription was cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.cancel_count() > 0
  }
}

impl<T: Send + 'static> Source<T> for TestSource<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    lock(&self.inner.sinks).push(Arc::downgrade(&sink));
    lock(&self.inner.contexts).push(context);
    let subscription = Arc::new(TestSubscription {
      source: Arc::clone(&self.inner),
    });
    sink.on_subscribe(SubscriptionRef::plain(subscription));
  }
}
