//! Recording consumer for tests.

use crate::arbiter::SubscriptionSlot;
use crate::context::Context;
use crate::demand::UNBOUNDED;
use crate::error::FlowError;
use crate::traits::{FusionMode, QueueSubscription, Sink, SubscriptionRef};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for [`TestSink`].
#[derive(Debug, Clone)]
pub struct TestSinkBuilder {
  initial_request: u64,
  fusion: FusionMode,
  context: Context,
  cancel_after: Option<usize>,
  request_each: u64,
}

impl Default for TestSinkBuilder {
  fn default() -> Self {
    Self {
      initial_request: 0,
      fusion: FusionMode::None,
      context: Context::empty(),
      cancel_after: None,
      request_each: 0,
    }
  }
}

impl TestSinkBuilder {
  /// Amount requested on subscription. Zero requests nothing.
  #[must_use]
  pub fn request(mut self, n: u64) -> Self {
    self.initial_request = n;
    self
  }

  /// Fusion mode to negotiate when the handle is fuseable.
  #[must_use]
  pub fn fusion(mut self, mode: FusionMode) -> Self {
    self.fusion = mode;
    self
  }

  /// Context the sink subscribes with.
  #[must_use]
  pub fn context(mut self, context: Context) -> Self {
    self.context = context;
    self
  }

  /// Cancels the subscription after `n` values have been received.
  #[must_use]
  pub fn cancel_after(mut self, n: usize) -> Self {
    self.cancel_after = Some(n);
    self
  }

  /// Requests `n` more from inside every `on_next`, as a one-by-one consumer does.
  #[must_use]
  pub fn request_each(mut self, n: u64) -> Self {
    self.request_each = n;
    self
  }

  /// Builds the sink.
  pub fn build<T>(self) -> Arc<TestSink<T>> {
    Arc::new(TestSink {
      initial_request: self.initial_request,
      fusion: self.fusion,
      context: self.context,
      cancel_after: self.cancel_after,
      request_each: self.request_each,
      granted: OnceLock::new(),
      upstream: SubscriptionSlot::new(),
      values: Mutex::new(Vec::new()),
      errors: Mutex::new(Vec::new()),
      contexts: Mutex::new(Vec::new()),
      completions: AtomicUsize::new(0),
      subscriptions: AtomicUsize::new(0),
      after_terminal: AtomicUsize::new(0),
      draining: AtomicBool::new(false),
    })
  }
}

/// Sink that records every signal it receives.
///
/// Values, errors, completions and announced contexts are kept in arrival order.
/// Signals received after a terminal signal are still recorded, and counted by
/// [`TestSink::signals_after_terminal`], so tests can assert that none arrived.
pub struct TestSink<T> {
  initial_request: u64,
  fusion: FusionMode,
  context: Context,
  cancel_after: Option<usize>,
  request_each: u64,
  granted: OnceLock<FusionMode>,
  upstream: SubscriptionSlot<T>,
  values: Mutex<Vec<T>>,
  errors: Mutex<Vec<FlowError>>,
  contexts: Mutex<Vec<Context>>,
  completions: AtomicUsize,
  subscriptions: AtomicUsize,
  after_terminal: AtomicUsize,
  draining: AtomicBool,
}

impl TestSink<()> {
  /// Starts a builder with no initial request and no fusion.
  #[must_use]
  pub fn builder() -> TestSinkBuilder {
    TestSinkBuilder::default()
  }
}

impl<T> TestSink<T> {
  /// A sink requesting unbounded demand on subscription.
  #[must_use]
  pub fn new() -> Arc<Self> {
    TestSinkBuilder::default().request(UNBOUNDED).build()
  }

  /// A sink requesting `n` values on subscription.
  #[must_use]
  pub fn with_request(n: u64) -> Arc<Self> {
    TestSinkBuilder::default().request(n).build()
  }

  /// A sink negotiating `mode` and requesting unbounded demand.
  #[must_use]
  pub fn with_fusion(mode: FusionMode) -> Arc<Self> {
    TestSinkBuilder::default().request(UNBOUNDED).fusion(mode).build()
  }

  /// Requests `n` more values.
  pub fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  /// Cancels the subscription.
  pub fn cancel(&self) {
    self.upstream.cancel();
  }

  /// Returns `true` once the sink cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.upstream.is_cancelled()
  }

  /// The handle received in `on_subscribe`, if any.
  pub fn subscription(&self) -> Option<SubscriptionRef<T>> {
    self.upstream.active().cloned()
  }

  /// Number of `on_subscribe` calls.
  #[must_use]
  pub fn subscription_count(&self) -> usize {
    self.subscriptions.load(Ordering::SeqCst)
  }

  /// The fusion mode granted by the upstream, if negotiated.
  #[must_use]
  pub fn granted_fusion(&self) -> Option<FusionMode> {
    self.granted.get().copied()
  }

  /// Number of values received.
  #[must_use]
  pub fn value_count(&self) -> usize {
    lock(&self.values).len()
  }

  /// Number of completion signals received.
  #[must_use]
  pub fn completions(&self) -> usize {
    self.completions.load(Ordering::SeqCst)
  }

  /// Returns `true` if at least one completion was received.
  #[must_use]
  pub fn is_completed(&self) -> bool {
    self.completions() > 0
  }

  /// Errors received.
  pub fn errors(&self) -> Vec<FlowError> {
    lock(&self.errors).clone()
  }

  /// The first error received.
  pub fn error(&self) -> Option<FlowError> {
    lock(&self.errors).first().cloned()
  }

  /// Returns `true` if at least one error was received.
  #[must_use]
  pub fn is_errored(&self) -> bool {
    !lock(&self.errors).is_empty()
  }

  /// Total number of terminal signals received.
  #[must_use]
  pub fn terminal_count(&self) -> usize {
    self.completions() + lock(&self.errors).len()
  }

  /// Returns `true` once any terminal signal was received.
  #[must_use]
  pub fn is_terminated(&self) -> bool {
    self.terminal_count() > 0
  }

  /// Number of signals that arrived after the first terminal signal.
  #[must_use]
  pub fn signals_after_terminal(&self) -> usize {
    self.after_terminal.load(Ordering::SeqCst)
  }

  /// Contexts announced through `on_context`, in order.
  pub fn contexts(&self) -> Vec<Context> {
    lock(&self.contexts).clone()
  }

  /// The most recently announced context.
  pub fn last_context(&self) -> Option<Context> {
    lock(&self.contexts).last().cloned()
  }

  fn note_after_terminal(&self) {
    if self.is_terminated() {
      self.after_terminal.fetch_add(1, Ordering::SeqCst);
    }
  }

  fn record(&self, value: T) {
    self.note_after_terminal();
    let count = {
      let mut values = lock(&self.values);
      values.push(value);
      values.len()
    };
    if self.cancel_after == Some(count) {
      self.cancel();
    }
  }

  fn record_error(&self, error: FlowError) {
    self.note_after_terminal();
    lock(&self.errors).push(error);
  }

  fn record_completion(&self) {
    self.note_after_terminal();
    self.completions.fetch_add(1, Ordering::SeqCst);
  }

  /// Polls the fused queue until it is empty. With synchronous fusion an exhausted
  /// queue is the completion.
  fn drain(&self, queue: &Arc<dyn QueueSubscription<T>>, sync: bool) {
    if self.draining.swap(true, Ordering::AcqRel) {
      return;
    }
    loop {
      if self.upstream.is_cancelled() {
        queue.clear();
        break;
      }
      match queue.poll() {
        Ok(Some(value)) => self.record(value),
        Ok(None) => {
          if sync {
            self.record_completion();
          }
          break;
        }
        Err(error) => {
          self.upstream.cancel();
          self.record_error(error);
          break;
        }
      }
    }
    self.draining.store(false, Ordering::Release);
  }
}

impl<T: Send + 'static> Sink<T> for TestSink<T> {
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    self.subscriptions.fetch_add(1, Ordering::SeqCst);
    if !self.upstream.set(subscription.clone()) {
      return;
    }
    if self.fusion != FusionMode::None {
      if let Some(queue) = subscription.queue() {
        let granted = subscription.request_fusion(self.fusion);
        let _ = self.granted.set(granted);
        if granted == FusionMode::Sync {
          self.drain(queue, true);
          return;
        }
      }
    }
    if self.initial_request > 0 {
      self.upstream.request(self.initial_request);
    }
  }

  fn on_next(&self, value: T) {
    self.record(value);
    if self.request_each > 0 && !self.is_terminated() {
      self.upstream.request(self.request_each);
    }
  }

  fn on_error(&self, error: FlowError) {
    self.record_error(error);
  }

  fn on_complete(&self) {
    self.record_completion();
  }

  fn on_available(&self) {
    let Some(subscription) = self.upstream.active() else {
      return;
    };
    if let Some(queue) = subscription.queue() {
      self.drain(queue, false);
    }
  }

  fn on_context(&self, context: Context) {
    lock(&self.contexts).push(context);
  }

  fn current_context(&self) -> Context {
    self.context.clone()
  }
}

impl<T: Clone> TestSink<T> {
  /// Values received, in order.
  pub fn values(&self) -> Vec<T> {
    lock(&self.values).clone()
  }
}
