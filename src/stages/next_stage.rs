//! First-element extraction.
//!
//! [`NextStage`] emits at most the first value of its upstream, then completes. The
//! first downstream request, whatever its amount, becomes one unbounded request
//! upstream; later requests are ignored. On the first value the upstream is cancelled
//! and the stage completes on its own. A value the upstream delivers after that
//! cancellation is dropped and reported through [`crate::hooks`], never raised.
//!
//! The downstream Sink receives the stage handle before the upstream is subscribed,
//! so the stage stays owned while an upstream delivers `on_subscribe` later, possibly
//! from another thread. Requests made in the meantime wait in the upstream slot.

use crate::arbiter::SubscriptionSlot;
use crate::config::StageConfig;
use crate::context::Context;
use crate::demand::{self, UNBOUNDED};
use crate::error::FlowError;
use crate::hooks;
use crate::traits::{Sink, SinkRef, Source, SourceRef, Subscription, SubscriptionRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Stage emitting the first upstream value, or completing empty.
pub struct NextStage<T> {
  upstream: SourceRef<T>,
  config: StageConfig,
}

impl<T> NextStage<T> {
  /// Creates the stage.
  pub fn new(upstream: SourceRef<T>) -> Self {
    Self {
      upstream,
      config: StageConfig::default(),
    }
  }

  /// Sets the name for this stage.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config = self.config.with_name(name);
    self
  }
}

impl<T> Source<T> for NextStage<T>
where
  T: Send + 'static,
{
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    let stage_sink = Arc::new(NextSink {
      actual: Arc::downgrade(&sink),
      upstream: SubscriptionSlot::new(),
      requested: AtomicBool::new(false),
      done: AtomicBool::new(false),
      name: self.config.name_or("next").to_string(),
    });
    sink.on_subscribe(SubscriptionRef::plain(Arc::clone(&stage_sink)));
    self.upstream.subscribe_with(stage_sink, context);
  }
}

struct NextSink<T> {
  actual: Weak<dyn Sink<T>>,
  upstream: SubscriptionSlot<T>,
  requested: AtomicBool,
  done: AtomicBool,
  name: String,
}

impl<T> Sink<T> for NextSink<T>
where
  T: Send + 'static,
{
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    if self.upstream.set(subscription) && self.actual.strong_count() == 0 {
      self.upstream.cancel();
    }
  }

  fn on_next(&self, value: T) {
    if self.upstream.is_cancelled() || self.done.swap(true, Ordering::AcqRel) {
      hooks::next_dropped(value);
      return;
    }
    trace!(stage = %self.name, "first value received");
    self.upstream.cancel();
    if let Some(actual) = self.actual.upgrade() {
      actual.on_next(value);
      actual.on_complete();
    }
  }

  fn on_error(&self, error: FlowError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::error_dropped(error);
      return;
    }
    if let Some(actual) = self.actual.upgrade() {
      actual.on_error(error);
    }
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(actual) = self.actual.upgrade() {
      actual.on_complete();
    }
  }

  fn on_context(&self, context: Context) {
    if let Some(actual) = self.actual.upgrade() {
      actual.on_context(context);
    }
  }

  fn current_context(&self) -> Context {
    self
      .actual
      .upgrade()
      .map(|actual| actual.current_context())
      .unwrap_or_default()
  }
}

impl<T> Subscription for NextSink<T>
where
  T: Send + 'static,
{
  fn request(&self, n: u64) {
    if !demand::validate(n) {
      return;
    }
    if !self.requested.swap(true, Ordering::AcqRel) {
      self.upstream.request(UNBOUNDED);
    }
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
