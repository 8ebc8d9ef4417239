//! # Contextualize
//!
//! Rewrites the [`Context`] a subscription runs with.
//!
//! ## Overview
//!
//! The merge function receives `(child, parent)` and returns the context to use:
//!
//! - At subscribe time it runs once as `merge(subscriber_context, empty)`. If it fails,
//!   the Sink is errored and the upstream is never subscribed. If the result is a
//!   different context, the Sink is told about it through `on_context` *before* the
//!   upstream is subscribed, and the upstream is subscribed with the merged context.
//! - When the upstream later announces a context through `on_context`, the stage runs
//!   `merge(own_context, announced)` and re-announces the result downstream if it
//!   changed. A failure at that point cancels the upstream and errors the Sink.
//!
//! Values pass through untouched. The upstream subscription handle is forwarded as-is,
//! fusion capability included, so a fusing Sink polls the upstream queue directly.
//! Until that handle arrives the stage Sink keeps itself alive, and it then moves
//! that reference into the forwarded handle. An upstream may therefore call
//! `on_subscribe` late, from any thread.

use crate::arbiter::SubscriptionSlot;
use crate::config::StageConfig;
use crate::context::Context;
use crate::error::FlowError;
use crate::hooks;
use crate::operators;
use crate::traits::{Sink, SinkRef, Source, SourceRef, SubscriptionRef};
use std::sync::atomic::{AtomicBool, Ordering};
use crossbeam_queue::ArrayQueue;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Merge function: `(child, parent) -> merged`. `Ok(None)` means no context was produced.
pub type ContextMerge =
  Arc<dyn Fn(&Context, &Context) -> Result<Option<Context>, FlowError> + Send + Sync>;

/// Stage that derives the subscription context with a merge function.
pub struct ContextualizeStage<T> {
  upstream: SourceRef<T>,
  merge: ContextMerge,
  config: StageConfig,
}

impl<T> ContextualizeStage<T> {
  /// Creates the stage.
  pub fn new<F>(upstream: SourceRef<T>, merge: F) -> Self
  where
    F: Fn(&Context, &Context) -> Result<Option<Context>, FlowError> + Send + Sync + 'static,
  {
    Self {
      upstream,
      merge: Arc::new(merge),
      config: StageConfig::default(),
    }
  }

  /// Sets the name for this stage.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config = self.config.with_name(name);
    self
  }
}

fn apply(merge: &ContextMerge, child: &Context, parent: &Context) -> Result<Context, FlowError> {
  operators::guard("the context merge returned no context", || merge(child, parent))
}

impl<T> Source<T> for ContextualizeStage<T>
where
  T: Send + 'static,
{
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    let name = self.config.name_or("contextualize").to_string();
    let merged = match apply(&self.merge, &context, &Context::empty()) {
      Ok(merged) => merged,
      Err(error) => {
        trace!(stage = %name, %error, "context merge failed at subscribe");
        operators::error(sink.as_ref(), error);
        return;
      }
    };
    if !merged.ptr_eq(&context) {
      trace!(stage = %name, entries = merged.len(), "announcing merged context");
      sink.on_context(merged.clone());
    }
    let stage_sink = Arc::new(ContextualizeSink {
      actual: Arc::downgrade(&sink),
      merge: Arc::clone(&self.merge),
      context: merged.clone(),
      upstream: SubscriptionSlot::new(),
      done: AtomicBool::new(false),
      pending: ArrayQueue::new(1),
      name,
    });
    let _ = stage_sink.pending.push(Arc::clone(&stage_sink));
    self.upstream.subscribe_with(stage_sink, merged);
  }
}

struct ContextualizeSink<T> {
  actual: Weak<dyn Sink<T>>,
  merge: ContextMerge,
  context: Context,
  upstream: SubscriptionSlot<T>,
  done: AtomicBool,
  /// Self reference held from subscribe until `on_subscribe` or a terminal signal.
  pending: ArrayQueue<Arc<Self>>,
  name: String,
}

impl<T> Sink<T> for ContextualizeSink<T>
where
  T: Send + 'static,
{
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    if !self.upstream.set(subscription.clone()) {
      return;
    }
    match (self.actual.upgrade(), self.pending.pop()) {
      (Some(actual), Some(me)) => actual.on_subscribe(subscription.retain(me)),
      _ => {
        self.upstream.cancel();
      }
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::next_dropped(value);
      return;
    }
    match self.actual.upgrade() {
      Some(actual) => actual.on_next(value),
      None => hooks::next_dropped(value),
    }
  }

  fn on_error(&self, error: FlowError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::error_dropped(error);
      return;
    }
    drop(self.pending.pop());
    if let Some(actual) = self.actual.upgrade() {
      actual.on_error(error);
    }
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::complete_dropped();
      return;
    }
    drop(self.pending.pop());
    if let Some(actual) = self.actual.upgrade() {
      actual.on_complete();
    }
  }

  fn on_available(&self) {
    if let Some(actual) = self.actual.upgrade() {
      actual.on_available();
    }
  }

  fn on_context(&self, context: Context) {
    if self.done.load(Ordering::Acquire) {
      return;
    }
    match apply(&self.merge, &self.context, &context) {
      Ok(merged) => {
        if !merged.ptr_eq(&self.context) {
          trace!(stage = %self.name, "re-announcing context");
          if let Some(actual) = self.actual.upgrade() {
            actual.on_context(merged);
          }
        }
      }
      Err(error) => {
        if self.done.swap(true, Ordering::AcqRel) {
          hooks::error_dropped(error);
          return;
        }
        trace!(stage = %self.name, %error, "context merge failed");
        self.upstream.cancel();
        if let Some(actual) = self.actual.upgrade() {
          actual.on_error(error);
        }
      }
    }
  }

  fn current_context(&self) -> Context {
    self.context.clone()
  }
}
