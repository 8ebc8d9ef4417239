//! # Zip With Iterable
//!
//! Pairs each value of an upstream Source with the next item of a finite sequence and
//! emits the combiner's result.
//!
//! ## Overview
//!
//! The sequence is built once per subscription, before the upstream is subscribed:
//!
//! - a factory that fails, panics or returns no sequence errors the Sink and the
//!   upstream is never subscribed;
//! - an empty sequence completes the Sink at once, again without subscribing upstream.
//!
//! The Sink then receives the stage handle, and only after that is the upstream
//! subscribed. Requests arriving before the upstream handle wait in its slot.
//!
//! From there the stage is one-to-one, so demand passes through unchanged. The stage
//! completes as soon as either side runs out: when the upstream completes, or right
//! after the value that consumed the last sequence item. A failing sequence item or a
//! combiner that fails or returns nothing cancels the upstream and errors the Sink.
//!
//! The stage changes the value type, so it never grants fusion.

use crate::arbiter::SubscriptionSlot;
use crate::config::StageConfig;
use crate::context::Context;
use crate::error::FlowError;
use crate::hooks;
use crate::operators;
use crate::traits::{Sink, SinkRef, Source, SourceRef, Subscription, SubscriptionRef};
use std::iter::Peekable;
use std::sync::atomic::{AtomicBool, Ordering};
use crossbeam_queue::ArrayQueue;
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

/// A boxed sequence whose items may fail.
pub type BoxIter<U> = Box<dyn Iterator<Item = Result<U, FlowError>> + Send>;

/// Builds the sequence for one subscription. `Ok(None)` means no sequence was produced.
pub type SequenceFactory<U> = Arc<dyn Fn() -> Result<Option<BoxIter<U>>, FlowError> + Send + Sync>;

/// Combines an upstream value with a sequence item. `Ok(None)` means no result.
pub type Combiner<T, U, R> = Arc<dyn Fn(T, U) -> Result<Option<R>, FlowError> + Send + Sync>;

type Sequence<U> = Peekable<BoxIter<U>>;

/// A one-slot queue holding the sequence. Taking the sequence out is what grants the
/// right to advance it; it is pushed back once the step is done.
fn single<U>(sequence: Sequence<U>) -> ArrayQueue<Sequence<U>> {
  let slot = ArrayQueue::new(1);
  let _ = slot.push(sequence);
  slot
}

/// Stage zipping an upstream Source with a finite sequence.
pub struct ZipIterableStage<T, U, R> {
  upstream: SourceRef<T>,
  sequence: SequenceFactory<U>,
  combiner: Combiner<T, U, R>,
  config: StageConfig,
}

impl<T, U, R> ZipIterableStage<T, U, R> {
  /// Creates the stage.
  ///
  /// # Arguments
  ///
  /// * `upstream` - The Source whose values are paired.
  /// * `sequence` - Builds the finite sequence, once per subscription.
  /// * `combiner` - Combines one upstream value with one sequence item.
  pub fn new<S, C>(upstream: SourceRef<T>, sequence: S, combiner: C) -> Self
  where
    S: Fn() -> Result<Option<BoxIter<U>>, FlowError> + Send + Sync + 'static,
    C: Fn(T, U) -> Result<Option<R>, FlowError> + Send + Sync + 'static,
  {
    Self {
      upstream,
      sequence: Arc::new(sequence),
      combiner: Arc::new(combiner),
      config: StageConfig::default(),
    }
  }

  /// Sets the name for this stage.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config = self.config.with_name(name);
    self
  }
}

/// Reports whether the sequence has another item, surfacing a failed item as an error.
fn has_next<U>(sequence: &mut Sequence<U>) -> Result<bool, FlowError> {
  operators::guard("the zip sequence", || {
    Ok(Some(match sequence.peek() {
      None => Ok(false),
      Some(Ok(_)) => Ok(true),
      Some(Err(error)) => Err(error.clone()),
    }))
  })?
}

impl<T, U, R> Source<R> for ZipIterableStage<T, U, R>
where
  T: Send + 'static,
  U: Send + 'static,
  R: Send + 'static,
{
  fn subscribe_with(&self, sink: SinkRef<R>, context: Context) {
    let name = self.config.name_or("zip_with_iterable").to_string();
    let mut sequence = match operators::guard("the zip sequence factory returned no sequence", || {
      (self.sequence)()
    }) {
      Ok(iter) => iter.peekable(),
      Err(error) => {
        operators::error(sink.as_ref(), error);
        return;
      }
    };
    match has_next(&mut sequence) {
      Ok(true) => {}
      Ok(false) => {
        trace!(stage = %name, "empty sequence, completing without subscribing upstream");
        operators::complete(sink.as_ref());
        return;
      }
      Err(error) => {
        operators::error(sink.as_ref(), error);
        return;
      }
    }
    let stage_sink = Arc::new(ZipSink {
      actual: Arc::downgrade(&sink),
      upstream: SubscriptionSlot::new(),
      sequence: single(sequence),
      combiner: Arc::clone(&self.combiner),
      done: AtomicBool::new(false),
      name,
    });
    sink.on_subscribe(SubscriptionRef::plain(Arc::clone(&stage_sink)));
    self.upstream.subscribe_with(stage_sink, context);
  }
}

enum Step<R> {
  Emit(R, After),
  Fail(FlowError),
}

enum After {
  Continue,
  Complete,
  Fail(FlowError),
}

struct ZipSink<T, U, R> {
  actual: Weak<dyn Sink<R>>,
  upstream: SubscriptionSlot<T>,
  sequence: ArrayQueue<Sequence<U>>,
  combiner: Combiner<T, U, R>,
  done: AtomicBool,
  name: String,
}

impl<T, U, R> ZipSink<T, U, R>
where
  T: Send + 'static,
  U: Send + 'static,
  R: Send + 'static,
{
  fn step(&self, sequence: &mut Sequence<U>, value: T) -> Step<R> {
    let item = match sequence.next() {
      Some(Ok(item)) => item,
      Some(Err(error)) => return Step::Fail(error),
      None => return Step::Fail(FlowError::null("the zip sequence ended unexpectedly")),
    };
    let combiner = &self.combiner;
    let result = match operators::guard("the zip combiner returned no value", || {
      combiner(value, item)
    }) {
      Ok(result) => result,
      Err(error) => return Step::Fail(error),
    };
    let after = match has_next(sequence) {
      Ok(true) => After::Continue,
      Ok(false) => After::Complete,
      Err(error) => After::Fail(error),
    };
    Step::Emit(result, after)
  }

  /// Cancels upstream and delivers a terminal signal the stage itself decided on.
  fn finish(&self, error: Option<FlowError>) {
    if self.done.swap(true, Ordering::AcqRel) {
      if let Some(error) = error {
        hooks::error_dropped(error);
      }
      return;
    }
    self.upstream.cancel();
    self.release();
    let Some(actual) = self.actual.upgrade() else {
      return;
    };
    match error {
      Some(error) => {
        trace!(stage = %self.name, %error, "zip failed");
        actual.on_error(error);
      }
      None => {
        trace!(stage = %self.name, "zip sequence exhausted");
        actual.on_complete();
      }
    }
  }

  fn release(&self) {
    drop(self.sequence.pop());
  }
}

impl<T, U, R> Sink<T> for ZipSink<T, U, R>
where
  T: Send + 'static,
  U: Send + 'static,
  R: Send + 'static,
{
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    if self.upstream.set(subscription) && self.actual.strong_count() == 0 {
      self.upstream.cancel();
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) || self.upstream.is_cancelled() {
      hooks::next_dropped(value);
      return;
    }
    let Some(mut sequence) = self.sequence.pop() else {
      if !self.done.load(Ordering::Acquire) {
        warn!(stage = %self.name, "overlapping on_next calls");
      }
      hooks::next_dropped(value);
      return;
    };
    let step = self.step(&mut sequence, value);
    if self.sequence.push(sequence).is_err() {
      warn!(stage = %self.name, "zip sequence returned twice");
    }
    match step {
      Step::Emit(result, after) => {
        if let Some(actual) = self.actual.upgrade() {
          actual.on_next(result);
        }
        match after {
          After::Continue => {}
          After::Complete => self.finish(None),
          After::Fail(error) => self.finish(Some(error)),
        }
      }
      Step::Fail(error) => self.finish(Some(error)),
    }
  }

  fn on_error(&self, error: FlowError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::error_dropped(error);
      return;
    }
    self.release();
    if let Some(actual) = self.actual.upgrade() {
      actual.on_error(error);
    }
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    self.release();
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

impl<T, U, R> Subscription for ZipSink<T, U, R>
where
  T: Send + 'static,
  U: Send + 'static,
  R: Send + 'static,
{
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    if self.upstream.cancel() {
      trace!(stage = %self.name, "zip cancelled");
    }
  }
}
