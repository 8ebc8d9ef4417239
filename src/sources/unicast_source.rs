//! # Unicast Source
//!
//! A queue that producers on any thread push into and exactly one Sink consumes.
//!
//! ## Overview
//!
//! [`UnicastSource`] buffers values until the Sink requests them. It is the one Source
//! in the crate that grants [`FusionMode::Async`]: a fused Sink is told through
//! `on_available` that values are ready and polls the queue itself, while
//! terminal signals are still delivered as `on_complete` / `on_error`.
//!
//! The first Sink to subscribe wins; every later Sink receives
//! [`FlowError::SinkLimit`] right after subscription.
//!
//! ## Example
//!
//! ```rust,ignore
//! let source = UnicastSource::new();
//! let producer = source.clone();
//! std::thread::spawn(move || {
//!   producer.emit(1);
//!   producer.complete();
//! });
//! ```

use crate::context::Context;
use crate::demand::{self, UNBOUNDED};
use crate::error::FlowError;
use crate::hooks;
use crate::operators;
use crate::traits::{
  FusionMode, QueueSubscription, Sink, SinkRef, Source, Subscription, SubscriptionRef,
};
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

const LIVE: u8 = 0;
const COMPLETED: u8 = 1;
const ERRORING: u8 = 2;
const ERRORED: u8 = 3;

/// Single-consumer source fed from any thread.
pub struct UnicastSource<T> {
  inner: Arc<UnicastInner<T>>,
}

impl<T> Clone for UnicastSource<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T: Send + 'static> Default for UnicastSource<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> UnicastSource<T> {
  /// Creates an empty, live source.
  #[must_use]
  pub fn new() -> Self {
    Self {
      inner: Arc::new(UnicastInner {
        queue: SegQueue::new(),
        sink: OnceLock::new(),
        subscribed: AtomicBool::new(false),
        requested: AtomicU64::new(0),
        wip: AtomicUsize::new(0),
        cancelled: AtomicBool::new(false),
        fused: AtomicBool::new(false),
        state: AtomicU8::new(LIVE),
        error: OnceLock::new(),
        terminated: AtomicBool::new(false),
      }),
    }
  }

  /// Queues `value` for the Sink. Values emitted after a terminal signal or after
  /// cancellation are dropped.
  pub fn emit(&self, value: T) {
    let inner = &self.inner;
    if inner.state.load(Ordering::Acquire) != LIVE || inner.cancelled.load(Ordering::Acquire) {
      hooks::next_dropped(value);
      return;
    }
    inner.queue.push(value);
    inner.drain();
  }

  /// Completes the source once every queued value has been delivered.
  pub fn complete(&self) {
    let inner = &self.inner;
    if inner
      .state
      .compare_exchange(LIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      hooks::complete_dropped();
      return;
    }
    trace!("unicast complete");
    inner.drain();
  }

  /// Fails the source once every queued value has been delivered.
  pub fn fail(&self, error: impl Into<FlowError>) {
    let inner = &self.inner;
    let error = error.into();
    if inner
      .state
      .compare_exchange(LIVE, ERRORING, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      hooks::error_dropped(error);
      return;
    }
    trace!(%error, "unicast fail");
    let _ = inner.error.set(error);
    inner.state.store(ERRORED, Ordering::Release);
    inner.drain();
  }

  /// Returns `true` once `complete` or `fail` has been called.
  #[must_use]
  pub fn is_terminated(&self) -> bool {
    self.inner.state.load(Ordering::Acquire) != LIVE
  }

  /// Returns `true` once a Sink has subscribed.
  #[must_use]
  pub fn has_sink(&self) -> bool {
    self.inner.subscribed.load(Ordering::Acquire)
  }

  /// Returns `true` once the Sink cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.inner.cancelled.load(Ordering::Acquire)
  }

  /// Number of values waiting for the Sink.
  #[must_use]
  pub fn buffered(&self) -> usize {
    self.inner.queue.len()
  }
}

impl<T: Send + 'static> Source<T> for UnicastSource<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, _context: Context) {
    let inner = &self.inner;
    if inner.subscribed.swap(true, Ordering::AcqRel) {
      operators::error(sink.as_ref(), FlowError::SinkLimit("UnicastSource"));
      return;
    }
    trace!("unicast subscribe");
    sink.on_subscribe(SubscriptionRef::fuseable(Arc::clone(inner)));
    let _ = inner.sink.set(Arc::downgrade(&sink));
    if inner.cancelled.load(Ordering::Acquire) {
      inner.clear_queue();
    } else {
      inner.drain();
    }
  }
}

struct UnicastInner<T> {
  queue: SegQueue<T>,
  sink: OnceLock<Weak<dyn Sink<T>>>,
  subscribed: AtomicBool,
  requested: AtomicU64,
  wip: AtomicUsize,
  cancelled: AtomicBool,
  fused: AtomicBool,
  state: AtomicU8,
  error: OnceLock<FlowError>,
  terminated: AtomicBool,
}

impl<T: Send> UnicastInner<T> {
  fn is_done(&self) -> bool {
    matches!(self.state.load(Ordering::Acquire), COMPLETED | ERRORED)
  }

  fn clear_queue(&self) {
    while self.queue.pop().is_some() {}
  }

  /// Reports values that raced past the terminal signal. A fused Sink polls the queue
  /// itself, so this only applies to regular delivery.
  fn discard_late(&self) {
    while let Some(value) = self.queue.pop() {
      hooks::next_dropped(value);
    }
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      if self.terminated.load(Ordering::Acquire) && !self.fused.load(Ordering::Acquire) {
        self.discard_late();
      } else if let Some(weak) = self.sink.get() {
        match weak.upgrade() {
          Some(sink) if self.fused.load(Ordering::Acquire) => self.drain_fused(sink.as_ref()),
          Some(sink) => self.drain_regular(sink.as_ref()),
          None => {
            self.cancelled.store(true, Ordering::Release);
            self.clear_queue();
          }
        }
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }

  fn drain_regular(&self, sink: &dyn Sink<T>) {
    let requested = self.requested.load(Ordering::Acquire);
    let mut emitted = 0u64;
    while emitted != requested {
      if self.cancelled.load(Ordering::Acquire) {
        self.clear_queue();
        return;
      }
      let done = self.is_done();
      match self.queue.pop() {
        Some(value) => {
          sink.on_next(value);
          emitted += 1;
        }
        None => {
          if done {
            self.terminate(sink);
            return;
          }
          break;
        }
      }
    }
    if emitted == requested {
      if self.cancelled.load(Ordering::Acquire) {
        self.clear_queue();
        return;
      }
      if self.is_done() && self.queue.is_empty() {
        self.terminate(sink);
        return;
      }
    }
    if emitted != 0 && requested != UNBOUNDED {
      demand::produced(&self.requested, emitted);
    }
  }

  fn drain_fused(&self, sink: &dyn Sink<T>) {
    if self.cancelled.load(Ordering::Acquire) {
      self.clear_queue();
      return;
    }
    let done = self.is_done();
    sink.on_available();
    if done {
      self.terminate(sink);
    }
  }

  fn terminate(&self, sink: &dyn Sink<T>) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      return;
    }
    match self.error.get() {
      Some(error) if self.state.load(Ordering::Acquire) == ERRORED => sink.on_error(error.clone()),
      _ => sink.on_complete(),
    }
  }
}

impl<T: Send> Subscription for UnicastInner<T> {
  fn request(&self, n: u64) {
    if !demand::validate(n) {
      return;
    }
    demand::add_cap(&self.requested, n);
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    trace!("unicast cancelled");
    if !self.fused.load(Ordering::Acquire) {
      self.clear_queue();
    }
  }
}

impl<T: Send> QueueSubscription<T> for UnicastInner<T> {
  fn request_fusion(&self, requested: FusionMode) -> FusionMode {
    if requested.accepts(FusionMode::Async) {
      trace!("unicast granted async fusion");
      self.fused.store(true, Ordering::Release);
      FusionMode::Async
    } else {
      FusionMode::None
    }
  }

  fn poll(&self) -> Result<Option<T>, FlowError> {
    Ok(self.queue.pop())
  }

  fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  fn clear(&self) {
    self.clear_queue();
  }

  fn size(&self) -> usize {
    self.queue.len()
  }
}
