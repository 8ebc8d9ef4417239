//! Array source: emits the items of an in-memory collection in order.
//!
//! The items are shared between subscriptions and cloned on emission, so one
//! [`ArraySource`] can be subscribed to any number of times.

use crate::context::Context;
use crate::demand;
use crate::error::FlowError;
use crate::operators;
use crate::traits::{
  FusionMode, QueueSubscription, Sink, SinkRef, Source, Subscription, SubscriptionRef,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Emits the items of a shared slice, then completes.
pub struct ArraySource<T> {
  items: Arc<[T]>,
}

impl<T> Clone for ArraySource<T> {
  fn clone(&self) -> Self {
    Self {
      items: Arc::clone(&self.items),
    }
  }
}

impl<T> ArraySource<T> {
  /// Creates a source over `items`.
  pub fn new(items: Vec<T>) -> Self {
    Self {
      items: Arc::from(items),
    }
  }

  /// Creates a source emitting a single item.
  pub fn just(item: T) -> Self {
    Self::new(vec![item])
  }

  /// Number of items each subscription emits.
  #[must_use]
  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// Returns `true` when the source emits nothing but completion.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl<T> FromIterator<T> for ArraySource<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

impl<T> Source<T> for ArraySource<T>
where
  T: Clone + Send + Sync + 'static,
{
  fn subscribe_with(&self, sink: SinkRef<T>, _context: Context) {
    if self.items.is_empty() {
      operators::complete(sink.as_ref());
      return;
    }
    trace!(len = self.items.len(), "array subscribe");
    let subscription = Arc::new(ArraySubscription {
      sink: Arc::downgrade(&sink),
      items: Arc::clone(&self.items),
      index: AtomicUsize::new(0),
      requested: AtomicU64::new(0),
      cancelled: AtomicBool::new(false),
      fused: AtomicBool::new(false),
    });
    sink.on_subscribe(SubscriptionRef::fuseable(subscription));
  }
}

struct ArraySubscription<T> {
  sink: Weak<dyn Sink<T>>,
  items: Arc<[T]>,
  index: AtomicUsize,
  requested: AtomicU64,
  cancelled: AtomicBool,
  fused: AtomicBool,
}

impl<T: Clone> ArraySubscription<T> {
  fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }

  fn drain(&self, mut n: u64) {
    let Some(sink) = self.sink.upgrade() else {
      self.cancelled.store(true, Ordering::Release);
      return;
    };
    let len = self.items.len();
    let mut emitted = 0u64;
    let mut i = self.index.load(Ordering::Acquire);
    loop {
      while emitted != n && i != len {
        if self.is_cancelled() {
          return;
        }
        sink.on_next(self.items[i].clone());
        emitted += 1;
        i += 1;
      }
      if self.is_cancelled() {
        return;
      }
      if i == len {
        self.index.store(i, Ordering::Release);
        sink.on_complete();
        return;
      }
      n = self.requested.load(Ordering::Acquire);
      if n == emitted {
        self.index.store(i, Ordering::Release);
        n = demand::produced(&self.requested, emitted);
        if n == 0 {
          return;
        }
        emitted = 0;
      }
    }
  }
}

impl<T> Subscription for ArraySubscription<T>
where
  T: Clone + Send + Sync,
{
  fn request(&self, n: u64) {
    if !demand::validate(n) || self.fused.load(Ordering::Acquire) {
      return;
    }
    if demand::add_cap(&self.requested, n) == 0 {
      self.drain(n);
    }
  }

  fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }
}

impl<T> QueueSubscription<T> for ArraySubscription<T>
where
  T: Clone + Send + Sync,
{
  fn request_fusion(&self, requested: FusionMode) -> FusionMode {
    if requested.accepts(FusionMode::Sync) {
      self.fused.store(true, Ordering::Release);
      FusionMode::Sync
    } else {
      FusionMode::None
    }
  }

  fn poll(&self) -> Result<Option<T>, FlowError> {
    let i = self.index.load(Ordering::Acquire);
    if i == self.items.len() {
      return Ok(None);
    }
    self.index.store(i + 1, Ordering::Release);
    Ok(Some(self.items[i].clone()))
  }

  fn is_empty(&self) -> bool {
    self.index.load(Ordering::Acquire) == self.items.len()
  }

  fn clear(&self) {
    self.index.store(self.items.len(), Ordering::Release);
  }

  fn size(&self) -> usize {
    self.items.len() - self.index.load(Ordering::Acquire)
  }
}
