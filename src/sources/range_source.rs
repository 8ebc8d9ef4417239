//! Range source: emits consecutive `i64` values.
//!
//! The source honours backpressure and grants synchronous fusion, in which case the
//! downstream Sink polls the remaining values directly.

use crate::context::Context;
use crate::demand::{self, UNBOUNDED};
use crate::operators;
use crate::traits::{
  FusionMode, QueueSubscription, Sink, SinkRef, Source, Subscription, SubscriptionRef,
};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Emits every value of a half-open `i64` range, then completes.
#[derive(Debug, Clone)]
pub struct RangeSource {
  range: Range<i64>,
}

impl RangeSource {
  /// Creates a source emitting `range.start..range.end`.
  pub fn new(range: Range<i64>) -> Self {
    Self { range }
  }

  /// Creates a source emitting `count` values starting at `start`.
  ///
  /// The end of the range saturates at `i64::MAX`.
  pub fn of(start: i64, count: u64) -> Self {
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    Self::new(start..start.saturating_add(count))
  }
}

impl Source<i64> for RangeSource {
  fn subscribe_with(&self, sink: SinkRef<i64>, _context: Context) {
    if self.range.is_empty() {
      operators::complete(sink.as_ref());
      return;
    }
    trace!(start = self.range.start, end = self.range.end, "range subscribe");
    let subscription = Arc::new(RangeSubscription {
      sink: Arc::downgrade(&sink),
      end: self.range.end,
      index: AtomicI64::new(self.range.start),
      requested: AtomicU64::new(0),
      cancelled: AtomicBool::new(false),
      fused: AtomicBool::new(false),
    });
    sink.on_subscribe(SubscriptionRef::fuseable(subscription));
  }
}

struct RangeSubscription {
  sink: Weak<dyn Sink<i64>>,
  end: i64,
  index: AtomicI64,
  requested: AtomicU64,
  cancelled: AtomicBool,
  fused: AtomicBool,
}

impl RangeSubscription {
  fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }

  fn fast_path(&self) {
    let Some(sink) = self.sink.upgrade() else {
      self.cancel();
      return;
    };
    let mut i = self.index.load(Ordering::Acquire);
    while i != self.end {
      if self.is_cancelled() {
        return;
      }
      sink.on_next(i);
      i += 1;
    }
    self.index.store(i, Ordering::Release);
    if self.is_cancelled() {
      return;
    }
    sink.on_complete();
  }

  fn slow_path(&self, mut n: u64) {
    let Some(sink) = self.sink.upgrade() else {
      self.cancel();
      return;
    };
    let mut emitted = 0u64;
    let mut i = self.index.load(Ordering::Acquire);
    loop {
      while emitted != n && i != self.end {
        if self.is_cancelled() {
          return;
        }
        sink.on_next(i);
        emitted += 1;
        i += 1;
      }
      if self.is_cancelled() {
        return;
      }
      if i == self.end {
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

impl Subscription for RangeSubscription {
  fn request(&self, n: u64) {
    if !demand::validate(n) || self.fused.load(Ordering::Acquire) {
      return;
    }
    if demand::add_cap(&self.requested, n) == 0 {
      if n == UNBOUNDED {
        self.fast_path();
      } else {
        self.slow_path(n);
      }
    }
  }

  fn cancel(&self) {
    if !self.cancelled.swap(true, Ordering::AcqRel) {
      trace!("range cancelled");
    }
  }
}

impl QueueSubscription<i64> for RangeSubscription {
  fn request_fusion(&self, requested: FusionMode) -> FusionMode {
    if requested.accepts(FusionMode::Sync) {
      self.fused.store(true, Ordering::Release);
      FusionMode::Sync
    } else {
      FusionMode::None
    }
  }

  fn poll(&self) -> Result<Option<i64>, crate::error::FlowError> {
    let i = self.index.load(Ordering::Acquire);
    if i == self.end {
      return Ok(None);
    }
    self.index.store(i + 1, Ordering::Release);
    Ok(Some(i))
  }

  fn is_empty(&self) -> bool {
    self.index.load(Ordering::Acquire) == self.end
  }

  fn clear(&self) {
    self.index.store(self.end, Ordering::Release);
  }

  fn size(&self) -> usize {
    let remaining = self.end.abs_diff(self.index.load(Ordering::Acquire));
    usize::try_from(remaining).unwrap_or(usize::MAX)
  }
}
