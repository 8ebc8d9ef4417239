//! # Serialized Sink
//!
//! Wraps a Sink that is fed by more than one concurrent producer so that it still
//! sees a single, non-overlapping sequence of signals with exactly one terminal.
//!
//! ## How It Works
//!
//! Producers enqueue their signal and bump a work-in-progress counter. The producer
//! that moves the counter away from zero becomes the drainer and delivers queued
//! signals until the counter returns to zero; every other producer returns at once.
//! A Sink that synchronously re-enters the wrapper (for example by requesting from
//! inside `on_next`, which makes a synchronous Source emit again) only enqueues, so
//! the stack never grows and no signal overtakes another.
//!
//! The first terminal signal to be delivered wins. Signals queued behind it, and
//! signals emitted after it, are dropped and reported through [`crate::hooks`].

use crate::context::Context;
use crate::error::FlowError;
use crate::signal::Signal;
use crate::traits::{Sink, SinkRef, SubscriptionRef};
use crossbeam_queue::SegQueue;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Sink wrapper that serializes signals from concurrent producers.
pub struct SerializedSink<T> {
  actual: Weak<dyn Sink<T>>,
  queue: SegQueue<Signal<T>>,
  wip: AtomicUsize,
  done: AtomicBool,
}

impl<T: Send> SerializedSink<T> {
  /// Wraps `actual`. The wrapper holds it weakly, like any Source would.
  pub fn new(actual: &SinkRef<T>) -> Self {
    Self {
      actual: std::sync::Arc::downgrade(actual),
      queue: SegQueue::new(),
      wip: AtomicUsize::new(0),
      done: AtomicBool::new(false),
    }
  }

  /// Returns `true` once a terminal signal has been delivered.
  #[must_use]
  pub fn is_terminated(&self) -> bool {
    self.done.load(Ordering::Acquire)
  }

  /// Enqueues `signal` and drains if no other thread is draining.
  pub fn emit(&self, signal: Signal<T>) {
    if self.done.load(Ordering::Acquire) {
      signal.drop_signal();
      return;
    }
    if self
      .wip
      .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      self.deliver(signal);
    } else {
      self.queue.push(signal);
      if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
        return;
      }
    }
    self.drain();
  }

  fn drain(&self) {
    let mut missed = 1;
    loop {
      while let Some(signal) = self.queue.pop() {
        self.deliver(signal);
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }

  fn deliver(&self, signal: Signal<T>) {
    if self.done.load(Ordering::Acquire) {
      signal.drop_signal();
      return;
    }
    let Some(actual) = self.actual.upgrade() else {
      signal.drop_signal();
      return;
    };
    match signal {
      Signal::Next(value) => actual.on_next(value),
      Signal::Error(error) => {
        if self.done.swap(true, Ordering::AcqRel) {
          crate::hooks::error_dropped(error);
        } else {
          actual.on_error(error);
        }
      }
      Signal::Complete => {
        if self.done.swap(true, Ordering::AcqRel) {
          crate::hooks::complete_dropped();
        } else {
          actual.on_complete();
        }
      }
    }
  }
}

impl<T: Send> Sink<T> for SerializedSink<T> {
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    match self.actual.upgrade() {
      Some(actual) => actual.on_subscribe(subscription),
      None => subscription.cancel(),
    }
  }

  fn on_next(&self, value: T) {
    self.emit(Signal::Next(value));
  }

  fn on_error(&self, error: FlowError) {
    self.emit(Signal::Error(error));
  }

  fn on_complete(&self) {
    self.emit(Signal::Complete);
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
