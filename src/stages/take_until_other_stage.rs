//! # Take Until Other
//!
//! Relays values from a main Source until a second, independent Source signals.
//!
//! ## Overview
//!
//! Two origins can terminate the downstream Sink, possibly at the same time on
//! different threads:
//!
//! - **main**: its completion or error terminates the Sink with that signal;
//! - **other**: its first value or its completion completes the Sink, its error
//!   errors the Sink.
//!
//! Each origin owns a [`SubscriptionSlot`]. A cause first cancels its own slot; if the
//! slot was already cancelled, the cause has been superseded and is absorbed. The
//! causes that get past their slot then race on a single `done` latch, and only the
//! winner cancels the peer slot and delivers the terminal signal. Downstream
//! cancellation cancels both slots.
//!
//! The Sink receives its subscription handle before either origin is subscribed.
//! Requests made before the main subscription exists are kept by the main slot and
//! forwarded once it arrives. The other origin is subscribed first, then the main
//! one; if the other origin already fired, the main handle is cancelled as soon as it
//! arrives.
//!
//! Signals from both origins reach the Sink through a [`SerializedSink`], so a value
//! from main never overlaps the terminal signal caused by other.

use crate::arbiter::SubscriptionSlot;
use crate::config::StageConfig;
use crate::context::Context;
use crate::demand::UNBOUNDED;
use crate::error::FlowError;
use crate::hooks;
use crate::serialized::SerializedSink;
use crate::signal::Signal;
use crate::traits::{Sink, SinkRef, Source, SourceRef, Subscription, SubscriptionRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

/// Stage relaying `main` until `other` emits or terminates.
pub struct TakeUntilOtherStage<T, U> {
  main: SourceRef<T>,
  other: SourceRef<U>,
  config: StageConfig,
}

impl<T, U> TakeUntilOtherStage<T, U> {
  /// Creates the stage.
  ///
  /// # Arguments
  ///
  /// * `main` - The Source whose values are relayed.
  /// * `other` - The Source whose first signal stops the relay.
  pub fn new(main: SourceRef<T>, other: SourceRef<U>) -> Self {
    Self {
      main,
      other,
      config: StageConfig::default(),
    }
  }

  /// Sets the name for this stage.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config = self.config.with_name(name);
    self
  }
}

impl<T, U> Source<T> for TakeUntilOtherStage<T, U>
where
  T: Send + 'static,
  U: Send + 'static,
{
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    let arbiter = Arc::new(TakeUntilArbiter {
      serialized: SerializedSink::new(&sink),
      main: SubscriptionSlot::new(),
      other: SubscriptionSlot::new(),
      other_sink: OnceLock::new(),
      done: AtomicBool::new(false),
      name: self.config.name_or("take_until_other").to_string(),
    });
    let other_sink = Arc::new(OtherSink {
      arbiter: Arc::downgrade(&arbiter),
      once: AtomicBool::new(false),
    });
    let _ = arbiter.other_sink.set(Arc::clone(&other_sink));

    sink.on_subscribe(SubscriptionRef::plain(Arc::clone(&arbiter)));
    trace!(stage = %arbiter.name, "subscribing other, then main");
    self.other.subscribe_with(other_sink, context.clone());
    self.main.subscribe_with(arbiter, context);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cause {
  Main,
  Other,
}

struct TakeUntilArbiter<T, U> {
  serialized: SerializedSink<T>,
  main: SubscriptionSlot<T>,
  other: SubscriptionSlot<U>,
  other_sink: OnceLock<Arc<OtherSink<T, U>>>,
  done: AtomicBool,
  name: String,
}

impl<T, U> TakeUntilArbiter<T, U>
where
  T: Send + 'static,
  U: Send + 'static,
{
  fn terminate(&self, cause: Cause, signal: Signal<T>) {
    let own = match cause {
      Cause::Main => self.main.cancel(),
      Cause::Other => self.other.cancel(),
    };
    if !own {
      trace!(stage = %self.name, ?cause, "terminal cause superseded");
      signal.drop_signal();
      return;
    }
    if self.done.swap(true, Ordering::AcqRel) {
      trace!(stage = %self.name, ?cause, "terminal cause lost the race");
      signal.drop_signal();
      return;
    }
    match cause {
      Cause::Main => {
        self.other.cancel();
      }
      Cause::Other => {
        self.main.cancel();
      }
    }
    trace!(stage = %self.name, ?cause, "delivering terminal signal");
    self.serialized.emit(signal);
  }
}

impl<T, U> Sink<T> for TakeUntilArbiter<T, U>
where
  T: Send + 'static,
  U: Send + 'static,
{
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    self.main.set(subscription);
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) || self.main.is_cancelled() {
      hooks::next_dropped(value);
      return;
    }
    self.serialized.emit(Signal::Next(value));
  }

  fn on_error(&self, error: FlowError) {
    self.terminate(Cause::Main, Signal::Error(error));
  }

  fn on_complete(&self) {
    self.terminate(Cause::Main, Signal::Complete);
  }

  fn on_context(&self, context: Context) {
    self.serialized.on_context(context);
  }

  fn current_context(&self) -> Context {
    self.serialized.current_context()
  }
}

impl<T, U> Subscription for TakeUntilArbiter<T, U>
where
  T: Send + 'static,
  U: Send + 'static,
{
  fn request(&self, n: u64) {
    self.main.request(n);
  }

  fn cancel(&self) {
    let main = self.main.cancel();
    let other = self.other.cancel();
    if main || other {
      trace!(stage = %self.name, "cancelled by downstream");
    }
  }
}

struct OtherSink<T, U> {
  arbiter: Weak<TakeUntilArbiter<T, U>>,
  once: AtomicBool,
}

impl<T, U> OtherSink<T, U>
where
  T: Send + 'static,
  U: Send + 'static,
{
  fn fire(&self, signal: Signal<T>) {
    if self.once.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(arbiter) = self.arbiter.upgrade() {
      arbiter.terminate(Cause::Other, signal);
    }
  }
}

impl<T, U> Sink<U> for OtherSink<T, U>
where
  T: Send + 'static,
  U: Send + 'static,
{
  fn on_subscribe(&self, subscription: SubscriptionRef<U>) {
    let Some(arbiter) = self.arbiter.upgrade() else {
      subscription.cancel();
      return;
    };
    if arbiter.other.set(subscription) {
      arbiter.other.request(UNBOUNDED);
    }
  }

  fn on_next(&self, value: U) {
    drop(value);
    self.fire(Signal::Complete);
  }

  fn on_error(&self, error: FlowError) {
    if self.once.load(Ordering::Acquire) {
      hooks::error_dropped(error);
      return;
    }
    self.fire(Signal::Error(error));
  }

  fn on_complete(&self) {
    self.fire(Signal::Complete);
  }

  fn current_context(&self) -> Context {
    self
      .arbiter
      .upgrade()
      .map(|arbiter| arbiter.current_context())
      .unwrap_or_default()
  }
}
