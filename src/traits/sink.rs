//! The consumer role of the demand protocol.

use crate::context::Context;
use crate::error::FlowError;
use crate::traits::subscription::SubscriptionRef;
use std::sync::Arc;

/// Shared handle to a Sink.
pub type SinkRef<T> = Arc<dyn Sink<T>>;

/// Receives signals from exactly one Source per subscription.
///
/// In order, a Sink receives at most one `on_subscribe`, then any number of
/// `on_next` calls (bounded by what it requested), and finally at most one of
/// `on_error` or `on_complete`. Calls on one Sink from one Source never overlap.
///
/// Signals arriving after the terminal signal are protocol violations by the Source.
/// Implementations drop them (see [`crate::hooks`]); they are never delivered twice.
///
/// Sources hold their Sink weakly. Whoever subscribes a Sink keeps it alive, and the
/// Sink keeps its subscription (and so the upstream chain) alive in turn.
pub trait Sink<T>: Send + Sync {
  /// Receives the subscription handle. Called once, before any other signal.
  fn on_subscribe(&self, subscription: SubscriptionRef<T>);

  /// Receives the next value.
  fn on_next(&self, value: T);

  /// Receives the error terminal signal.
  fn on_error(&self, error: FlowError);

  /// Receives the completion terminal signal.
  fn on_complete(&self);

  /// Asynchronous fusion: the upstream queue has values ready to be polled.
  fn on_available(&self) {}

  /// An upstream stage announces the context in effect for this subscription.
  fn on_context(&self, _context: Context) {}

  /// The context this Sink subscribes with.
  fn current_context(&self) -> Context {
    Context::empty()
  }
}
