//! The producer role of the demand protocol.

use crate::context::Context;
use crate::traits::sink::SinkRef;
use std::sync::Arc;

/// Shared handle to a Source.
pub type SourceRef<T> = Arc<dyn Source<T>>;

/// Emits values to one Sink per subscription, followed by at most one terminal signal.
///
/// Every call to [`Source::subscribe_with`] creates an independent subscription: a
/// Sink that subscribes after a previous subscriber terminated or cancelled still
/// receives the signals appropriate to the Source's current state.
pub trait Source<T>: Send + Sync {
  /// Subscribes `sink` with the negotiated `context`.
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context);

  /// Subscribes `sink` with the context it reports as current.
  fn subscribe(&self, sink: SinkRef<T>) {
    let context = sink.current_context();
    self.subscribe_with(sink, context);
  }
}

impl<T, S> Source<T> for Arc<S>
where
  S: Source<T> + ?Sized,
{
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    (**self).subscribe_with(sink, context);
  }
}
