//! Delegate processor: an input Sink and an output Source joined into one unit.
//!
//! Signals received by the processor go to the input Sink. Subscribing to the
//! processor subscribes to the output Source. In between, the processor relays
//! contexts: the first non-empty context announced to it is handed to the input Sink
//! once, and every subscriber of the output side is told the processor's context
//! before it is subscribed.

use crate::context::Context;
use crate::error::FlowError;
use crate::traits::{Sink, SinkRef, Source, SourceRef, SubscriptionRef};
use std::sync::OnceLock;
use tracing::trace;

/// Joins an input Sink and an output Source.
pub struct DelegateProcessor<In, Out> {
  input: SinkRef<In>,
  output: SourceRef<Out>,
  initial: Context,
  relayed: OnceLock<Context>,
}

impl<In, Out> DelegateProcessor<In, Out> {
  /// Creates a processor feeding `input` and publishing `output`.
  ///
  /// The processor starts with the context `input` reports as current.
  pub fn new(output: SourceRef<Out>, input: SinkRef<In>) -> Self {
    let initial = input.current_context();
    Self {
      input,
      output,
      initial,
      relayed: OnceLock::new(),
    }
  }

  /// The context the processor currently holds.
  #[must_use]
  pub fn context(&self) -> Context {
    self
      .relayed
      .get()
      .cloned()
      .unwrap_or_else(|| self.initial.clone())
  }
}

impl<In, Out> Sink<In> for DelegateProcessor<In, Out> {
  fn on_subscribe(&self, subscription: SubscriptionRef<In>) {
    self.input.on_subscribe(subscription);
  }

  fn on_next(&self, value: In) {
    self.input.on_next(value);
  }

  fn on_error(&self, error: FlowError) {
    self.input.on_error(error);
  }

  fn on_complete(&self) {
    self.input.on_complete();
  }

  fn on_available(&self) {
    self.input.on_available();
  }

  fn on_context(&self, context: Context) {
    if context.is_empty() || !self.initial.is_empty() {
      return;
    }
    if self.relayed.set(context.clone()).is_ok() {
      trace!(entries = context.len(), "relaying context to input sink");
      self.input.on_context(context);
    }
  }

  fn current_context(&self) -> Context {
    self.input.current_context()
  }
}

impl<In, Out> Source<Out> for DelegateProcessor<In, Out> {
  fn subscribe_with(&self, sink: SinkRef<Out>, _context: Context) {
    sink.on_context(self.context());
    self.output.subscribe(sink);
  }
}
