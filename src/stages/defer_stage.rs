//! Deferred construction: builds a fresh Source for every subscription.
//!
//! [`DeferStage`] holds a factory and invokes it once per subscription. The Source it
//! returns is subscribed to with the Sink and the negotiated context, and is never
//! cached. A factory that fails, panics or returns no Source terminates the Sink with
//! an error before any upstream subscription exists.

use crate::config::StageConfig;
use crate::context::Context;
use crate::error::FlowError;
use crate::operators;
use crate::traits::{SinkRef, Source, SourceRef};
use std::sync::Arc;
use tracing::trace;

/// Factory invoked once per subscription. `Ok(None)` means no Source was produced.
pub type SourceFactory<T> = Arc<dyn Fn() -> Result<Option<SourceRef<T>>, FlowError> + Send + Sync>;

/// Source that subscribes each Sink to a freshly built Source.
pub struct DeferStage<T> {
  factory: SourceFactory<T>,
  config: StageConfig,
}

impl<T> Clone for DeferStage<T> {
  fn clone(&self) -> Self {
    Self {
      factory: Arc::clone(&self.factory),
      config: self.config.clone(),
    }
  }
}

impl<T> DeferStage<T> {
  /// Creates a deferred stage around `factory`.
  pub fn new<F>(factory: F) -> Self
  where
    F: Fn() -> Result<Option<SourceRef<T>>, FlowError> + Send + Sync + 'static,
  {
    Self {
      factory: Arc::new(factory),
      config: StageConfig::default(),
    }
  }

  /// Sets the name for this stage.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.config = self.config.with_name(name);
    self
  }

  /// The stage configuration.
  pub fn config(&self) -> &StageConfig {
    &self.config
  }
}

impl<T> Source<T> for DeferStage<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    let stage = self.config.name_or("defer");
    match operators::guard("the deferred factory returned no source", || (self.factory)()) {
      Ok(source) => {
        trace!(stage, "subscribing to deferred source");
        source.subscribe_with(sink, context);
      }
      Err(error) => {
        trace!(stage, %error, "deferred factory failed");
        operators::error(sink.as_ref(), error);
      }
    }
  }
}
