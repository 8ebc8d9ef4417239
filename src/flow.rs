//! # Flow
//!
//! Fluent assembly of Sources and Stages.
//!
//! ## Overview
//!
//! A [`Flow`] wraps a [`SourceRef`] and builds new flows by wrapping it in stages.
//! Assembly does nothing by itself: every call to [`Flow::subscribe`] creates a fresh
//! chain of stage Sinks, one per stage, for that subscription alone.
//!
//! ## Example
//!
//! ```rust,ignore
//! use streamweave_reactive::{Flow, testing::TestSink};
//!
//! let sink = Flow::range(1, 5)
//!   .zip_with_iterable(vec![10, 20, 30, 40, 50], |a, b| a + b)
//!   .subscribe(TestSink::new());
//!
//! assert_eq!(sink.values(), vec![11, 22, 33, 44, 55]);
//! ```
//!
//! ## Keeping a Subscription Alive
//!
//! Sources hold their Sink weakly. [`Flow::subscribe`] hands the Sink back so the
//! caller decides how long the subscription lives; dropping the last reference to the
//! Sink drops the whole chain. For asynchronous Sources keep the returned value for as
//! long as values should arrive.

use crate::config::StreamConfig;
use crate::context::Context;
use crate::error::FlowError;
use crate::sinks::{self, LambdaSink, SinkStream};
use crate::sources::{ArraySource, EmptySource, ErrorSource, NeverSource, RangeSource};
use crate::stages::{
  BoxIter, ContextualizeStage, DeferStage, NextStage, TakeUntilOtherStage, ZipIterableStage,
};
use crate::traits::{Sink, SinkRef, Source, SourceRef};
use std::sync::Arc;

/// A Source assembled from other Sources and Stages.
pub struct Flow<T> {
  source: SourceRef<T>,
}

impl<T> Clone for Flow<T> {
  fn clone(&self) -> Self {
    Self {
      source: Arc::clone(&self.source),
    }
  }
}

impl Flow<i64> {
  /// Emits `count` consecutive values starting at `start`.
  pub fn range(start: i64, count: u64) -> Self {
    Flow::from_source(RangeSource::of(start, count))
  }
}

impl<T: Send + 'static> Flow<T> {
  /// Wraps any Source.
  pub fn from_source<S>(source: S) -> Self
  where
    S: Source<T> + 'static,
  {
    Self {
      source: Arc::new(source),
    }
  }

  /// Wraps a shared Source.
  pub fn from_ref(source: SourceRef<T>) -> Self {
    Self { source }
  }

  /// Emits the items of `items`, cloning them for every subscription.
  pub fn from_iter<I>(items: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Clone + Sync,
  {
    Flow::from_source(items.into_iter().collect::<ArraySource<T>>())
  }

  /// Emits `value` once.
  pub fn just(value: T) -> Self
  where
    T: Clone + Sync,
  {
    Flow::from_source(ArraySource::just(value))
  }

  /// Completes without values.
  pub fn empty() -> Self {
    Flow::from_source(EmptySource::new())
  }

  /// Fails with `error` without values.
  pub fn error(error: impl Into<FlowError>) -> Self {
    Flow::from_source(ErrorSource::new(error))
  }

  /// Never signals after subscription.
  pub fn never() -> Self {
    Flow::from_source(NeverSource::new())
  }

  /// Builds a new flow for every subscription.
  pub fn defer<F>(factory: F) -> Self
  where
    F: Fn() -> Flow<T> + Send + Sync + 'static,
  {
    Flow::try_defer(move || Ok(Some(factory().source)))
  }

  /// Builds a new Source for every subscription. The factory may fail or return
  /// nothing, and either terminates the subscriber with an error.
  pub fn try_defer<F>(factory: F) -> Self
  where
    F: Fn() -> Result<Option<SourceRef<T>>, FlowError> + Send + Sync + 'static,
  {
    Flow::from_source(DeferStage::new(factory))
  }

  /// Pairs each value with the next item of `items` using `combiner`, completing when
  /// either side runs out.
  pub fn zip_with_iterable<U, R, I, F>(self, items: I, combiner: F) -> Flow<R>
  where
    U: Send + 'static,
    R: Send + 'static,
    I: IntoIterator<Item = U> + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    self.try_zip_with_iterable(
      move || {
        let iter: BoxIter<U> = Box::new(items.clone().into_iter().map(Ok));
        Ok(Some(iter))
      },
      move |value, item| Ok(Some(combiner(value, item))),
    )
  }

  /// Fallible form of [`Flow::zip_with_iterable`]: the sequence is built per
  /// subscription, its items may fail, and the combiner may fail or return nothing.
  pub fn try_zip_with_iterable<U, R, S, F>(self, sequence: S, combiner: F) -> Flow<R>
  where
    U: Send + 'static,
    R: Send + 'static,
    S: Fn() -> Result<Option<BoxIter<U>>, FlowError> + Send + Sync + 'static,
    F: Fn(T, U) -> Result<Option<R>, FlowError> + Send + Sync + 'static,
  {
    Flow::from_source(ZipIterableStage::new(self.source, sequence, combiner))
  }

  /// Rewrites the subscription context with `merge(child, parent)`.
  pub fn contextualize<F>(self, merge: F) -> Self
  where
    F: Fn(&Context, &Context) -> Result<Context, FlowError> + Send + Sync + 'static,
  {
    self.try_contextualize(move |child, parent| merge(child, parent).map(Some))
  }

  /// Form of [`Flow::contextualize`] whose merge may return no context.
  pub fn try_contextualize<F>(self, merge: F) -> Self
  where
    F: Fn(&Context, &Context) -> Result<Option<Context>, FlowError> + Send + Sync + 'static,
  {
    Flow::from_source(ContextualizeStage::new(self.source, merge))
  }

  /// Emits only the first value, then completes.
  pub fn first(self) -> Self {
    Flow::from_source(NextStage::new(self.source))
  }

  /// Relays values until `other` emits a value or terminates.
  pub fn take_until_other<U>(self, other: Flow<U>) -> Self
  where
    U: Send + 'static,
  {
    Flow::from_source(TakeUntilOtherStage::new(self.source, other.source))
  }

  /// Subscribes `sink` and returns it.
  pub fn subscribe<S>(&self, sink: Arc<S>) -> Arc<S>
  where
    S: Sink<T> + 'static,
  {
    let sink_ref: SinkRef<T> = sink.clone();
    self.source.subscribe(sink_ref);
    sink
  }

  /// Subscribes `sink` with an explicit context and returns it.
  pub fn subscribe_with_context<S>(&self, sink: Arc<S>, context: Context) -> Arc<S>
  where
    S: Sink<T> + 'static,
  {
    let sink_ref: SinkRef<T> = sink.clone();
    self.source.subscribe_with(sink_ref, context);
    sink
  }

  /// Subscribes a [`LambdaSink`] calling `on_next` for every value.
  pub fn for_each<F>(&self, on_next: F) -> Arc<LambdaSink<T>>
  where
    F: Fn(T) + Send + Sync + 'static,
  {
    self.subscribe(LambdaSink::new(on_next).into_ref())
  }

  /// Consumes the flow as an async stream with the default configuration.
  pub fn into_stream(self) -> SinkStream<T> {
    self.into_stream_with(StreamConfig::default())
  }

  /// Consumes the flow as an async stream.
  pub fn into_stream_with(self, config: StreamConfig) -> SinkStream<T> {
    let (bridge, stream) = sinks::channel(config);
    self.source.subscribe(bridge);
    stream
  }

  /// The underlying Source.
  pub fn source(&self) -> &SourceRef<T> {
    &self.source
  }

  /// Unwraps the underlying Source.
  pub fn into_source(self) -> SourceRef<T> {
    self.source
  }
}

impl<T: Send + 'static> Source<T> for Flow<T> {
  fn subscribe_with(&self, sink: SinkRef<T>, context: Context) {
    self.source.subscribe_with(sink, context);
  }
}
