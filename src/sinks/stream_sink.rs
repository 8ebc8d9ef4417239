//! # Stream Bridge
//!
//! Consumes a pipeline as an async [`futures::Stream`].
//!
//! ## Overview
//!
//! [`channel`] returns a [`StreamBridge`], the Sink side, and a [`SinkStream`], the
//! `Stream` side, connected by an unbounded tokio channel. Demand keeps the channel
//! bounded in practice:
//!
//! - on subscription the bridge requests `prefetch` values;
//! - after the stream has yielded `replenish_threshold` values it requests that many
//!   more;
//! - dropping the stream cancels the upstream subscription.
//!
//! The stream yields `Ok(value)` for each value, a final `Err(error)` if the pipeline
//! fails, and then ends.

use crate::arbiter::SubscriptionSlot;
use crate::config::StreamConfig;
use crate::context::Context;
use crate::error::FlowError;
use crate::hooks;
use crate::signal::Signal;
use crate::traits::{Sink, SubscriptionRef};
use futures::Stream;
use pin_project::{pin_project, pinned_drop};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{self, Poll};
use tokio::sync::mpsc;
use tracing::trace;

/// Creates a connected bridge and stream.
pub fn channel<T: Send + 'static>(config: StreamConfig) -> (Arc<StreamBridge<T>>, SinkStream<T>) {
  channel_with_context(config, Context::empty())
}

/// Creates a connected bridge and stream whose bridge subscribes with `context`.
pub fn channel_with_context<T: Send + 'static>(
  config: StreamConfig,
  context: Context,
) -> (Arc<StreamBridge<T>>, SinkStream<T>) {
  let (sender, receiver) = mpsc::unbounded_channel();
  let threshold = config.replenish_threshold();
  let bridge = Arc::new(StreamBridge {
    sender,
    upstream: SubscriptionSlot::new(),
    done: AtomicBool::new(false),
    context,
    config,
  });
  let stream = SinkStream {
    bridge: Arc::clone(&bridge),
    receiver,
    threshold,
    consumed: 0,
    finished: false,
  };
  (bridge, stream)
}

/// Sink side of the bridge: forwards signals into the channel.
pub struct StreamBridge<T> {
  sender: mpsc::UnboundedSender<Signal<T>>,
  upstream: SubscriptionSlot<T>,
  done: AtomicBool,
  context: Context,
  config: StreamConfig,
}

impl<T> StreamBridge<T> {
  /// The bridge configuration.
  pub fn config(&self) -> &StreamConfig {
    &self.config
  }

  fn cancel(&self) {
    if self.upstream.cancel() {
      let stream = self.config.name.as_deref().unwrap_or("stream");
      trace!(stream, "stream dropped, cancelling upstream");
    }
  }

  fn terminate(&self, signal: Signal<T>) {
    if self.done.swap(true, Ordering::AcqRel) {
      signal.drop_signal();
      return;
    }
    if let Err(mpsc::error::SendError(signal)) = self.sender.send(signal) {
      signal.drop_signal();
    }
  }
}

impl<T: Send> Sink<T> for StreamBridge<T> {
  fn on_subscribe(&self, subscription: SubscriptionRef<T>) {
    if self.upstream.set(subscription) {
      self.upstream.request(self.config.prefetch);
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::next_dropped(value);
      return;
    }
    if let Err(mpsc::error::SendError(signal)) = self.sender.send(Signal::Next(value)) {
      self.upstream.cancel();
      signal.drop_signal();
    }
  }

  fn on_error(&self, error: FlowError) {
    self.terminate(Signal::Error(error));
  }

  fn on_complete(&self) {
    self.terminate(Signal::Complete);
  }

  fn current_context(&self) -> Context {
    self.context.clone()
  }
}

/// Stream side of the bridge.
#[pin_project(PinnedDrop)]
pub struct SinkStream<T> {
  bridge: Arc<StreamBridge<T>>,
  receiver: mpsc::UnboundedReceiver<Signal<T>>,
  threshold: u64,
  consumed: u64,
  finished: bool,
}

impl<T> SinkStream<T> {
  /// The Sink feeding this stream.
  pub fn bridge(&self) -> &Arc<StreamBridge<T>> {
    &self.bridge
  }
}

impl<T: Send> Stream for SinkStream<T> {
  type Item = Result<T, FlowError>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.project();
    if *this.finished {
      return Poll::Ready(None);
    }
    match this.receiver.poll_recv(cx) {
      Poll::Ready(Some(Signal::Next(value))) => {
        *this.consumed += 1;
        if *this.consumed == *this.threshold {
          *this.consumed = 0;
          this.bridge.upstream.request(*this.threshold);
        }
        Poll::Ready(Some(Ok(value)))
      }
      Poll::Ready(Some(Signal::Error(error))) => {
        *this.finished = true;
        Poll::Ready(Some(Err(error)))
      }
      Poll::Ready(Some(Signal::Complete)) | Poll::Ready(None) => {
        *this.finished = true;
        Poll::Ready(None)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

#[pinned_drop]
impl<T> PinnedDrop for SinkStream<T> {
  fn drop(self: Pin<&mut Self>) {
    self.bridge.cancel();
  }
}
