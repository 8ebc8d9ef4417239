//! # Subscription Handles
//!
//! The channel through which a Sink requests values from, or cancels, its Source.
//!
//! ## Overview
//!
//! - [`Subscription`]: `request(n)` and `cancel()`. Requests accumulate and
//!   [`crate::demand::UNBOUNDED`] means unbounded demand. Cancelling is idempotent.
//! - [`QueueSubscription`]: the optional fusion capability. A Source that keeps its
//!   values in a queue can let the downstream Sink `poll` them directly instead of
//!   pushing each one through `on_next`.
//! - [`SubscriptionRef`]: the handle actually given to `Sink::on_subscribe`. The fusion
//!   capability is resolved once, when the handle is built, and travels with it, so a
//!   Sink never needs to inspect the concrete subscription type.
//!
//! ## Fusion Negotiation
//!
//! A Sink holding a fuseable handle calls [`SubscriptionRef::request_fusion`] with the
//! mode it can handle. The Source answers with the mode it grants:
//!
//! - [`FusionMode::Sync`]: every value is already available. The Sink polls until
//!   `poll` returns `None`, which also means completion. No signals are sent.
//! - [`FusionMode::Async`]: values arrive over time. The Source calls
//!   `Sink::on_available` whenever the Sink should poll, and still delivers
//!   `on_complete`/`on_error`.
//! - [`FusionMode::None`]: the regular push protocol applies unchanged.

use crate::error::FlowError;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Demand and cancellation channel from a Sink to its Source.
pub trait Subscription: Send + Sync {
  /// Requests `n` more values. Zero is a protocol violation and is ignored.
  fn request(&self, n: u64);

  /// Stops further signals. Calling it more than once has no further effect.
  fn cancel(&self);
}

/// Fusion mode requested by a Sink or granted by a Source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FusionMode {
  /// No fusion: the push protocol applies.
  None,
  /// Synchronous fusion: all values can be polled right away.
  Sync,
  /// Asynchronous fusion: values are polled after an `on_available` signal.
  Async,
  /// Either mode; the Source picks.
  Any,
}

impl FusionMode {
  /// Returns `true` if a Sink requesting `self` accepts a grant of `granted`.
  #[must_use]
  pub fn accepts(self, granted: FusionMode) -> bool {
    match granted {
      FusionMode::None => true,
      FusionMode::Sync => matches!(self, FusionMode::Sync | FusionMode::Any),
      FusionMode::Async => matches!(self, FusionMode::Async | FusionMode::Any),
      FusionMode::Any => false,
    }
  }

  /// Returns `true` for [`FusionMode::Sync`] and [`FusionMode::Async`].
  #[must_use]
  pub fn is_fused(self) -> bool {
    matches!(self, FusionMode::Sync | FusionMode::Async)
  }
}

/// A subscription that also exposes its buffered values as a pull queue.
pub trait QueueSubscription<T>: Subscription {
  /// Negotiates a fusion mode. Returns the granted mode, [`FusionMode::None`] when the
  /// request cannot be satisfied. Must be called at most once, before any request.
  fn request_fusion(&self, requested: FusionMode) -> FusionMode;

  /// Takes the next value, `Ok(None)` when nothing is available. Never blocks.
  fn poll(&self) -> Result<Option<T>, FlowError>;

  /// Cheap emptiness check consistent with [`QueueSubscription::poll`].
  fn is_empty(&self) -> bool;

  /// Discards all buffered values without emitting them.
  fn clear(&self);

  /// Approximate number of buffered values.
  fn size(&self) -> usize;
}

enum Handle<T> {
  Plain(Arc<dyn Subscription>),
  Fuseable(Arc<dyn QueueSubscription<T>>),
}

impl<T> Clone for Handle<T> {
  fn clone(&self) -> Self {
    match self {
      Handle::Plain(s) => Handle::Plain(Arc::clone(s)),
      Handle::Fuseable(q) => Handle::Fuseable(Arc::clone(q)),
    }
  }
}

/// The handle a Sink receives in `on_subscribe`.
///
/// A pass-through stage may forward its upstream handle unchanged. Because a Source
/// only holds its Sink weakly, such a stage [`retains`](SubscriptionRef::retain)
/// itself in the forwarded handle to stay alive for as long as the handle is held.
pub struct SubscriptionRef<T> {
  handle: Handle<T>,
  retained: Vec<Arc<dyn Any + Send + Sync>>,
}

impl<T> Clone for SubscriptionRef<T> {
  fn clone(&self) -> Self {
    Self {
      handle: self.handle.clone(),
      retained: self.retained.clone(),
    }
  }
}

impl<T> SubscriptionRef<T> {
  /// Wraps a subscription without fusion capability.
  pub fn plain<S>(subscription: Arc<S>) -> Self
  where
    S: Subscription + 'static,
  {
    Self {
      handle: Handle::Plain(subscription),
      retained: Vec::new(),
    }
  }

  /// Wraps a subscription that can be fused.
  pub fn fuseable<Q>(queue: Arc<Q>) -> Self
  where
    Q: QueueSubscription<T> + 'static,
  {
    Self {
      handle: Handle::Fuseable(queue),
      retained: Vec::new(),
    }
  }

  /// A handle that ignores requests and cancellation.
  #[must_use]
  pub fn empty() -> Self {
    Self::plain(Arc::new(crate::operators::EmptySubscription))
  }

  /// Keeps `owner` alive for as long as this handle (or a clone of it) is held.
  #[must_use]
  pub fn retain(mut self, owner: Arc<dyn Any + Send + Sync>) -> Self {
    self.retained.push(owner);
    self
  }

  /// Forwards a request to the underlying subscription.
  pub fn request(&self, n: u64) {
    match &self.handle {
      Handle::Plain(s) => s.request(n),
      Handle::Fuseable(q) => q.request(n),
    }
  }

  /// Cancels the underlying subscription.
  pub fn cancel(&self) {
    match &self.handle {
      Handle::Plain(s) => s.cancel(),
      Handle::Fuseable(q) => q.cancel(),
    }
  }

  /// The fusion capability, if the underlying subscription has one.
  pub fn queue(&self) -> Option<&Arc<dyn QueueSubscription<T>>> {
    match &self.handle {
      Handle::Plain(_) => None,
      Handle::Fuseable(q) => Some(q),
    }
  }

  /// Returns `true` if the handle carries the fusion capability.
  #[must_use]
  pub fn is_fuseable(&self) -> bool {
    self.queue().is_some()
  }

  /// Negotiates fusion; always [`FusionMode::None`] for a plain handle.
  pub fn request_fusion(&self, requested: FusionMode) -> FusionMode {
    match &self.handle {
      Handle::Plain(_) => FusionMode::None,
      Handle::Fuseable(q) => q.request_fusion(requested),
    }
  }

  /// Identity comparison of the underlying subscriptions.
  #[must_use]
  pub fn ptr_eq(&self, other: &SubscriptionRef<T>) -> bool {
    self.address() == other.address()
  }

  fn address(&self) -> *const () {
    match &self.handle {
      Handle::Plain(s) => Arc::as_ptr(s) as *const (),
      Handle::Fuseable(q) => Arc::as_ptr(q) as *const (),
    }
  }
}

impl<T> fmt::Debug for SubscriptionRef<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SubscriptionRef")
      .field("fuseable", &self.is_fuseable())
      .field("address", &self.address())
      .finish()
  }
}
