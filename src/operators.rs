//! # Protocol Helpers
//!
//! Small building blocks shared by Sources and Stages.
//!
//! - [`EmptySubscription`]: a handle for Sinks that are terminated right away.
//! - [`error`] / [`complete`]: terminate a Sink that has not been subscribed yet.
//! - [`guard`]: the single call site for caller-supplied functions. Returned errors,
//!   absent results and panics all come back as a [`FlowError`] so that nothing a
//!   caller supplies can escape the protocol machinery.

use crate::error::FlowError;
use crate::traits::{Sink, Subscription, SubscriptionRef};
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

/// Subscription that ignores requests and cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubscription;

impl Subscription for EmptySubscription {
  fn request(&self, _n: u64) {}

  fn cancel(&self) {}
}

/// Delivers `on_subscribe(empty)` followed by `on_error(error)`.
pub fn error<T>(sink: &dyn Sink<T>, error: FlowError) {
  trace!(%error, "terminating sink with error before subscription");
  sink.on_subscribe(SubscriptionRef::empty());
  sink.on_error(error);
}

/// Delivers `on_subscribe(empty)` followed by `on_complete()`.
pub fn complete<T>(sink: &dyn Sink<T>) {
  trace!("completing sink before subscription");
  sink.on_subscribe(SubscriptionRef::empty());
  sink.on_complete();
}

/// Runs a caller-supplied function.
///
/// `Ok(None)` becomes [`FlowError::NullValue`] naming `what`; a panic becomes
/// [`FlowError::Panicked`].
pub fn guard<R, F>(what: &str, f: F) -> Result<R, FlowError>
where
  F: FnOnce() -> Result<Option<R>, FlowError>,
{
  match panic::catch_unwind(AssertUnwindSafe(f)) {
    Ok(Ok(Some(value))) => Ok(value),
    Ok(Ok(None)) => Err(FlowError::null(what)),
    Ok(Err(error)) => Err(error),
    Err(payload) => Err(FlowError::from_panic(payload)),
  }
}
