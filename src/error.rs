//! # Error Handling
//!
//! Errors that travel through a pipeline as the `Error` terminal signal, plus the
//! out-of-band protocol violations reported through [`crate::hooks`].
//!
//! ## Overview
//!
//! Errors fall into four groups:
//!
//! - **Subscription-time errors**: a factory or context merge function failed while a
//!   Sink was being subscribed. The Sink receives the error without any upstream
//!   subscription ever being created.
//! - **Runtime value errors**: a combiner failed while processing a value. The Sink
//!   receives the error and the upstream subscription is cancelled.
//! - **Null results**: a caller-supplied function produced no value
//!   ([`FlowError::NullValue`]).
//! - **Protocol violations**: a second subscription handle, a zero request. These are
//!   never delivered as a terminal signal; they are reported through the hooks.
//!
//! [`FlowError`] is cheap to clone so that the same error can be delivered
//! downstream and handed to diagnostics.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error type accepted from caller-supplied code.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error delivered through the `Error` terminal signal or reported to diagnostics.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
  /// A caller-supplied function produced an absent result where a value was expected.
  #[error("unexpected null: {0}")]
  NullValue(String),
  /// An error raised by caller-supplied code.
  #[error("{0}")]
  Failed(Arc<dyn StdError + Send + Sync>),
  /// A plain error message.
  #[error("{0}")]
  Message(String),
  /// A caller-supplied function panicked.
  #[error("operator panicked: {0}")]
  Panicked(String),
  /// A Sink received a second subscription handle while the first one was active.
  #[error("duplicate subscription: a subscription handle was already set")]
  DuplicateSubscription,
  /// A request for zero values.
  #[error("invalid request amount {0}: request must be positive")]
  InvalidRequest(u64),
  /// A single-consumer source was subscribed to by a second Sink.
  #[error("{0} allows only a single Sink")]
  SinkLimit(&'static str),
  /// Diagnostic hooks were already installed for this process.
  #[error("diagnostic hooks are already installed")]
  HooksInstalled,
}

impl FlowError {
  /// Wraps an arbitrary error raised by caller-supplied code.
  pub fn failed<E>(error: E) -> Self
  where
    E: Into<BoxError>,
  {
    FlowError::Failed(Arc::from(error.into()))
  }

  /// Creates a [`FlowError::NullValue`] describing which value was absent.
  pub fn null(what: impl Into<String>) -> Self {
    FlowError::NullValue(what.into())
  }

  /// Returns `true` if this error reports an absent value.
  #[must_use]
  pub fn is_null(&self) -> bool {
    matches!(self, FlowError::NullValue(_))
  }

  /// Returns `true` if this error was produced by a caught panic.
  #[must_use]
  pub fn is_panic(&self) -> bool {
    matches!(self, FlowError::Panicked(_))
  }

  pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
    let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "non-string panic payload".to_string()
    };
    FlowError::Panicked(message)
  }
}

impl From<&str> for FlowError {
  fn from(message: &str) -> Self {
    FlowError::Message(message.to_string())
  }
}

impl From<String> for FlowError {
  fn from(message: String) -> Self {
    FlowError::Message(message)
  }
}

impl From<std::io::Error> for FlowError {
  fn from(error: std::io::Error) -> Self {
    FlowError::failed(error)
  }
}
