//! # Diagnostic Hooks
//!
//! Signals that cannot be delivered are dropped: a value after cancellation, a second
//! terminal signal, a second subscription handle, a zero request. Dropping is the
//! default and needs no setup; every drop is also emitted as a `tracing` event.
//!
//! A process can install one [`DroppedHook`] to observe drops, for example to count
//! protocol violations in tests or to feed a metrics system.
//!
//! ```rust,ignore
//! use streamweave_reactive::hooks::{self, Dropped};
//!
//! hooks::install(|dropped: &Dropped| {
//!   eprintln!("dropped: {:?}", dropped);
//! })?;
//! ```

use crate::error::FlowError;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// A signal that was dropped instead of delivered.
#[derive(Debug, Clone)]
pub enum Dropped {
  /// A value arrived after cancellation or termination.
  Next {
    /// Type name of the dropped value.
    type_name: &'static str,
  },
  /// An error arrived after cancellation or termination.
  Error(FlowError),
  /// A completion arrived after cancellation or termination.
  Complete,
  /// A second subscription handle was offered to a Sink.
  DuplicateSubscription,
  /// A request for zero values.
  InvalidRequest(u64),
}

/// Callback invoked for every dropped signal.
pub type DroppedHook = Arc<dyn Fn(&Dropped) + Send + Sync>;

static HOOK: OnceLock<DroppedHook> = OnceLock::new();

/// Installs the process-wide hook. Only the first installation succeeds.
pub fn install<F>(hook: F) -> Result<(), FlowError>
where
  F: Fn(&Dropped) + Send + Sync + 'static,
{
  HOOK
    .set(Arc::new(hook))
    .map_err(|_| FlowError::HooksInstalled)
}

/// Returns `true` once a hook has been installed.
#[must_use]
pub fn is_installed() -> bool {
  HOOK.get().is_some()
}

/// Reports a dropped signal to tracing and to the installed hook.
pub fn report(dropped: Dropped) {
  match &dropped {
    Dropped::DuplicateSubscription | Dropped::InvalidRequest(_) => {
      warn!(?dropped, "protocol violation")
    }
    _ => debug!(?dropped, "signal dropped"),
  }
  if let Some(hook) = HOOK.get() {
    hook(&dropped);
  }
}

/// Drops a value that can no longer be delivered.
pub fn next_dropped<T>(value: T) {
  drop(value);
  report(Dropped::Next {
    type_name: std::any::type_name::<T>(),
  });
}

/// Drops an error that can no longer be delivered.
pub fn error_dropped(error: FlowError) {
  report(Dropped::Error(error));
}

/// Drops a completion that can no longer be delivered.
pub fn complete_dropped() {
  report(Dropped::Complete);
}

/// Reports a second subscription handle.
pub fn duplicate_subscription() {
  report(Dropped::DuplicateSubscription);
}
