//! Reified protocol signals.

use crate::error::FlowError;
use crate::hooks;

/// A value or terminal signal, reified so it can be queued.
#[derive(Debug, Clone)]
pub enum Signal<T> {
  /// A value.
  Next(T),
  /// The error terminal signal.
  Error(FlowError),
  /// The completion terminal signal.
  Complete,
}

impl<T> Signal<T> {
  /// Returns `true` for `Error` and `Complete`.
  #[must_use]
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Signal::Next(_))
  }

  /// Reports the signal to the diagnostic hooks and discards it.
  pub fn drop_signal(self) {
    match self {
      Signal::Next(value) => hooks::next_dropped(value),
      Signal::Error(error) => hooks::error_dropped(error),
      Signal::Complete => hooks::complete_dropped(),
    }
  }
}
