//! # Demand Accounting
//!
//! Lock-free helpers for the request counters every Source and Stage keeps.
//!
//! Requests accumulate and saturate at [`UNBOUNDED`]; once a counter reaches it, the
//! counter never moves again. Emitting values subtracts from a bounded counter only.

use crate::error::FlowError;
use crate::hooks::{self, Dropped};
use std::sync::atomic::{AtomicU64, Ordering};

/// Request amount that denotes unbounded demand.
pub const UNBOUNDED: u64 = u64::MAX;

/// Checks a request amount. Zero is reported as a protocol violation.
pub fn validate(n: u64) -> bool {
  if n == 0 {
    hooks::report(Dropped::InvalidRequest(n));
    return false;
  }
  true
}

/// Checks a request amount, returning the violation as an error instead of reporting it.
pub fn check(n: u64) -> Result<u64, FlowError> {
  if n == 0 {
    Err(FlowError::InvalidRequest(n))
  } else {
    Ok(n)
  }
}

/// Saturating addition of two request amounts.
#[must_use]
pub fn cap_add(a: u64, b: u64) -> u64 {
  a.saturating_add(b)
}

/// Adds `n` to `requested`, saturating at [`UNBOUNDED`]. Returns the previous value.
///
/// A previous value of zero tells the caller it now owns the emission loop.
pub fn add_cap(requested: &AtomicU64, n: u64) -> u64 {
  match requested.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
    if current == UNBOUNDED {
      None
    } else {
      Some(cap_add(current, n))
    }
  }) {
    Ok(previous) => previous,
    Err(unbounded) => unbounded,
  }
}

/// Subtracts `n` emitted values from `requested`. Returns the remaining demand.
///
/// Unbounded demand is left untouched.
pub fn produced(requested: &AtomicU64, n: u64) -> u64 {
  match requested.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
    if current == UNBOUNDED {
      None
    } else {
      Some(current.saturating_sub(n))
    }
  }) {
    Ok(previous) => previous.saturating_sub(n),
    Err(unbounded) => unbounded,
  }
}
