//! # Terminal-Signal Arbiter
//!
//! Per-origin subscription slots for stages that can be terminated by more than one
//! upstream.
//!
//! ## Overview
//!
//! A [`SubscriptionSlot`] records the subscription handle of one upstream origin and
//! moves through three states, never backward:
//!
//! ```text
//! Unset ──set──▶ Active ──cancel──▶ Cancelled
//!   └──────────────cancel──────────────▲
//! ```
//!
//! - `set` succeeds only from `Unset`. If a cancellation raced ahead, the incoming
//!   handle is cancelled immediately and never stored as active. A second handle is
//!   cancelled and reported as a duplicate subscription.
//! - `cancel` swaps the state to `Cancelled` and cancels the previous handle if there
//!   was one. Only the call that performs the swap returns `true`; that return value is
//!   the authorization to act on a terminal decision for this origin.
//! - `request` before the handle arrives is remembered and forwarded on `set`, so a
//!   downstream Sink may request as soon as it has been subscribed.
//!
//! All transitions are single compare-and-swap or swap operations; nothing blocks.

use crate::demand;
use crate::hooks;
use crate::traits::SubscriptionRef;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use tracing::trace;

const UNSET: u8 = 0;
const ACTIVE: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable state of a [`SubscriptionSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
  /// No handle has been set and no cancellation happened.
  Unset,
  /// A handle is set and live.
  Active,
  /// The slot was cancelled; any handle it held has been cancelled.
  Cancelled,
}

/// Atomic `Unset | Active(handle) | Cancelled` slot for one upstream origin.
pub struct SubscriptionSlot<T> {
  state: AtomicU8,
  handle: OnceLock<SubscriptionRef<T>>,
  missed: AtomicU64,
}

impl<T> Default for SubscriptionSlot<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> SubscriptionSlot<T> {
  /// Creates an unset slot.
  #[must_use]
  pub fn new() -> Self {
    Self {
      state: AtomicU8::new(UNSET),
      handle: OnceLock::new(),
      missed: AtomicU64::new(0),
    }
  }

  /// Stores `subscription`. Returns `true` if the slot became active.
  pub fn set(&self, subscription: SubscriptionRef<T>) -> bool {
    if let Err(rejected) = self.handle.set(subscription) {
      rejected.cancel();
      if !self.is_cancelled() {
        hooks::duplicate_subscription();
      }
      return false;
    }
    let Some(handle) = self.handle.get() else {
      return false;
    };
    match self
      .state
      .compare_exchange(UNSET, ACTIVE, Ordering::SeqCst, Ordering::SeqCst)
    {
      Ok(_) => {
        let missed = self.missed.swap(0, Ordering::SeqCst);
        if missed != 0 {
          handle.request(missed);
        }
        true
      }
      Err(_) => {
        trace!("subscription arrived after cancellation");
        handle.cancel();
        false
      }
    }
  }

  /// Forwards `n` to the handle, or remembers it until the handle is set.
  pub fn request(&self, n: u64) {
    if !demand::validate(n) {
      return;
    }
    if let Some(handle) = self.active() {
      handle.request(n);
      return;
    }
    demand::add_cap(&self.missed, n);
    if let Some(handle) = self.active() {
      let missed = self.missed.swap(0, Ordering::SeqCst);
      if missed != 0 {
        handle.request(missed);
      }
    }
  }

  /// Moves the slot to `Cancelled`, cancelling the held handle.
  ///
  /// Returns `true` only for the call that performed the transition.
  pub fn cancel(&self) -> bool {
    match self.state.swap(CANCELLED, Ordering::SeqCst) {
      CANCELLED => false,
      ACTIVE => {
        if let Some(handle) = self.handle.get() {
          handle.cancel();
        }
        true
      }
      _ => true,
    }
  }

  /// Current state.
  #[must_use]
  pub fn state(&self) -> SlotState {
    match self.state.load(Ordering::SeqCst) {
      UNSET => SlotState::Unset,
      ACTIVE => SlotState::Active,
      _ => SlotState::Cancelled,
    }
  }

  /// Returns `true` once the slot has been cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.state.load(Ordering::SeqCst) == CANCELLED
  }

  /// The live handle, if the slot is active.
  pub fn active(&self) -> Option<&SubscriptionRef<T>> {
    if self.state.load(Ordering::SeqCst) == ACTIVE {
      self.handle.get()
    } else {
      None
    }
  }
}

impl<T> fmt::Debug for SubscriptionSlot<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SubscriptionSlot")
      .field("state", &self.state())
      .field("missed", &self.missed.load(Ordering::Relaxed))
      .finish()
  }
}
