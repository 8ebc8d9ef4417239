//! # Subscription Slot Test Suite
//!
//! Tests for the `Unset -> Active -> Cancelled` slot: deferred requests, late
//! handles, duplicate handles and idempotent cancellation, including racing threads.

use crate::arbiter::{SlotState, SubscriptionSlot};
use crate::demand::UNBOUNDED;
use crate::traits::{Subscription, SubscriptionRef};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Default)]
struct Recorder {
  requested: AtomicU64,
  requests: AtomicUsize,
  cancels: AtomicUsize,
}

impl Subscription for Recorder {
  fn request(&self, n: u64) {
    self.requests.fetch_add(1, Ordering::SeqCst);
    self.requested.fetch_add(n.min(1_000_000), Ordering::SeqCst);
  }

  fn cancel(&self) {
    self.cancels.fetch_add(1, Ordering::SeqCst);
  }
}

fn handle(recorder: &Arc<Recorder>) -> SubscriptionRef<i32> {
  SubscriptionRef::plain(Arc::clone(recorder))
}

#[test]
fn test_new_slot_is_unset() {
  let slot = SubscriptionSlot::<i32>::new();
  assert_eq!(slot.state(), SlotState::Unset);
  assert!(slot.active().is_none());
}

#[test]
fn test_set_activates() {
  let slot = SubscriptionSlot::<i32>::new();
  let recorder = Arc::new(Recorder::default());
  assert!(slot.set(handle(&recorder)));
  assert_eq!(slot.state(), SlotState::Active);
  assert!(slot.active().is_some());
}

#[test]
fn test_request_before_set_is_forwarded_on_set() {
  let slot = SubscriptionSlot::<i32>::new();
  slot.request(3);
  slot.request(4);
  let recorder = Arc::new(Recorder::default());
  slot.set(handle(&recorder));
  assert_eq!(recorder.requested.load(Ordering::SeqCst), 7);
  assert_eq!(recorder.requests.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_after_set_goes_straight_through() {
  let slot = SubscriptionSlot::<i32>::new();
  let recorder = Arc::new(Recorder::default());
  slot.set(handle(&recorder));
  slot.request(5);
  assert_eq!(recorder.requested.load(Ordering::SeqCst), 5);
}

#[test]
fn test_zero_request_is_ignored() {
  let slot = SubscriptionSlot::<i32>::new();
  let recorder = Arc::new(Recorder::default());
  slot.set(handle(&recorder));
  slot.request(0);
  assert_eq!(recorder.requests.load(Ordering::SeqCst), 0);
}

#[test]
fn test_set_after_cancel_cancels_incoming_handle() {
  let slot = SubscriptionSlot::<i32>::new();
  assert!(slot.cancel());
  let recorder = Arc::new(Recorder::default());
  assert!(!slot.set(handle(&recorder)));
  assert_eq!(recorder.cancels.load(Ordering::SeqCst), 1);
  assert_eq!(slot.state(), SlotState::Cancelled);
  assert!(slot.active().is_none());
}

#[test]
fn test_duplicate_handle_is_cancelled_and_first_kept() {
  let slot = SubscriptionSlot::<i32>::new();
  let first = Arc::new(Recorder::default());
  let second = Arc::new(Recorder::default());
  assert!(slot.set(handle(&first)));
  assert!(!slot.set(handle(&second)));
  assert_eq!(second.cancels.load(Ordering::SeqCst), 1);
  assert_eq!(first.cancels.load(Ordering::SeqCst), 0);
  slot.request(2);
  assert_eq!(first.requested.load(Ordering::SeqCst), 2);
  assert_eq!(second.requested.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_is_idempotent() {
  let slot = SubscriptionSlot::<i32>::new();
  let recorder = Arc::new(Recorder::default());
  slot.set(handle(&recorder));
  assert!(slot.cancel());
  assert!(!slot.cancel());
  assert!(!slot.cancel());
  assert_eq!(recorder.cancels.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_after_cancel_is_not_forwarded() {
  let slot = SubscriptionSlot::<i32>::new();
  let recorder = Arc::new(Recorder::default());
  slot.set(handle(&recorder));
  slot.cancel();
  slot.request(UNBOUNDED);
  assert_eq!(recorder.requests.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_cancel_has_single_winner() {
  for _ in 0..64 {
    let slot = Arc::new(SubscriptionSlot::<i32>::new());
    let recorder = Arc::new(Recorder::default());
    slot.set(handle(&recorder));
    let barrier = Arc::new(Barrier::new(4));
    let winners = Arc::new(AtomicUsize::new(0));
    let threads: Vec<_> = (0..4)
      .map(|_| {
        let slot = Arc::clone(&slot);
        let barrier = Arc::clone(&barrier);
        let winners = Arc::clone(&winners);
        thread::spawn(move || {
          barrier.wait();
          if slot.cancel() {
            winners.fetch_add(1, Ordering::SeqCst);
          }
        })
      })
      .collect();
    for t in threads {
      t.join().unwrap();
    }
    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.cancels.load(Ordering::SeqCst), 1);
  }
}

#[test]
fn test_concurrent_set_and_cancel_never_leaves_live_handle() {
  for _ in 0..64 {
    let slot = Arc::new(SubscriptionSlot::<i32>::new());
    let recorder = Arc::new(Recorder::default());
    let barrier = Arc::new(Barrier::new(2));
    let setter = {
      let slot = Arc::clone(&slot);
      let recorder = Arc::clone(&recorder);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        slot.set(handle(&recorder));
      })
    };
    let canceller = {
      let slot = Arc::clone(&slot);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        slot.cancel();
      })
    };
    setter.join().unwrap();
    canceller.join().unwrap();
    assert_eq!(slot.state(), SlotState::Cancelled);
    assert_eq!(recorder.cancels.load(Ordering::SeqCst), 1);
  }
}
