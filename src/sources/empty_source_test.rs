//! Tests for EmptySource, ErrorSource and NeverSource

use crate::sources::{EmptySource, ErrorSource, NeverSource};
use crate::testing::TestSink;
use crate::traits::Source;

#[test]
fn test_empty_completes_after_subscription() {
  let sink = TestSink::<i32>::with_request(0);
  EmptySource::<i32>::new().subscribe(sink.clone());

  assert_eq!(sink.subscription_count(), 1);
  assert_eq!(sink.completions(), 1);
  assert_eq!(sink.value_count(), 0);
}

#[test]
fn test_error_fails_every_subscriber_with_same_error() {
  let source = ErrorSource::<i32>::new("broken");
  let first = TestSink::<i32>::new();
  let second = TestSink::<i32>::new();
  source.subscribe(first.clone());
  source.subscribe(second.clone());

  assert_eq!(first.error().unwrap().to_string(), "broken");
  assert_eq!(second.error().unwrap().to_string(), "broken");
  assert_eq!(first.subscription_count(), 1);
}

#[test]
fn test_never_only_subscribes() {
  let sink = TestSink::<i32>::new();
  NeverSource::<i32>::new().subscribe(sink.clone());

  assert_eq!(sink.subscription_count(), 1);
  assert!(!sink.is_terminated());
  sink.cancel();
  assert!(sink.is_cancelled());
}
