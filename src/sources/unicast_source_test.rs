//! Tests for UnicastSource

use crate::error::FlowError;
use crate::sources::UnicastSource;
use crate::testing::TestSink;
use crate::traits::{FusionMode, Source};
use std::thread;

#[test]
fn test_values_emitted_before_subscription_are_buffered() {
  let source = UnicastSource::<i32>::new();
  source.emit(1);
  source.emit(2);
  assert_eq!(source.buffered(), 2);
  assert!(!source.has_sink());

  let sink = TestSink::<i32>::new();
  source.subscribe(sink.clone());

  assert_eq!(sink.values(), vec![1, 2]);
  assert_eq!(source.buffered(), 0);
  assert!(source.has_sink());
}

#[test]
fn test_backpressure_keeps_values_queued() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::with_request(1);
  source.subscribe(sink.clone());

  source.emit(1);
  source.emit(2);
  source.emit(3);
  assert_eq!(sink.values(), vec![1]);
  assert_eq!(source.buffered(), 2);

  sink.request(2);
  assert_eq!(sink.values(), vec![1, 2, 3]);
}

#[test]
fn test_completion_waits_for_queued_values() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::with_request(0);
  source.subscribe(sink.clone());

  source.emit(9);
  source.complete();
  assert!(source.is_terminated());
  assert!(!sink.is_completed());

  sink.request(1);
  assert_eq!(sink.values(), vec![9]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_completion_needs_no_demand_when_queue_is_empty() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::with_request(0);
  source.subscribe(sink.clone());

  source.complete();
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_late_subscriber_receives_terminal() {
  let source = UnicastSource::<i32>::new();
  source.emit(7);
  source.fail("gone");

  let sink = TestSink::<i32>::new();
  source.subscribe(sink.clone());

  assert_eq!(sink.values(), vec![7]);
  assert_eq!(sink.error().unwrap().to_string(), "gone");
  assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn test_failure_follows_queued_values() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::new();
  source.subscribe(sink.clone());

  source.emit(1);
  source.fail("producer crashed");

  assert_eq!(sink.values(), vec![1]);
  assert_eq!(sink.error().unwrap().to_string(), "producer crashed");
  assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn test_signals_after_terminal_are_dropped() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::new();
  source.subscribe(sink.clone());

  source.complete();
  source.emit(1);
  source.fail("late");
  source.complete();

  assert_eq!(sink.value_count(), 0);
  assert_eq!(sink.terminal_count(), 1);
  assert_eq!(sink.signals_after_terminal(), 0);
}

#[test]
fn test_second_subscriber_is_rejected() {
  let source = UnicastSource::<i32>::new();
  let first = TestSink::<i32>::new();
  let second = TestSink::<i32>::new();
  source.subscribe(first.clone());
  source.subscribe(second.clone());

  assert!(matches!(
    second.error(),
    Some(FlowError::SinkLimit("UnicastSource"))
  ));
  source.emit(4);
  assert_eq!(first.values(), vec![4]);
  assert_eq!(second.value_count(), 0);
}

#[test]
fn test_cancel_discards_queue_and_later_values() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::with_request(0);
  source.subscribe(sink.clone());
  source.emit(1);

  sink.cancel();
  source.emit(2);

  assert!(source.is_cancelled());
  assert_eq!(source.buffered(), 0);
  assert_eq!(sink.value_count(), 0);
}

#[test]
fn test_async_fusion_signals_availability() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::with_fusion(FusionMode::Any);
  source.subscribe(sink.clone());
  assert_eq!(sink.granted_fusion(), Some(FusionMode::Async));

  source.emit(1);
  source.emit(2);
  assert_eq!(sink.values(), vec![1, 2]);

  source.complete();
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_sync_only_request_is_refused() {
  let source = UnicastSource::<i32>::new();
  let sink = TestSink::<i32>::with_fusion(FusionMode::Sync);
  source.subscribe(sink.clone());

  assert_eq!(sink.granted_fusion(), Some(FusionMode::None));
  source.emit(5);
  assert_eq!(sink.values(), vec![5]);
}

#[test]
fn test_producer_thread_delivers_in_order() {
  let source = UnicastSource::<u32>::new();
  let sink = TestSink::<u32>::new();
  source.subscribe(sink.clone());

  let producer = source.clone();
  thread::spawn(move || {
    for i in 0..1_000 {
      producer.emit(i);
    }
    producer.complete();
  })
  .join()
  .unwrap();

  assert_eq!(sink.values(), (0..1_000).collect::<Vec<_>>());
  assert_eq!(sink.completions(), 1);
}
