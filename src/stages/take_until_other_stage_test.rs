//! Tests for TakeUntilOtherStage

use crate::demand::UNBOUNDED;
use crate::flow::Flow;
use crate::stages::TakeUntilOtherStage;
use crate::testing::{TestSink, TestSource};
use crate::traits::{Source, SourceRef};
use std::sync::Arc;

fn pair() -> (TestSource<i32>, TestSource<()>) {
  (TestSource::new(), TestSource::new())
}

fn assemble(main: &TestSource<i32>, other: &TestSource<()>) -> Flow<i32> {
  Flow::from_source(main.clone()).take_until_other(Flow::from_source(other.clone()))
}

#[test]
fn test_other_value_before_main_completes_immediately() {
  let main = TestSource::<i32>::new();
  let sink = Flow::from_source(main.clone())
    .take_until_other(Flow::just(1))
    .subscribe(TestSink::new());

  assert_eq!(sink.value_count(), 0);
  assert_eq!(sink.completions(), 1);
  assert_eq!(main.cancel_count(), 1);
}

#[test]
fn test_relays_main_until_other_emits() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  main.next(1);
  main.next(2);
  other.next(());
  main.next(3);

  assert_eq!(sink.values(), vec![1, 2]);
  assert_eq!(sink.completions(), 1);
  assert_eq!(main.cancel_count(), 1);
  assert_eq!(other.cancel_count(), 1);
  assert_eq!(sink.signals_after_terminal(), 0);
}

#[test]
fn test_other_completion_completes() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  main.next(1);
  other.complete();

  assert_eq!(sink.values(), vec![1]);
  assert_eq!(sink.completions(), 1);
  assert_eq!(main.cancel_count(), 1);
}

#[test]
fn test_other_error_errors() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  other.error("stop signal failed");

  assert_eq!(sink.error().unwrap().to_string(), "stop signal failed");
  assert_eq!(sink.completions(), 0);
  assert_eq!(main.cancel_count(), 1);
}

#[test]
fn test_only_first_other_signal_counts() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  other.next(());
  other.error("ignored");
  other.complete();

  assert_eq!(sink.completions(), 1);
  assert!(!sink.is_errored());
  assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn test_main_completion_cancels_other() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  main.next(5);
  main.complete();
  other.next(());

  assert_eq!(sink.values(), vec![5]);
  assert_eq!(sink.completions(), 1);
  assert_eq!(other.cancel_count(), 1);
  assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn test_main_error_cancels_other() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  main.error("main failed");
  other.complete();

  assert_eq!(sink.error().unwrap().to_string(), "main failed");
  assert_eq!(other.cancel_count(), 1);
  assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn test_downstream_cancel_cancels_both_once() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::new());

  sink.cancel();
  sink.cancel();

  assert_eq!(main.cancel_count(), 1);
  assert_eq!(other.cancel_count(), 1);
  assert!(!sink.is_terminated());
}

#[test]
fn test_other_is_requested_unbounded() {
  let (main, other) = pair();
  let _sink = assemble(&main, &other).subscribe(TestSink::with_request(0));

  assert_eq!(other.requested(), UNBOUNDED);
  assert_eq!(main.requested(), 0);
}

#[test]
fn test_requests_before_main_subscription_are_forwarded() {
  let (main, other) = pair();
  let sink = assemble(&main, &other).subscribe(TestSink::with_request(2));
  assert_eq!(main.requested(), 2);

  sink.request(3);
  assert_eq!(main.requested(), 5);
}

#[test]
fn test_subscribes_other_before_main() {
  let (main, other) = pair();
  let main_ref: SourceRef<i32> = Arc::new(main.clone());
  let other_ref: SourceRef<()> = Arc::new(other.clone());
  let stage = TakeUntilOtherStage::new(main_ref, other_ref).with_name("until");
  let sink = TestSink::<i32>::new();
  stage.subscribe(sink.clone());

  assert_eq!(sink.subscription_count(), 1);
  assert_eq!(main.subscription_count(), 1);
  assert_eq!(other.subscription_count(), 1);
}

#[test]
fn test_main_values_flow_with_never_other() {
  let sink = Flow::range(1, 3)
    .take_until_other(Flow::<()>::never())
    .subscribe(TestSink::new());

  assert_eq!(sink.values(), vec![1, 2, 3]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_one_by_one_requests_from_on_next() {
  const COUNT: u64 = 200_000;
  let sink = Flow::range(0, COUNT)
    .take_until_other(Flow::<()>::never())
    .subscribe(TestSink::builder().request(1).request_each(1).build::<i64>());

  assert_eq!(sink.value_count() as u64, COUNT);
  assert_eq!(sink.completions(), 1);
  assert_eq!(sink.signals_after_terminal(), 0);
}
