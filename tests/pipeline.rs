use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use streamweave_reactive::testing::{TestSink, TestSource};
use streamweave_reactive::{Context, Flow, FlowError, FusionMode};

fn tens() -> Vec<i64> {
  vec![10, 20, 30, 40, 50]
}

#[test]
fn test_zip_round_trip() {
  let sink = Flow::range(1, 5)
    .zip_with_iterable(tens(), |a, b| a + b)
    .subscribe(TestSink::new());

  assert_eq!(sink.values(), vec![11, 22, 33, 44, 55]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_zip_stops_at_shorter_side() {
  let short_source = Flow::range(1, 4)
    .zip_with_iterable(tens(), |a, b| a + b)
    .subscribe(TestSink::new());
  let short_sequence = Flow::range(1, 5)
    .zip_with_iterable(vec![10, 20, 30, 40], |a, b| a + b)
    .subscribe(TestSink::new());

  assert_eq!(short_source.values(), vec![11, 22, 33, 44]);
  assert_eq!(short_sequence.values(), vec![11, 22, 33, 44]);
  assert_eq!(short_source.completions(), 1);
  assert_eq!(short_sequence.completions(), 1);
}

#[test]
fn test_zip_backpressure_steps() {
  let sink = Flow::range(1, 5)
    .zip_with_iterable(tens(), |a, b| a + b)
    .subscribe(TestSink::with_request(0));
  assert!(sink.values().is_empty());

  sink.request(1);
  assert_eq!(sink.values(), vec![11]);
  sink.request(2);
  assert_eq!(sink.values(), vec![11, 22, 33]);
  sink.request(5);
  assert_eq!(sink.values(), vec![11, 22, 33, 44, 55]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_defer_null_and_error() {
  let null = Flow::<i32>::try_defer(|| Ok(None)).subscribe(TestSink::new());
  assert!(null.error().unwrap().is_null());
  assert_eq!(null.value_count(), 0);

  let failing = Flow::<i32>::try_defer(|| Err(FlowError::from("E"))).subscribe(TestSink::new());
  assert_eq!(failing.error().unwrap().to_string(), "E");
}

#[test]
fn test_defer_single_value() {
  let sink = Flow::defer(|| Flow::just(1)).subscribe(TestSink::new());
  assert_eq!(sink.values(), vec![1]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_take_until_other_fires_before_main() {
  let main = TestSource::<i32>::new();
  let sink = Flow::from_source(main.clone())
    .take_until_other(Flow::just(1))
    .subscribe(TestSink::new());

  assert_eq!(sink.completions(), 1);
  assert_eq!(sink.value_count(), 0);
  assert_eq!(main.cancel_count(), 1);
}

#[test]
fn test_defer_builds_a_fresh_chain_per_subscription() {
  let builds = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&builds);
  let flow = Flow::defer(move || {
    counter.fetch_add(1, Ordering::SeqCst);
    Flow::range(1, 3).zip_with_iterable(vec!["a", "b", "c"], |n, s| format!("{s}{n}"))
  });

  let first = flow.subscribe(TestSink::new());
  let second = flow.subscribe(TestSink::with_request(1));

  assert_eq!(builds.load(Ordering::SeqCst), 2);
  assert_eq!(first.values(), vec!["a1", "b2", "c3"]);
  assert_eq!(second.values(), vec!["a1"]);
}

#[test]
fn test_first_of_zipped_values() {
  let sink = Flow::range(1, 5)
    .zip_with_iterable(tens(), |a, b| a * b)
    .first()
    .subscribe(TestSink::new());

  assert_eq!(sink.values(), vec![10]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_contextualize_reaches_deferred_source() {
  let upstream = TestSource::<i64>::new();
  let shared = upstream.clone();
  let _sink = Flow::defer(move || Flow::from_source(shared.clone()))
    .contextualize(|child, _| Ok(child.put("request_id", 7u64)))
    .subscribe_with_context(TestSink::new(), Context::of("user", "ada"));

  let seen = &upstream.contexts()[0];
  assert_eq!(seen.get::<u64>("request_id"), Some(&7));
  assert!(seen.has_key("user"));
}

#[test]
fn test_take_until_then_first() {
  let main = TestSource::<i32>::new();
  let other = TestSource::<&'static str>::new();
  let sink = Flow::from_source(main.clone())
    .take_until_other(Flow::from_source(other.clone()))
    .first()
    .subscribe(TestSink::new());

  main.next(42);
  other.next("stop");

  assert_eq!(sink.values(), vec![42]);
  assert_eq!(sink.terminal_count(), 1);
  assert_eq!(main.cancel_count(), 1);
}

#[test]
fn test_fusion_survives_contextualize_but_not_zip() {
  let fused = Flow::from_iter(vec![1, 2, 3])
    .contextualize(|child, _| Ok(child.put("k", 1u8)))
    .subscribe(TestSink::with_fusion(FusionMode::Any));
  assert_eq!(fused.granted_fusion(), Some(FusionMode::Sync));
  assert_eq!(fused.values(), vec![1, 2, 3]);

  let plain = Flow::from_iter(vec![1, 2, 3])
    .zip_with_iterable(vec![1, 1, 1], |a, b| a + b)
    .subscribe(TestSink::with_fusion(FusionMode::Any));
  assert_eq!(plain.granted_fusion(), None);
  assert_eq!(plain.values(), vec![2, 3, 4]);
}
