//! Tests for ArraySource

use crate::sources::ArraySource;
use crate::testing::TestSink;
use crate::traits::{FusionMode, Source};

#[test]
fn test_emits_items_in_order() {
  let source = ArraySource::new(vec!["a".to_string(), "b".to_string()]);
  let sink = TestSink::<String>::new();
  source.subscribe(sink.clone());

  assert_eq!(sink.values(), vec!["a", "b"]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_each_subscription_starts_over() {
  let source: ArraySource<u8> = (1..=3).collect();
  let first = TestSink::<u8>::new();
  let second = TestSink::<u8>::with_request(1);
  source.subscribe(first.clone());
  source.subscribe(second.clone());

  assert_eq!(source.len(), 3);
  assert_eq!(first.values(), vec![1, 2, 3]);
  assert_eq!(second.values(), vec![1]);
  assert!(!second.is_completed());
}

#[test]
fn test_backpressure() {
  let sink = TestSink::<i32>::with_request(0);
  ArraySource::new(vec![5, 6, 7]).subscribe(sink.clone());
  assert_eq!(sink.value_count(), 0);

  sink.request(2);
  assert_eq!(sink.values(), vec![5, 6]);
  sink.request(10);
  assert_eq!(sink.values(), vec![5, 6, 7]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_empty_array_completes() {
  let source = ArraySource::<i32>::new(Vec::new());
  let sink = TestSink::<i32>::with_request(0);
  source.subscribe(sink.clone());

  assert!(source.is_empty());
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_just_emits_single_item() {
  let sink = TestSink::<char>::new();
  ArraySource::just('x').subscribe(sink.clone());

  assert_eq!(sink.values(), vec!['x']);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_sync_fusion_polls_everything() {
  let sink = TestSink::<i32>::with_fusion(FusionMode::Sync);
  ArraySource::new(vec![1, 2]).subscribe(sink.clone());

  assert_eq!(sink.granted_fusion(), Some(FusionMode::Sync));
  assert_eq!(sink.values(), vec![1, 2]);
  assert_eq!(sink.completions(), 1);
}

#[test]
fn test_one_by_one_requests_from_on_next() {
  const COUNT: u32 = 200_000;
  let source: ArraySource<u32> = (0..COUNT).collect();
  let sink = TestSink::builder()
    .request(1)
    .request_each(1)
    .build::<u32>();
  source.subscribe(sink.clone());

  assert_eq!(sink.value_count(), COUNT as usize);
  assert_eq!(sink.values().last(), Some(&(COUNT - 1)));
  assert_eq!(sink.completions(), 1);
  assert_eq!(sink.signals_after_terminal(), 0);
}
