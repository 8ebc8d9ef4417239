//! Tests for DelegateProcessor

use crate::context::Context;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::stages::DelegateProcessor;
use crate::testing::TestSink;
use crate::traits::{Sink, SinkRef, Source, SubscriptionRef};

fn processor(input: &std::sync::Arc<TestSink<i32>>) -> DelegateProcessor<i32, i64> {
  let input_ref: SinkRef<i32> = input.clone();
  DelegateProcessor::new(Flow::range(1, 3).into_source(), input_ref)
}

#[test]
fn test_sink_side_feeds_input() {
  let input = TestSink::<i32>::new();
  let processor = processor(&input);

  processor.on_subscribe(SubscriptionRef::empty());
  processor.on_next(1);
  processor.on_next(2);
  processor.on_error(FlowError::from("input closed"));

  assert_eq!(input.subscription_count(), 1);
  assert_eq!(input.values(), vec![1, 2]);
  assert_eq!(input.error().unwrap().to_string(), "input closed");
}

#[test]
fn test_source_side_subscribes_output() {
  let input = TestSink::<i32>::new();
  let processor = processor(&input);
  let subscriber = TestSink::<i64>::new();
  processor.subscribe(subscriber.clone());

  assert_eq!(subscriber.values(), vec![1, 2, 3]);
  assert_eq!(subscriber.completions(), 1);
  assert_eq!(subscriber.contexts().len(), 1);
}

#[test]
fn test_first_non_empty_context_is_relayed_once() {
  let input = TestSink::<i32>::new();
  let processor = processor(&input);

  processor.on_context(Context::empty());
  assert!(input.contexts().is_empty());

  processor.on_context(Context::of("session", 1u8));
  processor.on_context(Context::of("session", 2u8));

  assert_eq!(input.contexts().len(), 1);
  assert_eq!(input.last_context().unwrap().get::<u8>("session"), Some(&1));
  assert_eq!(processor.context().get::<u8>("session"), Some(&1));
}

#[test]
fn test_input_with_own_context_is_not_overridden() {
  let input = TestSink::builder()
    .context(Context::of("owner", "input"))
    .build::<i32>();
  let processor = processor(&input);

  processor.on_context(Context::of("owner", "upstream"));

  assert!(input.contexts().is_empty());
  assert_eq!(processor.context().get::<&str>("owner").copied(), Some("input"));
}

#[test]
fn test_subscribers_see_relayed_context() {
  let input = TestSink::<i32>::new();
  let processor = processor(&input);
  processor.on_context(Context::of("tenant", "acme"));

  let subscriber = TestSink::<i64>::new();
  processor.subscribe(subscriber.clone());

  let seen = subscriber.contexts();
  assert_eq!(seen.len(), 1);
  assert_eq!(seen[0].get::<&str>("tenant").copied(), Some("acme"));
}
