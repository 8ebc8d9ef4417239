//! # Configuration Test Suite

use crate::config::{DEFAULT_PREFETCH, StageConfig, StreamConfig};
use crate::demand::UNBOUNDED;

#[test]
fn test_stage_config_default_has_no_name() {
  let config = StageConfig::default();
  assert_eq!(config.name(), None);
  assert_eq!(config.name_or("zip"), "zip");
}

#[test]
fn test_stage_config_with_name() {
  let config = StageConfig::default().with_name("pairs");
  assert_eq!(config.name(), Some("pairs"));
  assert_eq!(config.name_or("zip"), "pairs");
}

#[test]
fn test_stream_config_defaults() {
  let config = StreamConfig::default();
  assert_eq!(config.prefetch, DEFAULT_PREFETCH);
  assert_eq!(config.name, None);
  assert_eq!(config.replenish_threshold(), 192);
}

#[test]
fn test_stream_config_prefetch_is_at_least_one() {
  let config = StreamConfig::default().with_prefetch(0);
  assert_eq!(config.prefetch, 1);
  assert_eq!(config.replenish_threshold(), 1);
}

#[test]
fn test_stream_config_small_prefetch_threshold() {
  assert_eq!(StreamConfig::default().with_prefetch(4).replenish_threshold(), 3);
  assert_eq!(StreamConfig::default().with_prefetch(2).replenish_threshold(), 2);
}

#[test]
fn test_stream_config_unbounded_never_replenishes() {
  let config = StreamConfig::default().with_prefetch(UNBOUNDED);
  assert_eq!(config.replenish_threshold(), u64::MAX);
}

#[test]
fn test_stream_config_with_name() {
  let config = StreamConfig::default().with_name("events");
  assert_eq!(config.name.as_deref(), Some("events"));
}
