//! # Configuration
//!
//! Builder-style configuration for stages and for bridging a pipeline into async code.
//!
//! - [`StageConfig`]: the name a stage logs under.
//! - [`StreamConfig`]: prefetch and replenish policy of
//!   [`SinkStream`](crate::sinks::SinkStream).

/// Default number of values requested up front when bridging into a `Stream`.
pub const DEFAULT_PREFETCH: u64 = 256;

/// Configuration shared by every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageConfig {
  /// Optional name for identifying this stage in logs.
  pub name: Option<String>,
}

impl StageConfig {
  /// Sets the name for this stage.
  ///
  /// # Arguments
  ///
  /// * `name` - The name to assign to this stage.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Returns the current name, if set.
  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// Returns the name, or `fallback` when none was set.
  pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
    self.name.as_deref().unwrap_or(fallback)
  }
}

/// Configuration for consuming a pipeline as an async `Stream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
  /// Number of values requested when the stream subscribes.
  pub prefetch: u64,
  /// Optional name for identifying the stream in logs.
  pub name: Option<String>,
}

impl Default for StreamConfig {
  fn default() -> Self {
    Self {
      prefetch: DEFAULT_PREFETCH,
      name: None,
    }
  }
}

impl StreamConfig {
  /// Sets the prefetch amount. Values below one are raised to one.
  pub fn with_prefetch(mut self, prefetch: u64) -> Self {
    self.prefetch = prefetch.max(1);
    self
  }

  /// Sets the name for this stream.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Number of consumed values after which the stream requests more.
  ///
  /// Three quarters of the prefetch, and at least one.
  #[must_use]
  pub fn replenish_threshold(&self) -> u64 {
    if self.prefetch == crate::demand::UNBOUNDED {
      return u64::MAX;
    }
    (self.prefetch - self.prefetch / 4).max(1)
  }
}
