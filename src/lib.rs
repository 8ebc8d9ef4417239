//! # StreamWeave Reactive
//!
//! A push-based stream runtime with explicit pull-based demand.
//!
//! A Source emits values to a Sink only as far as the Sink has requested them, and
//! ends with at most one terminal signal. Stages sit in between: each one is a Sink
//! to its upstream and a Source to its downstream.
//!
//! ## Key Features
//!
//! - **Demand protocol**: accumulating, saturating requests and idempotent
//!   cancellation ([`traits`], [`demand`]).
//! - **Exactly-once termination**: per-origin subscription slots and a serializing
//!   wrapper for stages fed by racing origins ([`arbiter`], [`serialized`]).
//! - **Fusion**: adjacent stages can agree to replace `on_next` with direct polling of
//!   a queue ([`traits::QueueSubscription`]).
//! - **Context**: an immutable key/value map negotiated at subscribe time
//!   ([`context`]).
//! - **Caller code is contained**: errors, absent results and panics from supplied
//!   closures become error signals ([`operators::guard`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use streamweave_reactive::{Flow, testing::TestSink};
//!
//! let sink = Flow::range(1, 5)
//!   .zip_with_iterable(vec![10, 20, 30, 40, 50], |a, b| a + b)
//!   .subscribe(TestSink::new());
//!
//! assert_eq!(sink.values(), vec![11, 22, 33, 44, 55]);
//! assert!(sink.is_completed());
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Per-origin subscription slots for stages with racing terminal causes.
pub mod arbiter;
/// Stage and stream configuration.
pub mod config;
/// Immutable, structurally shared subscription context.
pub mod context;
/// Request accounting.
pub mod demand;
/// Error types.
pub mod error;
/// Fluent assembly API.
pub mod flow;
/// Diagnostics for dropped signals and protocol violations.
pub mod hooks;
/// Helpers shared by Sources and Stages.
pub mod operators;
/// Serializing Sink wrapper.
pub mod serialized;
/// Reified signals.
pub mod signal;
/// Terminal consumers.
pub mod sinks;
/// Concrete Sources.
pub mod sources;
/// Stages.
pub mod stages;
/// Test doubles.
pub mod testing;
/// Protocol roles.
pub mod traits;

pub use context::Context;
pub use error::FlowError;
pub use flow::Flow;
pub use signal::Signal;
pub use traits::{
  FusionMode, QueueSubscription, Sink, SinkRef, Source, SourceRef, Subscription,
  SubscriptionRef,
};

#[cfg(test)]
mod arbiter_test;
#[cfg(test)]
mod config_test;
