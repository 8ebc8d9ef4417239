//! Terminal consumers.
//!
//! - [`LambdaSink`]: closures per signal, unbounded demand.
//! - [`StreamBridge`] / [`SinkStream`]: the pipeline as an async `Stream`.

pub mod lambda_sink;
pub mod stream_sink;

pub use lambda_sink::LambdaSink;
pub use stream_sink::{SinkStream, StreamBridge, channel, channel_with_context};
