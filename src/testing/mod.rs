//! Test doubles for both protocol roles.
//!
//! [`TestSink`] records what it receives; [`TestSource`] emits what the test tells it
//! to. Both are safe to drive from several threads at once.

pub mod test_sink;
pub mod test_source;

pub use test_sink::{TestSink, TestSinkBuilder};
pub use test_source::TestSource;
