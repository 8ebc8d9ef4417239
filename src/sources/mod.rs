//! Concrete Sources.
//!
//! - [`RangeSource`]: consecutive `i64` values, synchronous fusion.
//! - [`ArraySource`]: the items of a collection, synchronous fusion.
//! - [`EmptySource`], [`ErrorSource`], [`NeverSource`]: no values.
//! - [`UnicastSource`]: a single-consumer queue fed from any thread, asynchronous fusion.

pub mod array_source;
pub mod empty_source;
pub mod range_source;
pub mod unicast_source;

pub use array_source::ArraySource;
pub use empty_source::{EmptySource, ErrorSource, NeverSource};
pub use range_source::RangeSource;
pub use unicast_source::UnicastSource;

#[cfg(test)]
mod array_source_test;
#[cfg(test)]
mod empty_source_test;
#[cfg(test)]
mod unicast_source_test;
