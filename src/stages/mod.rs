//! Stages: units that are a Sink to their upstream and a Source to their downstream.
//!
//! Each stage is a thin policy over the protocol primitives in [`crate::arbiter`],
//! [`crate::demand`] and [`crate::serialized`]. A stage value only describes the
//! assembly; every subscription creates its own stage Sink, which is never reused.

pub mod contextualize_stage;
pub mod defer_stage;
pub mod delegate_processor;
pub mod next_stage;
pub mod take_until_other_stage;
pub mod zip_iterable_stage;

pub use contextualize_stage::{ContextMerge, ContextualizeStage};
pub use defer_stage::{DeferStage, SourceFactory};
pub use delegate_processor::DelegateProcessor;
pub use next_stage::NextStage;
pub use take_until_other_stage::TakeUntilOtherStage;
pub use zip_iterable_stage::{BoxIter, Combiner, SequenceFactory, ZipIterableStage};

#[cfg(test)]
mod delegate_processor_test;
#[cfg(test)]
mod take_until_other_stage_test;
