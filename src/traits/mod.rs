//! Protocol roles shared by every Source, Stage and Sink.

pub mod sink;
pub mod source;
pub mod subscription;

pub use sink::{Sink, SinkRef};
pub use source::{Source, SourceRef};
pub use subscription::{FusionMode, QueueSubscription, Subscription, SubscriptionRef};
