//! Fetch orchestration, default merging and threshold classification.

pub mod aggregator;
pub mod classifier;
pub mod merge;

pub use aggregator::{wait_for_secondaries, wait_until, Aggregator, RetryPolicy};
pub use classifier::Classification;
pub use merge::ViewState;
