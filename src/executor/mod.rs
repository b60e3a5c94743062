//! Grid execution engine
//!
//! Fans a test out across its grid, runs each cell in a fresh sandbox and
//! aggregates the outcomes.

mod aggregator;
mod parallel;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::ResultAggregator;
pub use parallel::{CancelToken, GridDispatcher};
pub use runner::RunExecutor;
