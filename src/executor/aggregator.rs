//! Result aggregation
//!
//! All workers funnel their outcomes through one [`ResultAggregator`].

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{RunOutcome, TestSummary};

/// Upper bound on records reserved ahead of a run
const MAX_RESERVED_RECORDS: usize = 4096;

/// Serialized accumulation of cell outcomes into a [`TestSummary`].
///
/// The record append and the counter updates for one outcome happen under a
/// single lock acquisition, so readers never observe them out of step.
#[derive(Debug)]
pub struct ResultAggregator {
    summary: Mutex<TestSummary>,
}

impl ResultAggregator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            summary: Mutex::new(TestSummary::empty(name)),
        }
    }

    /// Pre-size the record collection for an expected number of cells.
    /// At most `MAX_RESERVED_RECORDS` are reserved; larger grids grow on demand.
    pub fn with_capacity(name: impl Into<String>, cells: usize) -> Self {
        let mut summary = TestSummary::empty(name);
        summary.records.reserve(cells.min(MAX_RESERVED_RECORDS));
        Self {
            summary: Mutex::new(summary),
        }
    }

    pub async fn record(&self, outcome: RunOutcome) {
        self.summary.lock().await.push(outcome);
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> TestSummary {
        self.summary.lock().await.clone()
    }

    /// Finish aggregation. Clones only if other handles are still alive.
    pub async fn into_summary(self: Arc<Self>) -> TestSummary {
        match Arc::try_unwrap(self) {
            Ok(aggregator) => aggregator.summary.into_inner(),
            Err(shared) => shared.snapshot().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellError, RunCoordinate};
    use chrono::Utc;
    use futures::future::join_all;
    use serde_json::json;

    fn outcome(t: usize, i: usize) -> RunOutcome {
        if (t + i) % 3 == 0 {
            RunOutcome::failure(
                RunCoordinate::new(t, i),
                CellError::Execution("boom".to_string()),
                Utc::now(),
                0,
            )
        } else {
            RunOutcome::success(RunCoordinate::new(t, i), json!(i), Utc::now(), 0)
        }
    }

    #[tokio::test]
    async fn test_record_updates_counts() {
        let aggregator = Arc::new(ResultAggregator::new("single"));
        aggregator.record(outcome(0, 0)).await;
        aggregator.record(outcome(0, 1)).await;

        let summary = aggregator.into_summary().await;
        assert_eq!(summary.name, "single");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failure, 1);
        assert_eq!(summary.success, 1);
        assert!(summary.is_consistent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_records_are_not_lost() {
        const WRITERS: usize = 64;
        const PER_WRITER: usize = 500;

        let aggregator = Arc::new(ResultAggregator::with_capacity(
            "stress",
            WRITERS * PER_WRITER,
        ));

        let handles: Vec<_> = (0..WRITERS)
            .map(|t| {
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    for i in 0..PER_WRITER {
                        aggregator.record(outcome(t, i)).await;
                        if i % 50 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();

        for result in join_all(handles).await {
            result.unwrap();
        }

        let summary = aggregator.into_summary().await;
        let expected_failures = (0..WRITERS)
            .flat_map(|t| (0..PER_WRITER).map(move |i| (t + i) % 3 == 0))
            .filter(|failed| *failed)
            .count();

        assert_eq!(summary.total, WRITERS * PER_WRITER);
        assert_eq!(summary.failure, expected_failures);
        assert!(summary.is_consistent());
        assert_eq!(summary.coordinates().len(), WRITERS * PER_WRITER);
    }

    #[tokio::test]
    async fn test_into_summary_with_live_handle() {
        let aggregator = Arc::new(ResultAggregator::new("shared"));
        let other = aggregator.clone();
        other.record(outcome(1, 1)).await;

        let summary = aggregator.into_summary().await;
        assert_eq!(summary.total, 1);
        assert_eq!(other.snapshot().await.total, 1);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let aggregator = ResultAggregator::with_capacity("huge", usize::MAX);
        let capacity = aggregator.snapshot().await.records.capacity();
        assert!(capacity <= MAX_RESERVED_RECORDS * 2);
    }
}
