use crate::api::executor::FetchExecutor;
use crate::api::model::{DecodeError, FetchReport};
use crate::core::stats::{FetchTally, Progress};
use crate::logging::{log, LogLevel};
use crate::model::common::FetchTarget;
use crate::model::output::FetchStatistics;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub struct BatchOutcome<T> {
    /// In completion order, chunk by chunk.
    pub reports: Vec<FetchReport<T>>,
    pub statistics: FetchStatistics,
    pub failed_targets: Vec<FetchTarget>,
}

/// Fetches `targets` in consecutive chunks of `chunk_size`.
///
/// Chunks run one after another; inside a chunk every target is in flight
/// at once, subject to the executor's limiter. `chunk_delay` is slept
/// between chunks, never after the last one.
pub async fn run_chunked<T, D>(
    executor: &FetchExecutor,
    targets: &[FetchTarget],
    chunk_size: usize,
    chunk_delay: Duration,
    decode: D,
) -> BatchOutcome<T>
where
    D: Fn(&FetchTarget, Bytes) -> Result<T, DecodeError>,
{
    let start = Instant::now();
    let chunk_size = chunk_size.max(1);
    let total_chunks = targets.len().div_ceil(chunk_size);
    let mut reports: Vec<FetchReport<T>> = Vec::with_capacity(targets.len());
    let mut tally = FetchTally::new(targets.len());
    let mut progress = Progress::new("Details", targets.len());

    for (index, chunk) in targets.chunks(chunk_size).enumerate() {
        log(
            LogLevel::Step,
            &format!(
                "Chunk {}/{} ({} targets)",
                index + 1,
                total_chunks,
                chunk.len()
            ),
        );

        let mut in_flight = stream::iter(chunk)
            .map(|target| executor.execute(target, &decode))
            .buffer_unordered(chunk.len());

        while let Some(report) = in_flight.next().await {
            tally.record(&report);
            progress.tick(report.outcome.is_success());
            reports.push(report);
        }

        if index + 1 < total_chunks && !chunk_delay.is_zero() {
            sleep(chunk_delay).await;
        }
    }

    let (statistics, failed_targets) = tally.finish(start.elapsed());
    BatchOutcome {
        reports,
        statistics,
        failed_targets,
    }
}
