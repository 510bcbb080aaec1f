//! Concurrency scheduler
//!
//! Runs a [`FileProcessor`] over a task set under one of four strategies.
//! Every task that is dispatched yields exactly one outcome, and outcomes
//! come back in input order whatever the strategy. Each file runs on its
//! own tokio task so a panic is contained to that file.

use crate::chain::FileProcessor;
use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use syntaxfix_core::{FileTask, FixOutcome, Strategy, DEFAULT_BATCH_SIZE};
use syntaxfix_utils::tracing::{batch_span, shard_span};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn, Instrument};

/// Stops a run from admitting new files
#[derive(Debug, Default)]
pub struct RunControl {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancelled or past the deadline
    pub fn should_stop(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<FixOutcome>,
    /// Set when files were left unprocessed by a cancel or deadline
    pub cancelled: bool,
    pub skipped: usize,
    pub duplicates_removed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    workers: usize,
    batch_size: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(syntaxfix_config::default_workers(), DEFAULT_BATCH_SIZE)
    }
}

impl Scheduler {
    pub fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn run(
        &self,
        tasks: Vec<FileTask>,
        strategy: Strategy,
        processor: Arc<dyn FileProcessor>,
        control: &Arc<RunControl>,
    ) -> RunReport {
        let submitted = tasks.len();
        let tasks = dedup_by_path(tasks);
        let duplicates_removed = submitted - tasks.len();
        if duplicates_removed > 0 {
            debug!(duplicates_removed, "dropped duplicate file tasks");
        }

        info!(
            strategy = %strategy,
            files = tasks.len(),
            workers = self.workers,
            "dispatching files"
        );

        let slots = match strategy {
            Strategy::Sequential => self.sequential(&tasks, &processor, control).await,
            Strategy::Batched => self.batched(&tasks, &processor, control).await,
            Strategy::BoundedConcurrent => self.bounded(&tasks, &processor, control).await,
            Strategy::ShardedParallel => self.sharded(&tasks, &processor, control).await,
        };

        let skipped = slots.iter().filter(|slot| slot.is_none()).count();
        if skipped > 0 {
            warn!(skipped, "run stopped before every file was processed");
        }

        RunReport {
            outcomes: slots.into_iter().flatten().collect(),
            cancelled: skipped > 0,
            skipped,
            duplicates_removed,
        }
    }

    async fn sequential(
        &self,
        tasks: &[FileTask],
        processor: &Arc<dyn FileProcessor>,
        control: &RunControl,
    ) -> Vec<Option<FixOutcome>> {
        let mut slots = vec![None; tasks.len()];
        for (index, task) in tasks.iter().enumerate() {
            if control.should_stop() {
                break;
            }
            slots[index] = Some(process_isolated(Arc::clone(processor), task.clone()).await);
        }
        slots
    }

    async fn batched(
        &self,
        tasks: &[FileTask],
        processor: &Arc<dyn FileProcessor>,
        control: &RunControl,
    ) -> Vec<Option<FixOutcome>> {
        let mut slots = vec![None; tasks.len()];
        for (batch_index, batch) in tasks.chunks(self.batch_size).enumerate() {
            if control.should_stop() {
                break;
            }
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|task| process_isolated(Arc::clone(processor), task.clone())),
            )
            .instrument(batch_span(batch_index, batch.len()))
            .await;

            let offset = batch_index * self.batch_size;
            for (position, outcome) in outcomes.into_iter().enumerate() {
                slots[offset + position] = Some(outcome);
            }
        }
        slots
    }

    async fn bounded(
        &self,
        tasks: &[FileTask],
        processor: &Arc<dyn FileProcessor>,
        control: &Arc<RunControl>,
    ) -> Vec<Option<FixOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut join_set = JoinSet::new();

        for (index, task) in tasks.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let processor = Arc::clone(processor);
            let control = Arc::clone(control);
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                if control.should_stop() {
                    return (index, None);
                }
                (index, Some(process_isolated(processor, task).await))
            });
        }

        let mut slots = vec![None; tasks.len()];
        collect_indexed(&mut join_set, &mut slots, |(index, outcome)| vec![(index, outcome)]).await;
        slots
    }

    async fn sharded(
        &self,
        tasks: &[FileTask],
        processor: &Arc<dyn FileProcessor>,
        control: &Arc<RunControl>,
    ) -> Vec<Option<FixOutcome>> {
        let shard_size = tasks.len().div_ceil(self.workers).max(1);
        let mut join_set = JoinSet::new();

        for (shard, chunk) in tasks.chunks(shard_size).enumerate() {
            let offset = shard * shard_size;
            let chunk = chunk.to_vec();
            let processor = Arc::clone(processor);
            let control = Arc::clone(control);
            let span = shard_span(shard, chunk.len());
            join_set.spawn(
                async move {
                    let mut done = Vec::with_capacity(chunk.len());
                    for (position, task) in chunk.into_iter().enumerate() {
                        if control.should_stop() {
                            break;
                        }
                        let outcome = process_isolated(Arc::clone(&processor), task).await;
                        done.push((offset + position, Some(outcome)));
                    }
                    done
                }
                .instrument(span),
            );
        }

        let mut slots = vec![None; tasks.len()];
        collect_indexed(&mut join_set, &mut slots, |done| done).await;
        slots
    }
}

/// Keep the first task for each path, preserving order
fn dedup_by_path(tasks: Vec<FileTask>) -> Vec<FileTask> {
    let mut unique: IndexMap<PathBuf, FileTask> = IndexMap::with_capacity(tasks.len());
    for task in tasks {
        unique.entry(task.path.clone()).or_insert(task);
    }
    unique.into_values().collect()
}

async fn collect_indexed<T, F>(
    join_set: &mut JoinSet<T>,
    slots: &mut [Option<FixOutcome>],
    mut unpack: F,
) where
    T: Send + 'static,
    F: FnMut(T) -> Vec<(usize, Option<FixOutcome>)>,
{
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(done) => {
                for (index, outcome) in unpack(done) {
                    slots[index] = outcome;
                }
            }
            Err(e) => error!(error = %e, "scheduler task failed"),
        }
    }
}

/// Run one file on its own task, turning a panic into `processing_error`
async fn process_isolated(processor: Arc<dyn FileProcessor>, task: FileTask) -> FixOutcome {
    let started = Instant::now();
    let spawned = {
        let task = task.clone();
        tokio::spawn(async move { processor.process(&task).await })
    };

    match spawned.await {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = panic_message(e);
            error!(path = %task.path.display(), error = %message, "file processing faulted");
            FixOutcome::processing_error(&task, message).with_elapsed(started.elapsed())
        }
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "file processing panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use syntaxfix_core::{FixStatus, Language};

    #[derive(Default)]
    struct Probe {
        active: AtomicUsize,
        max_active: AtomicUsize,
        processed: AtomicUsize,
        delay_ms: u64,
        cancel_after: Option<(usize, Arc<RunControl>)>,
    }

    #[async_trait]
    impl FileProcessor for Probe {
        async fn process(&self, task: &FileTask) -> FixOutcome {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if task.path.ends_with("explode.js") {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("tool adapter blew up");
            }
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let processed = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, control)) = &self.cancel_after {
                if processed >= *limit {
                    control.cancel();
                }
            }
            FixOutcome::new(task, "local_primary", FixStatus::Success).with_counts(1, 1)
        }
    }

    fn tasks(count: usize) -> Vec<FileTask> {
        (0..count)
            .map(|i| FileTask::new(format!("src/file{i:03}.js"), Language::JavaScript, 10))
            .collect()
    }

    async fn run(
        scheduler: Scheduler,
        strategy: Strategy,
        tasks: Vec<FileTask>,
        probe: Arc<Probe>,
    ) -> RunReport {
        scheduler
            .run(tasks, strategy, probe, &Arc::new(RunControl::new()))
            .await
    }

    const ALL: [Strategy; 4] = [
        Strategy::Sequential,
        Strategy::Batched,
        Strategy::BoundedConcurrent,
        Strategy::ShardedParallel,
    ];

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_strategy_returns_one_outcome_per_task_in_order() {
        for strategy in ALL {
            let input = tasks(37);
            let report = run(Scheduler::new(4, 10), strategy, input.clone(), Arc::default()).await;

            assert_eq!(report.outcomes.len(), 37, "{strategy}");
            assert!(!report.cancelled);
            for (task, outcome) in input.iter().zip(&report.outcomes) {
                assert_eq!(task.path, outcome.path, "{strategy}");
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallelism_bounds() {
        let sequential = Arc::new(Probe {
            delay_ms: 2,
            ..Probe::default()
        });
        run(Scheduler::new(4, 10), Strategy::Sequential, tasks(8), sequential.clone()).await;
        assert_eq!(sequential.max_active.load(Ordering::SeqCst), 1);

        let batched = Arc::new(Probe {
            delay_ms: 10,
            ..Probe::default()
        });
        run(Scheduler::new(8, 3), Strategy::Batched, tasks(10), batched.clone()).await;
        assert!(batched.max_active.load(Ordering::SeqCst) <= 3);

        let bounded = Arc::new(Probe {
            delay_ms: 10,
            ..Probe::default()
        });
        run(Scheduler::new(2, 10), Strategy::BoundedConcurrent, tasks(12), bounded.clone()).await;
        assert!(bounded.max_active.load(Ordering::SeqCst) <= 2);

        let sharded = Arc::new(Probe {
            delay_ms: 10,
            ..Probe::default()
        });
        run(Scheduler::new(3, 10), Strategy::ShardedParallel, tasks(10), sharded.clone()).await;
        assert!(sharded.max_active.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panic_is_contained_to_one_file() {
        for strategy in ALL {
            let mut input = tasks(5);
            input.insert(2, FileTask::new("src/explode.js", Language::JavaScript, 10));

            let report = run(Scheduler::new(2, 2), strategy, input, Arc::default()).await;

            assert_eq!(report.outcomes.len(), 6);
            let failed: Vec<_> = report
                .outcomes
                .iter()
                .filter(|o| o.status == FixStatus::ProcessingError)
                .collect();
            assert_eq!(failed.len(), 1, "{strategy}");
            assert!(failed[0].path.ends_with("explode.js"));
            assert_eq!(failed[0].method, "error");
            assert_eq!(failed[0].details["error"], "tool adapter blew up");
        }
    }

    #[tokio::test]
    async fn test_duplicate_paths_processed_once() {
        let mut input = tasks(4);
        input.push(input[1].clone());
        input.push(input[3].clone());

        let probe = Arc::new(Probe::default());
        let report = run(Scheduler::new(2, 10), Strategy::Batched, input, probe.clone()).await;

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.duplicates_removed, 2);
        assert_eq!(probe.processed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancel_keeps_completed_outcomes() {
        let control = Arc::new(RunControl::new());
        let probe = Arc::new(Probe {
            cancel_after: Some((3, Arc::clone(&control))),
            ..Probe::default()
        });

        let report = Scheduler::new(2, 10)
            .run(tasks(10), Strategy::Sequential, probe, &control)
            .await;

        assert!(report.cancelled);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.skipped, 7);
    }

    #[tokio::test]
    async fn test_expired_deadline_dispatches_nothing() {
        let control = Arc::new(RunControl::with_timeout(Duration::ZERO));
        let report = Scheduler::new(2, 10)
            .run(tasks(4), Strategy::ShardedParallel, Arc::new(Probe::default()), &control)
            .await;

        assert!(report.cancelled);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.skipped, 4);
    }
}
