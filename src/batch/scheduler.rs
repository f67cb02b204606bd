use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use super::types::{BatchAction, BatchCounts, BatchJob, BatchSummary, JobId, JobStatus};
use crate::artifact::Artifact;
use crate::config::{BatchConfig, DEFAULT_BATCH_CONCURRENCY};
use crate::edit::{apply_action, EditAction};
use crate::error::EditError;
use crate::model::ModelService;
use crate::raster::archive::package_zip;

struct BatchState {
    jobs: Vec<BatchJob>,
    next_id: u64,
    generation: u64,
    running: bool,
}

impl BatchState {
    fn job_mut(&mut self, id: JobId) -> Option<&mut BatchJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }
}

/// Marks a batch run in progress.
///
/// Dropping it while the run is still marked running means the `process`
/// future was cancelled: the batch is released and jobs left mid-flight go
/// back to pending so the next run picks them up.
struct ActiveRun<'a> {
    state: &'a Mutex<BatchState>,
    generation: u64,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != self.generation || !state.running {
            return;
        }
        state.running = false;
        let mut requeued = 0;
        for job in state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Processing)
        {
            job.status = JobStatus::Pending;
            requeued += 1;
        }
        warn!("Batch run cancelled, {} jobs returned to pending", requeued);
    }
}

/// Applies one action to many images with a bounded number of model calls
/// in flight.
///
/// Workers pull from a shared queue, so a worker that finishes early picks
/// up the next job immediately. All workers run on the calling task.
pub struct BatchScheduler<M> {
    model: Arc<M>,
    concurrency: usize,
    state: Mutex<BatchState>,
}

impl<M: ModelService> BatchScheduler<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self::with_concurrency(model, DEFAULT_BATCH_CONCURRENCY)
    }

    pub fn with_config(model: Arc<M>, config: &BatchConfig) -> Self {
        Self::with_concurrency(model, config.concurrency)
    }

    pub fn with_concurrency(model: Arc<M>, concurrency: usize) -> Self {
        Self {
            model,
            concurrency: concurrency.max(1),
            state: Mutex::new(BatchState {
                jobs: Vec::new(),
                next_id: 1,
                generation: 0,
                running: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn add_file(&self, source: Artifact) -> JobId {
        let mut state = self.lock();
        let id = JobId(state.next_id);
        state.next_id += 1;
        debug!("Queued {} as {}", source.filename(), id);
        state.jobs.push(BatchJob::new(id, source));
        id
    }

    pub fn jobs(&self) -> Vec<BatchJob> {
        self.lock().jobs.clone()
    }

    pub fn job(&self, id: JobId) -> Option<BatchJob> {
        self.lock().jobs.iter().find(|j| j.id == id).cloned()
    }

    pub fn counts(&self) -> BatchCounts {
        self.lock().counts()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// True when there is at least one job and every job is done.
    pub fn all_finished(&self) -> bool {
        let counts = self.counts();
        counts.total() > 0 && counts.done == counts.total()
    }

    /// Run `action` over every pending or failed job.
    ///
    /// Jobs already done are left alone, so calling this again after a
    /// partial failure only retries the failures.
    pub async fn process(&self, action: BatchAction) -> Result<BatchSummary, EditError> {
        let (generation, queue) = {
            let mut state = self.lock();
            if state.running {
                warn!("Batch already running, rejecting a second run");
                return Err(EditError::Busy);
            }
            let queue: VecDeque<JobId> = state
                .jobs
                .iter()
                .filter(|j| j.is_runnable())
                .map(|j| j.id)
                .collect();
            if queue.is_empty() {
                info!("Batch has nothing to process ({} jobs)", state.jobs.len());
                return Ok(BatchSummary {
                    total: state.jobs.len(),
                    processed: 0,
                    succeeded: 0,
                    failed: 0,
                });
            }
            state.running = true;
            (state.generation, queue)
        };

        let _run = ActiveRun {
            state: &self.state,
            generation,
        };
        let edit: EditAction = action.into();
        let workers = self.concurrency.min(queue.len());
        info!(
            "Batch {}: {} jobs, {} workers",
            edit.kind(),
            queue.len(),
            workers
        );

        let queue = Mutex::new(queue);
        let tallies =
            join_all((0..workers).map(|worker| self.run_worker(worker, generation, &queue, &edit)))
                .await;

        let mut state = self.lock();
        if state.generation != generation {
            warn!("Batch was cleared while running; results discarded");
            return Err(EditError::Stale);
        }
        state.running = false;

        let (succeeded, failed) = tallies
            .into_iter()
            .fold((0, 0), |(s, f), (ws, wf)| (s + ws, f + wf));
        let summary = BatchSummary {
            total: state.jobs.len(),
            processed: succeeded + failed,
            succeeded,
            failed,
        };
        info!(
            "Batch complete: {} total, {} succeeded, {} failed",
            summary.total, summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    async fn run_worker(
        &self,
        worker: usize,
        generation: u64,
        queue: &Mutex<VecDeque<JobId>>,
        action: &EditAction,
    ) -> (usize, usize) {
        let (mut succeeded, mut failed) = (0, 0);
        loop {
            let next = queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(id) = next else {
                break;
            };
            let Some(source) = self.start_job(generation, id) else {
                break;
            };

            debug!("Worker {} processing {}", worker, id);
            let outcome = apply_action(self.model.as_ref(), &source, action).await;
            match self.finish_job(generation, id, outcome) {
                Some(true) => succeeded += 1,
                Some(false) => failed += 1,
                None => break,
            }
        }
        (succeeded, failed)
    }

    fn start_job(&self, generation: u64, id: JobId) -> Option<Arc<Artifact>> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        let job = state.job_mut(id)?;
        job.status = JobStatus::Processing;
        job.error_message = None;
        Some(job.source.clone())
    }

    /// Record a job's outcome; `None` when the batch was cleared meanwhile.
    fn finish_job(
        &self,
        generation: u64,
        id: JobId,
        outcome: Result<Artifact, EditError>,
    ) -> Option<bool> {
        let mut state = self.lock();
        if state.generation != generation {
            debug!("Dropping late result for {}", id);
            return None;
        }
        let job = state.job_mut(id)?;
        match outcome {
            Ok(result) => {
                info!("  {} done: {}", id, result.filename());
                job.result = Some(Arc::new(result));
                job.status = JobStatus::Done;
                Some(true)
            }
            Err(e) => {
                warn!("  {} failed: {}", id, e);
                job.status = JobStatus::Error;
                job.error_message = Some(e.to_string());
                Some(false)
            }
        }
    }

    /// Forget every job. Results of a run still in flight are discarded.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.running = false;
        let dropped = state.jobs.len();
        state.jobs.clear();
        info!("Cleared batch ({} jobs)", dropped);
    }

    /// Package every result into one zip, keeping each result's filename.
    pub fn download_all(&self, filename: &str) -> Result<Artifact, EditError> {
        let state = self.lock();
        let counts = state.counts();
        if counts.total() == 0 || counts.done != counts.total() {
            return Err(EditError::BatchIncomplete {
                pending: counts.total() - counts.done,
                total: counts.total(),
            });
        }
        let results: Vec<&Artifact> = state
            .jobs
            .iter()
            .filter_map(|j| j.result.as_deref())
            .collect();
        info!("Packaging {} batch results into {}", results.len(), filename);
        Ok(package_zip(&results, filename)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{solid_png, MockModel};

    fn filter(prompt: &str) -> BatchAction {
        BatchAction::Filter {
            prompt: prompt.to_string(),
        }
    }

    fn scheduler_with(model: MockModel, files: usize) -> (BatchScheduler<MockModel>, Arc<MockModel>) {
        let model = Arc::new(model);
        let scheduler = BatchScheduler::new(model.clone());
        for i in 0..files {
            scheduler.add_file(solid_png(4, 4, &format!("photo-{}.jpg", i)));
        }
        (scheduler, model)
    }

    #[tokio::test]
    async fn test_never_more_than_three_in_flight() {
        let (scheduler, model) =
            scheduler_with(MockModel::with_delay(Duration::from_millis(15)), 10);

        let (summary, max_seen) = tokio::join!(scheduler.process(filter("noir")), async {
            let mut max_seen = 0;
            loop {
                tokio::time::sleep(Duration::from_millis(2)).await;
                let counts = scheduler.counts();
                max_seen = max_seen.max(counts.processing);
                if !scheduler.is_running() {
                    break max_seen;
                }
            }
        });

        let summary = summary.unwrap();
        assert_eq!(summary.succeeded, 10);
        assert!(max_seen <= 3);
        assert_eq!(model.max_in_flight(), 3);
        assert!(scheduler.all_finished());
    }

    #[tokio::test]
    async fn test_rerun_skips_done_jobs() {
        let (scheduler, model) = scheduler_with(MockModel::new(), 4);
        scheduler.process(filter("noir")).await.unwrap();
        assert_eq!(model.calls(), 4);

        let before: Vec<_> = scheduler
            .jobs()
            .iter()
            .map(|j| j.result.as_ref().unwrap().id())
            .collect();
        let summary = scheduler.process(filter("noir")).await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(model.calls(), 4);

        let after: Vec<_> = scheduler
            .jobs()
            .iter()
            .map(|j| j.result.as_ref().unwrap().id())
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_retried() {
        let (scheduler, model) = scheduler_with(MockModel::new(), 5);
        model.fail_next(2);

        let summary = scheduler.process(filter("noir")).await.unwrap();
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 2);
        assert!(!scheduler.all_finished());

        let failed: Vec<_> = scheduler
            .jobs()
            .into_iter()
            .filter(|j| j.status == JobStatus::Error)
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|j| j.error_message.is_some()));

        let summary = scheduler.process(filter("noir")).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(scheduler.all_finished());
        assert!(scheduler.jobs().iter().all(|j| j.error_message.is_none()));
    }

    #[tokio::test]
    async fn test_second_run_while_running_is_busy() {
        let (scheduler, _) = scheduler_with(MockModel::with_delay(Duration::from_millis(20)), 2);

        let (first, second) = tokio::join!(scheduler.process(filter("noir")), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            scheduler.process(filter("sepia")).await
        });
        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), EditError::Busy);
    }

    #[tokio::test]
    async fn test_clear_mid_run_discards_results() {
        let (scheduler, _) = scheduler_with(MockModel::with_delay(Duration::from_millis(20)), 4);

        let (result, _) = tokio::join!(scheduler.process(filter("noir")), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            scheduler.clear();
        });
        assert_eq!(result.unwrap_err(), EditError::Stale);
        assert!(scheduler.jobs().is_empty());
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_cancelled_run_requeues_jobs() {
        let (scheduler, _) = scheduler_with(MockModel::with_delay(Duration::from_millis(30)), 4);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(5), scheduler.process(filter("noir"))).await;
        assert!(timed_out.is_err());
        assert!(!scheduler.is_running());
        assert_eq!(
            scheduler.counts(),
            BatchCounts {
                pending: 4,
                ..BatchCounts::default()
            }
        );

        let summary = scheduler.process(filter("noir")).await.unwrap();
        assert_eq!(summary.succeeded, 4);
        assert!(scheduler.all_finished());
    }

    #[tokio::test]
    async fn test_download_requires_all_done() {
        let (scheduler, _) = scheduler_with(MockModel::new(), 0);
        assert!(!scheduler.all_finished());
        assert_eq!(
            scheduler.download_all("batch.zip").unwrap_err(),
            EditError::BatchIncomplete {
                pending: 0,
                total: 0
            }
        );

        scheduler.add_file(solid_png(4, 4, "a.jpg"));
        scheduler.add_file(solid_png(4, 4, "b.jpg"));
        assert_eq!(
            scheduler.download_all("batch.zip").unwrap_err(),
            EditError::BatchIncomplete {
                pending: 2,
                total: 2
            }
        );

        scheduler.process(filter("noir")).await.unwrap();
        let archive = scheduler.download_all("batch.zip").unwrap();
        assert_eq!(archive.mime_type(), "application/zip");

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes().to_vec())).unwrap();
        let mut names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }
}
