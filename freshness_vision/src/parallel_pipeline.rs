// THEORY:
// Batch analysis fans a list of images out over a pool of workers and gathers
// the results back in submission order. A single dispatcher hands tasks to the
// workers round-robin; each worker moves the CPU-bound analysis onto tokio's
// blocking pool and answers on a oneshot channel.
//
// Images are independent, so workers share one read-only `FreshnessPipeline`
// and nothing else. A worker that panics costs only its own image, which comes
// back as the error result.

use crate::pipeline::{AnalysisResult, FreshnessPipeline};
use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Largest number of images accepted in one batch. Extra paths are dropped.
pub const MAX_BATCH_SIZE: usize = 10;

pub struct AnalysisTask {
    pub path: PathBuf,
    pub result_sender: oneshot::Sender<AnalysisResult>,
}

/// One batch entry: the submitted path and its analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: AnalysisResult,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<AnalysisTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers. Must be called from
    /// inside a tokio runtime.
    pub fn new(pipeline: Arc<FreshnessPipeline>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisTask>();
        let mut workers = Vec::with_capacity(worker_count + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<AnalysisTask>())
            .unzip();

        // Dispatcher
        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let worker_pipeline = Arc::clone(&pipeline);

            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let pipeline = Arc::clone(&worker_pipeline);
                    let path = task.path.clone();
                    debug!(worker_id, path = %path.display(), "worker picked up image");

                    let result = tokio::task::spawn_blocking(move || pipeline.analyze(&path))
                        .await
                        .unwrap_or_else(|err| {
                            warn!(worker_id, path = %task.path.display(), error = %err, "analysis task died");
                            AnalysisResult::failed()
                        });

                    let _ = task.result_sender.send(result);
                }
            }));
        }

        Self { task_sender, workers }
    }

    /// Queues one image. The receiver yields its result, or an error if the
    /// pool shut down before answering.
    pub fn submit(&self, path: PathBuf) -> oneshot::Receiver<AnalysisResult> {
        let (result_sender, result_receiver) = oneshot::channel();
        if self.task_sender.send(AnalysisTask { path, result_sender }).is_err() {
            warn!("worker pool is closed");
        }
        result_receiver
    }

    /// Stops accepting work and waits for in-flight images to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Analyses batches of up to [`MAX_BATCH_SIZE`] images concurrently.
pub struct BatchAnalyzer {
    worker_pool: WorkerPool,
    max_batch: usize,
}

impl BatchAnalyzer {
    /// One worker per logical CPU. Must be called from inside a tokio runtime.
    pub fn new(pipeline: FreshnessPipeline) -> Self {
        Self::with_workers(pipeline, num_cpus::get())
    }

    pub fn with_workers(pipeline: FreshnessPipeline, worker_count: usize) -> Self {
        Self {
            worker_pool: WorkerPool::new(Arc::new(pipeline), worker_count),
            max_batch: MAX_BATCH_SIZE,
        }
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Analyses each path and returns the results in input order. Paths past
    /// the batch limit are ignored.
    pub async fn analyze_batch<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<BatchItem> {
        if paths.len() > self.max_batch {
            warn!(
                submitted = paths.len(),
                limit = self.max_batch,
                "batch truncated"
            );
        }

        let pending: Vec<_> = paths
            .iter()
            .take(self.max_batch)
            .map(|path| {
                let path = path.as_ref().to_path_buf();
                let receiver = self.worker_pool.submit(path.clone());
                (path, receiver)
            })
            .collect();

        join_all(pending.into_iter().map(|(path, receiver)| async move {
            let result = receiver.await.unwrap_or_else(|_| {
                warn!(path = %path.display(), "no result from worker");
                AnalysisResult::failed()
            });
            BatchItem { path, result }
        }))
        .await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
