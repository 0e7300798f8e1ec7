use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use crate::errors::{WorkerError, WorkerResult};
use crate::models::TaskStatus;
use super::orchestrator::{Orchestrator, SearchJob};

struct QueuedJob {
    job: SearchJob,
    done: oneshot::Sender<TaskStatus>,
}

/// Resolves once the worker has written the task's terminal status.
pub struct TaskHandle {
    pub task_id: String,
    done: oneshot::Receiver<TaskStatus>,
}

impl TaskHandle {
    pub async fn wait(self) -> WorkerResult<TaskStatus> {
        self.done.await.map_err(|_| WorkerError::QueueClosed)
    }
}

/// Hands submitted jobs to a fixed pool of workers.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
}

impl TaskQueue {
    /// Spawns `worker_count` workers, at most `max_concurrent_tasks` of which process at once.
    pub fn start(orchestrator: Arc<Orchestrator>, worker_count: usize, max_concurrent_tasks: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let semaphore = Arc::new(Semaphore::new(max_concurrent_tasks.max(1)));

        for worker_id in 0..worker_count.max(1) {
            tokio::spawn(worker_process(
                worker_id,
                orchestrator.clone(),
                receiver.clone(),
                semaphore.clone(),
            ));
        }

        Self { sender }
    }

    pub fn enqueue(&self, job: SearchJob) -> WorkerResult<TaskHandle> {
        let (done_tx, done_rx) = oneshot::channel();
        let task_id = job.task_id.clone();

        self.sender
            .send(QueuedJob { job, done: done_tx })
            .map_err(|_| WorkerError::QueueClosed)?;

        tracing::debug!("Queued task {}", task_id);
        Ok(TaskHandle { task_id, done: done_rx })
    }
}

async fn worker_process(
    worker_id: usize,
    orchestrator: Arc<Orchestrator>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<QueuedJob>>>,
    semaphore: Arc<Semaphore>,
) {
    tracing::info!("Worker {} started", worker_id);

    loop {
        // Take a slot before taking a job
        let _permit = match semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!("Worker {} lost its semaphore: {}", worker_id, e);
                return;
            }
        };

        let next = receiver.lock().await.recv().await;
        let Some(QueuedJob { job, done }) = next else {
            tracing::info!("Task queue closed, worker {} stopping", worker_id);
            return;
        };

        tracing::debug!("Worker {} processing task {} for {}", worker_id, job.task_id, job.username);
        let status = orchestrator.process(job).await;

        // Nobody may be waiting on the handle any more
        let _ = done.send(status);
    }
}
