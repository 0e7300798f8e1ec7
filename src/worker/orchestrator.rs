use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use uuid::Uuid;
use crate::errors::{WorkerError, WorkerResult};
use crate::models::{Category, ProgressRecord, SearchRequest, TaskStatus};
use crate::services::{Notifier, ProgressStore, SearchPipeline};

/// Path of the artifact the aggregation step leaves behind for `date`.
pub fn artifact_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("tenders_{}_filtered.csv", date.format("%Y-%m-%d")))
}

/// Where a task's own copy of the day's artifact is kept. Later tasks on the
/// same day overwrite the shared file, never this one.
pub fn task_artifact_path(output_dir: &Path, task_id: &str) -> PathBuf {
    output_dir.join("results").join(format!("{}.csv", task_id))
}

async fn keep_artifact(artifact: &Path, kept: &Path) -> WorkerResult<()> {
    if let Some(parent) = kept.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(artifact, kept).await?;
    tracing::debug!("Kept {} as {}", artifact.display(), kept.display());
    Ok(())
}

pub fn email_subject(keywords: &[String]) -> String {
    format!("Search Results for {}", keywords.join(", "))
}

pub fn email_body(keywords: &[String], category: Category) -> String {
    format!(
        "Keywords: {}\nSelected Option: {}\nPlease find the attached results.",
        keywords.join(", "),
        category
    )
}

/// A submitted search waiting for, or going through, processing.
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub task_id: String,
    pub username: String,
    pub request: SearchRequest,
}

#[derive(Debug)]
struct Outcome {
    artifact: Option<PathBuf>,
}

/// Drives a task through RUNNING to a terminal state.
pub struct Orchestrator {
    store: Arc<dyn ProgressStore>,
    pipeline: Arc<dyn SearchPipeline>,
    notifier: Arc<dyn Notifier>,
    output_dir: PathBuf,
    delay: Duration,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        pipeline: Arc<dyn SearchPipeline>,
        notifier: Arc<dyn Notifier>,
        output_dir: PathBuf,
        delay: Duration,
    ) -> Self {
        Self { store, pipeline, notifier, output_dir, delay }
    }

    /// Opens a task: writes the RUNNING record and indexes it for the user.
    pub async fn begin(&self, username: &str, request: SearchRequest) -> WorkerResult<SearchJob> {
        let task_id = Uuid::new_v4().to_string();
        let record = ProgressRecord::running(request.keywords.clone(), request.category);

        self.store.save(username, &task_id, &record).await?;
        self.store.record_task(username, &task_id).await?;

        tracing::info!(
            "Opened task {} for {} with {} keywords",
            task_id,
            username,
            request.keywords.len()
        );
        Ok(SearchJob {
            task_id,
            username: username.to_string(),
            request,
        })
    }

    /// Runs the processing steps and always finishes the record, whatever
    /// they did (including panicking). Returns the terminal status.
    pub async fn process(self: &Arc<Self>, job: SearchJob) -> TaskStatus {
        let this = Arc::clone(self);
        let step_job = job.clone();
        let outcome = match tokio::spawn(async move { this.run_steps(&step_job).await }).await {
            Ok(result) => result,
            Err(e) => Err(WorkerError::TaskPanic(e.to_string())),
        };

        let status = match &outcome {
            Ok(_) => TaskStatus::Succeeded,
            Err(e) => {
                tracing::error!("Task {} for {} failed: {}", job.task_id, job.username, e);
                TaskStatus::Failed
            }
        };

        if let Err(e) = self.finish(&job, status, outcome).await {
            tracing::error!("Failed to finish task {}: {}", job.task_id, e);
        }
        status
    }

    async fn run_steps(&self, job: &SearchJob) -> WorkerResult<Outcome> {
        let mut record = self.store.load(&job.username, &job.task_id).await?;
        record.mark_running();
        self.store.save(&job.username, &job.task_id, &record).await?;

        if !self.delay.is_zero() {
            tracing::debug!("Task {} waiting {:?} before searching", job.task_id, self.delay);
            sleep(self.delay).await;
        }

        let request = &job.request;
        let subject = email_subject(&request.keywords);
        let body = email_body(&request.keywords, request.category);

        self.pipeline
            .fetch_terms(&request.keywords, request.category)
            .await
            .map_err(|e| WorkerError::Search(format!("{:#}", e)))?;
        self.pipeline
            .aggregate()
            .await
            .map_err(|e| WorkerError::Aggregate(format!("{:#}", e)))?;

        let artifact = artifact_path(&self.output_dir, Local::now().date_naive());
        let found = tokio::fs::metadata(&artifact)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        if !found {
            tracing::info!("No artifact at {}, task {} found nothing", artifact.display(), job.task_id);
            self.notifier
                .send_no_results(&request.recipients, &subject, &body)
                .await
                .map_err(|e| WorkerError::Notify(format!("{:#}", e)))?;
            return Ok(Outcome { artifact: None });
        }

        let kept = task_artifact_path(&self.output_dir, &job.task_id);
        keep_artifact(&artifact, &kept).await?;

        self.notifier
            .send_results(&request.recipients, &subject, &body, &kept)
            .await
            .map_err(|e| WorkerError::Notify(format!("{:#}", e)))?;
        Ok(Outcome { artifact: Some(kept) })
    }

    async fn finish(
        &self,
        job: &SearchJob,
        status: TaskStatus,
        outcome: WorkerResult<Outcome>,
    ) -> WorkerResult<()> {
        let mut record = self.store.load(&job.username, &job.task_id).await?;
        record.finish(status);

        match outcome {
            Ok(Outcome { artifact }) => {
                record.results_found = Some(artifact.is_some());
                record.artifact = artifact.map(|p| p.display().to_string());
            }
            Err(e) => record.error = Some(e.to_string()),
        }

        self.store.save(&job.username, &job.task_id, &record).await?;
        tracing::info!("Task {} for {} finished as {:?}", job.task_id, job.username, status);
        Ok(())
    }
}
