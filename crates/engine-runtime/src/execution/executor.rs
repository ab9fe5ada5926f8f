use crate::{error::JobError, execution::instance::make_instance_id, job::Job};
use chrono::{DateTime, Utc};
use engine_core::{
    retry::RetryPolicy,
    state::StateStore,
};
use engine_processing::{error::RestartError, step::StepContext};
use model::{
    core::identifiers::InstanceId,
    execution::{params::JobParameters, status::BatchStatus, step::StepExecution},
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of one launch of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobExecution {
    pub job_name: String,
    pub instance_id: InstanceId,
    pub status: BatchStatus,
    pub steps: Vec<StepExecution>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl JobExecution {
    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step_name == name)
    }

    /// The first step that did not complete, if any.
    pub fn failed_step(&self) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.status == BatchStatus::Failed)
    }
}

/// Aggregated status: the first non-completed step decides.
fn job_status(steps: &[StepExecution]) -> BatchStatus {
    steps
        .iter()
        .map(|s| s.status)
        .find(|status| *status != BatchStatus::Completed)
        .unwrap_or(BatchStatus::Completed)
}

/// Starts jobs against one state store.
#[derive(Clone)]
pub struct JobLauncher {
    store: Arc<dyn StateStore>,
    cancel: CancellationToken,
}

impl JobLauncher {
    pub fn new(store: Arc<dyn StateStore>, cancel: CancellationToken) -> Self {
        Self { store, cancel }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Runs `job` for `params`. Steps that already completed for this instance
    /// are skipped; the first unfinished step resumes after its last committed
    /// chunk. A step that does not complete ends the launch.
    pub async fn run(&self, job: &Job, params: &JobParameters) -> Result<JobExecution, JobError> {
        let instance_id = make_instance_id(job.name(), params);
        let ctx = StepContext {
            job_name: job.name().to_string(),
            instance_id: instance_id.clone(),
            store: Arc::clone(&self.store),
            cancel: self.cancel.clone(),
        };
        let started_at = Utc::now();
        info!(job = %job.name(), instance = %instance_id, params = %params.canonical(), "Launching job");

        let mut steps = Vec::with_capacity(job.steps().len());
        let mut ran_any = false;

        for step in job.steps() {
            let key = ctx.step_key(step.name());
            if let Some(existing) = self.store.load_execution(&key).await?
                && existing.is_completed()
            {
                info!(job = %job.name(), step = %step.name(), "Step already completed, skipping");
                steps.push(existing);
                continue;
            }

            ran_any = true;
            let exec = step.execute(&ctx).await?;
            let completed = exec.is_completed();
            steps.push(exec);
            if !completed {
                break;
            }
        }

        if !ran_any {
            return Err(RestartError::JobAlreadyCompleted {
                job: job.name().to_string(),
                instance: instance_id.to_string(),
            }
            .into());
        }

        let status = job_status(&steps);
        info!(job = %job.name(), instance = %instance_id, status = %status, "Job finished");
        Ok(JobExecution {
            job_name: job.name().to_string(),
            instance_id,
            status,
            steps,
            started_at,
            ended_at: Utc::now(),
        })
    }

    /// Re-launches a failed job while its failure is retryable under
    /// `policy`. Every re-launch resumes from the last committed chunk.
    pub async fn run_with_retry(
        &self,
        job: &Job,
        params: &JobParameters,
        policy: &RetryPolicy,
    ) -> Result<JobExecution, JobError> {
        let mut attempt = 0;
        loop {
            let execution = self.run(job, params).await?;
            attempt += 1;

            let Some(failure) = execution.failed_step().and_then(|s| s.failure.clone()) else {
                return Ok(execution);
            };
            if self.cancel.is_cancelled() || !policy.should_retry(failure.kind, attempt) {
                return Ok(execution);
            }

            let delay = policy.backoff_delay(attempt - 1);
            warn!(
                job = %job.name(),
                attempt,
                kind = %failure.kind,
                cursor = %failure.last_committed,
                delay_ms = delay.as_millis() as u64,
                "Job failed, relaunching from last committed chunk"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Persisted step executions of the instance addressed by `params`.
    pub async fn status(
        &self,
        job_name: &str,
        params: &JobParameters,
    ) -> Result<Vec<StepExecution>, JobError> {
        let instance_id = make_instance_id(job_name, params);
        Ok(self.store.list_executions(&instance_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobBuilder;
    use engine_core::{
        connectors::memory::{ListSource, MemorySink},
        state::memory_store::MemoryStateStore,
        transform::PassThrough,
    };
    use engine_processing::step::StepBuilder;
    use model::execution::status::ErrorKind;
    use std::time::Duration;

    fn copy_step(name: &str, items: Vec<i64>, sink: MemorySink<i64>) -> impl engine_processing::step::Step {
        StepBuilder::new(name)
            .source(ListSource::new("numbers", items))
            .transformer(PassThrough)
            .sink(sink)
            .chunk_size(2)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn runs_steps_in_order_and_refuses_second_launch() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let launcher = JobLauncher::new(store, CancellationToken::new());
        let first = MemorySink::new("first");
        let second = MemorySink::new("second");
        let job = JobBuilder::new("two-steps")
            .start(copy_step("a", vec![1, 2, 3], first.clone()))
            .next(copy_step("b", vec![4, 5], second.clone()))
            .build()
            .unwrap();
        let params = JobParameters::new().with("run", "1");

        let execution = launcher.run(&job, &params).await.unwrap();
        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(first.items().await, vec![1, 2, 3]);
        assert_eq!(second.items().await, vec![4, 5]);

        let err = launcher.run(&job, &params).await.unwrap_err();
        match err {
            JobError::Restart(RestartError::JobAlreadyCompleted { job, instance }) => {
                assert_eq!(job, "two-steps");
                assert_eq!(instance, make_instance_id("two-steps", &params).to_string());
            }
            other => panic!("unexpected error: {other}"),
        }

        let status = launcher.status("two-steps", &params).await.unwrap();
        assert_eq!(status.len(), 2);
    }

    #[tokio::test]
    async fn failed_step_halts_the_job() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let launcher = JobLauncher::new(store, CancellationToken::new());
        let second = MemorySink::new("second");
        let job = JobBuilder::new("halting")
            .start(copy_step("a", vec![1, 2, 3], MemorySink::new("first").failing_on("3")))
            .next(copy_step("b", vec![4], second.clone()))
            .build()
            .unwrap();

        let execution = launcher.run(&job, &JobParameters::new()).await.unwrap();
        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(execution.steps.len(), 1);
        assert_eq!(second.begin_count(), 0);

        let failure = execution.failed_step().and_then(|s| s.failure.clone()).unwrap();
        assert_eq!(failure.kind, ErrorKind::Write);
        assert_eq!(failure.record_id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn retry_gives_up_after_configured_attempts() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let launcher = JobLauncher::new(store, CancellationToken::new());
        let sink = MemorySink::new("sink").failing_on("2");
        let job = JobBuilder::new("flaky")
            .start(copy_step("a", vec![1, 2], sink.clone()))
            .build()
            .unwrap();
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);

        let execution = launcher
            .run_with_retry(&job, &JobParameters::new(), &policy)
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(sink.begin_count(), 3);
        assert_eq!(execution.steps[0].attempt, 3);
    }

    #[test]
    fn empty_job_is_rejected() {
        assert!(matches!(
            JobBuilder::new("empty").build(),
            Err(JobError::NoSteps(_))
        ));
    }
}
