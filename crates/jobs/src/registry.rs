use crate::{context::JobContext, error::JobsError, order_recovery, post_block};
use engine_runtime::job::Job;

/// Registered jobs with a one-line description.
pub const JOBS: &[(&str, &str)] = &[
    (
        order_recovery::JOB_NAME,
        "Repairs order statuses that contradict their shipping id",
    ),
    (
        post_block::JOB_NAME,
        "Blocks posts reported heavily between startDateTimeStr and endDateTimeStr",
    ),
];

pub fn is_registered(name: &str) -> bool {
    JOBS.iter().any(|(job, _)| *job == name)
}

pub async fn build_job(name: &str, ctx: &JobContext) -> Result<Job, JobsError> {
    match name {
        order_recovery::JOB_NAME => order_recovery::build(ctx).await,
        post_block::JOB_NAME => post_block::build(ctx).await,
        other => Err(JobsError::UnknownJob(other.to_string())),
    }
}
