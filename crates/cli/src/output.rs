use crate::error::CliError;
use engine_runtime::execution::executor::JobExecution;
use model::{core::identifiers::InstanceId, execution::step::StepExecution};

pub fn print_execution(execution: &JobExecution) {
    println!(
        "Job '{}' instance '{}' finished {}",
        execution.job_name, execution.instance_id, execution.status
    );
    print_steps(&execution.steps);
}

pub fn print_status(
    job: &str,
    instance: &InstanceId,
    steps: &[StepExecution],
    as_json: bool,
) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(steps)?);
        return Ok(());
    }

    if steps.is_empty() {
        println!("No executions recorded for job '{job}' instance '{instance}'");
    } else {
        println!("Progress for job '{job}' / instance '{instance}':");
        print_steps(steps);
    }
    Ok(())
}

fn print_steps(steps: &[StepExecution]) {
    println!(
        "{:<24} {:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}  {}",
        "Step", "Status", "Read", "Written", "Filter", "Skip", "Commit", "Attempt", "Cursor"
    );
    for step in steps {
        println!(
            "{:<24} {:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}  {}",
            step.step_name,
            step.status.as_str(),
            step.read_count,
            step.write_count,
            step.filter_count,
            step.skip_count,
            step.commit_count,
            step.attempt,
            step.last_committed
        );
        if let Some(failure) = &step.failure {
            let record = failure.record_id.as_deref().unwrap_or("-");
            println!(
                "  {} in chunk {} (record {record}): {}",
                failure.kind, failure.chunk_index, failure.message
            );
        }
    }
}
