#[cfg(test)]
mod tests {
    use crate::utils::{STEP, copy_job, numbers};
    use engine_core::{
        connectors::memory::MemorySink,
        state::{StateStore, WalEntry, memory_store::MemoryStateStore, sled_store::SledStateStore},
    };
    use engine_processing::error::{RestartError, StepError};
    use engine_runtime::{
        error::JobError,
        execution::{executor::JobLauncher, instance::make_instance_id},
    };
    use model::{
        core::identifiers::StepKey,
        execution::{params::JobParameters, status::BatchStatus, step::StepExecution},
        pagination::cursor::Cursor,
    };
    use std::{sync::Arc, time::Duration};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    fn sled_launcher(path: &std::path::Path) -> JobLauncher {
        let store: Arc<dyn StateStore> = Arc::new(SledStateStore::open(path).unwrap());
        JobLauncher::new(store, CancellationToken::new())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_resumes_after_last_committed_chunk() {
        let dir = tempdir().unwrap();
        let params = JobParameters::new().with("run", "restart");

        // First launch fails on record 8, inside the second chunk.
        {
            let sink = MemorySink::new("sink").failing_on("8");
            let job = copy_job("resumable", numbers(12), sink.clone(), 5);
            let execution = sled_launcher(dir.path()).run(&job, &params).await.unwrap();

            assert_eq!(execution.status, BatchStatus::Failed);
            assert_eq!(sink.items().await, numbers(5));
        }

        // A fresh process sees the persisted state and picks up at offset 5.
        let launcher = sled_launcher(dir.path());
        let status = launcher.status("resumable", &params).await.unwrap();
        assert_eq!(status[0].status, BatchStatus::Failed);
        assert_eq!(status[0].last_committed, Cursor::offset(5));

        let sink = MemorySink::new("sink");
        let job = copy_job("resumable", numbers(12), sink.clone(), 5);
        let execution = launcher.run(&job, &params).await.unwrap();

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(sink.batches().await, vec![(6..=10).collect(), vec![11, 12]]);

        let step = execution.step(STEP).unwrap();
        assert_eq!(step.attempt, 2);
        assert_eq!(step.read_count, 12);
        assert_eq!(step.write_count, 12);
        assert_eq!(step.commit_count, 3);
        assert_eq!(step.rollback_count, 1);
        assert!(step.failure.is_none());
    }

    #[tokio::test]
    async fn completed_instance_refuses_to_run_again() {
        let dir = tempdir().unwrap();
        let launcher = sled_launcher(dir.path());
        let params = JobParameters::new().with("day", "2024-03-01");
        let sink = MemorySink::new("sink");
        let job = copy_job("once", numbers(3), sink.clone(), 2);

        launcher.run(&job, &params).await.unwrap();
        let err = launcher.run(&job, &params).await.unwrap_err();
        assert!(matches!(
            &err,
            JobError::Restart(RestartError::JobAlreadyCompleted { job, .. }) if job == "once"
        ));
        assert_eq!(sink.items().await, numbers(3));

        // Different parameters address a different instance.
        let other = JobParameters::new().with("day", "2024-03-02");
        let execution = launcher.run(&job, &other).await.unwrap();
        assert_eq!(execution.status, BatchStatus::Completed);
        assert_ne!(execution.instance_id, make_instance_id("once", &params));
    }

    #[tokio::test]
    async fn foreign_position_is_an_incompatible_restart() {
        let store = Arc::new(MemoryStateStore::new());
        let params = JobParameters::new();
        let key = StepKey::new("foreign", make_instance_id("foreign", &params), STEP);

        let mut previous = StepExecution::new(&key);
        previous.mark_started();
        previous.last_committed = Cursor::sort_key("id", 40);
        previous.mark_failed(
            model::execution::status::ErrorKind::Write,
            None,
            "crashed".to_string(),
        );
        store.save_execution(&previous).await.unwrap();

        let launcher = JobLauncher::new(store.clone(), CancellationToken::new());
        let sink = MemorySink::new("sink");
        let job = copy_job("foreign", numbers(3), sink.clone(), 2);

        let err = launcher.run(&job, &params).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::Step(StepError::Restart(RestartError::IncompatiblePosition { .. }))
        ));
        assert_eq!(sink.begin_count(), 0);

        let persisted = store.load_execution(&key).await.unwrap().unwrap();
        assert_eq!(persisted.status, BatchStatus::Failed);
        assert_eq!(persisted.last_committed, Cursor::sort_key("id", 40));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_request_halts_between_chunks_and_resumes() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let params = JobParameters::new();
        let sink = MemorySink::new("sink").with_write_delay(Duration::from_millis(20));
        let job = copy_job("stoppable", numbers(20), sink.clone(), 2);

        let cancel = CancellationToken::new();
        let launcher = JobLauncher::new(Arc::clone(&store), cancel.clone());
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let execution = launcher.run(&job, &params).await.unwrap();
        trigger.await.unwrap();

        assert_eq!(execution.status, BatchStatus::Stopped);
        let written = sink.items().await;
        assert!(written.len() < 20);
        assert_eq!(written.len() % 2, 0, "only whole chunks are committed");
        assert_eq!(
            execution.step(STEP).unwrap().last_committed,
            Cursor::offset(written.len() as u64)
        );

        let resumed = JobLauncher::new(store, CancellationToken::new())
            .run(&job, &params)
            .await
            .unwrap();
        assert_eq!(resumed.status, BatchStatus::Completed);
        assert_eq!(sink.items().await, numbers(20));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn instances_run_concurrently_on_one_store() {
        let dir = tempdir().unwrap();
        let launcher = sled_launcher(dir.path());

        let sinks: Vec<MemorySink<i64>> = (0..3).map(|i| MemorySink::new(format!("sink-{i}"))).collect();
        let jobs: Vec<_> = sinks
            .iter()
            .map(|sink| copy_job("parallel", numbers(17), sink.clone(), 4))
            .collect();
        let params: Vec<_> = (0..3)
            .map(|i| JobParameters::new().with("partition", i.to_string()))
            .collect();

        let runs = jobs
            .iter()
            .zip(&params)
            .map(|(job, params)| launcher.run(job, params));
        let executions = futures::future::join_all(runs).await;

        for (execution, sink) in executions.into_iter().zip(&sinks) {
            assert_eq!(execution.unwrap().status, BatchStatus::Completed);
            assert_eq!(sink.items().await, numbers(17));
        }
        for params in &params {
            let status = launcher.status("parallel", params).await.unwrap();
            assert_eq!(status[0].write_count, 17);
        }
    }

    #[tokio::test]
    async fn wal_keeps_commits_until_the_step_completes() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let launcher = JobLauncher::new(Arc::clone(&store), CancellationToken::new());
        let params = JobParameters::new();

        let failing = MemorySink::new("sink").failing_on("7");
        let job = copy_job("logged", numbers(7), failing, 3);
        let execution = launcher.run(&job, &params).await.unwrap();
        assert_eq!(execution.status, BatchStatus::Failed);

        let wal = store.iter_wal(&execution.instance_id).await.unwrap();
        assert!(matches!(wal.first(), Some(WalEntry::StepStart { .. })));
        assert!(matches!(wal.last(), Some(WalEntry::StepFailed { .. })));
        let commits = wal
            .iter()
            .filter(|e| matches!(e, WalEntry::ChunkCommit { .. }))
            .count();
        assert_eq!(commits, 2);
        assert!(wal.iter().any(|e| matches!(e, WalEntry::ChunkRollback { .. })));

        let job = copy_job("logged", numbers(7), MemorySink::new("sink"), 3);
        let execution = launcher.run(&job, &params).await.unwrap();
        assert_eq!(execution.status, BatchStatus::Completed);

        let wal = store.iter_wal(&execution.instance_id).await.unwrap();
        assert!(!wal.iter().any(WalEntry::is_chunk_entry));
        assert!(matches!(wal.last(), Some(WalEntry::StepDone { .. })));
        let starts = wal
            .iter()
            .filter(|e| matches!(e, WalEntry::StepStart { .. }))
            .count();
        assert_eq!(starts, 2);
    }
}
