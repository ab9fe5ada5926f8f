#[cfg(test)]
mod tests {
    use crate::utils::{
        STEP, copy_job, copy_step, dropping, memory_launcher, numbers, rejecting,
        single_step_job,
    };
    use engine_core::{
        connectors::memory::{ListSource, MemorySink},
        retry::RetryPolicy,
    };
    use engine_processing::{
        config::{SkipPolicy, StepConfig},
        step::StepBuilder,
    };
    use model::{
        execution::{
            params::JobParameters,
            status::{BatchStatus, ErrorKind},
        },
        pagination::cursor::Cursor,
    };
    use std::time::Duration;
    use tracing_test::traced_test;

    fn filtering_job(
        name: &str,
        items: Vec<i64>,
        sink: MemorySink<i64>,
        drop: &'static [i64],
        chunk_size: usize,
    ) -> engine_runtime::job::Job {
        single_step_job(
            name,
            StepBuilder::new(STEP)
                .source(ListSource::new("numbers", items))
                .transformer(dropping(drop))
                .sink(sink)
                .chunk_size(chunk_size)
                .build()
                .unwrap(),
        )
    }

    fn rejecting_job(
        name: &str,
        sink: MemorySink<i64>,
        reject: &'static [i64],
        config: StepConfig,
    ) -> engine_runtime::job::Job {
        single_step_job(
            name,
            StepBuilder::new(STEP)
                .source(ListSource::new("numbers", numbers(12)))
                .transformer(rejecting(reject))
                .sink(sink)
                .config(config)
                .build()
                .unwrap(),
        )
    }

    #[traced_test]
    #[tokio::test]
    async fn twelve_items_in_chunks_of_five() {
        let sink = MemorySink::new("sink");
        let job = copy_job("twelve", numbers(12), sink.clone(), 5);

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(
            sink.batches().await,
            vec![numbers(5), (6..=10).collect(), vec![11, 12]]
        );

        let step = execution.step(STEP).unwrap();
        assert_eq!(step.read_count, 12);
        assert_eq!(step.write_count, 12);
        assert_eq!(step.commit_count, 3);
        assert_eq!(step.last_committed, Cursor::offset(12));
        assert!(logs_contain("Chunk committed"));
    }

    #[tokio::test]
    async fn exact_multiple_makes_no_extra_sink_call() {
        let sink = MemorySink::new("sink");
        let job = copy_job("exact", numbers(10), sink.clone(), 5);

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(sink.begin_count(), 2);
        assert_eq!(execution.step(STEP).unwrap().commit_count, 2);
    }

    #[tokio::test]
    async fn empty_source_completes_without_writes() {
        let sink = MemorySink::new("sink");
        let job = copy_job("empty", Vec::new(), sink.clone(), 5);

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(sink.begin_count(), 0);
        assert_eq!(execution.step(STEP).unwrap().commit_count, 0);
    }

    #[tokio::test]
    async fn order_is_preserved_for_every_chunk_size() {
        for chunk_size in [1usize, 2, 3, 7, 23, 50] {
            let sink = MemorySink::new("sink");
            let job = copy_job("ordered", numbers(23), sink.clone(), chunk_size);

            memory_launcher()
                .run(&job, &JobParameters::new())
                .await
                .unwrap();

            assert_eq!(sink.items().await, numbers(23), "chunk size {chunk_size}");
            assert_eq!(sink.begin_count(), 23usize.div_ceil(chunk_size));
            assert!(
                sink.batches()
                    .await
                    .iter()
                    .all(|batch| batch.len() <= chunk_size)
            );
        }
    }

    #[tokio::test]
    async fn filtered_records_never_reach_the_sink() {
        let sink = MemorySink::new("sink");
        let job = filtering_job("filtered", numbers(6), sink.clone(), &[2, 4], 3);

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(sink.batches().await, vec![vec![1, 3], vec![5, 6]]);
        let step = execution.step(STEP).unwrap();
        assert_eq!(step.read_count, 6);
        assert_eq!(step.write_count, 4);
        assert_eq!(step.filter_count, 2);
    }

    #[tokio::test]
    async fn fully_filtered_chunk_still_advances() {
        let sink = MemorySink::new("sink");
        let job = filtering_job("half", numbers(6), sink.clone(), &[1, 2, 3], 3);

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(sink.begin_count(), 1);
        assert_eq!(sink.items().await, vec![4, 5, 6]);
        let step = execution.step(STEP).unwrap();
        assert_eq!(step.commit_count, 2);
        assert_eq!(step.last_committed, Cursor::offset(6));
    }

    #[tokio::test]
    async fn write_failure_rolls_back_the_whole_chunk() {
        let sink = MemorySink::new("sink").failing_on("8");
        let job = copy_job("atomic", numbers(12), sink.clone(), 5);

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        // 6 and 7 were staged in the failed transaction and are gone.
        assert_eq!(sink.items().await, numbers(5));
        assert_eq!(sink.rollback_count(), 1);

        let step = execution.step(STEP).unwrap();
        assert_eq!(step.write_count, 5);
        assert_eq!(step.rollback_count, 1);
        assert_eq!(step.last_committed, Cursor::offset(5));

        let failure = step.failure.clone().unwrap();
        assert_eq!(failure.kind, ErrorKind::Write);
        assert_eq!(failure.chunk_index, 1);
        assert_eq!(failure.record_id.as_deref(), Some("8"));
        assert_eq!(failure.last_committed, Cursor::offset(5));
    }

    #[tokio::test]
    async fn transform_error_aborts_by_default() {
        let sink = MemorySink::new("sink");
        let job = rejecting_job(
            "abort",
            sink.clone(),
            &[7],
            StepConfig::default().with_chunk_size(5),
        );

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(sink.items().await, numbers(5));
        // The failing chunk never got as far as the sink.
        assert_eq!(sink.begin_count(), 1);

        let failure = execution.failed_step().unwrap().failure.clone().unwrap();
        assert_eq!(failure.kind, ErrorKind::Transform);
        assert_eq!(failure.record_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn skip_policy_drops_rejected_records() {
        let sink = MemorySink::new("sink");
        let job = rejecting_job(
            "skip",
            sink.clone(),
            &[2, 7],
            StepConfig::default()
                .with_chunk_size(5)
                .with_skip_policy(SkipPolicy::Skip),
        );

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(sink.items().await, vec![1, 3, 4, 5, 6, 8, 9, 10, 11, 12]);
        let step = execution.step(STEP).unwrap();
        assert_eq!(step.skip_count, 2);
        assert_eq!(step.write_count, 10);
    }

    #[tokio::test]
    async fn skip_limit_fails_the_step() {
        let sink = MemorySink::new("sink");
        let job = rejecting_job(
            "skip-limit",
            sink.clone(),
            &[2, 7],
            StepConfig::default()
                .with_chunk_size(5)
                .with_skip_policy(SkipPolicy::Skip)
                .with_skip_limit(1),
        );

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(sink.items().await, vec![1, 3, 4, 5]);
        let step = execution.step(STEP).unwrap();
        assert_eq!(step.skip_count, 1);
        assert_eq!(step.failure.as_ref().unwrap().kind, ErrorKind::Transform);
    }

    #[tokio::test]
    async fn query_failure_keeps_committed_chunks() {
        let sink = MemorySink::new("sink");
        let job = single_step_job(
            "query",
            copy_step(
                ListSource::new("numbers", numbers(12)).with_failure_at(6),
                sink.clone(),
                StepConfig::default().with_chunk_size(5),
            ),
        );

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(sink.items().await, numbers(5));
        assert_eq!(sink.begin_count(), 1);

        let failure = execution.failed_step().unwrap().failure.clone().unwrap();
        assert_eq!(failure.kind, ErrorKind::Query);
        assert_eq!(failure.last_committed, Cursor::offset(5));
    }

    #[tokio::test]
    async fn slow_chunk_times_out_without_committing() {
        let sink = MemorySink::new("sink").with_write_delay(Duration::from_millis(500));
        let job = single_step_job(
            "slow",
            copy_step(
                ListSource::new("numbers", numbers(4)),
                sink.clone(),
                StepConfig::default()
                    .with_chunk_size(2)
                    .with_chunk_timeout(Duration::from_millis(50)),
            ),
        );

        let execution = memory_launcher()
            .run(&job, &JobParameters::new())
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert!(sink.items().await.is_empty());
        let step = execution.step(STEP).unwrap();
        assert_eq!(step.failure.as_ref().unwrap().kind, ErrorKind::Timeout);
        assert_eq!(step.last_committed, Cursor::None);
        assert_eq!(step.commit_count, 0);
    }

    #[tokio::test]
    async fn non_transient_failures_are_not_relaunched() {
        let sink = MemorySink::new("sink");
        let job = rejecting_job(
            "no-retry",
            sink.clone(),
            &[3],
            StepConfig::default().with_chunk_size(5),
        );
        let policy = RetryPolicy::new(5, Duration::ZERO, Duration::ZERO);

        let execution = memory_launcher()
            .run_with_retry(&job, &JobParameters::new(), &policy)
            .await
            .unwrap();

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(execution.step(STEP).unwrap().attempt, 1);
        assert_eq!(sink.begin_count(), 0);
    }
}
