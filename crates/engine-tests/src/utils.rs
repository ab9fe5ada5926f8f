#![allow(dead_code)]

use engine_core::{
    connectors::memory::{ListSource, MemorySink},
    error::TransformError,
    state::{StateStore, memory_store::MemoryStateStore},
    transform::{ItemTransformer, PassThrough, Transformed},
};
use engine_processing::{
    config::StepConfig,
    step::{ChunkStep, StepBuilder},
};
use engine_runtime::{
    execution::executor::JobLauncher,
    job::{Job, JobBuilder},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const STEP: &str = "copy";

pub fn numbers(n: i64) -> Vec<i64> {
    (1..=n).collect()
}

pub fn memory_launcher() -> JobLauncher {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    JobLauncher::new(store, CancellationToken::new())
}

/// Filters out the given values, keeps everything else.
pub fn dropping(values: &'static [i64]) -> impl ItemTransformer<i64, i64> {
    move |n: &i64| -> Result<Transformed<i64>, TransformError> {
        Ok(if values.contains(n) {
            Transformed::Skip
        } else {
            Transformed::Keep(*n)
        })
    }
}

/// Rejects the given values with a transform error.
pub fn rejecting(values: &'static [i64]) -> impl ItemTransformer<i64, i64> {
    move |n: &i64| -> Result<Transformed<i64>, TransformError> {
        if values.contains(n) {
            Err(TransformError::rejected(n.to_string(), "unacceptable value"))
        } else {
            Ok(Transformed::Keep(*n))
        }
    }
}

pub fn copy_step(
    source: ListSource<i64>,
    sink: MemorySink<i64>,
    config: StepConfig,
) -> ChunkStep<i64, i64> {
    StepBuilder::new(STEP)
        .source(source)
        .transformer(PassThrough)
        .sink(sink)
        .config(config)
        .build()
        .expect("valid step")
}

pub fn single_step_job(name: &str, step: ChunkStep<i64, i64>) -> Job {
    JobBuilder::new(name).start(step).build().expect("valid job")
}

pub fn copy_job(name: &str, items: Vec<i64>, sink: MemorySink<i64>, chunk_size: usize) -> Job {
    single_step_job(
        name,
        copy_step(
            ListSource::new("numbers", items),
            sink,
            StepConfig::default().with_chunk_size(chunk_size),
        ),
    )
}
