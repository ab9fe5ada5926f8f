use crate::{
    config::StepConfig,
    error::{BuildError, RestartError, StepError},
    orchestrator::{ChunkOrchestrator, ChunkOutcome},
    state_manager::StateManager,
};
use async_trait::async_trait;
use engine_core::{
    connectors::{sink::ItemSink, source::ItemSource},
    error::SourceError,
    state::StateStore,
    transform::ItemTransformer,
};
use model::{
    core::identifiers::{InstanceId, StepKey},
    execution::{status::ErrorKind, step::StepExecution},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything a step needs from the job that runs it.
#[derive(Clone)]
pub struct StepContext {
    pub job_name: String,
    pub instance_id: InstanceId,
    pub store: Arc<dyn StateStore>,
    pub cancel: CancellationToken,
}

impl StepContext {
    pub fn step_key(&self, step_name: &str) -> StepKey {
        StepKey::new(self.job_name.clone(), self.instance_id.clone(), step_name)
    }
}

#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the step to a terminal status.
    ///
    /// A step that ends COMPLETED, FAILED or STOPPED returns `Ok` with the
    /// persisted execution; the failure, if any, is in `exec.failure`. `Err` is
    /// returned only when the step could not run at all: a restart was refused
    /// or its state could not be loaded.
    async fn execute(&self, ctx: &StepContext) -> Result<StepExecution, StepError>;
}

/// A step that processes its input in fixed-size transactional chunks.
pub struct ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    name: String,
    source: Mutex<Box<dyn ItemSource<I>>>,
    transformer: Box<dyn ItemTransformer<I, O>>,
    sink: Box<dyn ItemSink<O>>,
    config: StepConfig,
}

impl<I, O> ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    async fn prepare(
        &self,
        state: &StateManager,
        ctx: &StepContext,
    ) -> Result<StepExecution, StepError> {
        match state.load().await? {
            Some(exec) if exec.is_completed() => Err(RestartError::AlreadyCompleted {
                step: self.name.clone(),
                instance: ctx.instance_id.to_string(),
            }
            .into()),
            Some(mut exec) => {
                info!(
                    step = %state.key(),
                    previous = %exec.status,
                    cursor = %exec.last_committed,
                    "Restarting step after last committed chunk"
                );
                exec.restart();
                Ok(exec)
            }
            None => Ok(StepExecution::new(state.key())),
        }
    }
}

#[async_trait]
impl<I, O> Step for ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &StepContext) -> Result<StepExecution, StepError> {
        let state = StateManager::new(ctx.step_key(&self.name), Arc::clone(&ctx.store));
        let mut exec = self.prepare(&state, ctx).await?;
        state.begin_step(&mut exec).await?;

        let mut source = self.source.lock().await;
        if let Err(err) = source.open(&exec.last_committed).await {
            return self.open_failed(&state, exec, err).await;
        }

        let mut orchestrator = ChunkOrchestrator::new(
            source.as_mut(),
            self.transformer.as_ref(),
            self.sink.as_ref(),
            &self.config,
            &state,
        );

        loop {
            if ctx.cancel.is_cancelled() {
                info!(step = %state.key(), chunk = exec.chunk_index, "Stop requested, halting between chunks");
                if let Err(err) = state.stop(&mut exec).await {
                    error!(step = %state.key(), error = %err, "Failed to persist stop");
                }
                break;
            }

            match orchestrator.next_chunk(&mut exec).await {
                Ok(ChunkOutcome::Continue) => continue,
                Ok(ChunkOutcome::Exhausted) => {
                    if let Err(err) = state.complete(&mut exec).await {
                        error!(step = %state.key(), error = %err, "Failed to persist completion");
                        // Leave the execution restartable.
                        exec.mark_failed(ErrorKind::State, None, err.to_string());
                    } else {
                        info!(
                            step = %state.key(),
                            read = exec.read_count,
                            written = exec.write_count,
                            filtered = exec.filter_count,
                            skipped = exec.skip_count,
                            commits = exec.commit_count,
                            "Step completed"
                        );
                    }
                    break;
                }
                // Already persisted as FAILED by the orchestrator.
                Err(_) => break,
            }
        }

        if let Err(err) = source.close().await {
            warn!(step = %state.key(), error = %err, "Failed to close source");
        }

        Ok(exec)
    }
}

impl<I, O> ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    async fn open_failed(
        &self,
        state: &StateManager,
        mut exec: StepExecution,
        err: SourceError,
    ) -> Result<StepExecution, StepError> {
        let restart = matches!(err, SourceError::IncompatiblePosition { .. });
        let err = StepError::from(err);
        error!(step = %state.key(), error = %err, "Failed to open source");
        state
            .fail(&mut exec, err.kind(), None, err.to_string())
            .await?;

        if restart {
            Err(RestartError::IncompatiblePosition {
                step: self.name.clone(),
                position: exec.last_committed.to_string(),
            }
            .into())
        } else {
            Ok(exec)
        }
    }
}

/// Assembles a [`ChunkStep`].
pub struct StepBuilder<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    name: String,
    source: Option<Box<dyn ItemSource<I>>>,
    transformer: Option<Box<dyn ItemTransformer<I, O>>>,
    sink: Option<Box<dyn ItemSink<O>>>,
    config: StepConfig,
}

impl<I, O> StepBuilder<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            transformer: None,
            sink: None,
            config: StepConfig::default(),
        }
    }

    pub fn source(mut self, source: impl ItemSource<I> + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn transformer(mut self, transformer: impl ItemTransformer<I, O> + 'static) -> Self {
        self.transformer = Some(Box::new(transformer));
        self
    }

    pub fn sink(mut self, sink: impl ItemSink<O> + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Like [`Self::source`], for sources chosen at runtime.
    pub fn boxed_source(mut self, source: Box<dyn ItemSource<I>>) -> Self {
        self.source = Some(source);
        self
    }

    /// Like [`Self::sink`], for sinks chosen at runtime.
    pub fn boxed_sink(mut self, sink: Box<dyn ItemSink<O>>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: StepConfig) -> Self {
        self.config = config;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn build(self) -> Result<ChunkStep<I, O>, BuildError> {
        if self.config.chunk_size == 0 {
            return Err(BuildError::InvalidChunkSize(self.name));
        }
        let source = self
            .source
            .ok_or_else(|| BuildError::MissingSource(self.name.clone()))?;
        let transformer = self
            .transformer
            .ok_or_else(|| BuildError::MissingTransformer(self.name.clone()))?;
        let sink = self
            .sink
            .ok_or_else(|| BuildError::MissingSink(self.name.clone()))?;

        Ok(ChunkStep {
            name: self.name,
            source: Mutex::new(source),
            transformer,
            sink,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{
        connectors::memory::{ListSource, MemorySink},
        state::memory_store::MemoryStateStore,
        transform::PassThrough,
    };
    use model::execution::status::BatchStatus;

    fn context(store: Arc<dyn StateStore>) -> StepContext {
        StepContext {
            job_name: "numbers".into(),
            instance_id: InstanceId::new("numbers-1"),
            store,
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn builder_requires_all_parts() {
        let missing_sink = StepBuilder::<i64, i64>::new("s")
            .source(ListSource::new("src", vec![1_i64]))
            .transformer(PassThrough)
            .build();
        assert_eq!(missing_sink.err(), Some(BuildError::MissingSink("s".into())));

        let zero = StepBuilder::<i64, i64>::new("s")
            .source(ListSource::new("src", vec![1_i64]))
            .transformer(PassThrough)
            .sink(MemorySink::new("sink"))
            .chunk_size(0)
            .build();
        assert_eq!(zero.err(), Some(BuildError::InvalidChunkSize("s".into())));
    }

    #[tokio::test]
    async fn completed_step_refuses_to_run_again() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let ctx = context(store);
        let step = StepBuilder::new("copy")
            .source(ListSource::new("src", vec![1_i64, 2, 3]))
            .transformer(PassThrough)
            .sink(MemorySink::new("sink"))
            .chunk_size(2)
            .build()
            .unwrap();

        let exec = step.execute(&ctx).await.unwrap();
        assert_eq!(exec.status, BatchStatus::Completed);

        let err = step.execute(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            StepError::Restart(RestartError::AlreadyCompleted { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Restart);
    }

    #[tokio::test]
    async fn cancelled_step_stops_before_next_chunk() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let ctx = context(store);
        ctx.cancel.cancel();

        let sink = MemorySink::new("sink");
        let step = StepBuilder::new("copy")
            .source(ListSource::new("src", vec![1_i64, 2, 3]))
            .transformer(PassThrough)
            .sink(sink.clone())
            .build()
            .unwrap();

        let exec = step.execute(&ctx).await.unwrap();
        assert_eq!(exec.status, BatchStatus::Stopped);
        assert!(exec.status.is_restartable());
        assert_eq!(sink.begin_count(), 0);
    }
}
