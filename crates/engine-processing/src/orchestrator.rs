use crate::{
    config::{SkipPolicy, StepConfig},
    error::StepError,
    phase::ChunkPhase,
    state_manager::StateManager,
};
use engine_core::{
    connectors::{
        sink::{ItemSink, SinkTransaction},
        source::ItemSource,
    },
    transform::{ItemTransformer, Transformed},
};
use model::{
    execution::step::StepExecution,
    pagination::cursor::Cursor,
    records::chunk::{Chunk, ChunkTally},
};
use tracing::{debug, error, info, warn};

/// Result of one successful chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// More input may follow.
    Continue,
    /// The source is exhausted; the step can complete.
    Exhausted,
}

/// A chunk whose outputs are staged in an open sink transaction, or that
/// had nothing to write.
struct StagedChunk<O> {
    tally: ChunkTally,
    end: Cursor,
    last: bool,
    tx: Option<Box<dyn SinkTransaction<O>>>,
}

/// Drives read → transform → write for one step, one chunk at a time.
///
/// Chunks are strictly sequential. Each non-empty chunk is written in exactly
/// one sink transaction; progress is recorded only after that transaction
/// commits.
pub struct ChunkOrchestrator<'a, I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    source: &'a mut dyn ItemSource<I>,
    transformer: &'a dyn ItemTransformer<I, O>,
    sink: &'a dyn ItemSink<O>,
    config: &'a StepConfig,
    state: &'a StateManager,
    phase: ChunkPhase,
}

impl<'a, I, O> ChunkOrchestrator<'a, I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    pub fn new(
        source: &'a mut dyn ItemSource<I>,
        transformer: &'a dyn ItemTransformer<I, O>,
        sink: &'a dyn ItemSink<O>,
        config: &'a StepConfig,
        state: &'a StateManager,
    ) -> Self {
        Self {
            source,
            transformer,
            sink,
            config,
            state,
            phase: ChunkPhase::Idle,
        }
    }

    pub fn phase(&self) -> ChunkPhase {
        self.phase
    }

    /// Runs the next chunk and records its outcome in `exec`.
    ///
    /// The chunk deadline covers read, transform and write. Expiry drops the
    /// open transaction, which rolls it back. The commit runs outside the
    /// deadline so a chunk the sink has committed is always recorded.
    ///
    /// On error the in-flight transaction has been rolled back and `exec` has
    /// been persisted as FAILED with its last committed position untouched.
    pub async fn next_chunk(
        &mut self,
        exec: &mut StepExecution,
    ) -> Result<ChunkOutcome, StepError> {
        let chunk_index = exec.chunk_index;
        let skipped_before = exec.skip_count;

        let attempt = match self.config.chunk_timeout {
            Some(after) => {
                match tokio::time::timeout(after, self.process(chunk_index, skipped_before)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(StepError::Timeout { chunk_index, after }),
                }
            }
            None => self.process(chunk_index, skipped_before).await,
        };

        let processed = match attempt {
            Ok(processed) => processed,
            Err(err) => return Err(self.fail(exec, err).await),
        };

        if let Some(tx) = processed.tx
            && let Err(err) = tx.commit().await
        {
            return Err(self.fail(exec, err.into()).await);
        }

        if processed.tally.read > 0 {
            if let Err(err) = self
                .state
                .commit_chunk(exec, processed.tally, processed.end.clone())
                .await
            {
                return Err(self.fail(exec, err.into()).await);
            }
            self.phase = ChunkPhase::Committed;
            info!(
                step = %self.state.key(),
                chunk = chunk_index,
                read = processed.tally.read,
                written = processed.tally.written,
                filtered = processed.tally.filtered,
                cursor = %processed.end,
                "Chunk committed"
            );
        }

        if processed.last {
            self.phase = ChunkPhase::Done;
            Ok(ChunkOutcome::Exhausted)
        } else {
            Ok(ChunkOutcome::Continue)
        }
    }

    async fn process(
        &mut self,
        chunk_index: u64,
        skipped_before: u64,
    ) -> Result<StagedChunk<O>, StepError> {
        let chunk = self.read(chunk_index).await?;
        let mut tally = ChunkTally {
            read: chunk.len() as u64,
            ..ChunkTally::default()
        };

        self.phase = ChunkPhase::Transforming;
        let outputs = self.transform(&chunk, &mut tally, skipped_before)?;

        let tx = if outputs.is_empty() {
            debug!(
                step = %self.state.key(),
                chunk = chunk_index,
                read = tally.read,
                "Nothing to write, no transaction opened"
            );
            None
        } else {
            self.phase = ChunkPhase::Writing;
            let tx = self.write(&outputs).await?;
            tally.written = outputs.len() as u64;
            Some(tx)
        };

        Ok(StagedChunk {
            tally,
            end: chunk.end,
            last: chunk.last,
            tx,
        })
    }

    async fn read(&mut self, index: u64) -> Result<Chunk<I>, StepError> {
        self.phase = ChunkPhase::Reading;
        let start = self.source.position();
        let mut items = Vec::with_capacity(self.config.chunk_size);
        let mut last = false;

        while items.len() < self.config.chunk_size {
            match self.source.read().await? {
                Some(item) => items.push(item),
                None => {
                    last = true;
                    break;
                }
            }
        }

        Ok(Chunk {
            index,
            items,
            start,
            end: self.source.position(),
            last,
        })
    }

    fn transform(
        &self,
        chunk: &Chunk<I>,
        tally: &mut ChunkTally,
        skipped_before: u64,
    ) -> Result<Vec<O>, StepError> {
        let mut outputs = Vec::with_capacity(chunk.len());

        for item in &chunk.items {
            match self.transformer.transform(item) {
                Ok(Transformed::Keep(out)) => outputs.push(out),
                Ok(Transformed::Skip) => tally.filtered += 1,
                Err(err) => match self.config.skip_policy {
                    SkipPolicy::Abort => return Err(err.into()),
                    SkipPolicy::Skip => {
                        tally.skipped += 1;
                        if let Some(limit) = self.config.skip_limit
                            && skipped_before + tally.skipped > limit
                        {
                            return Err(StepError::SkipLimitExceeded { limit, source: err });
                        }
                        warn!(
                            step = %self.state.key(),
                            chunk = chunk.index,
                            error = %err,
                            "Skipping record rejected by transformer"
                        );
                    }
                },
            }
        }

        Ok(outputs)
    }

    /// Opens a transaction and stages `outputs` in it. The caller commits.
    async fn write(&mut self, outputs: &[O]) -> Result<Box<dyn SinkTransaction<O>>, StepError> {
        let mut tx = self.sink.begin().await?;
        match tx.write(outputs).await {
            Ok(_) => Ok(tx),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        sink = %self.sink.name(),
                        error = %rollback_err,
                        "Rollback after failed write also failed"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Records the failure and hands the error back for the caller.
    async fn fail(&mut self, exec: &mut StepExecution, err: StepError) -> StepError {
        self.phase = ChunkPhase::Failed;
        error!(
            step = %self.state.key(),
            chunk = exec.chunk_index,
            kind = %err.kind(),
            cursor = %exec.last_committed,
            error = %err,
            "Chunk failed"
        );

        self.state.rollback_chunk(exec, &err.to_string()).await;
        if let Err(state_err) = self
            .state
            .fail(exec, err.kind(), err.record_id(), err.to_string())
            .await
        {
            error!(
                step = %self.state.key(),
                error = %state_err,
                "Failed to persist step failure"
            );
        }
        err
    }
}
