use model::execution::params::JobParameters;

/// Which source flavour a job reads with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Paging,
    Cursor,
}

/// Where a job writes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    #[default]
    Database,
    Log,
}

/// Inputs needed to assemble a registered job.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub database_url: String,
    pub params: JobParameters,
    pub source: SourceKind,
    pub sink: SinkKind,
}

impl JobContext {
    pub fn new(database_url: impl Into<String>, params: JobParameters) -> Self {
        Self {
            database_url: database_url.into(),
            params,
            source: SourceKind::default(),
            sink: SinkKind::default(),
        }
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }
}
