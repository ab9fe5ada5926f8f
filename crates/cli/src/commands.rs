use clap::{Subcommand, ValueEnum};
use jobs::context::{SinkKind, SourceKind};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch (or resume) a job instance
    Run {
        #[arg(long, help = "Registered job name, see `batch jobs`")]
        job: String,

        #[arg(
            long = "param",
            value_name = "KEY=VALUE",
            value_parser = parse_param,
            help = "Job parameter; repeat for several. Parameters identify the instance"
        )]
        params: Vec<(String, String)>,

        #[arg(long, value_enum, default_value_t = SourceArg::Paging)]
        source: SourceArg,

        #[arg(long, value_enum, default_value_t = SinkArg::Db)]
        sink: SinkArg,

        #[arg(long, help = "Postgres connection string (falls back to DATABASE_URL)")]
        database_url: Option<String>,

        #[arg(
            long,
            default_value_t = 1,
            help = "Relaunch transient failures up to this many attempts in total"
        )]
        max_attempts: usize,
    },
    /// Show the persisted progress of a job instance
    Status {
        #[arg(long)]
        job: String,

        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[arg(long, help = "Print the step executions as JSON instead of a table")]
        json: bool,
    },
    /// List registered jobs
    Jobs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Re-issued bounded queries
    Paging,
    /// One server-side cursor
    Cursor,
}

impl From<SourceArg> for SourceKind {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Paging => SourceKind::Paging,
            SourceArg::Cursor => SourceKind::Cursor,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    Db,
    Log,
}

impl From<SinkArg> for SinkKind {
    fn from(value: SinkArg) -> Self {
        match value {
            SinkArg::Db => SinkKind::Database,
            SinkArg::Log => SinkKind::Log,
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    model::execution::params::JobParameters::parse_pair(raw).map_err(|e| e.to_string())
}
