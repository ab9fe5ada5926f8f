use crate::{
    commands::Commands,
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use engine_core::retry::RetryPolicy;
use engine_runtime::execution::{
    executor::JobLauncher, instance::make_instance_id, store::open_state_store,
};
use jobs::{
    context::JobContext,
    registry::{self, JOBS},
};
use model::execution::{params::JobParameters, status::BatchStatus};
use std::{path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "batch", version = "0.1.0", about = "Chunk-oriented batch job runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Load KEY=VALUE pairs from this file")]
    env_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Execution state directory (falls back to BATCH_STATE_DIR, then ~/.batch/state)"
    )]
    state_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Log at debug level")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, &shutdown).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = &cli.env_file {
        env.load_from_file(path)?;
    }
    let state_dir = cli
        .state_dir
        .or_else(|| env.get(env::STATE_DIR).map(PathBuf::from));

    match cli.command {
        Commands::Jobs => {
            for (name, description) in JOBS {
                println!("{name:<20} {description}");
            }
            Ok(ExitCode::Success)
        }
        Commands::Status { job, params, json } => {
            let params = JobParameters::from_iter(params);
            let launcher = JobLauncher::new(open_state_store(state_dir)?, shutdown.cancel_token());
            let steps = launcher.status(&job, &params).await?;
            output::print_status(&job, &make_instance_id(&job, &params), &steps, json)?;
            Ok(ExitCode::Success)
        }
        Commands::Run {
            job,
            params,
            source,
            sink,
            database_url,
            max_attempts,
        } => {
            if !registry::is_registered(&job) {
                return Err(CliError::UnknownJob(job));
            }
            let database_url = database_url
                .or_else(|| env.get(env::DATABASE_URL).map(str::to_string))
                .ok_or(CliError::MissingDatabaseUrl)?;

            let ctx = JobContext::new(database_url, JobParameters::from_iter(params))
                .with_source(source.into())
                .with_sink(sink.into());
            let definition = registry::build_job(&job, &ctx).await?;

            let launcher = JobLauncher::new(open_state_store(state_dir)?, shutdown.cancel_token());
            let policy = RetryPolicy::new(max_attempts, Duration::from_secs(1), Duration::from_secs(30));
            let execution = launcher
                .run_with_retry(&definition, &ctx.params, &policy)
                .await?;

            output::print_execution(&execution);
            info!(job = %job, status = %execution.status, "Run finished");

            Ok(match execution.status {
                BatchStatus::Completed => ExitCode::Success,
                _ if shutdown.is_shutdown_requested() => ExitCode::ShutdownRequested,
                BatchStatus::Stopped => ExitCode::ShutdownRequested,
                _ => ExitCode::GeneralError,
            })
        }
    }
}
