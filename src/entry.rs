use clap::Parser;

use crate::app::{self, AppContext};
use crate::args::{Command, RunnerArgs};
use crate::config::{load_config, resolve_settings};
use crate::error::AppResult;
use crate::shutdown::{setup_signal_shutdown_handler, shutdown_channel};

/// Parse the command line, build the runtime, and dispatch.
///
/// # Errors
///
/// Returns the first error of the selected command.
pub fn run() -> AppResult<()> {
    let args = RunnerArgs::parse();

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

async fn run_async(args: RunnerArgs) -> AppResult<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = resolve_settings(config.as_ref(), args.data_root.as_deref())?;
    tracing::debug!("Resolved settings: {:?}", settings);
    let ctx = AppContext::new(settings);

    // Launch stops its worker on Ctrl-C; watch only stops following.
    let (shutdown_tx, _) = shutdown_channel();
    let signal_task = args
        .command
        .follows_worker()
        .then(|| setup_signal_shutdown_handler(&shutdown_tx));

    let result = match &args.command {
        Command::Launch(launch) => app::run_launch(&ctx, launch, &shutdown_tx).await,
        Command::Watch(watch) => app::run_watch(&ctx, watch, &shutdown_tx).await,
        Command::Stop(stop) => app::run_stop(&ctx, stop).await,
        Command::Status(status) => app::run_status(&ctx, status).await,
        Command::Report(report) => app::run_report(&ctx, report).await,
        Command::Delete(delete) => app::run_delete(&ctx, delete).await,
    };

    if let Some(task) = signal_task {
        task.abort();
    }
    result
}
