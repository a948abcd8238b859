use tracing::info;

use crate::args::{DeleteArgs, StatusArgs, StopArgs, WatchArgs};
use crate::error::{AppError, AppResult, LaunchError};
use crate::shutdown::ShutdownSender;
use crate::tail::TailFrom;

use super::AppContext;
use super::follow::{FollowMode, follow_run};
use super::render::{run_detail_lines, run_list_lines};
use super::report::print_final_report;

/// Follow a run by name. Without a marker the run is not active and only its
/// stored report is printed. Interrupting a watch leaves the worker running.
pub(crate) async fn run_watch(
    ctx: &AppContext,
    args: &WatchArgs,
    shutdown_tx: &ShutdownSender,
) -> AppResult<()> {
    let paths = ctx.store.open(&args.name)?;
    match ctx.store.attach(&args.name).await {
        Some(handle) => {
            let outcome = follow_run(
                handle,
                ctx.settings.poll_interval,
                TailFrom::Start,
                args.report.format,
                FollowMode::Viewer,
                shutdown_tx,
            )
            .await?;
            // The worker is still writing; its results are not final yet.
            if outcome.is_none() {
                return Ok(());
            }
        }
        None => info!("Run '{}' is not active", args.name),
    }
    print_final_report(&args.name, &paths, args.report).await;
    Ok(())
}

pub(crate) async fn run_stop(ctx: &AppContext, args: &StopArgs) -> AppResult<()> {
    ctx.store.open(&args.name)?;
    let Some(handle) = ctx.store.attach(&args.name).await else {
        println!("Run '{}' is not active.", args.name);
        return Ok(());
    };
    if handle.terminate()? {
        println!("Sent stop to run '{}' (pid {}).", args.name, handle.pid());
    } else {
        println!(
            "Run '{}' (pid {}) had already exited.",
            args.name,
            handle.pid()
        );
    }
    if args.wait {
        let outcome = handle
            .with_poll_interval(ctx.settings.poll_interval)
            .wait()
            .await?;
        println!("Run '{}' is {}.", outcome.name, outcome.status);
    }
    Ok(())
}

pub(crate) async fn run_status(ctx: &AppContext, args: &StatusArgs) -> AppResult<()> {
    let lines = match args.name.as_deref() {
        Some(name) => run_detail_lines(&ctx.store.describe(name).await?),
        None => run_list_lines(&ctx.store.list().await?),
    };
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub(crate) async fn run_delete(ctx: &AppContext, args: &DeleteArgs) -> AppResult<()> {
    match ctx.store.delete(&args.name).await {
        Ok(()) => {
            println!("Deleted run '{}'.", args.name);
            Ok(())
        }
        Err(err @ LaunchError::RunActive { .. }) => {
            tracing::error!("{} Stop it first.", err);
            Err(AppError::launch(err))
        }
        Err(err) => Err(AppError::launch(err)),
    }
}
