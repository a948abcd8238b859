use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::args::OutputFormat;
use crate::error::AppResult;
use crate::run::{RunHandle, RunOutcome};
use crate::shutdown::ShutdownSender;
use crate::tail::{LogTailer, TailFrom};

use super::live_view::LiveView;

/// How a follower treats a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FollowMode {
    /// The run was launched here: shutdown terminates the worker once and the
    /// wait continues until it is gone.
    Owner,
    /// Attached to someone else's run: shutdown only stops following and the
    /// worker keeps running.
    Viewer,
}

/// Stream the run's log while waiting for the worker. Returns `None` when a
/// viewer stopped following before the worker exited.
pub(crate) async fn follow_run(
    handle: RunHandle,
    poll_interval: Duration,
    from: TailFrom,
    format: OutputFormat,
    mode: FollowMode,
    shutdown_tx: &ShutdownSender,
) -> AppResult<Option<RunOutcome>> {
    let stopper = handle.stopper();
    let tailer = LogTailer::new(handle.paths().log.clone())
        .with_poll_interval(poll_interval)
        .starting_at(from);

    let active = Arc::new(AtomicBool::new(true));
    let tail_active = active.clone();
    let tail_task = tokio::spawn(async move {
        let is_active = move || tail_active.load(Ordering::SeqCst);
        match format {
            // Keep stdout clean for the JSON document.
            OutputFormat::Json => {
                let mut view = LiveView::new(std::io::stderr());
                tailer.stream(is_active, |text| view.show(text)).await
            }
            OutputFormat::Text => {
                let mut view = LiveView::new(std::io::stdout());
                tailer.stream(is_active, |text| view.show(text)).await
            }
        }
    });

    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut listening = true;
    let wait = handle.wait();
    tokio::pin!(wait);
    let outcome = loop {
        tokio::select! {
            result = &mut wait => break Some(result),
            received = shutdown_rx.recv(), if listening => {
                listening = false;
                let cause = match received {
                    Ok(cause) => cause.as_str(),
                    Err(RecvError::Lagged(_)) => "repeated signals",
                    Err(RecvError::Closed) => continue,
                };
                match mode {
                    FollowMode::Viewer => {
                        info!(
                            "{}: stopped watching run '{}', it keeps running",
                            cause,
                            stopper.name()
                        );
                        break None;
                    }
                    FollowMode::Owner => {
                        info!("{}: stopping run '{}'", cause, stopper.name());
                        if let Err(err) = stopper.terminate() {
                            warn!("Failed to stop run '{}': {}", stopper.name(), err);
                        }
                    }
                }
            }
        }
    };

    active.store(false, Ordering::SeqCst);
    tail_task.await?;
    Ok(outcome.transpose()?)
}
