//! Ctrl-C / SIGTERM fan-out for commands that follow a worker.
use tokio::sync::broadcast;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Which request ended the follow. Launch turns either into a worker stop;
/// watch only detaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Interrupt,
    Terminate,
}

impl ShutdownCause {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ShutdownCause::Interrupt => "Ctrl-C",
            ShutdownCause::Terminate => "SIGTERM",
        }
    }
}

impl std::fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ShutdownSender = broadcast::Sender<ShutdownCause>;
pub type ShutdownReceiver = broadcast::Receiver<ShutdownCause>;

/// One request is all a follower acts on.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY)
}

/// Forward the first Ctrl-C or SIGTERM into the channel. The task also ends
/// when something else sends on the channel first.
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::select! {
            _ = shutdown_rx.recv() => {}
            cause = next_signal() => {
                tracing::debug!("Received {}", cause);
                drop(shutdown_tx.send(cause));
            }
        }
    })
}

#[cfg(unix)]
async fn next_signal() -> ShutdownCause {
    let mut term_signal = match signal(SignalKind::terminate()) {
        Ok(signal) => Some(signal),
        Err(err) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", err);
            None
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => ShutdownCause::Interrupt,
        () = async {
            if let Some(signal) = term_signal.as_mut() {
                signal.recv().await;
            } else {
                std::future::pending::<()>().await;
            }
        } => ShutdownCause::Terminate,
    }
}

#[cfg(not(unix))]
async fn next_signal() -> ShutdownCause {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    ShutdownCause::Interrupt
}
