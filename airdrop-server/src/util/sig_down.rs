//! Graceful shutdown signal handling.
//!
//! On Unix, [`SigDown`] listens for SIGTERM and SIGINT. On Windows, it
//! listens for Ctrl+C. The first signal cancels a [`CancellationToken`]
//! that the HTTP server awaits before draining in-flight requests.

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Handles graceful shutdown on SIGTERM and SIGINT signals.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    #[allow(clippy::unnecessary_wraps)] // Result needed on Unix for signal registration
    pub fn try_new() -> Result<Self, std::io::Error> {
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let task_tracker = TaskTracker::new();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down"),
                }
                inner.cancel();
            });
        }

        #[cfg(windows)]
        {
            task_tracker.spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received Ctrl-C, shutting down");
                inner.cancel();
            });
        }

        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token: outer,
        })
    }

    /// Returns a clone of the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Waits until a shutdown signal was received and the handler task exited.
    pub async fn recv(&self) {
        self.cancellation_token.cancelled().await;
        self.task_tracker.wait().await;
    }
}
