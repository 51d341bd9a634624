use std::fmt;

use anyhow::{Context, Result};
use tokio::signal;

/// The process signal that ended serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve with whichever of Ctrl+C or SIGTERM arrives first.
///
/// # Errors
/// Fails when a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> Result<ShutdownSignal> {
    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            Ok(ShutdownSignal::Interrupt)
        }
        result = terminate() => result,
    }
}

#[cfg(unix)]
async fn terminate() -> Result<ShutdownSignal> {
    signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?
        .recv()
        .await;
    Ok(ShutdownSignal::Terminate)
}

// No SIGTERM off unix; only Ctrl+C can stop the server.
#[cfg(not(unix))]
async fn terminate() -> Result<ShutdownSignal> {
    std::future::pending().await
}
