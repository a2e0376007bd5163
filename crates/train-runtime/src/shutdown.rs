//! Stopping a [`crate::Server`]
//!
//! Triggering the signal stops the accept loop. Requests already in their lifecycle keep
//! running until they finish or `shutdown_timeout` runs out.

use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

/// Cloneable handle that tells a server to stop accepting connections
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<broadcast::Sender<()>>,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Receiver that resolves once [`ShutdownSignal::trigger`] is called
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Ask every server holding this signal to drain and stop
    pub fn trigger(&self) {
        let _ = self.sender.send(());
        tracing::info!("Shutdown signal triggered");
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards SIGINT/SIGTERM to a [`ShutdownSignal`]; spawned by [`crate::Application::run`]
#[derive(Debug)]
pub struct SignalHandler {
    signal: ShutdownSignal,
}

impl SignalHandler {
    /// Watch OS signals on behalf of `signal`
    pub fn new(signal: ShutdownSignal) -> Self {
        Self { signal }
    }

    /// Wait for the first signal (Ctrl+C outside unix), then trigger shutdown once
    pub async fn run(self) {
        #[cfg(unix)]
        {
            use signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        tracing::error!("Failed to install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT");
                }
            }
            self.signal.trigger();
        }

        #[cfg(not(unix))]
        {
            match signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C");
                    self.signal.trigger();
                }
                Err(err) => {
                    tracing::error!("Failed to listen for Ctrl+C: {}", err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clone_reaches_every_subscriber() {
        let signal = ShutdownSignal::new();
        let mut accept_loop = signal.subscribe();
        let mut drain = signal.subscribe();

        signal.clone().trigger();

        assert!(accept_loop.recv().await.is_ok());
        assert!(drain.try_recv().is_ok());
    }
}
