use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use super::backend::StateBackend;
use super::{StateError, StateTable};

pub(super) enum StateRequest {
    Update {
        plugin: String,
        value: Value,
    },
    Flush {
        ack: oneshot::Sender<Result<(), StateError>>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Clean,
    Dirty { flush_at: Instant },
}

/// Owns the authoritative table and the debounce timer.
pub(super) struct StateActor {
    table: StateTable,
    backend: Arc<dyn StateBackend>,
    delay: Duration,
    phase: Phase,
    rx: mpsc::UnboundedReceiver<StateRequest>,
}

impl StateActor {
    pub(super) fn new(
        table: StateTable,
        backend: Arc<dyn StateBackend>,
        delay: Duration,
        rx: mpsc::UnboundedReceiver<StateRequest>,
    ) -> Self {
        Self {
            table,
            backend,
            delay,
            phase: Phase::Clean,
            rx,
        }
    }

    pub(super) async fn run(mut self) {
        loop {
            let deadline = match self.phase {
                Phase::Dirty { flush_at } => Some(flush_at),
                Phase::Clean => None,
            };

            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(StateRequest::Update { plugin, value }) => {
                        self.table.insert(plugin, value);
                        self.mark_dirty();
                    }
                    Some(StateRequest::Flush { ack }) => {
                        let result = self.flush().await;
                        let _ = ack.send(result);
                    }
                    Some(StateRequest::Shutdown { ack }) => {
                        self.rx.close();
                        let mut acks = self.drain();
                        acks.push(ack);
                        self.finish().await;
                        for ack in acks {
                            let _ = ack.send(());
                        }
                        return;
                    }
                    None => {
                        self.finish().await;
                        return;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Err(e) = self.flush().await {
                        error!(error = %e, retry_in = ?self.delay, "Failed to persist state");
                    }
                }
            }
        }
    }

    fn mark_dirty(&mut self) {
        if self.phase == Phase::Clean {
            self.phase = Phase::Dirty {
                flush_at: Instant::now() + self.delay,
            };
        }
    }

    /// Writes the table if dirty. On failure the table stays dirty and the
    /// timer is re-armed for another full delay.
    async fn flush(&mut self) -> Result<(), StateError> {
        if self.phase == Phase::Clean {
            return Ok(());
        }
        match self.backend.save(&self.table).await {
            Ok(()) => {
                debug!(entries = self.table.len(), "State flushed");
                self.phase = Phase::Clean;
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Dirty {
                    flush_at: Instant::now() + self.delay,
                };
                Err(e)
            }
        }
    }

    /// Applies updates that were queued behind a shutdown request.
    fn drain(&mut self) -> Vec<oneshot::Sender<()>> {
        let mut acks = Vec::new();
        while let Ok(request) = self.rx.try_recv() {
            match request {
                StateRequest::Update { plugin, value } => {
                    self.table.insert(plugin, value);
                    self.mark_dirty();
                }
                StateRequest::Flush { ack } => {
                    let _ = ack.send(Err(StateError::Closed));
                }
                StateRequest::Shutdown { ack } => acks.push(ack),
            }
        }
        acks
    }

    async fn finish(&mut self) {
        if let Err(e) = self.flush().await {
            error!(error = %e, "Failed to persist state on shutdown");
        }
        info!("State actor stopped");
    }
}
