use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use portal_core::{
    update_connection, AttemptId, ConnectionEffect, ConnectionMsg, ConnectionState,
    ConnectionStatus,
};
use portal_logging::{portal_debug, portal_warn};
use tokio::sync::watch;

use crate::{ExtensionProbe, RelayConnector, RelaySession};

/// Owns the relay connection lifecycle.
///
/// Every operation settles into an updated [`ConnectionStatus`]; failures are
/// reported through `status.error` and never returned to the caller. The
/// state guard inside [`update_connection`] makes redundant calls no-ops.
pub struct ConnectionController {
    connector: Arc<dyn RelayConnector>,
    state: Mutex<ConnectionState>,
    /// Held across the open→store and take→close steps so a concurrent
    /// disconnect never misses a session that is being installed.
    session: tokio::sync::Mutex<Option<Box<dyn RelaySession>>>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl ConnectionController {
    pub fn new(connector: Arc<dyn RelayConnector>) -> Self {
        let state = ConnectionState::new();
        let (status_tx, _) = watch::channel(state.status());
        Self {
            connector,
            state: Mutex::new(state),
            session: tokio::sync::Mutex::new(None),
            status_tx,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_tx.borrow().clone()
    }

    /// Receives a fresh snapshot after every observable transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Open a relay session for the current tab.
    ///
    /// Ignored unless disconnected with the extension present.
    pub async fn connect(&self, relay_url: &str) -> ConnectionStatus {
        let effects = self.apply(ConnectionMsg::ConnectRequested {
            relay_url: relay_url.to_string(),
        });
        self.run(effects).await;
        self.status()
    }

    /// Tear down the session, or abandon an attempt still in flight.
    pub async fn disconnect(&self) -> ConnectionStatus {
        let effects = self.apply(ConnectionMsg::DisconnectRequested);
        self.run(effects).await;
        self.status()
    }

    pub fn set_extension_installed(&self, installed: bool) -> ConnectionStatus {
        let effects = self.apply(ConnectionMsg::ExtensionDetected(installed));
        debug_assert!(effects.is_empty());
        self.status()
    }

    pub async fn refresh_extension(&self, probe: &dyn ExtensionProbe) -> ConnectionStatus {
        let installed = probe.is_installed().await;
        self.set_extension_installed(installed)
    }

    fn apply(&self, msg: ConnectionMsg) -> Vec<ConnectionEffect> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = std::mem::take(&mut *guard);
        let (mut state, effects) = update_connection(state, msg);
        if state.consume_dirty() {
            self.status_tx.send_replace(state.status());
        }
        *guard = state;
        effects
    }

    async fn run(&self, effects: Vec<ConnectionEffect>) {
        let mut queue: VecDeque<ConnectionEffect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                ConnectionEffect::OpenSession { attempt, relay_url } => {
                    queue.extend(self.open_session(attempt, &relay_url).await);
                }
                ConnectionEffect::CloseSession => {
                    let session = self.session.lock().await.take();
                    if let Some(session) = session {
                        if let Err(err) = session.close().await {
                            queue.extend(self.apply(ConnectionMsg::TeardownFailed {
                                message: err.to_string(),
                            }));
                        }
                    }
                }
                ConnectionEffect::DiscardSession { attempt } => {
                    // Sessions are discarded inside `open_session`, where the handle is in scope.
                    portal_debug!("attempt={} already discarded", attempt);
                }
            }
        }
    }

    async fn open_session(&self, attempt: AttemptId, relay_url: &str) -> Vec<ConnectionEffect> {
        match self.connector.open(relay_url).await {
            Ok(session) => {
                let mut slot = self.session.lock().await;
                let effects = self.apply(ConnectionMsg::SessionOpened {
                    attempt,
                    tab_id: session.tab_id(),
                });
                let discard = effects.contains(&ConnectionEffect::DiscardSession { attempt });
                let orphan = if discard {
                    Some(session)
                } else {
                    slot.replace(session)
                };
                drop(slot);
                if let Some(orphan) = orphan {
                    if let Err(err) = orphan.close().await {
                        portal_warn!("closing orphaned session failed: {}", err);
                    }
                }
                effects
                    .into_iter()
                    .filter(|effect| !matches!(effect, ConnectionEffect::DiscardSession { .. }))
                    .collect()
            }
            Err(err) => self.apply(ConnectionMsg::SessionFailed {
                attempt,
                message: err.to_string(),
            }),
        }
    }
}
