//! Saves the client session when the channel drops and restores it once the
//! channel is back.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use vigil_bridge::MessageFromBackend;
use vigil_bridge::events::names;
use vigil_bridge::settings::ClientSettings;

use crate::connection::{ConnectionHandle, Timer, now_millis};
use crate::session::SharedSession;
use crate::store::{self, KeyValueStore, keys};

/// Source tag of commands replayed by recovery.
const RECOVERY_SOURCE: &str = "recovery";

/// Snapshot of the session written on every disconnect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub monitoring: bool,
    #[serde(default, alias = "activeSettings")]
    pub settings: ClientSettings,
    /// Unix milliseconds of the save.
    #[serde(default, alias = "lastUpdate")]
    pub saved_at: u64,
}

pub struct StateRecovery {
    handle: ConnectionHandle,
    store: Arc<dyn KeyValueStore>,
    session: SharedSession,
    frontend: Sender<MessageFromBackend>,
    settle_delay: Duration,
    status: UnboundedReceiver<Value>,
}

impl StateRecovery {
    /// Subscribes to connection status right away, so a connect that happens
    /// before [`StateRecovery::run`] is first polled is not missed.
    pub fn new(
        handle: ConnectionHandle,
        store: Arc<dyn KeyValueStore>,
        session: SharedSession,
        frontend: Sender<MessageFromBackend>,
        settle_delay: Duration,
    ) -> Self {
        let status = handle.subscribe(names::CONNECTION_STATUS);
        Self {
            handle,
            store,
            session,
            frontend,
            settle_delay,
            status,
        }
    }

    /// Reacts to connection status changes until the connection shuts down.
    pub async fn run(mut self) {
        let mut settle = Timer::default();
        loop {
            tokio::select! {
                status = self.status.recv() => {
                    let Some(status) = status else {
                        break;
                    };
                    let connected = status
                        .get("connected")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    if connected {
                        settle.arm(self.settle_delay);
                    } else if settle.is_armed() {
                        // The previous snapshot has not been restored yet.
                        settle.cancel();
                        self.session.write().await.monitoring = false;
                    } else {
                        self.save().await;
                    }
                }
                _ = settle.elapsed() => {
                    settle.cancel();
                    self.restore().await;
                }
            }
        }
        log::debug!("State recovery stopped");
    }

    async fn save(&self) {
        let state = {
            let mut session = self.session.write().await;
            let state = PersistedState {
                monitoring: session.monitoring,
                settings: session.settings.clone(),
                saved_at: now_millis(),
            };
            session.monitoring = false;
            state
        };

        match store::write(self.store.as_ref(), keys::SOCKET_STATE, &state) {
            Ok(()) => log::info!("Client state saved"),
            Err(error) => log::warn!("Failed to save client state: {error}"),
        }
    }

    async fn restore(&self) {
        let Some(saved) = self.load() else {
            return;
        };

        let resume_monitoring = {
            let mut session = self.session.write().await;
            let resume = saved.monitoring && !session.monitoring;
            if resume {
                session.monitoring = true;
            }
            session.settings.merge(saved.settings.clone());
            resume
        };

        if resume_monitoring {
            log::info!("Restoring monitoring state");
            self.handle.start_monitoring(RECOVERY_SOURCE);
            self.forward(MessageFromBackend::MonitoringChanged(true))
                .await;
        }
        if !saved.settings.is_empty() {
            self.forward(MessageFromBackend::SettingsRestored(saved.settings))
                .await;
        }
        log::info!("Client state restored");
    }

    /// Reads the snapshot, falling back to the standalone monitoring flag.
    fn load(&self) -> Option<PersistedState> {
        match store::read::<PersistedState>(self.store.as_ref(), keys::SOCKET_STATE) {
            Ok(Some(state)) => return Some(state),
            Ok(None) => {}
            Err(error) => {
                log::warn!("Discarding saved client state: {error}");
                return None;
            }
        }

        match store::read::<bool>(self.store.as_ref(), keys::MONITORING) {
            Ok(Some(monitoring)) => Some(PersistedState {
                monitoring,
                ..PersistedState::default()
            }),
            Ok(None) => {
                log::info!("No saved client state to restore");
                None
            }
            Err(error) => {
                log::warn!("Discarding saved client state: {error}");
                None
            }
        }
    }

    async fn forward(&self, message: MessageFromBackend) {
        if self.frontend.send(message).await.is_err() {
            log::debug!("Frontend is gone, dropping restored state");
        }
    }
}
