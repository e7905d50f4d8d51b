//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, the real-time channel, state
//! recovery and the message dispatch loop that listens to frontend bridge
//! requests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};
use vigil_bridge::config::Config;
use vigil_bridge::events::{ServerEvent, names};
use vigil_bridge::settings::ClientSettings;
use vigil_bridge::{MessageFromBackend, MessageToBackend};

use crate::api::ApiClient;
use crate::app::AppContext;
use crate::config::Paths;
use crate::connection::{
    Collaborators, ConnectionHandle, ConnectionManager, TrafficTap, WebSocketConnector,
};
use crate::debug::DebugObserver;
use crate::notify::{FrontendRelay, NotificationSink};
use crate::recovery::StateRecovery;
use crate::session::{ClientSession, SharedSession};
use crate::state::State;
use crate::store::{self, FileStore, KeyValueStore, keys};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct StatusPayload {
    connected: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct LatencyPayload {
    latency: u64,
}

/// Initialize backend state and start processing frontend messages.
async fn setup_backend(rx: Receiver<MessageToBackend>, tx: Sender<MessageFromBackend>) {
    let (config, paths) = match crate::config::load_config().await {
        Ok(loaded) => loaded,
        Err(error) => {
            log::error!("Failed to load configuration, using defaults: {error}");
            (Config::default(), Paths::local())
        }
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(paths.store_file()));
    let debug = Arc::new(DebugObserver::new(&config.debug));
    let session: SharedSession = Arc::new(RwLock::new(ClientSession::default()));

    let relay = FrontendRelay::spawn(tx.clone());
    let notifier: Arc<dyn NotificationSink> = Arc::new(relay.clone());
    let tap: Arc<dyn TrafficTap> = debug.clone();
    let (connection, manager) = ConnectionManager::new(
        WebSocketConnector::new(&config.server.socket_url),
        config.connection.clone(),
        Collaborators {
            notifier: Some(notifier),
            tap: Some(tap),
        },
    );
    forward_connection_events(&connection, &relay);

    if config.recovery.enabled {
        let recovery = StateRecovery::new(
            connection.clone(),
            store.clone(),
            session.clone(),
            tx.clone(),
            config.recovery.settle_delay(),
        );
        tokio::spawn(recovery.run());
    }
    restore_alert_volume(store.as_ref(), &session, &tx).await;

    let manager_task = tokio::spawn(manager.run());

    let request_client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|error| {
            log::warn!("Failed to configure HTTP client, using defaults: {error}");
            reqwest::Client::new()
        });
    let state = Arc::new(RwLock::new(State {
        api: ApiClient::new(request_client, &config.server.http_url),
        config,
        paths,
        connection: connection.clone(),
        session,
        store,
        debug,
    }));

    let context = Arc::new(AppContext { state, tx });
    context.consume_bridge_messages(rx).await;

    connection.shutdown().await;
    if let Err(error) = manager_task.await {
        log::error!("Connection manager task failed: {error}");
    }
}

/// Registers the listeners that relay channel events to the frontend.
/// Video frames are skipped while the frontend lags; everything else is
/// delivered in order.
fn forward_connection_events(connection: &ConnectionHandle, relay: &FrontendRelay) {
    for event in names::SERVER_EVENTS {
        let relay = relay.clone();
        connection.on(event, move |payload| {
            let decoded = ServerEvent::decode(event, payload.clone())?;
            if matches!(decoded, ServerEvent::VideoFrame(_)) {
                relay.offer(MessageFromBackend::ServerEvent(decoded));
                return Ok(());
            }
            relay.deliver(MessageFromBackend::ServerEvent(decoded))
        });
    }

    let status_relay = relay.clone();
    connection.on_typed(names::CONNECTION_STATUS, move |status: StatusPayload| {
        status_relay.deliver(MessageFromBackend::ConnectionStatus {
            connected: status.connected,
            reason: status.reason,
        })
    });

    let latency_relay = relay.clone();
    connection.on_typed(names::CONNECTION_LATENCY, move |payload: LatencyPayload| {
        latency_relay.deliver(MessageFromBackend::ConnectionLatency(payload.latency))
    });
}

/// Applies the persisted alert volume at startup, before any reconnect.
async fn restore_alert_volume(
    store: &dyn KeyValueStore,
    session: &SharedSession,
    tx: &Sender<MessageFromBackend>,
) {
    let volume = match store::read::<f32>(store, keys::ALERT_VOLUME) {
        Ok(Some(volume)) => volume,
        Ok(None) => return,
        Err(error) => {
            log::warn!("{error}");
            return;
        }
    };
    log::info!("Restoring alert volume {volume}");
    let settings = ClientSettings {
        alert_volume: Some(volume),
        ..ClientSettings::default()
    };
    session.write().await.settings.merge(settings.clone());
    if tx
        .send(MessageFromBackend::SettingsRestored(settings))
        .await
        .is_err()
    {
        log::warn!("Frontend bridge is closed");
    }
}

/// Spawn the backend runtime and begin processing bridge messages. The
/// returned thread finishes once the frontend side of the bridge is dropped
/// and the channel has been shut down.
pub fn run(
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("backend".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build tokio runtime");
            runtime.block_on(async { setup_backend(rx, tx).await });
        })
        .expect("failed to spawn backend thread")
}
