use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use vigil_bridge::config::ConnectionConfig;
use vigil_bridge::diagnostics::{ConnectionSnapshot, ConnectionState};
use vigil_bridge::events::{
    AcknowledgeAlert, BatchedMessage, CameraCommand, DataRequest, MonitoringCommand, Pong,
    Timestamped, names,
};
use vigil_bridge::notification::{DismissAfter, NotificationMessage};

use super::listeners::{self, ListenerId, ListenerRegistry};
use super::queue::{OutboundQueue, QueuedFrame};
use super::timer::Timer;
use super::transport::{ChannelEvent, ChannelLink, Connector, DisconnectReason, Frame};
use super::{TrafficTap, now_millis};
use crate::notify::NotificationSink;

const OFFLINE_WARNING: &str = "Connection lost. Message will be sent when reconnected.";

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(0);

enum Command {
    Send(Frame),
    Batch(Frame),
    ForceReconnect,
    Shutdown(oneshot::Sender<()>),
}

/// Optional components the manager reports to.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub notifier: Option<Arc<dyn NotificationSink>>,
    pub tap: Option<Arc<dyn TrafficTap>>,
}

/// Why [`ConnectionHandle::request`] produced no response.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("not connected")]
    NotConnected,
    #[error("no response within {0:?}")]
    TimedOut(Duration),
    #[error("connection shut down")]
    Closed,
}

/// Cloneable front of a running [`ConnectionManager`].
#[derive(Clone)]
pub struct ConnectionHandle {
    commands: UnboundedSender<Command>,
    listeners: Arc<Mutex<ListenerRegistry>>,
    snapshot: watch::Receiver<ConnectionSnapshot>,
    request_timeout: Duration,
}

impl ConnectionHandle {
    /// Sends an event now, or queues it until the channel is connected.
    pub fn send(&self, event: &str, payload: Value) {
        if self
            .commands
            .send(Command::Send(Frame::new(event, payload)))
            .is_err()
        {
            log::warn!("Connection is shut down, dropping {event}");
        }
    }

    /// Adds an event to the next `batch_messages` frame. The batch goes out
    /// once it is full or shortly after its first entry.
    pub fn batch(&self, event: &str, payload: Value) {
        if self
            .commands
            .send(Command::Batch(Frame::new(event, payload)))
            .is_err()
        {
            log::warn!("Connection is shut down, dropping {event}");
        }
    }

    /// Sends `<data_type>_request` and waits for the `<data_type>_response`
    /// carrying the same `requestId`. The response listener is removed
    /// whatever the outcome.
    pub async fn request(&self, data_type: &str) -> Result<Value, RequestError> {
        if !self.is_connected() {
            log::error!("Cannot request {data_type}: not connected");
            return Err(RequestError::NotConnected);
        }

        let request_id = format!(
            "req_{}_{}",
            now_millis(),
            REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        let response_event = format!("{data_type}_response");
        let (reply_tx, reply_rx) = oneshot::channel();
        let reply_tx = Mutex::new(Some(reply_tx));
        let expected = request_id.clone();
        let listener = self.on(&response_event, move |payload| {
            if payload.get("requestId").and_then(Value::as_str) == Some(expected.as_str())
                && let Some(reply) = reply_tx
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
            {
                let _ = reply.send(payload.clone());
            }
            Ok(())
        });

        self.send_serialized(
            &format!("{data_type}_request"),
            &DataRequest {
                request_id,
                timestamp: now_millis(),
            },
        );
        let outcome = tokio::time::timeout(self.request_timeout, reply_rx).await;
        self.off(&response_event, listener);
        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(RequestError::Closed),
            Err(_) => Err(RequestError::TimedOut(self.request_timeout)),
        }
    }

    pub fn request_frame(&self) {
        self.send_serialized(names::REQUEST_FRAME, &Timestamped { timestamp: now_millis() });
    }

    pub fn request_status(&self) {
        self.send_serialized(names::REQUEST_STATUS, &Timestamped { timestamp: now_millis() });
    }

    /// `source` tells the server who asked, e.g. `dashboard` or `recovery`.
    pub fn start_monitoring(&self, source: &str) {
        self.send_monitoring(names::START_MONITORING, source);
    }

    pub fn stop_monitoring(&self, source: &str) {
        self.send_monitoring(names::STOP_MONITORING, source);
    }

    fn send_monitoring(&self, event: &str, source: &str) {
        self.send_serialized(
            event,
            &MonitoringCommand {
                timestamp: now_millis(),
                source: source.to_string(),
            },
        );
    }

    pub fn camera_command(&self, command: &str, parameters: Value) {
        self.send_serialized(
            names::CAMERA_COMMAND,
            &CameraCommand {
                command: command.to_string(),
                parameters,
                timestamp: now_millis(),
            },
        );
    }

    pub fn acknowledge_alert(&self, alert_id: &str, user_id: &str) {
        self.send_serialized(
            names::ACKNOWLEDGE_ALERT,
            &AcknowledgeAlert {
                alert_id: alert_id.to_string(),
                timestamp: now_millis(),
                user_id: user_id.to_string(),
            },
        );
    }

    fn send_serialized<T: serde::Serialize>(&self, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(payload) => self.send(event, payload),
            Err(error) => log::error!("Failed to encode {event}: {error}"),
        }
    }

    /// Registers a handler. Handlers of one event run in registration order;
    /// a failing handler does not affect the others.
    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.lock_listeners().add(event, Arc::new(handler))
    }

    /// Registers a handler that receives the payload decoded as `T`.
    pub fn on_typed<T, F>(&self, event: &str, handler: F) -> ListenerId
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(event, move |payload| {
            handler(serde_json::from_value(payload.clone())?)
        })
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.lock_listeners().remove(event, id)
    }

    /// Forwards every payload of `event` into a channel, for async consumers.
    pub fn subscribe(&self, event: &str) -> UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on(event, move |payload| {
            let _ = tx.send(payload.clone());
            Ok(())
        });
        rx
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.borrow().is_connected()
    }

    /// Waits until the snapshot satisfies `predicate`. Returns `None` once
    /// the manager has stopped.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ConnectionSnapshot) -> bool,
    ) -> Option<ConnectionSnapshot> {
        let mut snapshot = self.snapshot.clone();
        let result = snapshot.wait_for(predicate).await;
        result.ok().map(|snapshot| snapshot.clone())
    }

    /// Resets the attempt counter, drops the current link and connects again
    /// after a short delay.
    pub fn force_reconnect(&self) {
        if self.commands.send(Command::ForceReconnect).is_err() {
            log::warn!("Connection is shut down, ignoring reconnect");
        }
    }

    /// Stops the manager and waits for it to tear down. Calling it again is
    /// a no-op.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    fn lock_listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the channel and all of its timers.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    config: ConnectionConfig,
    collaborators: Collaborators,
    commands: UnboundedReceiver<Command>,
    listeners: Arc<Mutex<ListenerRegistry>>,
    snapshot: watch::Sender<ConnectionSnapshot>,

    outbound: Option<UnboundedSender<Frame>>,
    inbound: Option<UnboundedReceiver<ChannelEvent>>,
    queue: OutboundQueue,
    state: ConnectionState,
    reconnect_attempts: u32,
    last_ping: Option<u64>,
    last_activity: Option<u64>,
    latency: Option<u64>,
    batch: Vec<BatchedMessage>,

    heartbeat: Timer,
    ping_timeout: Timer,
    reconnect: Timer,
    force_reconnect: Timer,
    health: Timer,
    batch_flush: Timer,
}

impl ConnectionManager {
    /// Creates the manager and its handle. Nothing connects until
    /// [`ConnectionManager::run`] is polled, so listeners registered on the
    /// handle in between see the first connect.
    pub fn new(
        connector: impl Connector,
        config: ConnectionConfig,
        collaborators: Collaborators,
    ) -> (ConnectionHandle, ConnectionManager) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let listeners = Arc::new(Mutex::new(ListenerRegistry::default()));
        let (snapshot_tx, snapshot_rx) = watch::channel(ConnectionSnapshot {
            max_reconnect_attempts: config.max_reconnect_attempts,
            ..ConnectionSnapshot::default()
        });

        let handle = ConnectionHandle {
            commands: commands_tx,
            listeners: listeners.clone(),
            snapshot: snapshot_rx,
            request_timeout: config.request_timeout(),
        };
        let manager = ConnectionManager {
            connector: Box::new(connector),
            queue: OutboundQueue::new(config.queue_capacity),
            config,
            collaborators,
            commands: commands_rx,
            listeners,
            snapshot: snapshot_tx,
            outbound: None,
            inbound: None,
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            last_ping: None,
            last_activity: None,
            latency: None,
            batch: Vec::new(),
            heartbeat: Timer::default(),
            ping_timeout: Timer::default(),
            reconnect: Timer::default(),
            force_reconnect: Timer::default(),
            health: Timer::default(),
            batch_flush: Timer::default(),
        };
        (handle, manager)
    }

    /// Connects and serves the channel until shut down or every handle is
    /// dropped.
    pub async fn run(mut self) {
        if !self.config.health_log_interval().is_zero() {
            self.health.arm(self.config.health_log_interval());
        }
        self.connect().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => self.send(frame),
                    Some(Command::Batch(frame)) => self.add_to_batch(frame),
                    Some(Command::ForceReconnect) => self.begin_force_reconnect(),
                    Some(Command::Shutdown(done)) => {
                        self.teardown();
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.teardown();
                        break;
                    }
                },
                event = next_event(&mut self.inbound) => match event {
                    ChannelEvent::Frame(frame) => self.on_frame(frame),
                    ChannelEvent::Closed(reason) => self.on_disconnect(reason),
                },
                _ = self.heartbeat.elapsed() => self.send_heartbeat(),
                _ = self.ping_timeout.elapsed() => {
                    self.ping_timeout.cancel();
                    log::warn!("Ping timeout - connection may be unstable");
                    self.on_disconnect(DisconnectReason::PingTimeout);
                }
                _ = self.reconnect.elapsed() => {
                    self.reconnect.cancel();
                    self.connect().await;
                }
                _ = self.force_reconnect.elapsed() => {
                    self.force_reconnect.cancel();
                    self.connect().await;
                }
                _ = self.batch_flush.elapsed() => self.flush_batch(),
                _ = self.health.elapsed() => {
                    self.log_health();
                    self.health.arm(self.config.health_log_interval());
                }
            }
        }
        log::info!("Connection manager stopped");
    }

    async fn connect(&mut self) {
        if self.state == ConnectionState::Connected {
            return;
        }
        self.state = ConnectionState::Connecting;
        self.publish();
        log::info!("Connecting to {}", self.connector.describe());

        let attempt =
            tokio::time::timeout(self.config.connect_timeout(), self.connector.connect()).await;
        match attempt {
            Ok(Ok(link)) => self.on_connected(link),
            Ok(Err(error)) => {
                log::error!("Connection error: {error}");
                self.attempt_reconnect();
            }
            Err(_) => {
                log::error!(
                    "Connection error: no answer within {:?}",
                    self.config.connect_timeout()
                );
                self.attempt_reconnect();
            }
        }
    }

    fn on_connected(&mut self, link: ChannelLink) {
        log::info!("Connected to security system");
        self.outbound = Some(link.outbound);
        self.inbound = Some(link.inbound);
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        self.reconnect.cancel();

        self.flush_queue();
        if !self.config.heartbeat_interval().is_zero() {
            self.heartbeat.arm(self.config.heartbeat_interval());
        }
        self.publish();

        self.emit_local(names::CONNECTION_STATUS, json!({ "connected": true }));
        self.notify(NotificationMessage::success("Connected to security system"));
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        log::warn!("Disconnected from server: {reason}");
        self.outbound = None;
        self.inbound = None;
        self.heartbeat.cancel();
        self.ping_timeout.cancel();
        self.state = ConnectionState::Disconnected;
        self.publish();

        self.emit_local(
            names::CONNECTION_STATUS,
            json!({ "connected": false, "reason": reason.as_str() }),
        );
        self.notify(NotificationMessage::warning(format!("Disconnected: {reason}")));

        if reason.is_transient() {
            self.attempt_reconnect();
        }
    }

    fn attempt_reconnect(&mut self) {
        let max = self.config.max_reconnect_attempts;
        if self.reconnect_attempts >= max {
            log::error!("Max reconnection attempts reached");
            self.reconnect.cancel();
            self.state = ConnectionState::Failed;
            self.publish();
            self.notify(NotificationMessage::error("Failed to reconnect to server").persistent());
            return;
        }

        self.reconnect_attempts += 1;
        self.state = ConnectionState::Reconnecting;
        self.publish();
        log::info!(
            "Attempting to reconnect ({}/{max})",
            self.reconnect_attempts
        );
        self.notify(
            NotificationMessage::info(format!(
                "Reconnecting... ({}/{max})",
                self.reconnect_attempts
            ))
            .dismiss_after(DismissAfter::millis(2000)),
        );
        self.reconnect.arm(self.config.reconnect_interval());
    }

    fn begin_force_reconnect(&mut self) {
        log::info!("Forcing reconnection");
        self.reconnect_attempts = 0;
        self.reconnect.cancel();
        if self.outbound.is_some() {
            self.on_disconnect(DisconnectReason::ClientDisconnect);
        } else {
            self.state = ConnectionState::Disconnected;
            self.publish();
        }
        self.force_reconnect
            .arm(self.config.force_reconnect_delay());
    }

    fn send(&mut self, frame: Frame) {
        if self.state == ConnectionState::Connected {
            match self.transmit(frame) {
                Ok(()) => return,
                Err(frame) => self.enqueue(frame),
            }
        } else {
            log::warn!("Cannot send {}: not connected", frame.event);
            self.notify(NotificationMessage::warning(OFFLINE_WARNING));
            self.enqueue(frame);
        }
    }

    fn add_to_batch(&mut self, frame: Frame) {
        self.batch.push(BatchedMessage {
            event: frame.event,
            data: frame.data,
            timestamp: now_millis(),
        });
        if self.batch.len() >= self.config.batch_size.max(1) {
            self.flush_batch();
        } else if !self.batch_flush.is_armed() {
            self.batch_flush.arm(self.config.batch_flush_interval());
        }
    }

    fn flush_batch(&mut self) {
        self.batch_flush.cancel();
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        match serde_json::to_value(&batch) {
            Ok(payload) => self.send(Frame::new(names::BATCH_MESSAGES, payload)),
            Err(error) => log::error!("Failed to encode message batch: {error}"),
        }
    }

    fn enqueue(&mut self, frame: Frame) {
        log::debug!("Message queued: {}", frame.event);
        let evicted = self.queue.push(QueuedFrame {
            frame,
            queued_at: now_millis(),
        });
        if let Some(evicted) = evicted {
            log::warn!(
                "Outbound queue is full, dropped oldest message {}",
                evicted.frame.event
            );
        }
        self.publish();
    }

    /// Hands a frame to the open link. Gives the frame back if there is no
    /// link or it has closed.
    fn transmit(&mut self, frame: Frame) -> Result<(), Frame> {
        let Some(outbound) = &self.outbound else {
            return Err(frame);
        };
        if let Some(tap) = &self.collaborators.tap {
            tap.outbound(&frame);
        }
        outbound.send(frame).map_err(|error| error.0)
    }

    fn flush_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        log::info!("Processing {} queued messages", self.queue.len());
        while let Some(queued) = self.queue.pop() {
            if let Err(frame) = self.transmit(queued.frame) {
                log::warn!("Channel closed while flushing queued messages");
                self.queue.push_front(QueuedFrame {
                    frame,
                    queued_at: queued.queued_at,
                });
                break;
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) {
        if let Some(tap) = &self.collaborators.tap {
            tap.inbound(&frame);
        }
        self.last_activity = Some(now_millis());

        if frame.event == names::PONG {
            self.on_pong(&frame.data);
        } else {
            listeners::dispatch(&self.listeners, &frame.event, &frame.data);
        }
        self.publish();
    }

    fn send_heartbeat(&mut self) {
        self.heartbeat.cancel();
        if self.state != ConnectionState::Connected {
            return;
        }
        let timestamp = now_millis();
        let ping = Frame::new(names::PING, json!({ "timestamp": timestamp }));
        if self.transmit(ping).is_ok() {
            self.last_ping = Some(timestamp);
            self.ping_timeout.arm(self.config.ping_timeout());
            self.publish();
        }
        self.heartbeat.arm(self.config.heartbeat_interval());
    }

    fn on_pong(&mut self, payload: &Value) {
        if !self.ping_timeout.is_armed() {
            log::debug!("Ignoring unsolicited pong");
            return;
        }
        self.ping_timeout.cancel();

        let pong: Pong = serde_json::from_value(payload.clone()).unwrap_or_default();
        let Some(sent_at) = pong.timestamp.or(self.last_ping) else {
            return;
        };
        let latency = now_millis().saturating_sub(sent_at);
        self.latency = Some(latency);
        self.emit_local(names::CONNECTION_LATENCY, json!({ "latency": latency }));
    }

    fn log_health(&self) {
        let idle = self
            .last_activity
            .map(|at| format!("{}ms", now_millis().saturating_sub(at)))
            .unwrap_or_else(|| "never".to_string());
        log::info!(
            "Connection health: state={:?}, last activity {idle} ago, queued={}, latency={:?}",
            self.state,
            self.queue.len(),
            self.latency
        );
    }

    fn teardown(&mut self) {
        log::info!("Closing real-time channel");
        self.heartbeat.cancel();
        self.ping_timeout.cancel();
        self.reconnect.cancel();
        self.force_reconnect.cancel();
        self.health.cancel();
        self.batch_flush.cancel();
        self.batch.clear();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.queue.clear();
        self.outbound = None;
        self.inbound = None;
        self.state = ConnectionState::Disconnected;
        self.publish();
    }

    fn emit_local(&self, event: &str, payload: Value) {
        listeners::dispatch(&self.listeners, event, &payload);
    }

    fn notify(&self, message: NotificationMessage) {
        if let Some(notifier) = &self.collaborators.notifier {
            notifier.notify(message);
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(ConnectionSnapshot {
            state: self.state,
            reconnect_attempts: self.reconnect_attempts,
            max_reconnect_attempts: self.config.max_reconnect_attempts,
            queued_messages: self.queue.len(),
            last_ping: self.last_ping,
            last_activity: self.last_activity,
            latency: self.latency,
        });
    }
}

async fn next_event(inbound: &mut Option<UnboundedReceiver<ChannelEvent>>) -> ChannelEvent {
    match inbound {
        Some(inbound) => inbound
            .recv()
            .await
            .unwrap_or(ChannelEvent::Closed(DisconnectReason::TransportClose)),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::JoinHandle;
    use tokio::time::Instant;
    use vigil_bridge::notification::Severity;

    use super::*;
    use crate::connection::testing::{MockConnector, MockServer};

    struct Harness {
        handle: ConnectionHandle,
        connector: MockConnector,
        servers: UnboundedReceiver<MockServer>,
        notifications: UnboundedReceiver<NotificationMessage>,
        status: UnboundedReceiver<Value>,
        latency: UnboundedReceiver<Value>,
        task: JoinHandle<()>,
    }

    impl Harness {
        fn start(refuse: bool) -> Self {
            Self::start_with(ConnectionConfig::default(), refuse)
        }

        fn start_with(config: ConnectionConfig, refuse: bool) -> Self {
            let (connector, servers) = MockConnector::new(refuse);
            let (notifications_tx, notifications) = mpsc::unbounded_channel();
            let collaborators = Collaborators {
                notifier: Some(Arc::new(notifications_tx)),
                tap: None,
            };
            let (handle, manager) =
                ConnectionManager::new(connector.clone(), config, collaborators);
            let status = handle.subscribe(names::CONNECTION_STATUS);
            let latency = handle.subscribe(names::CONNECTION_LATENCY);
            let task = tokio::spawn(manager.run());
            Harness {
                handle,
                connector,
                servers,
                notifications,
                status,
                latency,
                task,
            }
        }

        async fn server(&mut self) -> MockServer {
            self.servers.recv().await.unwrap()
        }

        async fn wait_for_state(&self, state: ConnectionState) -> ConnectionSnapshot {
            self.handle
                .wait_for(|snapshot| snapshot.state == state)
                .await
                .unwrap()
        }

        fn drain_notifications(&mut self) -> Vec<NotificationMessage> {
            let mut drained = Vec::new();
            while let Ok(message) = self.notifications.try_recv() {
                drained.push(message);
            }
            drained
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connecting_emits_status_and_success_notification() {
        let mut harness = Harness::start(false);
        let _server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        assert_eq!(
            harness.status.recv().await.unwrap(),
            json!({ "connected": true })
        );
        let notifications = harness.drain_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].severity, Severity::Success);
        assert_eq!(notifications[0].message, "Connected to security system");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_maximum_number_of_attempts() {
        let mut harness = Harness::start(true);
        let failed = harness.wait_for_state(ConnectionState::Failed).await;
        assert_eq!(failed.reconnect_attempts, 5);

        let attempts = harness.connector.attempts();
        assert_eq!(attempts.len(), 6);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }

        let notifications = harness.drain_notifications();
        let progress: Vec<_> = notifications
            .iter()
            .filter(|n| n.severity == Severity::Info)
            .map(|n| n.message.as_str())
            .collect();
        assert_eq!(
            progress,
            vec![
                "Reconnecting... (1/5)",
                "Reconnecting... (2/5)",
                "Reconnecting... (3/5)",
                "Reconnecting... (4/5)",
                "Reconnecting... (5/5)",
            ]
        );
        let last = notifications.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert_eq!(last.message, "Failed to reconnect to server");
        assert_eq!(last.dismiss_after, DismissAfter::Never);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(harness.connector.attempts().len(), 6);
        assert_eq!(harness.handle.snapshot().state, ConnectionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_connect_resets_the_attempt_counter() {
        let mut harness = Harness::start(true);
        harness
            .handle
            .wait_for(|snapshot| snapshot.reconnect_attempts == 2)
            .await
            .unwrap();

        harness.connector.set_refuse(false);
        let server = harness.server().await;
        let connected = harness.wait_for_state(ConnectionState::Connected).await;
        assert_eq!(connected.reconnect_attempts, 0);

        server.close(DisconnectReason::TransportClose);
        let reconnecting = harness.wait_for_state(ConnectionState::Reconnecting).await;
        assert_eq!(reconnecting.reconnect_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_sent_while_offline_are_flushed_in_order() {
        let mut harness = Harness::start(false);
        let server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        harness.connector.set_refuse(true);
        server.close(DisconnectReason::TransportClose);
        harness.wait_for_state(ConnectionState::Reconnecting).await;

        harness.handle.start_monitoring("dashboard");
        harness.handle.camera_command("pan", json!({ "x": 1 }));
        harness
            .handle
            .wait_for(|snapshot| snapshot.queued_messages == 2)
            .await
            .unwrap();

        harness.connector.set_refuse(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;
        harness.handle.send("live", json!({}));

        let mut events = Vec::new();
        for _ in 0..3 {
            events.push(server.outbound.recv().await.unwrap().event);
        }
        assert_eq!(events, vec!["start_monitoring", "camera_command", "live"]);
        assert_eq!(harness.handle.snapshot().queued_messages, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_overflow_drops_the_oldest_frames() {
        let config = ConnectionConfig {
            queue_capacity: 2,
            ..ConnectionConfig::default()
        };
        let mut harness = Harness::start_with(config, true);
        harness.wait_for_state(ConnectionState::Reconnecting).await;

        for name in ["a", "b", "c"] {
            harness.handle.send(name, Value::Null);
        }
        harness
            .handle
            .wait_for(|snapshot| snapshot.queued_messages == 2)
            .await
            .unwrap();

        harness.connector.set_refuse(false);
        let mut server = harness.server().await;
        assert_eq!(server.outbound.recv().await.unwrap().event, "b");
        assert_eq!(server.outbound.recv().await.unwrap().event, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_pong_is_treated_as_a_transient_drop() {
        let mut harness = Harness::start(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;
        assert_eq!(harness.status.recv().await.unwrap()["connected"], true);

        let started = Instant::now();
        let ping = server.outbound.recv().await.unwrap();
        assert_eq!(ping.event, "ping");
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(ping.data["timestamp"].is_u64());

        let status = harness.status.recv().await.unwrap();
        assert_eq!(
            status,
            json!({ "connected": false, "reason": "ping timeout" })
        );
        assert!(started.elapsed() >= Duration::from_secs(35));
        let snapshot = harness.handle.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Reconnecting);
        assert_eq!(snapshot.reconnect_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pong_keeps_the_channel_alive_and_reports_latency() {
        let mut harness = Harness::start(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        let ping = server.outbound.recv().await.unwrap();
        server.push("pong", ping.data.clone());

        let latency = harness.latency.recv().await.unwrap();
        assert!(latency["latency"].is_u64());
        harness
            .handle
            .wait_for(|snapshot| snapshot.last_activity.is_some())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(harness.handle.is_connected());
        assert_eq!(harness.connector.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsolicited_pong_is_ignored() {
        let mut harness = Harness::start(false);
        let server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        server.push("pong", json!({ "timestamp": 1 }));
        harness
            .handle
            .wait_for(|snapshot| snapshot.last_activity.is_some())
            .await
            .unwrap();
        assert!(harness.latency.try_recv().is_err());
        assert_eq!(harness.handle.snapshot().latency, None);
    }

    #[tokio::test(start_paused = true)]
    async fn deliberate_server_close_does_not_reconnect() {
        let mut harness = Harness::start(false);
        let server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        server.close(DisconnectReason::ServerDisconnect);
        harness.wait_for_state(ConnectionState::Disconnected).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(harness.connector.attempts().len(), 1);
        assert_eq!(
            harness.handle.snapshot().state,
            ConnectionState::Disconnected
        );
        let warnings: Vec<_> = harness
            .drain_notifications()
            .into_iter()
            .filter(|n| n.severity == Severity::Warning)
            .map(|n| n.message)
            .collect();
        assert_eq!(warnings, vec!["Disconnected: io server disconnect"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listener_does_not_block_later_listeners() {
        let mut harness = Harness::start(false);
        harness
            .handle
            .on("system_alert", |_| anyhow::bail!("listener bug"));
        let mut alerts = harness.handle.subscribe("system_alert");

        let server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;
        server.push("system_alert", json!({ "message": "door forced" }));

        assert_eq!(
            alerts.recv().await.unwrap(),
            json!({ "message": "door forced" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn typed_listeners_receive_decoded_payloads() {
        let mut harness = Harness::start(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        harness.handle.on_typed("system_alert", move |alert: vigil_bridge::events::SystemAlert| {
            tx.send(alert.severity)?;
            Ok(())
        });

        let server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;
        server.push("system_alert", json!({ "message": "motion" }));
        assert_eq!(rx.recv().await.unwrap(), "warning");
    }

    #[tokio::test(start_paused = true)]
    async fn removed_listener_stops_receiving() {
        let mut harness = Harness::start(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = harness.handle.on("system_status", move |payload| {
            tx.send(payload.clone())?;
            Ok(())
        });
        assert!(harness.handle.off("system_status", id));
        assert!(!harness.handle.off("system_status", id));

        let server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;
        server.push("system_status", json!({ "status": "ok" }));
        harness
            .handle
            .wait_for(|snapshot| snapshot.last_activity.is_some())
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn force_reconnect_recovers_from_failure() {
        let mut harness = Harness::start(true);
        harness.wait_for_state(ConnectionState::Failed).await;

        harness.connector.set_refuse(false);
        harness.handle.force_reconnect();
        let _server = harness.server().await;
        let connected = harness.wait_for_state(ConnectionState::Connected).await;
        assert_eq!(connected.reconnect_attempts, 0);
        assert_eq!(harness.connector.attempts().len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_idempotent() {
        let mut harness = Harness::start(false);
        let _server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        harness.handle.shutdown().await;
        harness.handle.shutdown().await;
        (&mut harness.task).await.unwrap();

        assert_eq!(
            harness.handle.snapshot().state,
            ConnectionState::Disconnected
        );
        harness.handle.send("late", Value::Null);
        assert!(harness.handle.wait_for(|_| false).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn typed_helpers_send_the_expected_payloads() {
        let mut harness = Harness::start(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        harness.handle.stop_monitoring("dashboard");
        harness.handle.acknowledge_alert("alert-9", "anonymous");

        let stop = server.outbound.recv().await.unwrap();
        assert_eq!(stop.event, "stop_monitoring");
        assert_eq!(stop.data["source"], "dashboard");
        assert!(stop.data["timestamp"].is_u64());

        let ack = server.outbound.recv().await.unwrap();
        assert_eq!(ack.event, "acknowledge_alert");
        assert_eq!(ack.data["alertId"], "alert-9");
        assert_eq!(ack.data["userId"], "anonymous");

        harness.handle.request_frame();
        harness.handle.request_status();
        for event in ["request_frame", "request_status"] {
            let frame = server.outbound.recv().await.unwrap();
            assert_eq!(frame.event, event);
            assert!(frame.data["timestamp"].is_u64());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sending_while_offline_warns_and_queues() {
        let mut harness = Harness::start(true);
        harness.wait_for_state(ConnectionState::Reconnecting).await;
        harness.drain_notifications();

        harness.handle.send("a", Value::Null);
        harness
            .handle
            .wait_for(|snapshot| snapshot.queued_messages == 1)
            .await
            .unwrap();

        let warnings: Vec<_> = harness
            .drain_notifications()
            .into_iter()
            .filter(|n| n.severity == Severity::Warning)
            .map(|n| n.message)
            .collect();
        assert_eq!(warnings, vec![OFFLINE_WARNING]);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_flush_when_full_or_after_the_interval() {
        let mut harness = Harness::start(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        for index in 0..10 {
            harness.handle.batch("tick", json!({ "n": index }));
        }
        let full = server.outbound.recv().await.unwrap();
        assert_eq!(full.event, "batch_messages");
        let entries = full.data.as_array().unwrap();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0]["event"], "tick");
        assert_eq!(entries[9]["data"]["n"], 9);
        assert!(entries[9]["timestamp"].is_u64());

        let start = Instant::now();
        harness.handle.batch("tick", json!({ "n": 10 }));
        harness.handle.batch("tock", json!({}));
        let partial = server.outbound.recv().await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(100) && waited < Duration::from_millis(200));
        let events: Vec<_> = partial
            .data
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["event"].as_str().unwrap())
            .collect();
        assert_eq!(events, ["tick", "tock"]);
        assert!(server.outbound.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn request_matches_its_response_by_id() {
        let mut harness = Harness::start(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        let handle = harness.handle.clone();
        let pending = tokio::spawn(async move { handle.request("stats").await });

        let request = server.outbound.recv().await.unwrap();
        assert_eq!(request.event, "stats_request");
        let request_id = request.data["requestId"].as_str().unwrap().to_string();
        assert!(request_id.starts_with("req_"));
        assert!(request.data["timestamp"].is_u64());

        server.push("stats_response", json!({ "requestId": "req_other", "fps": 1 }));
        server.push("stats_response", json!({ "requestId": request_id, "fps": 30 }));

        let response = pending.await.unwrap().unwrap();
        assert_eq!(response["fps"], 30);
        assert!(
            harness
                .handle
                .lock_listeners()
                .listeners("stats_response")
                .is_empty()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out_and_drops_its_listener() {
        let mut harness = Harness::start(false);
        let mut server = harness.server().await;
        harness.wait_for_state(ConnectionState::Connected).await;

        let start = Instant::now();
        let error = harness.handle.request("stats").await.unwrap_err();
        assert!(matches!(error, RequestError::TimedOut(_)));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
        assert!(
            harness
                .handle
                .lock_listeners()
                .listeners("stats_response")
                .is_empty()
        );
        assert_eq!(server.outbound.recv().await.unwrap().event, "stats_request");
    }

    #[tokio::test(start_paused = true)]
    async fn request_needs_a_connection() {
        let harness = Harness::start(true);
        harness.wait_for_state(ConnectionState::Reconnecting).await;
        assert!(matches!(
            harness.handle.request("stats").await,
            Err(RequestError::NotConnected)
        ));
        assert_eq!(harness.handle.snapshot().queued_messages, 0);
    }
}
