//! Terminal frontend of the dashboard.
//!
//! Renders notifications and dashboard state as text, reads commands from
//! stdin and talks to the backend only through the bridge channels.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use vigil_audio::cue::{AudioCue, SoundPlayer};
use vigil_bridge::config::{AudioConfig, Config};
use vigil_bridge::notification::{ActionKind, NotificationMessage};
use vigil_bridge::settings::ClientSettings;
use vigil_bridge::{MessageFromBackend, MessageToBackend};

use crate::dashboard::{Dashboard, Reaction, VIOLATION_LIST_LIMIT};
use crate::input::Command;
use crate::notifications::{NotificationCenter, NotificationId};

pub mod dashboard;
pub mod formatting;
pub mod input;
pub mod notifications;
pub mod terminal;

#[cfg(feature = "device")]
type Player = vigil_audio::device::CpalPlayer;
#[cfg(not(feature = "device"))]
type Player = vigil_audio::cue::LogPlayer;

#[derive(Clone)]
pub struct BackendBridge {
    pub to_backend: mpsc::Sender<MessageToBackend>,
}

impl BackendBridge {
    pub async fn send(&self, message: MessageToBackend) {
        if let Err(error) = self.to_backend.send(message).await {
            log::warn!("Backend is gone, dropping {:?}", error.0);
        }
    }

    pub async fn request_config(&self) {
        self.send(MessageToBackend::ConfigurationRequest).await;
    }

    pub async fn update_settings(&self, settings: ClientSettings) {
        self.send(MessageToBackend::UpdateSettings(settings)).await;
    }

    /// Sends `message` once `delay` has passed, without blocking the caller.
    pub fn send_later(&self, message: MessageToBackend, delay: Duration) {
        let bridge = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bridge.send(message).await;
        });
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn audio_cue<P: SoundPlayer>(player: P, config: &AudioConfig) -> AudioCue<P> {
    let mut cue = AudioCue::new(player);
    cue.set_volume(config.volume);
    if !config.enabled {
        cue.disable();
    }
    cue
}

struct Frontend<P> {
    bridge: BackendBridge,
    center: NotificationCenter<P>,
    dashboard: Dashboard,
}

impl<P: SoundPlayer> Frontend<P> {
    fn new(bridge: BackendBridge, player: P) -> Self {
        let config = Config::default();
        Self {
            bridge,
            center: NotificationCenter::new(
                &config.notifications,
                audio_cue(player, &config.audio),
            ),
            dashboard: Dashboard::default(),
        }
    }

    /// Applies the loaded configuration to the live notification center,
    /// keeping a volume restored before the configuration arrived.
    fn configure(&mut self, config: &Config, now: Instant) {
        self.center.configure(&config.notifications, now);
        let audio = self.center.audio_mut();
        audio.set_volume(
            self.dashboard
                .settings
                .alert_volume
                .unwrap_or(config.audio.volume),
        );
        if config.audio.enabled {
            audio.enable();
        } else {
            audio.disable();
        }
        log::info!(
            "Notifications: {} live at most, sound {}",
            config.notifications.max_active,
            if self.center.sound_enabled() { "on" } else { "off" }
        );
    }

    fn handle_backend_message(&mut self, message: MessageFromBackend, now: Instant) {
        match message {
            MessageFromBackend::ConfigurationResponse(config) => self.configure(&config, now),
            MessageFromBackend::ConnectionStateResponse(snapshot) => {
                println!("{}", terminal::connection_snapshot(&snapshot));
            }
            MessageFromBackend::TrafficLogResponse(records) => {
                if records.is_empty() {
                    println!("traffic log is empty (enable it with `traffic on`)");
                }
                for record in &records {
                    println!("{}", terminal::traffic_record(record));
                }
            }
            MessageFromBackend::DataResponse { data_type, payload } => {
                println!("{data_type}: {payload}");
            }
            MessageFromBackend::ViolationsResponse(violations) => {
                println!("{} violation(s)", violations.len());
                for record in &violations {
                    println!("{}", terminal::violation(record));
                }
                self.dashboard
                    .apply(MessageFromBackend::ViolationsResponse(violations), now);
            }
            other => {
                for reaction in self.dashboard.apply(other, now) {
                    self.react(reaction, now);
                }
            }
        }
    }

    fn react(&mut self, reaction: Reaction, now: Instant) {
        match reaction {
            Reaction::Notify(message) => self.notify(message, now),
            Reaction::Request { message, delay } => self.bridge.send_later(message, delay),
            Reaction::ApplySettings(settings) => {
                if let Some(volume) = settings.alert_volume {
                    self.center.audio_mut().set_volume(volume);
                }
            }
        }
    }

    fn notify(&mut self, message: NotificationMessage, now: Instant) {
        let id = self.center.show(message, now);
        if let Some(shown) = self.center.queue().get(&id) {
            println!("{}", terminal::notification(shown));
        }
    }

    fn tick(&mut self, now: Instant) {
        self.center.advance(now);
    }

    fn print_dismissals(&mut self) {
        for dismissal in self.center.take_dismissals() {
            println!("{}", terminal::dismissal(&dismissal));
        }
    }

    async fn handle_line(&mut self, line: &str, now: Instant) -> Flow {
        match input::parse(line) {
            Ok(Some(command)) => self.handle_command(command, now).await,
            Ok(None) => Flow::Continue,
            Err(error) => {
                println!("{error}");
                Flow::Continue
            }
        }
    }

    async fn handle_command(&mut self, command: Command, now: Instant) -> Flow {
        let request = match command {
            Command::Start => MessageToBackend::StartMonitoring,
            Command::Stop => MessageToBackend::StopMonitoring,
            Command::Camera {
                command,
                parameters,
            } => MessageToBackend::CameraCommand {
                command,
                parameters,
            },
            Command::Acknowledge(alert_id) => MessageToBackend::AcknowledgeAlert(alert_id),
            Command::Send { event, payload } => MessageToBackend::Emit { event, payload },
            Command::Batch { event, payload } => MessageToBackend::EmitBatched { event, payload },
            Command::RequestFrame => MessageToBackend::RequestFrame,
            Command::ServerStatus => MessageToBackend::RequestChannelStatus,
            Command::Request(data_type) => MessageToBackend::RequestData(data_type),
            Command::Volume(volume) => {
                self.center.audio_mut().set_volume(volume);
                self.change_settings(ClientSettings {
                    alert_volume: Some(volume),
                    ..ClientSettings::default()
                })
            }
            Command::Quality(quality) => self.change_settings(ClientSettings {
                recording_quality: Some(quality),
                ..ClientSettings::default()
            }),
            Command::ToggleSound => {
                let enabled = self.center.toggle_sound();
                println!("notification sounds {}", if enabled { "on" } else { "off" });
                return Flow::Continue;
            }
            Command::Close(id) => {
                if !self.center.close(&NotificationId::from(id.as_str()), now) {
                    println!("no live notification `{id}`");
                }
                return Flow::Continue;
            }
            Command::CloseAll => {
                self.center.close_all(now);
                return Flow::Continue;
            }
            Command::Activate(id) => {
                self.activate(&NotificationId::from(id.as_str()), now);
                return Flow::Continue;
            }
            Command::History => {
                self.print_history();
                return Flow::Continue;
            }
            Command::ClearHistory => {
                self.center.clear_history();
                return Flow::Continue;
            }
            Command::ExportHistory(path) => {
                self.export_history(&path, now).await;
                return Flow::Continue;
            }
            Command::Violations => MessageToBackend::ListViolations {
                limit: VIOLATION_LIST_LIMIT,
            },
            Command::ClearViolations => MessageToBackend::ClearViolations,
            Command::ExportViolation(id) => MessageToBackend::ExportViolation(id),
            Command::ExportLogs => MessageToBackend::ExportLogs,
            Command::Health => MessageToBackend::HealthCheck,
            Command::TestAlarm => MessageToBackend::TestAlarm,
            Command::Reconnect => MessageToBackend::ForceReconnect,
            Command::Status => {
                println!("{}", terminal::dashboard(&self.dashboard, now));
                MessageToBackend::StatusRequest
            }
            Command::Debug => {
                self.bridge
                    .send(MessageToBackend::ConnectionStateRequest)
                    .await;
                MessageToBackend::TrafficLogRequest
            }
            Command::Traffic(enabled) => MessageToBackend::SetTrafficLog(enabled),
            Command::Help => {
                println!("{}", input::HELP);
                return Flow::Continue;
            }
            Command::Quit => return Flow::Quit,
        };

        self.bridge.send(request).await;
        Flow::Continue
    }

    fn change_settings(&mut self, settings: ClientSettings) -> MessageToBackend {
        self.dashboard.settings.merge(settings.clone());
        MessageToBackend::UpdateSettings(settings)
    }

    fn activate(&mut self, id: &NotificationId, now: Instant) {
        match self.center.activate(id, now) {
            Some(action) => match action.kind {
                ActionKind::PlayClip(Some(clip)) => println!("playing clip {clip}"),
                ActionKind::PlayClip(None) => println!("no footage recorded for this violation"),
                ActionKind::ShowAlertDetails => println!("{}", action.label),
            },
            None => println!("no action for `{id}`"),
        }
    }

    fn print_history(&self) {
        match self.center.history() {
            Some(history) if !history.is_empty() => {
                for entry in history.entries() {
                    println!("{}", terminal::history_entry(entry));
                }
            }
            Some(_) => println!("history is empty"),
            None => println!("history is disabled"),
        }
    }

    async fn export_history(&mut self, path: &std::path::Path, now: Instant) {
        let Some(history) = self.center.history() else {
            println!("history is disabled");
            return;
        };

        let result = match history.export_json() {
            Ok(json) => tokio::fs::write(path, json).await.map_err(anyhow::Error::from),
            Err(error) => Err(error.into()),
        };
        let message = match result {
            Ok(()) => NotificationMessage::success(format!("History exported to {}", path.display())),
            Err(error) => {
                log::error!("Failed to export history to {path:?}: {error}");
                NotificationMessage::error(format!("Failed to export history: {error}"))
            }
        };
        self.notify(message, now);
    }
}

/// Resolves when `deadline` passes; never when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

async fn event_loop(
    mut rx: mpsc::Receiver<MessageFromBackend>,
    tx: mpsc::Sender<MessageToBackend>,
) -> anyhow::Result<()> {
    let bridge = BackendBridge { to_backend: tx };
    let mut frontend = Frontend::new(bridge.clone(), Player::default());
    bridge.request_config().await;

    println!("vigil dashboard, type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else {
                    log::info!("Backend bridge closed");
                    break;
                };
                log::debug!("Got a message from backend: {message:?}");
                frontend.handle_backend_message(message, Instant::now());
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if frontend.handle_line(&line, Instant::now()).await == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("Input closed, running without commands");
                    stdin_open = false;
                }
                Err(error) => {
                    log::warn!("Failed to read input: {error}");
                    stdin_open = false;
                }
            },
            _ = wait_until(frontend.center.next_deadline()) => {
                frontend.tick(Instant::now());
            }
        }
        frontend.print_dismissals();
    }

    Ok(())
}

/// Runs the frontend on the current thread until the user quits or the
/// backend goes away. Dropping `tx` on return lets the backend shut down.
pub fn run(
    rx: mpsc::Receiver<MessageFromBackend>,
    tx: mpsc::Sender<MessageToBackend>,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(event_loop(rx, tx))
}
