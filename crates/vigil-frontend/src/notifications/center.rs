use std::time::Instant;

use vigil_audio::cue::{AudioCue, SoundPlayer};
use vigil_bridge::config::NotificationConfig;
use vigil_bridge::notification::{NotificationAction, NotificationMessage};

use super::history::NotificationHistory;
use super::queue::{Dismissal, Notification, NotificationId, NotificationQueue};

/// Live notifications together with their history and audio cue.
pub struct NotificationCenter<P> {
    queue: NotificationQueue,
    history: Option<NotificationHistory>,
    audio: AudioCue<P>,
    sound_enabled: bool,
    /// Set once the user picks a sound setting; configuration no longer
    /// overrides it afterwards.
    sound_chosen: bool,
}

impl<P: SoundPlayer> NotificationCenter<P> {
    /// A zero `history_capacity` disables the history.
    pub fn new(config: &NotificationConfig, audio: AudioCue<P>) -> Self {
        Self {
            queue: NotificationQueue::new(config.max_active, config.removal_grace()),
            history: (config.history_capacity > 0)
                .then(|| NotificationHistory::new(config.history_capacity)),
            audio,
            sound_enabled: config.sound_enabled,
            sound_chosen: false,
        }
    }

    /// Applies a reloaded configuration in place. Live notifications and the
    /// history are kept; a zero `history_capacity` drops the history.
    pub fn configure(&mut self, config: &NotificationConfig, now: Instant) {
        self.queue
            .set_limits(config.max_active, config.removal_grace(), now);
        let capacity = config.history_capacity;
        if capacity == 0 {
            self.history = None;
        } else if let Some(history) = self.history.as_mut() {
            history.set_capacity(capacity);
        } else {
            self.history = Some(NotificationHistory::new(capacity));
        }
        if !self.sound_chosen {
            self.sound_enabled = config.sound_enabled;
        }
    }

    /// Shows `message`, records it in the history and plays its cue unless
    /// sound is off for the center or for this message.
    pub fn show(&mut self, message: NotificationMessage, now: Instant) -> NotificationId {
        let NotificationMessage {
            severity,
            message,
            dismiss_after,
            sound,
            action,
        } = message;

        let id = self
            .queue
            .show_with_action(message, severity, dismiss_after, action, now);
        if let (Some(history), Some(shown)) = (self.history.as_mut(), self.queue.get(&id)) {
            history.record(&shown.message, severity, shown.shown_at);
        }
        if self.sound_enabled && sound {
            self.audio.play(severity);
        }
        id
    }

    pub fn close(&mut self, id: &NotificationId, now: Instant) -> bool {
        self.queue.close(id, now)
    }

    pub fn close_all(&mut self, now: Instant) -> usize {
        self.queue.close_all(now)
    }

    pub fn activate(&mut self, id: &NotificationId, now: Instant) -> Option<NotificationAction> {
        self.queue.activate(id, now)
    }

    pub fn advance(&mut self, now: Instant) -> Vec<Notification> {
        self.queue.advance(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    pub fn take_dismissals(&mut self) -> Vec<Dismissal> {
        self.queue.take_dismissals()
    }

    pub fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    pub fn history(&self) -> Option<&NotificationHistory> {
        self.history.as_ref()
    }

    pub fn clear_history(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
        self.sound_chosen = true;
    }

    /// Flips the sound flag and returns the new value.
    pub fn toggle_sound(&mut self) -> bool {
        self.set_sound_enabled(!self.sound_enabled);
        self.sound_enabled
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn audio(&self) -> &AudioCue<P> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioCue<P> {
        &mut self.audio
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use vigil_audio::cue::PlaybackError;
    use vigil_audio::sound::Sound;

    use super::*;

    #[derive(Clone, Default)]
    struct CountingPlayer(Rc<Cell<usize>>);

    impl SoundPlayer for CountingPlayer {
        fn play(&self, _sound: &Sound, _volume: f32) -> Result<(), PlaybackError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    fn center(config: &NotificationConfig) -> (NotificationCenter<CountingPlayer>, Rc<Cell<usize>>) {
        let player = CountingPlayer::default();
        let played = player.0.clone();
        (NotificationCenter::new(config, AudioCue::new(player)), played)
    }

    #[test]
    fn history_outlives_eviction() {
        let (mut center, _) = center(&NotificationConfig::default());
        let now = Instant::now();
        for index in 0..8 {
            center.show(NotificationMessage::info(format!("n{index}")), now);
        }

        assert_eq!(center.queue().active_count(), 5);
        let history = center.history().unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history.entries().next().unwrap().message, "n7");
    }

    #[test]
    fn sound_respects_both_switches() {
        let (mut center, played) = center(&NotificationConfig::default());
        let now = Instant::now();

        center.show(NotificationMessage::warning("loud"), now);
        center.show(NotificationMessage::warning("quiet").silent(), now);
        assert_eq!(played.get(), 1);

        assert!(!center.toggle_sound());
        center.show(NotificationMessage::error("muted"), now);
        assert_eq!(played.get(), 1);

        center.set_sound_enabled(true);
        center.audio_mut().disable();
        center.show(NotificationMessage::error("device off"), now);
        assert_eq!(played.get(), 1);
    }

    #[test]
    fn configuration_keeps_live_entries_and_history() {
        let (mut center, _) = center(&NotificationConfig::default());
        let now = Instant::now();
        for index in 0..3 {
            center.show(NotificationMessage::info(format!("n{index}")), now);
        }
        center.toggle_sound();

        center.configure(
            &NotificationConfig {
                max_active: 2,
                history_capacity: 50,
                sound_enabled: true,
                ..NotificationConfig::default()
            },
            now,
        );

        let live: Vec<_> = center.queue().active().map(|entry| entry.message.as_str()).collect();
        assert_eq!(live, ["n1", "n2"]);
        assert_eq!(center.history().unwrap().len(), 3);
        assert!(!center.sound_enabled());

        center.show(NotificationMessage::info("n3"), now);
        assert_eq!(center.queue().active_count(), 2);
        assert_eq!(center.history().unwrap().len(), 4);
    }

    #[test]
    fn configuration_sets_sound_until_the_user_chooses() {
        let (mut center, _) = center(&NotificationConfig::default());
        let quiet = NotificationConfig {
            sound_enabled: false,
            history_capacity: 0,
            ..NotificationConfig::default()
        };
        center.configure(&quiet, Instant::now());
        assert!(!center.sound_enabled());
        assert!(center.history().is_none());

        center.set_sound_enabled(true);
        center.configure(&quiet, Instant::now());
        assert!(center.sound_enabled());
    }

    #[test]
    fn zero_capacity_disables_history() {
        let config = NotificationConfig {
            history_capacity: 0,
            ..NotificationConfig::default()
        };
        let (mut center, _) = center(&config);
        center.show(NotificationMessage::info("untracked"), Instant::now());
        assert!(center.history().is_none());
        center.clear_history();
    }
}
