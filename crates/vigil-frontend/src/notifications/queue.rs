use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use vigil_bridge::notification::{DismissAfter, NotificationAction, Severity};

/// Opaque identifier of a shown notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ids typed back by the user.
impl From<&str> for NotificationId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Why a notification left the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Closed,
    Expired,
    /// Pushed out by a newer notification while the live set was full.
    Evicted,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    pub created_at: Instant,
    /// Wall-clock time shown next to the message.
    pub shown_at: DateTime<Local>,
    /// Auto-dismiss delay; `None` for persistent notifications.
    pub expires_after: Option<Duration>,
    pub dismissed: bool,
    pub action: Option<NotificationAction>,
    deadline: Option<Instant>,
    remove_at: Option<Instant>,
}

impl Notification {
    /// Fraction of the display time left, counting down linearly from 1 to 0
    /// at the dismissal deadline. `None` for persistent notifications.
    pub fn progress(&self, now: Instant) -> Option<f32> {
        let duration = self.expires_after?;
        if self.dismissed {
            return Some(0.0);
        }
        let elapsed = now.saturating_duration_since(self.created_at);
        let remaining = duration.saturating_sub(elapsed);
        Some(remaining.as_secs_f32() / duration.as_secs_f32())
    }
}

/// A notification that was just dismissed, with the cause.
#[derive(Debug, Clone)]
pub struct Dismissal {
    pub notification: Notification,
    pub reason: DismissReason,
}

/// Bounded, ordered and auto-expiring set of user-visible notifications.
///
/// The queue never reads the clock for scheduling: every mutation takes the
/// current [`Instant`] and the owner calls [`NotificationQueue::advance`]
/// when [`NotificationQueue::next_deadline`] passes.
#[derive(Debug)]
pub struct NotificationQueue {
    /// Live and closing notifications, oldest first.
    entries: Vec<Notification>,
    max_active: usize,
    removal_grace: Duration,
    dismissals: Vec<Dismissal>,
    sequence: u64,
}

impl NotificationQueue {
    /// `max_active` is raised to at least one.
    pub fn new(max_active: usize, removal_grace: Duration) -> Self {
        Self {
            entries: Vec::new(),
            max_active: max_active.max(1),
            removal_grace,
            dismissals: Vec::new(),
            sequence: 0,
        }
    }

    /// Applies new limits to the live set. Entries over a lowered cap are
    /// evicted oldest first; the new grace applies to later dismissals.
    pub fn set_limits(&mut self, max_active: usize, removal_grace: Duration, now: Instant) {
        self.max_active = max_active.max(1);
        self.removal_grace = removal_grace;
        while self.active_count() > self.max_active {
            let Some(oldest) = self.entries.iter().position(|entry| !entry.dismissed) else {
                break;
            };
            self.dismiss_at(oldest, DismissReason::Evicted, now);
        }
    }

    pub fn show(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        dismiss_after: DismissAfter,
        now: Instant,
    ) -> NotificationId {
        self.show_with_action(message, severity, dismiss_after, None, now)
    }

    /// Shows a notification, evicting the oldest live ones first while the
    /// live set is full.
    pub fn show_with_action(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        dismiss_after: DismissAfter,
        action: Option<NotificationAction>,
        now: Instant,
    ) -> NotificationId {
        while self.active_count() >= self.max_active {
            let Some(oldest) = self.entries.iter().position(|entry| !entry.dismissed) else {
                break;
            };
            self.dismiss_at(oldest, DismissReason::Evicted, now);
        }

        let shown_at = Local::now();
        self.sequence += 1;
        let id = NotificationId(format!(
            "notification_{}_{}",
            shown_at.timestamp_millis(),
            self.sequence
        ));
        let expires_after = dismiss_after.resolve(severity);
        self.entries.push(Notification {
            id: id.clone(),
            message: message.into(),
            severity,
            created_at: now,
            shown_at,
            expires_after,
            dismissed: false,
            action,
            deadline: expires_after.map(|duration| now + duration),
            remove_at: None,
        });
        id
    }

    /// Dismisses `id`. Unknown or already dismissed ids are ignored.
    pub fn close(&mut self, id: &NotificationId, now: Instant) -> bool {
        match self
            .entries
            .iter()
            .position(|entry| &entry.id == id && !entry.dismissed)
        {
            Some(index) => {
                self.dismiss_at(index, DismissReason::Closed, now);
                true
            }
            None => false,
        }
    }

    /// Closes every live notification. Returns how many were closed.
    pub fn close_all(&mut self, now: Instant) -> usize {
        let ids: Vec<NotificationId> = self.active().map(|entry| entry.id.clone()).collect();
        ids.iter().filter(|id| self.close(id, now)).count()
    }

    /// Returns the action of `id` and closes it. `None` when the notification
    /// is not live or carries no action.
    pub fn activate(&mut self, id: &NotificationId, now: Instant) -> Option<NotificationAction> {
        let action = self
            .active()
            .find(|entry| &entry.id == id)
            .and_then(|entry| entry.action.clone())?;
        self.close(id, now);
        Some(action)
    }

    /// Fires due auto-dismiss deadlines and drops entries whose removal grace
    /// period has elapsed. Returns the notifications that expired.
    pub fn advance(&mut self, now: Instant) -> Vec<Notification> {
        let mut expired = Vec::new();
        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if !entry.dismissed && entry.deadline.is_some_and(|deadline| deadline <= now) {
                self.dismiss_at(index, DismissReason::Expired, now);
                expired.push(self.entries[index].clone());
            }
        }

        self.entries
            .retain(|entry| entry.remove_at.is_none_or(|remove_at| remove_at > now));
        expired
    }

    /// Earliest pending expiry or removal.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|entry| entry.remove_at.or(entry.deadline))
            .min()
    }

    /// Dismissals recorded since the last call, oldest first.
    pub fn take_dismissals(&mut self) -> Vec<Dismissal> {
        std::mem::take(&mut self.dismissals)
    }

    /// Live notifications, oldest first.
    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(|entry| !entry.dismissed)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Live and still-closing notifications.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn dismiss_at(&mut self, index: usize, reason: DismissReason, now: Instant) {
        let entry = &mut self.entries[index];
        entry.dismissed = true;
        entry.deadline = None;
        entry.remove_at = Some(now + self.removal_grace);
        log::trace!("Notification {} dismissed ({reason:?})", entry.id);
        self.dismissals.push(Dismissal {
            notification: entry.clone(),
            reason,
        });
    }
}
