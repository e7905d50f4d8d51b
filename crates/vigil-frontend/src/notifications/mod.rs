//! Toast notifications: the bounded live queue, its history and the
//! composition that plays audio cues alongside.

pub mod center;
pub mod history;
pub mod presets;
pub mod queue;

pub use center::NotificationCenter;
pub use history::{HistoryEntry, NotificationHistory};
pub use queue::{DismissReason, Dismissal, Notification, NotificationId, NotificationQueue};
