use std::sync::Arc;

use tokio::sync::RwLock;
use vigil_bridge::settings::ClientSettings;

/// What the user has set up in this run of the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSession {
    /// Whether monitoring is active as far as the client knows.
    pub monitoring: bool,
    pub settings: ClientSettings,
}

pub type SharedSession = Arc<RwLock<ClientSession>>;
