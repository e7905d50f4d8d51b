use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Paths;
use crate::connection::ConnectionHandle;
use crate::debug::DebugObserver;
use crate::session::SharedSession;
use crate::store::KeyValueStore;

/// The core application state that holds configuration, the connection
/// handle and other shared resources.
///
/// It is designed to be wrapped in thread-safe, async-friendly concurrency
/// primitives (see [`SharedState`]) to allow safe concurrent reads and
/// occasional writes from multiple tasks.
pub struct State {
    /// The loaded application configuration.
    pub config: vigil_bridge::config::Config,
    /// Location of the config file and the data directory.
    pub paths: Paths,
    /// Client for the server's HTTP API.
    pub api: ApiClient,
    /// Front of the real-time channel.
    pub connection: ConnectionHandle,
    /// What the user has set up in this run.
    pub session: SharedSession,
    /// Values that survive a restart.
    pub store: Arc<dyn KeyValueStore>,
    /// Channel traffic log.
    pub debug: Arc<DebugObserver>,
}

/// Thread-safe, async-friendly shared reference to the application [`State`].
pub type SharedState = Arc<tokio::sync::RwLock<State>>;
