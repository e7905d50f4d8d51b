//! Backend service handlers for frontend-driven requests.
//!
//! This module groups async request handlers that operate on the shared
//! `AppContext`, perform side effects (network, filesystem, the real-time
//! channel), and emit responses or notifications back to the frontend.

pub mod command_service;
pub mod config_service;
pub mod monitoring_service;
pub mod settings_service;
pub mod system_service;
pub mod violation_service;

/// Represents a type that is used in all handlers as an application context.
pub(crate) type AppContextHandle = std::sync::Arc<crate::app::AppContext>;
