//! Backend runtime entry point and public API surface.
//!
//! This crate owns the backend lifecycle: the real-time channel to the
//! security server, state recovery across reconnects, the HTTP API client and
//! the traffic log. It routes bridge messages to services and manages shared
//! state used by asynchronous tasks.

pub mod api;
mod app;
pub mod config;
pub mod connection;
pub mod debug;
pub mod notify;
pub mod recovery;
mod runtime;
mod services;
pub mod session;
mod state;
pub mod store;

pub use crate::runtime::run;
