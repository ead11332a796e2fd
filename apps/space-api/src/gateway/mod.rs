//! Realtime gateway: per-space connection registry, broadcast hub, and the
//! WebSocket session loop that feeds it.

pub mod connection;
pub mod events;
pub mod hub;
pub mod registry;
pub mod server;
pub mod session;
