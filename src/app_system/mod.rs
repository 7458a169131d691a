//! System orchestration, configuration, startup, and shutdown logic.

pub mod admin_system;
pub mod config;
pub mod telemetry;

pub use admin_system::*;
pub use config::*;
pub use telemetry::*;
