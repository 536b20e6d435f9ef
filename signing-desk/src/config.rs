//! Desk configuration.

mod loader;
mod static_config;

pub use loader::load_config;
pub use static_config::{DeskConfig, WorkspaceConfig};
