//! Application services layer.

pub mod coordinator;
pub mod error;
pub mod provider;
pub mod repos;
pub mod resolver;
pub mod settings_panel;
pub mod targets;
