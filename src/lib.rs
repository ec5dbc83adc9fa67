#![forbid(unsafe_code)]

pub mod api;
pub mod app;
pub mod auth;
pub mod azure;
pub mod config;
pub mod constants;
pub mod error;
pub mod groups;
pub mod models;
pub mod observability;
pub mod plugin;
pub mod runtime;
pub mod username;

pub use auth::AuthHook;
pub use config::AzureAdConfig;
pub use plugin::AzureAdPlugin;
