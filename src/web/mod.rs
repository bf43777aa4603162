pub mod config;
pub mod auth;
pub mod rate_limit;
pub mod coordinator;
pub mod webhook;
pub mod billing;
pub mod handlers;
pub mod models;
pub mod server;

pub use config::AppConfig;
pub use coordinator::RecalcCoordinator;
pub use server::start_web_server;
