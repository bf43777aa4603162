pub mod app_auth;
pub mod client;
pub mod field_setup;
pub mod models;

pub use app_auth::AppAuth;
pub use client::GithubProjectsClient;
pub use field_setup::{ensure_fields, resolve_field_ids, FieldSetupOutcome};
