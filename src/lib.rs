pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod web;
pub mod error;

pub use domain::entities;
pub use domain::value_objects;
pub use application::services;
pub use application::use_cases;
pub use error::EngineError;
