pub mod github;
pub mod persistence;
