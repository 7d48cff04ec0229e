//! Core business logic for tavern-rs.

pub mod services;

pub use services::*;
