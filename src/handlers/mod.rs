// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod public;
pub mod results;
pub mod test_taking;
