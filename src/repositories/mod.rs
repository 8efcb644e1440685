// src/repositories/mod.rs

pub mod assessments;
pub mod submissions;
pub mod users;
