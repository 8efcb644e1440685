// src/models/mod.rs

pub mod ai_question;
pub mod question;
pub mod submission;
pub mod team;
pub mod user;
