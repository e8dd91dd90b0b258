//! HTTP handlers

pub mod analyze;
pub mod health;
pub mod history;
