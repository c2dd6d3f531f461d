//! HTTP route handlers.

pub mod admin;
pub mod dashboard;
pub mod health;
pub mod participants;
pub mod scans;
