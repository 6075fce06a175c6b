//! Configuration and statement data models.

pub mod config;
pub mod statement;
