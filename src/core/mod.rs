//! Shared error and configuration plumbing.

pub mod config;
pub mod errors;
